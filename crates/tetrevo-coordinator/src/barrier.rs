use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crate::{
    context::{StopSignal, UnitLayout},
    store::{SharedStore, StoreError},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum BarrierError {
    #[display("barrier {sequence} timed out with {arrived} of {expected} units")]
    Timeout {
        sequence: u64,
        arrived: usize,
        expected: usize,
    },
    #[display("stopped while waiting at barrier {sequence}")]
    Stopped { sequence: u64 },
    #[display("{_0}")]
    Store(StoreError),
}

impl From<StoreError> for BarrierError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Rendezvous of all units between phases.
///
/// Barrier `n` lives under the store key `tick:{n}`. A unit joins by adding its
/// id to that set and then polls until the set holds every unit. A unit that
/// arrives early at barrier `n + 1` is simply the first member of the next set;
/// old sets are left behind.
#[derive(Clone)]
pub struct RoundBarrier {
    store: Arc<dyn SharedStore>,
    layout: UnitLayout,
    stop: StopSignal,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl RoundBarrier {
    #[must_use]
    pub fn new(
        store: Arc<dyn SharedStore>,
        layout: UnitLayout,
        stop: StopSignal,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            layout,
            stop,
            poll_interval,
            timeout,
        }
    }

    #[must_use]
    pub fn key(sequence: u64) -> String {
        format!("tick:{sequence}")
    }

    /// Blocks until every unit has joined barrier `sequence`.
    pub fn wait(&self, sequence: u64) -> Result<(), BarrierError> {
        let key = Self::key(sequence);
        let member = self.layout.unit().to_string();
        let expected = self.layout.units();
        let started = Instant::now();
        let mut arrived = self.store.join_set(&key, &member)?;
        while arrived < expected {
            if self.stop.is_stopped() {
                return Err(BarrierError::Stopped { sequence });
            }
            if self.timeout.is_some_and(|t| started.elapsed() >= t) {
                return Err(BarrierError::Timeout {
                    sequence,
                    arrived,
                    expected,
                });
            }
            thread::sleep(self.poll_interval);
            arrived = self.store.join_set(&key, &member)?;
        }
        log::debug!("unit {} passed barrier {sequence}", self.layout.unit());
        Ok(())
    }
}
