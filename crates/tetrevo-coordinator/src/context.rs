use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::Duration,
};

use crate::{config::EvolutionConfig, error::CoordinatorError, summary::RoundSummary};

/// Shared flag asking a run to stop after the current event cycle.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Position of one execution unit among all units of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLayout {
    unit: usize,
    units: usize,
}

impl UnitLayout {
    /// # Errors
    ///
    /// Fails unless `unit < units`.
    pub fn new(unit: usize, units: usize) -> Result<Self, CoordinatorError> {
        if unit >= units {
            return Err(CoordinatorError::InvalidConfig {
                reason: format!("unit {unit} out of range for {units} units"),
            });
        }
        Ok(Self { unit, units })
    }

    /// The only unit of a single-process run.
    #[must_use]
    pub fn single() -> Self {
        Self { unit: 0, units: 1 }
    }

    #[must_use]
    pub fn unit(self) -> usize {
        self.unit
    }

    #[must_use]
    pub fn units(self) -> usize {
        self.units
    }

    #[must_use]
    pub fn is_single(self) -> bool {
        self.units == 1
    }

    /// Whether agent `id` is evaluated by this unit.
    #[must_use]
    pub fn owns(self, id: usize) -> bool {
        id % self.units == self.unit
    }
}

/// Run-wide settings handed to a coordinator at construction.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub stop: StopSignal,
    pub layout: UnitLayout,
    /// Worker threads evaluating chunks inside this unit.
    pub workers: usize,
    /// Publish render records every this many events; `None` publishes only
    /// when a chunk finishes.
    pub render_interval: Option<u64>,
    pub poll_interval: Duration,
    pub barrier_timeout: Option<Duration>,
    /// Stop after this many event cycles even if games are still running.
    pub cycle_limit: Option<u64>,
    pub seed: u64,
}

impl RunContext {
    #[must_use]
    pub fn from_config(config: &EvolutionConfig, layout: UnitLayout, stop: StopSignal) -> Self {
        Self {
            stop,
            layout,
            workers: config.workers.unwrap_or_else(default_workers),
            render_interval: config.render_interval,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            barrier_timeout: config.barrier_timeout_ms.map(Duration::from_millis),
            cycle_limit: config.cycle_limit,
            seed: config.seed.unwrap_or_else(rand::random),
        }
    }
}

/// Available parallelism minus two, leaving room for the coordinator and
/// the rest of the host; at least one.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map_or(1, |n| n.get().saturating_sub(2))
        .max(1)
}

/// Receives the summary of every completed round.
pub trait RoundSink: Send {
    fn round_completed(&mut self, summary: &RoundSummary);
}

/// Logs each summary at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RoundSink for LogSink {
    fn round_completed(&mut self, summary: &RoundSummary) {
        log::info!("{summary}");
    }
}

impl RoundSink for mpsc::Sender<RoundSummary> {
    fn round_completed(&mut self, summary: &RoundSummary) {
        // a dropped receiver only means nobody is listening anymore
        let _ = self.send(summary.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_validation() {
        assert!(UnitLayout::new(2, 2).is_err());
        let layout = UnitLayout::new(1, 3).unwrap();
        assert!(layout.owns(4));
        assert!(!layout.owns(3));
        assert!(!layout.is_single());
        assert!(UnitLayout::single().owns(17));
    }

    #[test]
    fn test_stop_signal_is_shared() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        assert!(!clone.is_stopped());
        stop.stop();
        assert!(clone.is_stopped());
    }

    #[test]
    fn test_default_workers_is_positive() {
        assert!(default_workers() >= 1);
    }
}
