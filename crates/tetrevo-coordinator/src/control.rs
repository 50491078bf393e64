use std::{
    sync::{Arc, mpsc},
    thread::{self, JoinHandle},
};

use tetrevo_engine::{Engine, Simulation};
use tetrevo_evolution::NeuralPolicy;

use crate::{
    config::EvolutionConfig,
    context::{RunContext, StopSignal, UnitLayout},
    coordinator::Coordinator,
    error::CoordinatorError,
    executor::{ChunkExecutor, PoolExecutor},
    record::AgentRecord,
    store::{SharedStore, StoreClient, StoreError},
    summary::RoundSummary,
};

/// A single-unit evolution running on a background thread.
///
/// Dropping the handle stops the run and waits for it.
pub struct EvolutionHandle {
    stop: StopSignal,
    client: StoreClient,
    population: usize,
    summaries: mpsc::Receiver<RoundSummary>,
    thread: Option<JoinHandle<Result<u64, CoordinatorError>>>,
}

impl EvolutionHandle {
    /// Starts evolving `population` neural agents with the rest of `config`.
    pub fn start(
        population: usize,
        config: &EvolutionConfig,
        store: Arc<dyn SharedStore>,
    ) -> Result<Self, CoordinatorError> {
        let config = EvolutionConfig {
            population,
            ..config.clone()
        };
        let ctx = RunContext::from_config(&config, UnitLayout::single(), StopSignal::new());
        let executor = PoolExecutor::new(ctx.workers)?;
        let coordinator: Coordinator<Engine, _> =
            Coordinator::new(&config, ctx, store, Arc::new(NeuralPolicy), executor)?;
        Self::spawn(coordinator)
    }

    /// Runs an already built coordinator until stopped.
    pub fn spawn<E, X>(mut coordinator: Coordinator<E, X>) -> Result<Self, CoordinatorError>
    where
        E: Simulation + 'static,
        X: ChunkExecutor + Send + 'static,
    {
        let (tx, summaries) = mpsc::channel();
        coordinator.add_sink(tx);
        let stop = coordinator.stop_signal().clone();
        let client = coordinator.store().clone();
        let population = coordinator.population();
        let thread = thread::Builder::new()
            .name("tetrevo-coordinator".to_owned())
            .spawn(move || coordinator.run(None))
            .map_err(CoordinatorError::Spawn)?;
        Ok(Self {
            stop,
            client,
            population,
            summaries,
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Latest render record of every agent, in one batched read.
    pub fn latest_states(&self) -> Result<Vec<Option<AgentRecord>>, StoreError> {
        self.client.load_render_states(self.population)
    }

    /// Summaries of rounds completed since the last call.
    pub fn summaries(&self) -> impl Iterator<Item = RoundSummary> + '_ {
        self.summaries.try_iter()
    }

    /// Stops the run after its current event cycle; returns the rounds completed.
    pub fn stop(mut self) -> Result<u64, CoordinatorError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<u64, CoordinatorError> {
        self.stop.stop();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| CoordinatorError::Panicked)?,
            None => Ok(0),
        }
    }
}

impl Drop for EvolutionHandle {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("evolution ended with an error: {e}");
        }
    }
}
