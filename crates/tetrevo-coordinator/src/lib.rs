//! Round coordination for evolving a population of game-playing agents.
//!
//! A run is split into execution units (threads or processes), each owning a
//! stride of the population. Every unit drives the same cyclic state machine
//! ([`Phase`]):
//!
//! 1. **Evaluating** - local agents play until every game is over, in parallel
//!    chunks on a worker pool.
//! 2. **All over** - full records, render records and round-stamped fitness
//!    records are published to the [`SharedStore`].
//! 3. **Selecting** - once every unit has published (a [`RoundBarrier`]), parents
//!    are drawn by fitness over the whole population.
//! 4. **Breeding** - parents owned by other units are fetched in one batched
//!    read, and each local agent stages `mutate(crossover(a, b))`.
//! 5. **Reinitializing** - staged genomes are promoted, games restart and the
//!    round number advances.
//!
//! Units only share the store; the barrier guarantees that no unit starts
//! round `N + 1` before every unit finished round `N`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tetrevo_coordinator::{
//!     Coordinator, EvolutionConfig, InlineExecutor, MemoryStore, RunContext, StopSignal,
//!     UnitLayout,
//! };
//! use tetrevo_engine::ScriptedGame;
//! use tetrevo_evolution::NeuralPolicy;
//!
//! let config = EvolutionConfig {
//!     population: 4,
//!     width: 6,
//!     height: 6,
//!     ..EvolutionConfig::default()
//! };
//! let ctx = RunContext::from_config(&config, UnitLayout::single(), StopSignal::new());
//! let mut coordinator = Coordinator::<ScriptedGame, _>::new(
//!     &config,
//!     ctx,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NeuralPolicy),
//!     InlineExecutor,
//! )
//! .unwrap();
//! let summary = coordinator.run_round().unwrap().unwrap();
//! assert_eq!(summary.round, 0);
//! assert_eq!(coordinator.round(), 1);
//! ```

pub use self::{
    agent::*, barrier::*, config::*, context::*, control::*, coordinator::*, error::*,
    evaluate::*, executor::*, population::*, record::*, store::*, summary::*,
};

mod agent;
mod barrier;
mod config;
mod context;
mod control;
mod coordinator;
mod error;
mod evaluate;
mod executor;
mod population;
mod record;
mod store;
mod summary;
