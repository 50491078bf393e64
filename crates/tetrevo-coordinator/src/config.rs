use serde::{Deserialize, Serialize};
use tetrevo_evolution::GenomeShape;

use crate::error::CoordinatorError;

/// Tunable parameters of an evolution run.
///
/// Every field has a default, so a JSON config file only needs the fields it
/// changes:
///
/// ```
/// # use tetrevo_coordinator::EvolutionConfig;
/// let config: EvolutionConfig = serde_json::from_str(r#"{"population": 32}"#).unwrap();
/// assert_eq!(config.population, 32);
/// assert_eq!(config.width, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Agents across all units.
    pub population: usize,
    pub width: usize,
    pub height: usize,
    /// Width of the network's hidden layer.
    pub hidden: usize,
    /// Per-scalar mutation probability.
    pub mutation_rate: f64,
    /// Render publication period in events; `None` publishes once per chunk.
    pub render_interval: Option<u64>,
    pub poll_interval_ms: u64,
    pub barrier_timeout_ms: Option<u64>,
    /// Event-cycle cap per round; `None` plays every game to the end.
    pub cycle_limit: Option<u64>,
    /// Evaluation threads per unit; `None` picks from the host's parallelism.
    pub workers: Option<usize>,
    /// Run seed; `None` draws one.
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: 16,
            width: 10,
            height: 10,
            hidden: 16,
            mutation_rate: 0.01,
            render_interval: Some(9),
            poll_interval_ms: 100,
            barrier_timeout_ms: None,
            cycle_limit: None,
            workers: None,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    #[must_use]
    pub fn genome_shape(&self) -> GenomeShape {
        GenomeShape::for_board(self.width, self.height, self.hidden)
    }

    /// Rejects settings no run can start with.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        let reason = if self.population == 0 {
            "population must not be empty".to_owned()
        } else if self.width < 4 || self.height < 2 {
            format!("board {}x{} is too small", self.width, self.height)
        } else if self.hidden == 0 {
            "hidden layer must not be empty".to_owned()
        } else if !(0.0..=1.0).contains(&self.mutation_rate) {
            format!("mutation rate {} is not a probability", self.mutation_rate)
        } else if self.workers == Some(0) {
            "at least one worker is required".to_owned()
        } else if self.render_interval == Some(0) {
            "render interval must be positive".to_owned()
        } else {
            return Ok(());
        };
        Err(CoordinatorError::InvalidConfig { reason })
    }
}
