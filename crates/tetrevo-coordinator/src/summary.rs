use std::fmt;

use serde::Serialize;
use tetrevo_stats::descriptive::DescriptiveStats;

use crate::agent::AgentId;

/// Outcome of one completed round, as seen by one unit.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: u64,
    pub unit: usize,
    /// Agents across all units.
    pub population: usize,
    /// Fitness over the whole population.
    pub fitness: DescriptiveStats,
    /// Best local agent and its fitness.
    pub best: (AgentId, u64),
    /// Local agents that cleared at least one line.
    pub scorer_count: usize,
    /// Event cycles of the longest local chunk.
    pub cycles: u64,
    /// Events played across local chunks.
    pub events: u64,
}

impl fmt::Display for RoundSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {} (unit {}): fitness min {:.0} / mean {:.2} / median {:.1} / max {:.0} \
             (std-dev {:.2}), best agent {} = {}, scorers {}, {} cycles",
            self.round,
            self.unit,
            self.fitness.min,
            self.fitness.mean,
            self.fitness.median,
            self.fitness.max,
            self.fitness.std_dev,
            self.best.0,
            self.best.1,
            self.scorer_count,
            self.cycles,
        )
    }
}
