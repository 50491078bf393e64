use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tetrevo_coordinator::{AgentId, EvolutionConfig};
use tetrevo_evolution::Genome;

/// Best genome of a run, exported for replay or seeding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenomeModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    /// Rounds completed when the genome was exported.
    pub rounds: u64,
    pub agent: AgentId,
    pub fitness: u64,
    pub config: EvolutionConfig,
    pub genome: Genome,
}
