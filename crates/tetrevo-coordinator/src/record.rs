use serde::{Deserialize, Serialize};
use tetrevo_engine::EngineSnapshot;
use tetrevo_evolution::Genome;

use crate::agent::AgentId;

/// Key prefix of a record family in the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Namespace {
    /// Full agent records, genome included.
    #[display("bot")]
    Bot,
    /// Lightweight records for renderers, without genome.
    #[display("render_bot")]
    RenderBot,
    /// Round-stamped fitness values.
    #[display("fitness")]
    Fitness,
}

impl Namespace {
    /// Store key of agent `id`, e.g. `render_bot:3`.
    #[must_use]
    pub fn key(self, id: AgentId) -> String {
        format!("{self}:{id}")
    }
}

/// Serialized state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub width: usize,
    pub height: usize,
    pub fitness: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genome: Option<Genome>,
}

/// Fitness of one agent at the end of `round`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessRecord {
    pub id: AgentId,
    pub round: u64,
    pub fitness: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(Namespace::Bot.key(AgentId(4)), "bot:4");
        assert_eq!(Namespace::RenderBot.key(AgentId(0)), "render_bot:0");
        assert_eq!(Namespace::Fitness.key(AgentId(12)), "fitness:12");
    }

    #[test]
    fn test_render_record_omits_genome() {
        let record = AgentRecord {
            id: AgentId(1),
            width: 10,
            height: 10,
            fitness: 7,
            engine: None,
            genome: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":1,"width":10,"height":10,"fitness":7}"#);
        let back: AgentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
