use tetrevo_evolution::ShapeMismatchError;

use crate::{agent::AgentId, barrier::BarrierError, store::StoreError};

/// Errors that abort a round.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CoordinatorError {
    #[display("invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
    #[display("{_0}")]
    Store(StoreError),
    #[display("{_0}")]
    Barrier(BarrierError),
    #[display("{_0}")]
    Shape(ShapeMismatchError),
    #[display("agent {id} has no staged offspring")]
    MissingOffspring {
        id: AgentId,
    },
    #[display("chunk {chunk} of unit {unit} failed in round {round}: {source}")]
    ChunkFailed {
        unit: usize,
        round: u64,
        chunk: usize,
        source: StoreError,
    },
    #[display("failed to build worker pool: {_0}")]
    Pool(rayon::ThreadPoolBuildError),
    #[display("failed to spawn coordinator thread: {_0}")]
    Spawn(std::io::Error),
    #[display("evolution thread panicked")]
    Panicked,
}

impl From<StoreError> for CoordinatorError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<BarrierError> for CoordinatorError {
    fn from(e: BarrierError) -> Self {
        Self::Barrier(e)
    }
}

impl From<ShapeMismatchError> for CoordinatorError {
    fn from(e: ShapeMismatchError) -> Self {
        Self::Shape(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for CoordinatorError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::Pool(e)
    }
}
