use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tetrevo_engine::Simulation;

use crate::{agent::Agent, error::CoordinatorError};

/// Runs chunk jobs and hands back one result per chunk, in chunk order.
///
/// This is the seam between a coordinator and whatever actually executes its
/// chunks: the calling thread, a local worker pool, or a remote queue.
pub trait ChunkExecutor {
    /// Number of chunks the coordinator should split its agents into.
    fn workers(&self) -> usize;

    fn execute<E, F, R>(&self, chunks: Vec<Vec<&mut Agent<E>>>, job: F) -> Vec<R>
    where
        E: Simulation,
        F: Fn(usize, &mut [&mut Agent<E>]) -> R + Send + Sync,
        R: Send;
}

/// Runs every chunk on the calling thread, one after the other.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl ChunkExecutor for InlineExecutor {
    fn workers(&self) -> usize {
        1
    }

    fn execute<E, F, R>(&self, chunks: Vec<Vec<&mut Agent<E>>>, job: F) -> Vec<R>
    where
        E: Simulation,
        F: Fn(usize, &mut [&mut Agent<E>]) -> R + Send + Sync,
        R: Send,
    {
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, mut chunk)| job(i, &mut chunk))
            .collect()
    }
}

/// Runs chunks in parallel on a dedicated rayon pool.
#[derive(Debug)]
pub struct PoolExecutor {
    pool: ThreadPool,
    workers: usize,
}

impl PoolExecutor {
    pub fn new(workers: usize) -> Result<Self, CoordinatorError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tetrevo-eval-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }
}

impl ChunkExecutor for PoolExecutor {
    fn workers(&self) -> usize {
        self.workers
    }

    fn execute<E, F, R>(&self, chunks: Vec<Vec<&mut Agent<E>>>, job: F) -> Vec<R>
    where
        E: Simulation,
        F: Fn(usize, &mut [&mut Agent<E>]) -> R + Send + Sync,
        R: Send,
    {
        self.pool.install(|| {
            chunks
                .into_par_iter()
                .enumerate()
                .map(|(i, mut chunk)| job(i, &mut chunk))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg32;
    use tetrevo_engine::ScriptedGame;
    use tetrevo_evolution::{Genome, GenomeShape};

    use super::*;
    use crate::{agent::AgentId, population::stride_chunks};

    fn agents(n: usize) -> Vec<Agent<ScriptedGame>> {
        let mut rng = Pcg32::seed_from_u64(0);
        (0..n)
            .map(|id| {
                let genome = Genome::random(GenomeShape::for_board(4, 4, 2), &mut rng);
                Agent::new(AgentId(id), 4, 4, genome, rng.random())
            })
            .collect()
    }

    fn chunk_ids<X: ChunkExecutor>(executor: &X) -> Vec<Vec<usize>> {
        let mut agents = agents(7);
        let chunks = stride_chunks(agents.iter_mut(), executor.workers());
        executor.execute(chunks, |_, chunk| chunk.iter().map(|a| a.id().0).collect())
    }

    #[test]
    fn test_inline_runs_one_chunk() {
        assert_eq!(chunk_ids(&InlineExecutor), vec![vec![0, 1, 2, 3, 4, 5, 6]]);
    }

    #[test]
    fn test_pool_keeps_chunk_order() {
        let pool = PoolExecutor::new(3).unwrap();
        assert_eq!(
            chunk_ids(&pool),
            vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]
        );
    }
}
