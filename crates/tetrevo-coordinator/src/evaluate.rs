//! Chunk evaluation: agents play event cycles until every game is over.
//!
//! An event cycle is [`PLAIN_EVENTS`] plain events followed by one megatick.
//! On every event each live agent observes its board, asks the policy for a
//! move and applies it; on the megatick gravity and scoring advance as well.

use tetrevo_engine::Simulation;
use tetrevo_evolution::Policy;

use crate::{
    agent::Agent,
    context::StopSignal,
    store::{StoreClient, StoreError},
};

/// Plain events per cycle before the megatick.
pub const PLAIN_EVENTS: u64 = 8;

/// Events per cycle, megatick included.
pub const EVENTS_PER_CYCLE: u64 = PLAIN_EVENTS + 1;

/// What a chunk needs besides its agents.
#[derive(Clone, Copy)]
pub struct ChunkJob<'a> {
    pub policy: &'a dyn Policy,
    pub store: &'a StoreClient,
    pub stop: &'a StopSignal,
    pub render_interval: Option<u64>,
    pub cycle_limit: Option<u64>,
}

/// Outcome of one chunk evaluation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    /// Event cycles started, the last one possibly cut short.
    pub cycles: u64,
    pub events: u64,
    /// The stop signal ended the chunk before its games did.
    pub stopped: bool,
}

/// Plays the chunk until every agent is over, the cycle limit is hit or the
/// stop signal is raised.
///
/// The stop signal is checked between cycles; a stopped chunk does not
/// publish its final render records.
pub fn evaluate_chunk<E>(
    agents: &mut [&mut Agent<E>],
    job: &ChunkJob<'_>,
) -> Result<ChunkReport, StoreError>
where
    E: Simulation,
{
    let mut report = ChunkReport::default();
    let mut inputs = Vec::new();
    let all_over = |agents: &[&mut Agent<E>]| agents.iter().all(|a| a.is_over());

    while !all_over(agents) {
        if job.stop.is_stopped() {
            report.stopped = true;
            return Ok(report);
        }
        if job.cycle_limit.is_some_and(|limit| report.cycles >= limit) {
            break;
        }
        report.cycles += 1;
        for event in 0..EVENTS_PER_CYCLE {
            let megatick = event == PLAIN_EVENTS;
            for agent in agents.iter_mut() {
                agent.step(job.policy, megatick, &mut inputs);
            }
            report.events += 1;
            if all_over(agents) {
                break;
            }
            if job
                .render_interval
                .is_some_and(|interval| report.events % interval == 0)
            {
                job.store.publish_render(agents.iter().map(|a| &**a))?;
            }
        }
    }

    job.store.publish_render(agents.iter().map(|a| &**a))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg32;
    use tetrevo_engine::{Engine, Move, ScriptedGame};
    use tetrevo_evolution::{FixedPolicy, Genome, GenomeShape};

    use super::*;
    use crate::{agent::AgentId, store::MemoryStore};

    fn agents<E: Simulation>(n: usize, width: usize, height: usize) -> Vec<Agent<E>> {
        let mut rng = Pcg32::seed_from_u64(0);
        let shape = GenomeShape::for_board(width, height, 4);
        (0..n)
            .map(|id| {
                let genome = Genome::random(shape, &mut rng);
                Agent::new(AgentId(id), width, height, genome, rng.random())
            })
            .collect()
    }

    fn run<E: Simulation>(
        agents: &mut [Agent<E>],
        policy: &dyn Policy,
        cycle_limit: Option<u64>,
    ) -> (ChunkReport, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let client = StoreClient::new(store.clone());
        let stop = StopSignal::new();
        let job = ChunkJob {
            policy,
            store: &client,
            stop: &stop,
            render_interval: None,
            cycle_limit,
        };
        let mut refs: Vec<_> = agents.iter_mut().collect();
        let report = evaluate_chunk(&mut refs, &job).unwrap();
        (report, store)
    }

    #[test]
    fn test_noop_agents_earn_one_per_cycle_on_scripted_games() {
        let mut agents = agents::<ScriptedGame>(2, 10, 10);
        let (report, _) = run(&mut agents, &FixedPolicy(Move::Noop), Some(40));
        assert_eq!(report.cycles, 40);
        assert_eq!(report.events, 40 * EVENTS_PER_CYCLE);
        for agent in &agents {
            assert_eq!(agent.fitness(), 40);
            assert!(!agent.is_over());
        }
    }

    #[test]
    fn test_noop_agents_earn_one_per_cycle_on_real_engine() {
        let mut agents = agents::<Engine>(2, 10, 10);
        let (_, _) = run(&mut agents, &FixedPolicy(Move::Noop), Some(40));
        for agent in &agents {
            if !agent.is_over() {
                // no move ever scores; a line clear would need 10 blocks in a row
                assert_eq!(agent.fitness(), 40 + u64::from(agent.game().total_score()));
            }
        }
    }

    #[test]
    fn test_scripted_games_run_to_the_end() {
        let mut agents = agents::<ScriptedGame>(3, 4, 4);
        let (report, store) = run(&mut agents, &FixedPolicy(Move::Left), None);
        // 16 ticks of lifetime: 16 full cycles, the last one ends on its megatick
        assert_eq!(report.cycles, 16);
        assert_eq!(report.events, 16 * EVENTS_PER_CYCLE);
        for agent in &agents {
            assert!(agent.is_over());
            assert_eq!(agent.fitness(), 16 * EVENTS_PER_CYCLE + 16);
        }
        // one final render publication
        assert_eq!(store.stats().sets, 1);
    }

    #[test]
    fn test_render_interval_publishes_periodically() {
        let mut agents = agents::<ScriptedGame>(1, 4, 4);
        let store = Arc::new(MemoryStore::new());
        let client = StoreClient::new(store.clone());
        let stop = StopSignal::new();
        let job = ChunkJob {
            policy: &FixedPolicy(Move::Noop),
            store: &client,
            stop: &stop,
            render_interval: Some(EVENTS_PER_CYCLE),
            cycle_limit: Some(3),
        };
        let mut refs: Vec<_> = agents.iter_mut().collect();
        evaluate_chunk(&mut refs, &job).unwrap();
        assert_eq!(store.stats().sets, 3 + 1);
    }

    #[test]
    fn test_stop_skips_final_publication() {
        let mut agents = agents::<ScriptedGame>(2, 4, 4);
        let store = Arc::new(MemoryStore::new());
        let client = StoreClient::new(store.clone());
        let stop = StopSignal::new();
        stop.stop();
        let job = ChunkJob {
            policy: &FixedPolicy(Move::Noop),
            store: &client,
            stop: &stop,
            render_interval: Some(1),
            cycle_limit: None,
        };
        let mut refs: Vec<_> = agents.iter_mut().collect();
        let report = evaluate_chunk(&mut refs, &job).unwrap();
        assert!(report.stopped);
        assert_eq!(report.cycles, 0);
        assert_eq!(store.stats().sets, 0);
    }
}
