use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use rand::Rng as _;
use rand_pcg::Pcg32;
use tetrevo_engine::{Engine, Simulation};
use tetrevo_evolution::{Genome, Policy, check_total, select_parent};
use tetrevo_stats::descriptive::DescriptiveStats;

use crate::{
    agent::{Agent, AgentId},
    barrier::{BarrierError, RoundBarrier},
    config::EvolutionConfig,
    context::{RoundSink, RunContext, StopSignal, UnitLayout},
    error::CoordinatorError,
    evaluate::{ChunkJob, ChunkReport, evaluate_chunk},
    executor::{ChunkExecutor, PoolExecutor},
    population::{stride_chunks, unit_agent_ids},
    record::Namespace,
    store::{SharedStore, StoreClient, StoreError},
    summary::RoundSummary,
};

/// Where a coordinator is in its round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum Phase {
    #[display("evaluating")]
    Evaluating,
    #[display("all over")]
    AllOver,
    #[display("selecting")]
    Selecting,
    #[display("breeding")]
    Breeding,
    #[display("reinitializing")]
    Reinitializing,
}

/// Drives the rounds of one execution unit.
///
/// Owns the unit's agents (ids `unit, unit + units, ...`) and talks to the
/// other units only through the shared store and the round barrier.
pub struct Coordinator<E = Engine, X = PoolExecutor>
where
    E: Simulation,
    X: ChunkExecutor,
{
    ctx: RunContext,
    population: usize,
    mutation_rate: f64,
    agents: Vec<Agent<E>>,
    store: StoreClient,
    barrier: RoundBarrier,
    policy: Arc<dyn Policy>,
    executor: X,
    sinks: Vec<Box<dyn RoundSink>>,
    rng: Pcg32,
    round: u64,
    phase: Phase,
    champion: Option<(AgentId, u64, Genome)>,
}

/// Parents drawn for one local agent.
type ParentPair = (AgentId, AgentId);

impl<E, X> Coordinator<E, X>
where
    E: Simulation,
    X: ChunkExecutor,
{
    /// Creates the unit's agents with random genomes and fresh games.
    pub fn new(
        config: &EvolutionConfig,
        ctx: RunContext,
        store: Arc<dyn SharedStore>,
        policy: Arc<dyn Policy>,
        executor: X,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let layout = ctx.layout;
        // every unit must own at least one agent or its barrier arrivals mean nothing
        if config.population < layout.units() {
            return Err(CoordinatorError::InvalidConfig {
                reason: format!(
                    "population {} is smaller than the {} execution units",
                    config.population,
                    layout.units()
                ),
            });
        }
        // one PCG stream per unit, all derived from the run seed
        let mut rng = Pcg32::new(ctx.seed, layout.unit() as u64);
        let shape = config.genome_shape();
        let agents = unit_agent_ids(config.population, layout)
            .into_iter()
            .map(|id| {
                let genome = Genome::random(shape, &mut rng);
                Agent::new(id, config.width, config.height, genome, rng.random())
            })
            .collect::<Vec<_>>();
        let barrier = RoundBarrier::new(
            Arc::clone(&store),
            layout,
            ctx.stop.clone(),
            ctx.poll_interval,
            ctx.barrier_timeout,
        );
        log::info!(
            "unit {}/{}: {} of {} agents, {} workers, seed {}",
            layout.unit(),
            layout.units(),
            agents.len(),
            config.population,
            executor.workers(),
            ctx.seed,
        );
        Ok(Self {
            ctx,
            population: config.population,
            mutation_rate: config.mutation_rate,
            agents,
            store: StoreClient::new(store),
            barrier,
            policy,
            executor,
            sinks: Vec::new(),
            rng,
            round: 0,
            phase: Phase::Evaluating,
            champion: None,
        })
    }

    pub fn add_sink<S>(&mut self, sink: S)
    where
        S: RoundSink + 'static,
    {
        self.sinks.push(Box::new(sink));
    }

    /// Number of completed rounds.
    #[must_use]
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Agents across all units.
    #[must_use]
    pub fn population(&self) -> usize {
        self.population
    }

    #[must_use]
    pub fn stop_signal(&self) -> &StopSignal {
        &self.ctx.stop
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent<E>] {
        &self.agents
    }

    #[must_use]
    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// Best local agent of the last completed round, with the genome it played.
    #[must_use]
    pub fn champion(&self) -> Option<&(AgentId, u64, Genome)> {
        self.champion.as_ref()
    }

    /// Runs rounds until `max_rounds` complete or the stop signal is raised.
    ///
    /// Returns the number of rounds completed by this call.
    pub fn run(&mut self, max_rounds: Option<u64>) -> Result<u64, CoordinatorError> {
        let mut completed = 0;
        while max_rounds.is_none_or(|max| completed < max) {
            if self.run_round()?.is_none() {
                break;
            }
            completed += 1;
        }
        Ok(completed)
    }

    /// Runs one full round; `None` if the stop signal ended it early.
    pub fn run_round(&mut self) -> Result<Option<RoundSummary>, CoordinatorError> {
        let round = self.round;
        if self.ctx.stop.is_stopped() {
            return Ok(None);
        }

        self.enter(Phase::Evaluating);
        if !self.pass_barrier(2 * round + 1)? {
            return Ok(None);
        }
        let Some(report) = self.evaluate()? else {
            log::info!("unit {}: stopped during round {round}", self.ctx.layout.unit());
            return Ok(None);
        };

        self.enter(Phase::AllOver);
        self.store.publish_round(&self.agents, round)?;
        if !self.pass_barrier(2 * round + 2)? {
            return Ok(None);
        }

        self.enter(Phase::Selecting);
        let fitness = self.population_fitness()?;
        let summary = self.summarize(&fitness, report)?;
        let pairs = self.select_parents(&fitness);

        self.enter(Phase::Breeding);
        self.breed(&pairs)?;

        self.enter(Phase::Reinitializing);
        self.reinitialize()?;

        for sink in &mut self.sinks {
            sink.round_completed(&summary);
        }
        Ok(Some(summary))
    }

    fn enter(&mut self, phase: Phase) {
        log::trace!(
            "unit {} round {}: {phase}",
            self.ctx.layout.unit(),
            self.round
        );
        self.phase = phase;
    }

    /// Waits at barrier `sequence`; `false` if the wait was stopped.
    fn pass_barrier(&self, sequence: u64) -> Result<bool, CoordinatorError> {
        match self.barrier.wait(sequence) {
            Ok(()) => Ok(true),
            Err(BarrierError::Stopped { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Plays every local game to the end; `None` if stopped.
    fn evaluate(&mut self) -> Result<Option<ChunkReport>, CoordinatorError> {
        let unit = self.ctx.layout.unit();
        let round = self.round;
        let job = ChunkJob {
            policy: &*self.policy,
            store: &self.store,
            stop: &self.ctx.stop,
            render_interval: self.ctx.render_interval,
            cycle_limit: self.ctx.cycle_limit,
        };
        let chunks = stride_chunks(self.agents.iter_mut(), self.executor.workers());
        let results = self.executor.execute(chunks, |chunk, agents| {
            log::debug!(
                "unit {unit} round {round}: chunk {chunk} evaluating {} agents",
                agents.len()
            );
            evaluate_chunk(agents, &job)
        });

        let mut total = ChunkReport::default();
        for (chunk, result) in results.into_iter().enumerate() {
            let report = result.map_err(|source| {
                log::error!("unit {unit} round {round}: chunk {chunk} failed: {source}");
                CoordinatorError::ChunkFailed {
                    unit,
                    round,
                    chunk,
                    source,
                }
            })?;
            total.cycles = total.cycles.max(report.cycles);
            total.events += report.events;
            total.stopped |= report.stopped;
        }
        Ok((!total.stopped).then_some(total))
    }

    /// Fitness of every agent of the population, indexed by id.
    fn population_fitness(&self) -> Result<Vec<u64>, CoordinatorError> {
        if self.ctx.layout.is_single() {
            return Ok(self.agents.iter().map(Agent::fitness).collect());
        }
        Ok(self.store.load_fitness(self.population, self.round)?)
    }

    #[expect(clippy::cast_precision_loss)]
    fn summarize(
        &mut self,
        fitness: &[u64],
        report: ChunkReport,
    ) -> Result<RoundSummary, CoordinatorError> {
        let stats = DescriptiveStats::new(fitness.iter().map(|&f| f as f64)).ok_or_else(|| {
            CoordinatorError::InvalidConfig {
                reason: "population must not be empty".to_owned(),
            }
        })?;
        self.champion = self
            .agents
            .iter()
            .max_by_key(|a| a.fitness())
            .map(|a| (a.id(), a.fitness(), a.genome().active().clone()));
        let best = self
            .champion
            .as_ref()
            .map_or((AgentId(self.ctx.layout.unit()), 0), |(id, f, _)| (*id, *f));
        let summary = RoundSummary {
            round: self.round,
            unit: self.ctx.layout.unit(),
            population: self.population,
            fitness: stats,
            best,
            scorer_count: self
                .agents
                .iter()
                .filter(|a| a.game().total_score() > 0)
                .count(),
            cycles: report.cycles,
            events: report.events,
        };
        log::info!("{summary}");
        Ok(summary)
    }

    /// Draws two parents for every local agent, by fitness over the population.
    #[expect(clippy::cast_precision_loss)]
    fn select_parents(&mut self, fitness: &[u64]) -> Vec<ParentPair> {
        let weights: Vec<f64> = fitness.iter().map(|&f| f as f64).collect();
        let total: f64 = weights.iter().sum();
        if let Err(e) = check_total(total) {
            log::warn!("round {}: {e}, selecting parents uniformly", self.round);
        }
        let count = self.agents.len();
        let mut draw = || AgentId(select_parent(&weights, total, &mut self.rng).unwrap_or(0));
        (0..count).map(|_| (draw(), draw())).collect()
    }

    fn local_index(&self, id: AgentId) -> Option<usize> {
        local_index(self.ctx.layout, self.agents.len(), id)
    }

    /// Genomes of parents owned by other units, fetched in one batched read.
    fn fetch_remote_parents(
        &self,
        pairs: &[ParentPair],
    ) -> Result<BTreeMap<AgentId, Genome>, CoordinatorError> {
        let remote: BTreeSet<AgentId> = pairs
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .filter(|&id| self.local_index(id).is_none())
            .collect();
        if remote.is_empty() {
            return Ok(BTreeMap::new());
        }
        let ids: Vec<_> = remote.into_iter().collect();
        log::debug!(
            "unit {}: fetching {} remote parents",
            self.ctx.layout.unit(),
            ids.len()
        );
        Ok(self.store.load_genomes(&ids)?)
    }

    /// Stages `mutate(crossover(a, b))` as every local agent's next genome.
    fn breed(&mut self, pairs: &[ParentPair]) -> Result<(), CoordinatorError> {
        let remote = self.fetch_remote_parents(pairs)?;
        let layout = self.ctx.layout;
        let mut children = Vec::with_capacity(pairs.len());
        for &(a, b) in pairs {
            let parent_a = parent_genome(&self.agents, layout, a, &remote)?;
            let parent_b = parent_genome(&self.agents, layout, b, &remote)?;
            let child = parent_a
                .crossover(parent_b, &mut self.rng)?
                .mutate(self.mutation_rate, &mut self.rng);
            children.push(child);
        }
        for (agent, child) in self.agents.iter_mut().zip(children) {
            agent.genome_mut().stage(child);
        }
        Ok(())
    }

    /// Promotes staged genomes and restarts every local game.
    fn reinitialize(&mut self) -> Result<(), CoordinatorError> {
        for agent in &mut self.agents {
            if !agent.genome_mut().promote() {
                return Err(CoordinatorError::MissingOffspring { id: agent.id() });
            }
            agent.restart(self.rng.random());
        }
        self.round += 1;
        Ok(())
    }
}

/// Position of agent `id` among the `len` agents of `layout`'s unit.
fn local_index(layout: UnitLayout, len: usize, id: AgentId) -> Option<usize> {
    if !layout.owns(id.0) {
        return None;
    }
    let index = id.0 / layout.units();
    (index < len).then_some(index)
}

fn parent_genome<'a, E>(
    agents: &'a [Agent<E>],
    layout: UnitLayout,
    id: AgentId,
    remote: &'a BTreeMap<AgentId, Genome>,
) -> Result<&'a Genome, CoordinatorError>
where
    E: Simulation,
{
    if let Some(index) = local_index(layout, agents.len(), id) {
        return Ok(agents[index].genome().active());
    }
    remote.get(&id).ok_or_else(|| {
        StoreError::Missing {
            key: Namespace::Bot.key(id),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread};

    use tetrevo_engine::{Move, ScriptedGame};
    use tetrevo_evolution::{FixedPolicy, NeuralPolicy};

    use super::*;
    use crate::{
        executor::InlineExecutor,
        store::{DirStore, MemoryStore},
    };

    fn config(population: usize) -> EvolutionConfig {
        EvolutionConfig {
            population,
            width: 6,
            height: 6,
            hidden: 4,
            poll_interval_ms: 1,
            barrier_timeout_ms: Some(10_000),
            seed: Some(11),
            ..EvolutionConfig::default()
        }
    }

    fn coordinator(
        config: &EvolutionConfig,
        layout: UnitLayout,
        store: Arc<MemoryStore>,
        policy: Arc<dyn Policy>,
    ) -> Coordinator<ScriptedGame, InlineExecutor> {
        let ctx = RunContext::from_config(config, layout, StopSignal::new());
        Coordinator::new(config, ctx, store, policy, InlineExecutor).unwrap()
    }

    #[test]
    fn test_single_unit_round_breeds_every_agent() {
        let store = Arc::new(MemoryStore::new());
        // every scalar mutates, so no child can equal its parent
        let config = EvolutionConfig {
            mutation_rate: 1.0,
            ..config(5)
        };
        let mut c = coordinator(
            &config,
            UnitLayout::single(),
            store.clone(),
            Arc::new(FixedPolicy(Move::Left)),
        );
        let before: Vec<_> = c.agents().iter().map(|a| a.genome().active().clone()).collect();
        let summary = c.run_round().unwrap().unwrap();

        assert_eq!(summary.round, 0);
        assert_eq!(summary.population, 5);
        // 36 cycles of 9 scoring moves plus the megatick bonus
        assert_eq!(summary.fitness.min, 36.0 * 10.0);
        assert_eq!(summary.fitness.max, 36.0 * 10.0);
        assert_eq!(summary.cycles, 36);
        assert_eq!(c.round(), 1);
        assert!(c.phase().is_reinitializing());
        for (agent, old) in c.agents().iter().zip(&before) {
            assert_eq!(agent.fitness(), 0);
            assert!(!agent.is_over());
            assert_ne!(agent.genome().active(), old);
            assert!(agent.genome().pending().is_none());
        }
        // single unit: fitness comes from memory, parents are all local
        assert_eq!(store.stats().gets, 0);
        let champion = c.champion().unwrap();
        assert_eq!(champion.1, 360);
    }

    #[test]
    fn test_zero_fitness_falls_back_to_uniform_selection() {
        let mut c = coordinator(
            &config(4),
            UnitLayout::single(),
            Arc::new(MemoryStore::new()),
            Arc::new(FixedPolicy(Move::Noop)),
        );
        let pairs = c.select_parents(&[0, 0, 0, 0]);
        assert_eq!(pairs.len(), 4);
        assert!(pairs.iter().all(|&(a, b)| a.0 < 4 && b.0 < 4));
    }

    #[test]
    fn test_remote_parents_are_fetched_in_one_batch() {
        let store = Arc::new(MemoryStore::new());
        let config = config(6);
        let mut unit0 = coordinator(
            &config,
            UnitLayout::new(0, 2).unwrap(),
            store.clone(),
            Arc::new(NeuralPolicy),
        );
        let unit1 = coordinator(
            &config,
            UnitLayout::new(1, 2).unwrap(),
            store.clone(),
            Arc::new(NeuralPolicy),
        );
        assert_eq!(
            unit0.agents().iter().map(|a| a.id().0).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        unit1.store().publish_round(unit1.agents(), 0).unwrap();

        let gets = store.stats().gets;
        let pairs = vec![
            (AgentId(1), AgentId(3)),
            (AgentId(3), AgentId(0)),
            (AgentId(5), AgentId(5)),
        ];
        let remote = unit0.fetch_remote_parents(&pairs).unwrap();
        assert_eq!(
            remote.keys().copied().collect::<Vec<_>>(),
            vec![AgentId(1), AgentId(3), AgentId(5)]
        );
        assert_eq!(&remote[&AgentId(3)], unit1.agents()[1].genome().active());
        assert_eq!(store.stats().gets, gets + 1);

        unit0.breed(&pairs).unwrap();
        assert_eq!(store.stats().gets, gets + 2);
        assert!(unit0.agents().iter().all(|a| a.genome().pending().is_some()));

        // all-local parents need no read at all
        unit0.breed(&[(AgentId(0), AgentId(2)); 3]).unwrap();
        assert_eq!(store.stats().gets, gets + 2);
    }

    #[test]
    fn test_stale_fitness_aborts_selection() {
        let store = Arc::new(MemoryStore::new());
        let config = config(4);
        let mut unit0 = coordinator(
            &config,
            UnitLayout::new(0, 2).unwrap(),
            store.clone(),
            Arc::new(NeuralPolicy),
        );
        let unit1 = coordinator(
            &config,
            UnitLayout::new(1, 2).unwrap(),
            store.clone(),
            Arc::new(NeuralPolicy),
        );
        unit1.store().publish_round(unit1.agents(), 0).unwrap();
        unit0.store().publish_round(unit0.agents(), 0).unwrap();
        unit0.round = 1;
        unit0.store().publish_round(unit0.agents(), 1).unwrap();
        let err = unit0.population_fitness().unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Store(StoreError::StaleRound { .. })
        ));
    }

    #[test]
    fn test_units_in_threads_complete_rounds_together() {
        let store = Arc::new(MemoryStore::new());
        let config = EvolutionConfig {
            render_interval: None,
            ..config(7)
        };
        let (tx, rx) = mpsc::channel();
        thread::scope(|s| {
            for unit in 0..3 {
                let store = store.clone();
                let tx = tx.clone();
                let config = &config;
                s.spawn(move || {
                    let mut c = coordinator(
                        config,
                        UnitLayout::new(unit, 3).unwrap(),
                        store,
                        Arc::new(NeuralPolicy),
                    );
                    c.add_sink(tx);
                    assert_eq!(c.run(Some(3)).unwrap(), 3);
                    assert_eq!(c.round(), 3);
                });
            }
        });
        drop(tx);
        let summaries: Vec<_> = rx.iter().collect();
        assert_eq!(summaries.len(), 9);
        for round in 0..3 {
            let of_round: Vec<_> = summaries.iter().filter(|s| s.round == round).collect();
            assert_eq!(of_round.len(), 3);
            // every unit saw the same population-wide fitness
            assert!(of_round.iter().all(|s| s.fitness == of_round[0].fitness));
            assert!(of_round.iter().all(|s| s.population == 7));
        }
    }

    #[test]
    fn test_units_share_a_store_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = EvolutionConfig {
            render_interval: None,
            ..config(4)
        };
        thread::scope(|s| {
            for unit in 0..2 {
                let config = &config;
                let root = dir.path();
                s.spawn(move || {
                    let store = Arc::new(DirStore::open_run(root, "shared").unwrap());
                    let ctx = RunContext::from_config(
                        config,
                        UnitLayout::new(unit, 2).unwrap(),
                        StopSignal::new(),
                    );
                    let mut c: Coordinator<ScriptedGame, InlineExecutor> = Coordinator::new(
                        config,
                        ctx,
                        store,
                        Arc::new(NeuralPolicy),
                        InlineExecutor,
                    )
                    .unwrap();
                    assert_eq!(c.run(Some(2)).unwrap(), 2);
                });
            }
        });
        let client = StoreClient::new(Arc::new(DirStore::open(dir.path()).unwrap()));
        assert_eq!(client.load_fitness(4, 1).unwrap().len(), 4);
        assert!(dir.path().join("tick.4.set").is_dir());
    }

    #[test]
    fn test_stop_ends_run_without_new_rounds() {
        let store = Arc::new(MemoryStore::new());
        let config = config(3);
        let stop = StopSignal::new();
        let ctx = RunContext::from_config(&config, UnitLayout::single(), stop.clone());
        let mut c: Coordinator<ScriptedGame, InlineExecutor> = Coordinator::new(
            &config,
            ctx,
            store,
            Arc::new(NeuralPolicy),
            InlineExecutor,
        )
        .unwrap();
        assert_eq!(c.run(Some(2)).unwrap(), 2);
        stop.stop();
        assert!(c.run_round().unwrap().is_none());
        assert_eq!(c.run(None).unwrap(), 0);
        assert_eq!(c.round(), 2);
    }

    /// Accepts barrier joins but refuses every write.
    struct ReadOnlyStore;

    impl SharedStore for ReadOnlyStore {
        fn set_many(&self, _entries: &[(String, String)]) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }

        fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
            Ok(vec![None; keys.len()])
        }

        fn join_set(&self, _key: &str, _member: &str) -> Result<usize, StoreError> {
            Ok(1)
        }
    }

    #[test]
    fn test_failed_render_publish_fails_the_round() {
        let config = config(3);
        let ctx = RunContext::from_config(&config, UnitLayout::single(), StopSignal::new());
        let mut c: Coordinator<ScriptedGame, InlineExecutor> = Coordinator::new(
            &config,
            ctx,
            Arc::new(ReadOnlyStore),
            Arc::new(NeuralPolicy),
            InlineExecutor,
        )
        .unwrap();
        let err = c.run_round().unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::ChunkFailed {
                unit: 0,
                round: 0,
                chunk: 0,
                source: StoreError::Poisoned,
            }
        ));
        // nothing was bred and the round did not advance
        assert_eq!(c.round(), 0);
        assert!(c.phase().is_evaluating());
        assert!(c.agents().iter().all(|a| a.genome().pending().is_none()));
    }

    #[test]
    fn test_reinitialize_without_offspring_is_an_error() {
        let mut c = coordinator(
            &config(2),
            UnitLayout::single(),
            Arc::new(MemoryStore::new()),
            Arc::new(NeuralPolicy),
        );
        let err = c.reinitialize().unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::MissingOffspring { id: AgentId(0) }
        ));
        assert_eq!(c.round(), 0);
    }

    #[test]
    fn test_population_smaller_than_units_is_rejected() {
        let config = config(2);
        let ctx = RunContext::from_config(
            &config,
            UnitLayout::new(0, 3).unwrap(),
            StopSignal::new(),
        );
        let result: Result<Coordinator<ScriptedGame, InlineExecutor>, _> = Coordinator::new(
            &config,
            ctx,
            Arc::new(MemoryStore::new()),
            Arc::new(NeuralPolicy),
            InlineExecutor,
        );
        assert!(matches!(
            result,
            Err(CoordinatorError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_peer_times_out() {
        let config = EvolutionConfig {
            barrier_timeout_ms: Some(20),
            ..config(4)
        };
        let mut c = coordinator(
            &config,
            UnitLayout::new(0, 2).unwrap(),
            Arc::new(MemoryStore::new()),
            Arc::new(NeuralPolicy),
        );
        let err = c.run_round().unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Barrier(BarrierError::Timeout {
                sequence: 1,
                arrived: 1,
                expected: 2
            })
        ));
    }
}
