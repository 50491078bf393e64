use serde::{Deserialize, Serialize};
use tetrevo_engine::{Engine, PieceSeed, Simulation};
use tetrevo_evolution::{Genome, Policy};

use crate::record::{AgentRecord, FitnessRecord};

/// Population-wide identifier of an agent, `0..population`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct AgentId(pub usize);

/// The genome an agent plays with, plus the offspring staged to replace it.
///
/// Breeding stages children while parents are still readable; the swap
/// happens for every agent at once during reinitialization.
#[derive(Debug, Clone)]
pub struct GenomeSlot {
    active: Genome,
    pending: Option<Genome>,
}

impl GenomeSlot {
    #[must_use]
    pub fn new(active: Genome) -> Self {
        Self {
            active,
            pending: None,
        }
    }

    #[must_use]
    pub fn active(&self) -> &Genome {
        &self.active
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Genome> {
        self.pending.as_ref()
    }

    pub fn stage(&mut self, genome: Genome) {
        self.pending = Some(genome);
    }

    /// Replaces the active genome with the staged one.
    ///
    /// Returns `false`, leaving the slot unchanged, if nothing was staged.
    pub fn promote(&mut self) -> bool {
        match self.pending.take() {
            Some(genome) => {
                self.active = genome;
                true
            }
            None => false,
        }
    }
}

/// One member of the population: genome, live game and fitness.
#[derive(Debug, Clone)]
pub struct Agent<E = Engine> {
    id: AgentId,
    width: usize,
    height: usize,
    genome: GenomeSlot,
    game: E,
    fitness: u64,
}

impl<E> Agent<E>
where
    E: Simulation,
{
    #[must_use]
    pub fn new(id: AgentId, width: usize, height: usize, genome: Genome, seed: PieceSeed) -> Self {
        Self {
            id,
            width,
            height,
            genome: GenomeSlot::new(genome),
            game: E::start(width, height, seed),
            fitness: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn fitness(&self) -> u64 {
        self.fitness
    }

    #[must_use]
    pub fn game(&self) -> &E {
        &self.game
    }

    #[must_use]
    pub fn genome(&self) -> &GenomeSlot {
        &self.genome
    }

    pub fn genome_mut(&mut self) -> &mut GenomeSlot {
        &mut self.genome
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.game.is_game_over()
    }

    /// Plays one event: observe, choose, move and, on a megatick, advance gravity.
    ///
    /// Every non-noop move earns 1; a megatick earns 1 more plus the tick's
    /// line-clear reward. Finished games are left alone.
    pub fn step(&mut self, policy: &dyn Policy, megatick: bool, inputs: &mut Vec<f32>) {
        if self.game.is_game_over() {
            return;
        }
        self.game.observe(inputs);
        let mv = policy.choose_move(self.genome.active(), inputs);
        self.game.apply_move(mv);
        if !mv.is_noop() {
            self.fitness += 1;
        }
        if megatick {
            self.fitness += 1;
            self.fitness += u64::from(self.game.tick());
        }
    }

    /// Starts a fresh game and clears fitness, keeping the genome slot.
    pub fn restart(&mut self, seed: PieceSeed) {
        self.game = E::start(self.width, self.height, seed);
        self.fitness = 0;
    }

    /// Record for renderers: board and score, no genome.
    #[must_use]
    pub fn render_record(&self) -> AgentRecord {
        AgentRecord {
            id: self.id,
            width: self.width,
            height: self.height,
            fitness: self.fitness,
            engine: Some(self.game.snapshot()),
            genome: None,
        }
    }

    /// Record for breeding on other units: the render record plus the active genome.
    #[must_use]
    pub fn full_record(&self) -> AgentRecord {
        AgentRecord {
            genome: Some(self.genome.active().clone()),
            ..self.render_record()
        }
    }

    #[must_use]
    pub fn fitness_record(&self, round: u64) -> FitnessRecord {
        FitnessRecord {
            id: self.id,
            round,
            fitness: self.fitness,
        }
    }
}
