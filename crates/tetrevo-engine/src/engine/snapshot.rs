use serde::{Deserialize, Serialize};

use crate::core::grid::Cell;

use super::{game::Engine, moves::Move, piece_bag::PieceSeed};

/// Observable state of one game, as published for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Total line-clear score of the game.
    pub score: u32,
    pub is_game_over: bool,
    /// Row-major cells, row 0 at the top, with the falling piece drawn in.
    pub grid: Vec<Vec<Cell>>,
}

/// Anything that can report an [`EngineSnapshot`].
pub trait Snapshot {
    fn snapshot(&self) -> EngineSnapshot;
}

/// A game an agent can be evaluated on.
///
/// Implemented by the real [`Engine`] and by
/// [`ScriptedGame`](super::ScriptedGame), whose outcome is known in advance.
pub trait Simulation: Snapshot + Send {
    /// Starts a fresh game on a `width` x `height` board.
    fn start(width: usize, height: usize, seed: PieceSeed) -> Self
    where
        Self: Sized;

    fn apply_move(&mut self, mv: Move);

    /// Advances the game by one tick and returns the reward earned by it.
    fn tick(&mut self) -> u32;

    fn is_game_over(&self) -> bool;

    fn total_score(&self) -> u32;

    /// Writes the board into `inputs` as `width * height` row-major values.
    ///
    /// `0.0` is empty, `1.0` is the falling piece and `0.5` a locked block.
    fn observe(&self, inputs: &mut Vec<f32>);
}

/// Encodes a rendered board the way [`Simulation::observe`] expects.
pub(crate) fn encode_cells(cells: &[Vec<Cell>], inputs: &mut Vec<f32>) {
    inputs.clear();
    inputs.extend(cells.iter().flatten().map(|cell| match cell {
        Cell::Empty => 0.0,
        Cell::Active => 1.0,
        Cell::Locked(_) => 0.5,
    }));
}

impl Snapshot for Engine {
    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            score: self.total_score(),
            is_game_over: self.is_game_over(),
            grid: self.cells(),
        }
    }
}

impl Simulation for Engine {
    fn start(width: usize, height: usize, seed: PieceSeed) -> Self {
        Engine::with_seed(width, height, seed)
    }

    fn apply_move(&mut self, mv: Move) {
        Engine::apply_move(self, mv);
    }

    fn tick(&mut self) -> u32 {
        Engine::tick(self)
    }

    fn is_game_over(&self) -> bool {
        Engine::is_game_over(self)
    }

    fn total_score(&self) -> u32 {
        Engine::total_score(self)
    }

    fn observe(&self, inputs: &mut Vec<f32>) {
        encode_cells(&self.cells(), inputs);
    }
}
