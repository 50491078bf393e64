use crate::core::grid::Cell;

use super::{
    moves::Move,
    piece_bag::PieceSeed,
    snapshot::{EngineSnapshot, Simulation, Snapshot, encode_cells},
};

/// A game with no pieces that ends after a fixed number of ticks.
///
/// Moves are accepted and ignored, ticks never score. Used where the outcome of
/// an evaluation has to be known exactly, e.g. for fitness bookkeeping tests
/// and benchmarks of the coordinator.
#[derive(Debug, Clone)]
pub struct ScriptedGame {
    width: usize,
    height: usize,
    ticks_left: usize,
}

impl ScriptedGame {
    #[must_use]
    pub fn with_lifetime(width: usize, height: usize, lifetime: usize) -> Self {
        Self {
            width,
            height,
            ticks_left: lifetime,
        }
    }

    #[must_use]
    pub fn ticks_left(&self) -> usize {
        self.ticks_left
    }
}

impl Snapshot for ScriptedGame {
    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            score: 0,
            is_game_over: self.is_game_over(),
            grid: vec![vec![Cell::Empty; self.width]; self.height],
        }
    }
}

impl Simulation for ScriptedGame {
    /// Lives for `width * height` ticks; the seed is unused.
    fn start(width: usize, height: usize, _seed: PieceSeed) -> Self {
        Self::with_lifetime(width, height, width * height)
    }

    fn apply_move(&mut self, _mv: Move) {}

    fn tick(&mut self) -> u32 {
        self.ticks_left = self.ticks_left.saturating_sub(1);
        0
    }

    fn is_game_over(&self) -> bool {
        self.ticks_left == 0
    }

    fn total_score(&self) -> u32 {
        0
    }

    fn observe(&self, inputs: &mut Vec<f32>) {
        encode_cells(&self.snapshot().grid, inputs);
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng as _;

    use super::*;

    #[test]
    fn test_ends_after_lifetime() {
        let mut game = ScriptedGame::with_lifetime(4, 4, 3);
        for _ in 0..2 {
            game.apply_move(Move::Left);
            assert_eq!(game.tick(), 0);
            assert!(!game.is_game_over());
        }
        game.tick();
        assert!(game.is_game_over());
        assert!(game.snapshot().is_game_over);
        game.tick();
        assert_eq!(game.ticks_left(), 0);
    }

    #[test]
    fn test_start_uses_board_area() {
        let game = ScriptedGame::start(10, 10, rand::rng().random());
        assert_eq!(game.ticks_left(), 100);
        let mut inputs = Vec::new();
        game.observe(&mut inputs);
        assert_eq!(inputs, vec![0.0; 100]);
    }
}
