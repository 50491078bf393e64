use std::collections::HashSet;

use rand::Rng as _;

use crate::core::{
    grid::{Cell, Grid},
    kick::{KickOffset, Transition, kick_offsets},
    piece::{Piece, PieceKind, RotationDirection},
};

use super::{
    moves::{Move, MoveHistory},
    piece_bag::{PieceBag, PieceSeed},
};

/// Score values for line clears.
///
/// Index corresponds to number of lines cleared simultaneously:
/// - 0 lines: 0 points
/// - 1 line: 100 points
/// - 2 lines: 300 points
/// - 3 lines: 500 points
/// - 4 lines: 800 points
pub const SCORE_TABLE: [u32; 5] = [0, 100, 300, 500, 800];

/// Reward for clearing `lines` rows at once.
#[must_use]
pub fn line_clear_reward(lines: usize) -> u32 {
    SCORE_TABLE
        .get(lines)
        .copied()
        .unwrap_or(SCORE_TABLE[SCORE_TABLE.len() - 1])
}

/// A successful wall kick, remembered for the lifetime of one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KickAttempt {
    x: i32,
    y: i32,
    transition: Transition,
    offset: KickOffset,
}

/// Game state of a single agent: playfield, falling piece, bag and score.
///
/// The engine is a one-way state machine: it plays until a spawned piece
/// collides or the move history turns degenerate, and then ignores every
/// further move and tick. Invalid moves are silent no-ops.
///
/// # Example
///
/// ```
/// use tetrevo_engine::{Engine, Move};
///
/// let mut engine = Engine::new(10, 10);
/// engine.apply_move(Move::Up); // hard drop locks the piece
/// assert!(engine.grid().rows().iter().flatten().any(|c| c.is_locked()));
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    grid: Grid,
    active: Piece,
    next: PieceKind,
    bag: PieceBag,
    score: u32,
    total_score: u32,
    game_over: bool,
    history: MoveHistory,
    kick_memo: HashSet<KickAttempt>,
}

impl Engine {
    /// Starts a game with a random piece seed.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_seed(width, height, rand::rng().random())
    }

    /// Starts a game whose piece sequence is fixed by `seed`.
    ///
    /// # Panics
    ///
    /// Panics if the board is narrower than 4 or shorter than 2 cells, which
    /// cannot hold every spawn shape.
    #[must_use]
    pub fn with_seed(width: usize, height: usize, seed: PieceSeed) -> Self {
        assert!(
            width >= 4 && height >= 2,
            "board {width}x{height} is too small for every piece"
        );
        let mut bag = PieceBag::with_seed(seed);
        let active = Piece::spawn(bag.pop_next(), width);
        let next = bag.pop_next();
        Self {
            grid: Grid::new(width, height),
            active,
            next,
            bag,
            score: 0,
            total_score: 0,
            game_over: false,
            history: MoveHistory::new(),
            kick_memo: HashSet::new(),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// Locked blocks, without the falling piece.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn active_piece(&self) -> Piece {
        self.active
    }

    #[must_use]
    pub fn next_piece(&self) -> PieceKind {
        self.next
    }

    /// Line-clear reward earned since the last tick started.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[must_use]
    pub fn move_history(&self) -> &MoveHistory {
        &self.history
    }

    /// Playfield with the falling piece drawn as [`Cell::Active`].
    #[must_use]
    pub fn cells(&self) -> Vec<Vec<Cell>> {
        let mut cells = self.grid.rows().to_vec();
        for (x, y) in self.active.cells() {
            let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
                continue;
            };
            if let Some(cell) = cells.get_mut(y).and_then(|row| row.get_mut(x)) {
                *cell = Cell::Active;
            }
        }
        cells
    }

    /// Applies one input to the falling piece.
    ///
    /// Every move except [`Move::Noop`] is recorded in the move history first;
    /// if the history turns degenerate the game ends and the move is dropped.
    pub fn apply_move(&mut self, mv: Move) {
        if self.game_over {
            return;
        }
        if !mv.is_noop() {
            self.history.push(mv);
            if self.history.is_degenerate() {
                self.game_over = true;
                return;
            }
        }

        match mv {
            Move::Left => {
                self.try_shift(-1, 0);
            }
            Move::Right => {
                self.try_shift(1, 0);
            }
            Move::Down => {
                self.try_shift(0, 1);
            }
            Move::Up => self.hard_drop(),
            Move::RotateCw => {
                self.rotate(RotationDirection::Clockwise);
            }
            Move::RotateCcw => {
                self.rotate(RotationDirection::CounterClockwise);
            }
            Move::Noop => {}
        }
    }

    /// Advances gravity by one row, or locks the piece and spawns the next one.
    ///
    /// Returns the line-clear reward earned by this tick.
    pub fn tick(&mut self) -> u32 {
        if self.game_over {
            return 0;
        }
        self.score = 0;
        if !self.try_shift(0, 1) {
            self.lock_and_spawn();
        }
        self.score
    }

    fn try_shift(&mut self, dx: i32, dy: i32) -> bool {
        let candidate = self.active.shifted(dx, dy);
        if !self.grid.fits(candidate) {
            return false;
        }
        self.active = candidate;
        true
    }

    fn hard_drop(&mut self) {
        while self.try_shift(0, 1) {}
        self.lock_and_spawn();
    }

    fn lock_and_spawn(&mut self) {
        self.grid.lock(self.active);
        let reward = line_clear_reward(self.grid.clear_full_rows());
        self.score += reward;
        self.total_score += reward;

        self.active = Piece::spawn(self.next, self.grid.width());
        self.next = self.bag.pop_next();
        self.kick_memo.clear();
        if !self.grid.fits(self.active) {
            self.game_over = true;
        }
    }

    /// Rotates through the wall-kick trials; the first valid, not yet used kick wins.
    fn rotate(&mut self, direction: RotationDirection) -> bool {
        let rotated = self.active.rotated(direction);
        let transition = Transition::new(self.active.rotation(), rotated.rotation());
        for &offset in kick_offsets(self.active.kind(), transition) {
            let attempt = KickAttempt {
                x: self.active.x(),
                y: self.active.y(),
                transition,
                offset,
            };
            if self.kick_memo.contains(&attempt) {
                continue;
            }
            let candidate = rotated.shifted(i32::from(offset.0), i32::from(offset.1));
            if self.grid.fits(candidate) {
                self.active = candidate;
                self.kick_memo.insert(attempt);
                return true;
            }
        }
        false
    }
}
