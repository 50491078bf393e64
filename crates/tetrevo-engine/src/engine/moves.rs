use std::collections::VecDeque;

/// An input applied to the falling piece.
///
/// The declaration order is the order of a policy's output vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::IsVariant)]
pub enum Move {
    #[display("left")]
    Left,
    #[display("right")]
    Right,
    /// Hard drop.
    #[display("up")]
    Up,
    /// Soft drop by one row.
    #[display("down")]
    Down,
    #[display("rotate_cw")]
    RotateCw,
    #[display("rotate_ccw")]
    RotateCcw,
    #[display("noop")]
    Noop,
}

impl Move {
    pub const LEN: usize = 7;

    /// All moves in policy-output order.
    pub const ALL: [Self; Self::LEN] = [
        Move::Left,
        Move::Right,
        Move::Up,
        Move::Down,
        Move::RotateCw,
        Move::RotateCcw,
        Move::Noop,
    ];

    /// Move at `index` of a policy's output vector.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn is_vertical(self) -> bool {
        matches!(self, Move::Up | Move::Down)
    }
}

const SINGLE_REPEAT_WINDOW: usize = 20;
const DOUBLE_REPEAT_WINDOW: usize = 30;

/// Recent moves of one game, used to end degenerate play.
///
/// Only the last [`DOUBLE_REPEAT_WINDOW`] moves are kept.
#[derive(Debug, Clone, Default)]
pub struct MoveHistory {
    moves: VecDeque<Move>,
}

impl MoveHistory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            moves: VecDeque::with_capacity(DOUBLE_REPEAT_WINDOW),
        }
    }

    pub fn push(&mut self, mv: Move) {
        if self.moves.len() == DOUBLE_REPEAT_WINDOW {
            self.moves.pop_front();
        }
        self.moves.push_back(mv);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Whether the agent is stuck repeating itself.
    ///
    /// True when the latest move is horizontal or a rotation and either the last
    /// 20 moves are identical or the last 30 alternate between two moves.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let Some(&last) = self.moves.back() else {
            return false;
        };
        if last.is_vertical() {
            return false;
        }
        self.has_single_repetition(last) || self.has_double_repetition()
    }

    fn has_single_repetition(&self, last: Move) -> bool {
        self.moves.len() >= SINGLE_REPEAT_WINDOW
            && self
                .moves
                .iter()
                .rev()
                .take(SINGLE_REPEAT_WINDOW)
                .all(|&mv| mv == last)
    }

    fn has_double_repetition(&self) -> bool {
        if self.moves.len() < DOUBLE_REPEAT_WINDOW {
            return false;
        }
        let window = self.moves.range(self.moves.len() - DOUBLE_REPEAT_WINDOW..);
        let (even, odd): (Vec<_>, Vec<_>) = window.enumerate().partition(|(i, _)| i % 2 == 0);
        let all_same = |moves: &[(usize, &Move)]| moves.iter().all(|(_, mv)| *mv == moves[0].1);
        all_same(&even) && all_same(&odd)
    }
}
