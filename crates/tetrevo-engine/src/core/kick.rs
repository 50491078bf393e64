use std::fmt;

use super::piece::{PieceKind, PieceRotation};

/// A quarter-turn transition between two adjacent rotation states.
///
/// Displayed with the rotation-system labels, e.g. `0->R` or `L->2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    from: PieceRotation,
    to: PieceRotation,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl Transition {
    #[must_use]
    pub fn new(from: PieceRotation, to: PieceRotation) -> Self {
        Self { from, to }
    }

    /// Row index into the kick tables.
    fn table_index(self) -> Option<usize> {
        let index = match (self.from.label(), self.to.label()) {
            ('0', 'R') => 0,
            ('R', '0') => 1,
            ('R', '2') => 2,
            ('2', 'R') => 3,
            ('2', 'L') => 4,
            ('L', '2') => 5,
            ('L', '0') => 6,
            ('0', 'L') => 7,
            _ => return None,
        };
        Some(index)
    }
}

/// `(dx, dy)` offset tried after a rotation. Y grows downward.
pub type KickOffset = (i8, i8);

type KickTable = [[KickOffset; 5]; 8];

const JLSTZ_KICKS: KickTable = [
    // 0->R
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    // R->0
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    // R->2
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    // 2->R
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    // 2->L
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    // L->2
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    // L->0
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    // 0->L
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
];

const I_KICKS: KickTable = [
    // 0->R
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    // R->0
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    // R->2
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    // 2->R
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
    // 2->L
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    // L->2
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    // L->0
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
    // 0->L
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
];

/// Ordered wall-kick trials for rotating `kind` through `transition`.
///
/// O never rotates and yields no trials, I has its own table and every other
/// kind shares the J/L/S/T/Z table. Non-adjacent transitions yield no trials.
#[must_use]
pub fn kick_offsets(kind: PieceKind, transition: Transition) -> &'static [KickOffset] {
    let Some(index) = transition.table_index() else {
        return &[];
    };
    match kind {
        PieceKind::O => &[],
        PieceKind::I => &I_KICKS[index],
        PieceKind::S | PieceKind::Z | PieceKind::J | PieceKind::L | PieceKind::T => {
            &JLSTZ_KICKS[index]
        }
    }
}
