use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// A falling piece (tetromino) with kind, rotation state and position.
///
/// Pieces are immutable values: shifting and rotating return new `Piece`s and
/// leave collision checks to the caller.
///
/// # Coordinate System
///
/// - `(x, y)` is the top-left corner of the piece's bounding box
/// - X increases rightward, Y increases downward
/// - I and O use a 4×4 box, every other kind a 3×3 box
///
/// # Example
///
/// ```
/// use tetrevo_engine::{Piece, PieceKind, RotationDirection};
///
/// let piece = Piece::spawn(PieceKind::T, 10);
/// let moved = piece.shifted(-1, 0);
/// let rotated = moved.rotated(RotationDirection::Clockwise);
/// assert_eq!(rotated.x(), piece.x() - 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    kind: PieceKind,
    rotation: PieceRotation,
    x: i32,
    y: i32,
}

impl Piece {
    /// Places a piece of `kind` at the spawn pose for a board `board_width` wide.
    ///
    /// The spawn shape is centered horizontally and its topmost occupied row
    /// lands on row 0. On boards too narrow to center it, the shape is pushed
    /// back inside the right wall.
    #[must_use]
    pub fn spawn(kind: PieceKind, board_width: usize) -> Self {
        let cells = kind.cells(PieceRotation::SPAWN);
        let top = cells.iter().map(|&(_, dy)| dy).min().unwrap_or(0);
        let left = i32::from(cells.iter().map(|&(dx, _)| dx).min().unwrap_or(0));
        let right = i32::from(cells.iter().map(|&(dx, _)| dx).max().unwrap_or(0));
        let center = (left + right) / 2;
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let board_width = board_width as i32;
        let x = (board_width / 2 - center).min(board_width - 1 - right).max(-left);
        Self {
            kind,
            rotation: PieceRotation::SPAWN,
            x,
            y: -i32::from(top),
        }
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn rotation(&self) -> PieceRotation {
        self.rotation
    }

    #[must_use]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Board coordinates of the four occupied cells.
    #[must_use]
    pub fn cells(&self) -> ArrayVec<(i32, i32), 4> {
        self.kind
            .cells(self.rotation)
            .iter()
            .map(|&(dx, dy)| (self.x + i32::from(dx), self.y + i32::from(dy)))
            .collect()
    }

    #[must_use]
    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Rotates in place without any wall kick.
    #[must_use]
    pub fn rotated(&self, direction: RotationDirection) -> Self {
        Self {
            rotation: self.rotation.rotated(direction),
            ..*self
        }
    }
}

/// Direction of a quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Rotation state of a piece.
///
/// States are named by the standard rotation system labels:
///
/// - `0`: spawn orientation
/// - `R`: one clockwise quarter turn
/// - `2`: half turn
/// - `L`: one counter-clockwise quarter turn
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRotation(u8);

impl fmt::Display for PieceRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl PieceRotation {
    pub const SPAWN: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const TWO: Self = Self(2);
    pub const LEFT: Self = Self(3);

    #[must_use]
    pub fn rotated(self, direction: RotationDirection) -> Self {
        match direction {
            RotationDirection::Clockwise => Self((self.0 + 1) % 4),
            RotationDirection::CounterClockwise => Self((self.0 + 3) % 4),
        }
    }

    #[must_use]
    pub const fn label(self) -> char {
        match self.0 {
            0 => '0',
            1 => 'R',
            2 => '2',
            _ => 'L',
        }
    }

    pub(crate) const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Enum representing the type of piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// S-piece.
    S = 2,
    /// Z-piece.
    Z = 3,
    /// J-piece.
    J = 4,
    /// L-piece.
    L = 5,
    /// T-piece.
    T = 6,
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
        PieceKind::T,
    ];

    /// Offsets of the occupied cells inside the bounding box for `rotation`.
    #[must_use]
    pub fn cells(self, rotation: PieceRotation) -> &'static ShapeCells {
        &PIECE_CELLS[self as usize][rotation.as_usize()]
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use tetrevo_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::T => 'T',
        }
    }

    /// Parses a piece kind from a single character.
    ///
    /// # Examples
    ///
    /// ```
    /// use tetrevo_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_char('Z'), Some(PieceKind::Z));
    /// assert_eq!(PieceKind::from_char('X'), None);
    /// ```
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            'T' => Some(PieceKind::T),
            _ => None,
        }
    }
}

/// Occupied `(dx, dy)` offsets of a piece within its bounding box.
pub type ShapeCells = [(i8, i8); 4];

/// Generates all 4 rotation states by turning the spawn shape 90° clockwise.
///
/// A clockwise turn maps `(x, y)` to `(size - 1 - y, x)` inside a box of `size`.
const fn cell_rotations(size: i8, cells: ShapeCells) -> [ShapeCells; 4] {
    let mut rotations = [cells; 4];
    let mut i = 1;
    while i < 4 {
        let prev = rotations[i - 1];
        let mut next = prev;
        let mut j = 0;
        while j < 4 {
            let (x, y) = prev[j];
            next[j] = (size - 1 - y, x);
            j += 1;
        }
        rotations[i] = next;
        i += 1;
    }
    rotations
}

const PIECE_CELLS: [[ShapeCells; 4]; PieceKind::LEN] = [
    // I-piece
    cell_rotations(4, [(0, 1), (1, 1), (2, 1), (3, 1)]),
    // O-piece
    cell_rotations(4, [(1, 1), (2, 1), (1, 2), (2, 2)]),
    // S-piece
    cell_rotations(3, [(1, 0), (2, 0), (0, 1), (1, 1)]),
    // Z-piece
    cell_rotations(3, [(0, 0), (1, 0), (1, 1), (2, 1)]),
    // J-piece
    cell_rotations(3, [(0, 0), (0, 1), (1, 1), (2, 1)]),
    // L-piece
    cell_rotations(3, [(2, 0), (0, 1), (1, 1), (2, 1)]),
    // T-piece
    cell_rotations(3, [(1, 0), (0, 1), (1, 1), (2, 1)]),
];
