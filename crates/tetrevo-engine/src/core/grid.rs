use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::piece::{Piece, PieceKind};

/// A single cell of the playfield.
///
/// Serialized the way renderers expect it: `0` for empty, `1` for the falling
/// piece, and the piece letter (e.g. `"T"`) for locked blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    /// Empty cell.
    #[default]
    Empty,
    /// Occupied by the falling piece. Never stored in a [`Grid`].
    Active,
    /// Locked block left by a piece of the given kind.
    Locked(PieceKind),
}

impl Cell {
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Cell::Locked(_))
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Empty => serializer.serialize_u8(0),
            Cell::Active => serializer.serialize_u8(1),
            Cell::Locked(kind) => serializer.serialize_char(kind.as_char()),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(u8),
            Kind(char),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(0) => Ok(Cell::Empty),
            Repr::Flag(1) => Ok(Cell::Active),
            Repr::Flag(n) => Err(serde::de::Error::custom(format!(
                "cell flag must be 0 or 1, got {n}"
            ))),
            Repr::Kind(c) => PieceKind::from_char(c)
                .map(Cell::Locked)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid piece kind: {c}"))),
        }
    }
}

/// Locked blocks of the playfield, row-major with row 0 at the top.
///
/// The falling piece is not part of the grid; see
/// [`Engine::cells`](crate::Engine::cells) for the rendered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            rows: vec![vec![Cell::Empty; width]; height],
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y)?.get(x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.rows[y][x] = cell;
    }

    /// Whether a piece cell may occupy `(x, y)`.
    ///
    /// The cell must be inside the board on all four sides and not hold a
    /// locked block.
    #[must_use]
    pub fn is_free(&self, x: i32, y: i32) -> bool {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return false;
        };
        self.get(x, y).is_some_and(|cell| !cell.is_locked())
    }

    /// Whether every cell of `piece` is free.
    #[must_use]
    pub fn fits(&self, piece: Piece) -> bool {
        piece.cells().iter().all(|&(x, y)| self.is_free(x, y))
    }

    /// Writes the piece's cells into the grid as locked blocks.
    ///
    /// Cells outside the board are dropped.
    pub fn lock(&mut self, piece: Piece) {
        for (x, y) in piece.cells() {
            let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
                continue;
            };
            if let Some(cell) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
                *cell = Cell::Locked(piece.kind());
            }
        }
    }

    /// Removes every full row and inserts the same number of empty rows on top.
    ///
    /// Returns the number of rows removed.
    pub fn clear_full_rows(&mut self) -> usize {
        let height = self.height();
        self.rows
            .retain(|row| !row.iter().all(|cell| cell.is_locked()));
        let cleared = height - self.rows.len();
        for _ in 0..cleared {
            self.rows.insert(0, vec![Cell::Empty; self.width]);
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: Cell = Cell::Locked(PieceKind::Z);

    fn fill_row(grid: &mut Grid, y: usize) {
        for x in 0..grid.width() {
            grid.set(x, y, X);
        }
    }

    #[test]
    fn test_is_free_bounds() {
        let grid = Grid::new(4, 5);
        assert!(grid.is_free(0, 0));
        assert!(grid.is_free(3, 4));
        assert!(!grid.is_free(-1, 0));
        assert!(!grid.is_free(4, 0));
        assert!(!grid.is_free(0, 5));
        assert!(!grid.is_free(0, -1));
    }

    #[test]
    fn test_locked_cells_block() {
        let mut grid = Grid::new(4, 5);
        grid.set(1, 2, X);
        assert!(!grid.is_free(1, 2));
        assert!(grid.is_free(2, 2));
    }

    #[test]
    fn test_clear_no_rows_leaves_grid_unchanged() {
        let mut grid = Grid::new(4, 4);
        grid.set(0, 3, X);
        grid.set(2, 2, X);
        let before = grid.clone();
        assert_eq!(grid.clear_full_rows(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_clear_rows_shifts_remaining_rows_down() {
        let mut grid = Grid::new(4, 6);
        // marker above the cleared rows
        grid.set(1, 2, Cell::Locked(PieceKind::T));
        fill_row(&mut grid, 3);
        grid.set(0, 4, X);
        fill_row(&mut grid, 5);

        assert_eq!(grid.clear_full_rows(), 2);
        assert_eq!(grid.get(1, 4), Some(Cell::Locked(PieceKind::T)));
        assert_eq!(grid.get(0, 5), Some(X));
        assert!(grid.rows()[..2].iter().flatten().all(|&c| c == Cell::Empty));
        assert_eq!(grid.height(), 6);
    }

    #[test]
    fn test_cell_serialization() {
        let row = vec![Cell::Empty, Cell::Active, Cell::Locked(PieceKind::S)];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[0,1,"S"]"#);
        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);

        assert!(serde_json::from_str::<Cell>("2").is_err());
        assert!(serde_json::from_str::<Cell>(r#""X""#).is_err());
    }
}
