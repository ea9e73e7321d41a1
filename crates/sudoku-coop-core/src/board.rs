use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locks::CellLock;
use crate::protocol::PieceDto;

/// Side length of the board.
pub const GRID_SIZE: u8 = 9;

/// Number of cells in a full board.
pub const CELL_COUNT: usize = 81;

/// What a single cell holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// Puzzle given, never editable.
    Given(u8),
    /// Value entered by one of the players.
    Entered(u8),
    Empty,
}

impl Entry {
    pub fn value(&self) -> Option<u8> {
        match self {
            Entry::Given(v) | Entry::Entered(v) => Some(*v),
            Entry::Empty => None,
        }
    }

    pub fn is_given(&self) -> bool {
        matches!(self, Entry::Given(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Entry::Empty)
    }

    fn from_editable(value: Option<u8>) -> Self {
        match value {
            Some(v) => Entry::Entered(v),
            None => Entry::Empty,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: u8,
    pub y: u8,
    pub entry: Entry,
}

impl Cell {
    pub fn value(&self) -> Option<u8> {
        self.entry.value()
    }

    pub fn is_fixed(&self) -> bool {
        self.entry.is_given()
    }

    /// Rendering order key: a cell at (x, y) comes before (x', y')
    /// iff `y*10 + x < y'*10 + x'`.
    pub fn order_key(&self) -> u16 {
        u16::from(self.y) * 10 + u16::from(self.x)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("expected 81 cells, got {0}")]
    WrongCellCount(usize),

    #[error("cell ({x}, {y}) is outside the 9x9 board")]
    OutOfRange { x: u8, y: u8 },

    #[error("cell ({x}, {y}) appears more than once")]
    Duplicate { x: u8, y: u8 },

    #[error("cell ({x}, {y}) holds invalid value {value}")]
    InvalidValue { x: u8, y: u8, value: u8 },

    #[error("fixed cell ({x}, {y}) has no value")]
    EmptyGiven { x: u8, y: u8 },
}

pub fn in_range(x: u8, y: u8) -> bool {
    x < GRID_SIZE && y < GRID_SIZE
}

pub fn is_valid_value(value: u8) -> bool {
    (1..=9).contains(&value)
}

/// The 81 cells of one puzzle, held in row-major order so that
/// `cells[y * 9 + x]` is the cell at (x, y).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid from cells arriving in any order.
    pub fn from_cells(mut cells: Vec<Cell>) -> Result<Self, GridError> {
        if cells.len() != CELL_COUNT {
            return Err(GridError::WrongCellCount(cells.len()));
        }
        for cell in &cells {
            if !in_range(cell.x, cell.y) {
                return Err(GridError::OutOfRange {
                    x: cell.x,
                    y: cell.y,
                });
            }
            if let Some(value) = cell.value() {
                if !is_valid_value(value) {
                    return Err(GridError::InvalidValue {
                        x: cell.x,
                        y: cell.y,
                        value,
                    });
                }
            }
        }

        cells.sort_by_key(Cell::order_key);
        // 81 in-range cells sorted by key: a duplicate is the only way to
        // leave a gap, and it always sits next to its twin.
        for pair in cells.windows(2) {
            if pair[0].order_key() == pair[1].order_key() {
                return Err(GridError::Duplicate {
                    x: pair[1].x,
                    y: pair[1].y,
                });
            }
        }

        Ok(Self { cells })
    }

    /// Build a grid from the backend's piece list.
    pub fn from_pieces(pieces: &[PieceDto]) -> Result<Self, GridError> {
        let cells = pieces
            .iter()
            .map(|piece| {
                let entry = match (piece.static_piece, piece.value) {
                    (true, Some(v)) => Entry::Given(v),
                    (true, None) => {
                        return Err(GridError::EmptyGiven {
                            x: piece.x_coordinate,
                            y: piece.y_coordinate,
                        });
                    }
                    (false, value) => Entry::from_editable(value),
                };
                Ok(Cell {
                    x: piece.x_coordinate,
                    y: piece.y_coordinate,
                    entry,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cells(cells)
    }

    /// Grid with every cell empty and editable.
    pub fn empty() -> Self {
        let cells = (0..GRID_SIZE)
            .flat_map(|y| {
                (0..GRID_SIZE).map(move |x| Cell {
                    x,
                    y,
                    entry: Entry::Empty,
                })
            })
            .collect();
        Self { cells }
    }

    pub fn get(&self, x: u8, y: u8) -> Option<&Cell> {
        if !in_range(x, y) {
            return None;
        }
        self.cells.get(index(x, y))
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.entry.is_empty()).count()
    }

    /// Overwrite the value of an editable cell. Callers check fixedness first.
    pub(crate) fn set_editable(&mut self, x: u8, y: u8, value: Option<u8>) {
        if let Some(cell) = self.cells.get_mut(index(x, y)) {
            if !cell.is_fixed() {
                cell.entry = Entry::from_editable(value);
            }
        }
    }
}

fn index(x: u8, y: u8) -> usize {
    usize::from(y) * usize::from(GRID_SIZE) + usize::from(x)
}

/// How a cell should be presented to the local player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellView<'a> {
    Fixed(u8),
    Editable(Option<u8>),
    LockedByOther {
        value: Option<u8>,
        lock: &'a CellLock,
    },
}

impl CellView<'_> {
    pub fn value(&self) -> Option<u8> {
        match self {
            CellView::Fixed(v) => Some(*v),
            CellView::Editable(value) | CellView::LockedByOther { value, .. } => *value,
        }
    }

    pub fn is_read_only(&self) -> bool {
        !matches!(self, CellView::Editable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(x: u8, y: u8, static_piece: bool, value: Option<u8>) -> PieceDto {
        PieceDto {
            x_coordinate: x,
            y_coordinate: y,
            static_piece,
            value,
        }
    }

    fn shuffled_pieces() -> Vec<PieceDto> {
        // Reverse column-major order, deliberately not row-major.
        let mut pieces = Vec::new();
        for x in (0..9).rev() {
            for y in (0..9).rev() {
                let given = (x + y) % 4 == 0;
                let value = if given { Some((x + y) % 9 + 1) } else { None };
                pieces.push(piece(x, y, given, value));
            }
        }
        pieces
    }

    #[test]
    fn cells_come_out_row_major() {
        let grid = Grid::from_pieces(&shuffled_pieces()).unwrap();
        let keys: Vec<u16> = grid.cells().iter().map(Cell::order_key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(grid.cells()[0].order_key(), 0);
        assert_eq!(grid.cells()[80].order_key(), 88);
    }

    #[test]
    fn get_finds_cell_by_coordinates() {
        let grid = Grid::from_pieces(&shuffled_pieces()).unwrap();
        let cell = grid.get(4, 0).unwrap();
        assert_eq!((cell.x, cell.y), (4, 0));
        assert!(cell.is_fixed());
        assert_eq!(cell.value(), Some(5));
        assert!(grid.get(9, 0).is_none());
    }

    #[test]
    fn rejects_wrong_count() {
        let mut pieces = shuffled_pieces();
        pieces.pop();
        assert_eq!(
            Grid::from_pieces(&pieces),
            Err(GridError::WrongCellCount(80))
        );
    }

    #[test]
    fn rejects_duplicate_coordinates() {
        let mut pieces = shuffled_pieces();
        let last = pieces.len() - 1;
        pieces[last] = piece(3, 3, false, None);
        assert!(matches!(
            Grid::from_pieces(&pieces),
            Err(GridError::Duplicate { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_and_bad_values() {
        let mut pieces = shuffled_pieces();
        pieces[0] = piece(9, 0, false, None);
        assert_eq!(
            Grid::from_pieces(&pieces),
            Err(GridError::OutOfRange { x: 9, y: 0 })
        );

        let mut pieces = shuffled_pieces();
        pieces[0].value = Some(10);
        assert!(matches!(
            Grid::from_pieces(&pieces),
            Err(GridError::InvalidValue { value: 10, .. })
        ));
    }

    #[test]
    fn given_without_value_is_rejected() {
        let mut pieces = shuffled_pieces();
        pieces[1] = piece(pieces[1].x_coordinate, pieces[1].y_coordinate, true, None);
        assert!(matches!(
            Grid::from_pieces(&pieces),
            Err(GridError::EmptyGiven { .. })
        ));
    }

    #[test]
    fn set_editable_leaves_givens_alone() {
        let mut grid = Grid::from_pieces(&shuffled_pieces()).unwrap();
        grid.set_editable(0, 0, Some(7));
        assert_eq!(grid.get(0, 0).unwrap().entry, Entry::Given(1));
        grid.set_editable(1, 0, Some(7));
        assert_eq!(grid.get(1, 0).unwrap().entry, Entry::Entered(7));
    }
}
