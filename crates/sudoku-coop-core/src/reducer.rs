//! Local copy of the shared board.
//!
//! The backend owns the puzzle; this reducer merges its full snapshots with
//! optimistic local edits. Snapshots always win: whatever arrives last is
//! what the player sees.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::board::{Cell, Grid, in_range, is_valid_value};
use crate::protocol::{Coordinate, MovePieceRequest};
use crate::puzzle::{Player, Puzzle, PuzzleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditRejected {
    #[error("the puzzle has not loaded yet")]
    NotLoaded,
    #[error("cell ({x}, {y}) is outside the board")]
    OutOfRange { x: u8, y: u8 },
    #[error("{0} is not a valid cell value")]
    InvalidValue(u8),
    #[error("cell ({x}, {y}) is a puzzle given")]
    FixedCell { x: u8, y: u8 },
    #[error("cell ({x}, {y}) is being edited by another player")]
    LockedByOther { x: u8, y: u8 },
    #[error("the puzzle is already completed")]
    Completed,
    #[error("cell already holds that value")]
    Unchanged,
}

/// An optimistic edit that still has to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEdit {
    pub seq: u64,
    pub x: u8,
    pub y: u8,
    pub value: Option<u8>,
}

impl LocalEdit {
    pub fn to_request(&self) -> MovePieceRequest {
        MovePieceRequest {
            x_coordinate: self.x,
            y_coordinate: self.y,
            value: self.value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingEdit {
    seq: u64,
    previous: Option<u8>,
    /// Edit that wrote `previous`, 0 when it came from a snapshot.
    base: u64,
}

#[derive(Debug, Clone)]
pub struct BoardState {
    puzzle_id: PuzzleId,
    grid: Option<Grid>,
    completed: bool,
    players: Vec<Player>,
    difficulty: f64,
    point_value: i64,
    next_seq: u64,
    pending: HashMap<(u8, u8), PendingEdit>,
}

impl BoardState {
    pub fn new(puzzle_id: PuzzleId) -> Self {
        Self {
            puzzle_id,
            grid: None,
            completed: false,
            players: Vec::new(),
            difficulty: 0.0,
            point_value: 0,
            next_seq: 1,
            pending: HashMap::new(),
        }
    }

    pub fn puzzle_id(&self) -> PuzzleId {
        self.puzzle_id
    }

    pub fn is_loaded(&self) -> bool {
        self.grid.is_some()
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn cell(&self, x: u8, y: u8) -> Option<&Cell> {
        self.grid.as_ref().and_then(|g| g.get(x, y))
    }

    /// Cells in row-major order; empty until the first snapshot.
    pub fn cells(&self) -> &[Cell] {
        self.grid.as_ref().map(Grid::cells).unwrap_or(&[])
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn point_value(&self) -> i64 {
        self.point_value
    }

    pub fn pending_edits(&self) -> usize {
        self.pending.len()
    }

    /// Replace everything with the backend's authoritative state.
    pub fn apply_snapshot(&mut self, puzzle: Puzzle) {
        if puzzle.id != self.puzzle_id {
            debug!(
                expected = self.puzzle_id,
                got = puzzle.id,
                "ignoring snapshot for another puzzle"
            );
            return;
        }
        if !self.pending.is_empty() {
            debug!(
                puzzle_id = self.puzzle_id,
                dropped = self.pending.len(),
                "snapshot overrides pending local edits"
            );
        }
        self.grid = Some(puzzle.grid);
        self.completed = puzzle.completed;
        self.players = puzzle.players;
        self.difficulty = puzzle.difficulty;
        self.point_value = puzzle.point_value;
        self.pending.clear();
    }

    /// Optimistically write a value (or clear with `None`) into an editable
    /// cell. Returns the edit to persist; a rejected edit changes nothing.
    pub fn apply_local_edit(
        &mut self,
        x: u8,
        y: u8,
        value: Option<u8>,
    ) -> Result<LocalEdit, EditRejected> {
        if !in_range(x, y) {
            return Err(EditRejected::OutOfRange { x, y });
        }
        if let Some(v) = value {
            if !is_valid_value(v) {
                return Err(EditRejected::InvalidValue(v));
            }
        }
        if self.completed {
            return Err(EditRejected::Completed);
        }
        let grid = self.grid.as_mut().ok_or(EditRejected::NotLoaded)?;
        let cell = grid.get(x, y).ok_or(EditRejected::OutOfRange { x, y })?;
        if cell.is_fixed() {
            return Err(EditRejected::FixedCell { x, y });
        }
        let previous = cell.value();
        if previous == value {
            return Err(EditRejected::Unchanged);
        }

        grid.set_editable(x, y, value);
        let seq = self.next_seq;
        self.next_seq += 1;

        // Rolling back a chain of edits on one cell returns to the value
        // before the first unconfirmed one.
        let (previous, base) = self
            .pending
            .get(&(x, y))
            .map(|p| (p.previous, p.base))
            .unwrap_or((previous, 0));
        self.pending.insert((x, y), PendingEdit { seq, previous, base });

        Ok(LocalEdit { seq, x, y, value })
    }

    /// The backend accepted the edit. If a newer edit on the same cell is
    /// still pending, its rollback target becomes this accepted value.
    pub fn confirm(&mut self, edit: &LocalEdit) {
        let Some(pending) = self.pending.get_mut(&(edit.x, edit.y)) else {
            return;
        };
        if pending.seq == edit.seq {
            self.pending.remove(&(edit.x, edit.y));
        } else if edit.seq < pending.seq && edit.seq > pending.base {
            pending.previous = edit.value;
            pending.base = edit.seq;
        }
    }

    /// The backend refused the edit. Restores the cell if it still holds
    /// this edit; returns whether anything changed.
    pub fn rollback(&mut self, edit: &LocalEdit) -> bool {
        let Some(pending) = self.pending.get(&(edit.x, edit.y)).copied() else {
            return false;
        };
        if pending.seq != edit.seq {
            return false;
        }
        self.pending.remove(&(edit.x, edit.y));
        if let Some(grid) = self.grid.as_mut() {
            grid.set_editable(edit.x, edit.y, pending.previous);
        }
        debug!(
            puzzle_id = self.puzzle_id,
            x = edit.x,
            y = edit.y,
            seq = edit.seq,
            "rolled back local edit"
        );
        true
    }

    /// Result of a solution check; an empty discrepancy list means solved.
    pub fn apply_solution(&mut self, discrepancy: &[Coordinate]) {
        self.completed = discrepancy.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Entry;
    use crate::protocol::PieceDto;

    /// Givens on the main diagonal, everything else empty.
    fn puzzle(id: PuzzleId, filler: Option<u8>) -> Puzzle {
        let mut pieces = Vec::new();
        for y in 0..9u8 {
            for x in 0..9u8 {
                let given = x == y;
                pieces.push(PieceDto {
                    x_coordinate: x,
                    y_coordinate: y,
                    static_piece: given,
                    value: if given { Some(x + 1) } else { filler },
                });
            }
        }
        Puzzle {
            id,
            difficulty: 0.5,
            point_value: 30,
            completed: false,
            grid: Grid::from_pieces(&pieces).unwrap(),
            players: Vec::new(),
        }
    }

    fn loaded() -> BoardState {
        let mut board = BoardState::new(1);
        board.apply_snapshot(puzzle(1, None));
        board
    }

    #[test]
    fn edit_before_load_is_rejected() {
        let mut board = BoardState::new(1);
        assert_eq!(
            board.apply_local_edit(1, 0, Some(3)),
            Err(EditRejected::NotLoaded)
        );
        assert!(board.cells().is_empty());
    }

    #[test]
    fn local_edit_is_applied_immediately() {
        let mut board = loaded();
        let edit = board.apply_local_edit(1, 0, Some(3)).unwrap();
        assert_eq!(edit.value, Some(3));
        assert_eq!(board.cell(1, 0).unwrap().entry, Entry::Entered(3));
        assert_eq!(board.pending_edits(), 1);
        assert_eq!(
            edit.to_request(),
            MovePieceRequest {
                x_coordinate: 1,
                y_coordinate: 0,
                value: Some(3)
            }
        );
    }

    #[test]
    fn fixed_cell_edit_is_a_no_op() {
        let mut board = loaded();
        let before = board.grid().unwrap().clone();
        assert_eq!(
            board.apply_local_edit(4, 4, Some(9)),
            Err(EditRejected::FixedCell { x: 4, y: 4 })
        );
        assert_eq!(
            board.apply_local_edit(4, 4, None),
            Err(EditRejected::FixedCell { x: 4, y: 4 })
        );
        assert_eq!(board.grid().unwrap(), &before);
        assert_eq!(board.pending_edits(), 0);
    }

    #[test]
    fn invalid_edits_are_rejected() {
        let mut board = loaded();
        assert_eq!(
            board.apply_local_edit(1, 0, Some(0)),
            Err(EditRejected::InvalidValue(0))
        );
        assert_eq!(
            board.apply_local_edit(9, 0, Some(1)),
            Err(EditRejected::OutOfRange { x: 9, y: 0 })
        );
        assert_eq!(
            board.apply_local_edit(1, 0, None),
            Err(EditRejected::Unchanged)
        );
    }

    #[test]
    fn snapshot_replaces_every_cell() {
        let mut board = loaded();
        board.apply_local_edit(1, 0, Some(3)).unwrap();
        board.apply_local_edit(2, 0, Some(4)).unwrap();

        board.apply_snapshot(puzzle(1, Some(7)));

        let cells = board.cells();
        assert_eq!(cells.len(), 81);
        for cell in cells {
            if cell.x == cell.y {
                assert_eq!(cell.entry, Entry::Given(cell.x + 1));
            } else {
                assert_eq!(cell.entry, Entry::Entered(7));
            }
        }
        assert_eq!(board.pending_edits(), 0);
    }

    #[test]
    fn snapshot_for_other_puzzle_is_ignored() {
        let mut board = loaded();
        board.apply_snapshot(puzzle(2, Some(7)));
        assert_eq!(board.cell(1, 0).unwrap().entry, Entry::Empty);
    }

    #[test]
    fn rollback_restores_previous_value() {
        let mut board = loaded();
        let first = board.apply_local_edit(1, 0, Some(3)).unwrap();
        assert!(board.rollback(&first));
        assert_eq!(board.cell(1, 0).unwrap().entry, Entry::Empty);
        assert!(!board.rollback(&first));
    }

    #[test]
    fn rollback_of_superseded_edit_keeps_newer_value() {
        let mut board = loaded();
        let first = board.apply_local_edit(1, 0, Some(3)).unwrap();
        let second = board.apply_local_edit(1, 0, Some(5)).unwrap();
        assert!(second.seq > first.seq);

        assert!(!board.rollback(&first));
        assert_eq!(board.cell(1, 0).unwrap().value(), Some(5));

        // Failing the newest edit unwinds the whole unconfirmed chain.
        assert!(board.rollback(&second));
        assert_eq!(board.cell(1, 0).unwrap().value(), None);
    }

    #[test]
    fn rollback_after_confirmed_predecessor_restores_accepted_value() {
        let mut board = loaded();
        let first = board.apply_local_edit(1, 0, Some(3)).unwrap();
        let second = board.apply_local_edit(1, 0, Some(5)).unwrap();

        board.confirm(&first);
        assert_eq!(board.pending_edits(), 1);
        assert!(board.rollback(&second));
        assert_eq!(board.cell(1, 0).unwrap().value(), Some(3));
    }

    #[test]
    fn late_confirm_of_older_edit_does_not_move_rollback_target_back() {
        let mut board = loaded();
        let first = board.apply_local_edit(1, 0, Some(3)).unwrap();
        let second = board.apply_local_edit(1, 0, Some(4)).unwrap();
        let third = board.apply_local_edit(1, 0, Some(5)).unwrap();

        board.confirm(&second);
        board.confirm(&first);
        assert!(board.rollback(&third));
        assert_eq!(board.cell(1, 0).unwrap().value(), Some(4));
    }

    #[test]
    fn rollback_after_snapshot_does_nothing() {
        let mut board = loaded();
        let edit = board.apply_local_edit(1, 0, Some(3)).unwrap();
        board.apply_snapshot(puzzle(1, Some(8)));
        assert!(!board.rollback(&edit));
        assert_eq!(board.cell(1, 0).unwrap().value(), Some(8));
    }

    #[test]
    fn confirm_clears_bookkeeping() {
        let mut board = loaded();
        let edit = board.apply_local_edit(1, 0, Some(3)).unwrap();
        board.confirm(&edit);
        assert_eq!(board.pending_edits(), 0);
        assert!(!board.rollback(&edit));
        assert_eq!(board.cell(1, 0).unwrap().value(), Some(3));
    }

    #[test]
    fn solution_check_drives_completed() {
        let mut board = loaded();
        board.apply_solution(&[Coordinate {
            x_coordinate: 0,
            y_coordinate: 1,
        }]);
        assert!(!board.is_completed());
        board.apply_solution(&[]);
        assert!(board.is_completed());
        assert_eq!(
            board.apply_local_edit(1, 0, Some(2)),
            Err(EditRejected::Completed)
        );
        board.apply_solution(&[Coordinate {
            x_coordinate: 0,
            y_coordinate: 1,
        }]);
        assert!(!board.is_completed());
    }
}
