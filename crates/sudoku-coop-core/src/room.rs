//! One player's live view of one shared puzzle.
//!
//! [`PuzzleRoom`] composes the board reducer, lock tracker and chat log,
//! routes inbound channel events to them and turns local intents into
//! outbound events. It performs no I/O.

use tracing::{debug, warn};

use crate::board::{CellView, in_range};
use crate::chat::ChatLog;
use crate::locks::LockTracker;
use crate::protocol::{ClientEvent, ServerEvent, SolutionResponse};
use crate::puzzle::{Puzzle, PuzzleId};
use crate::reducer::{BoardState, EditRejected, LocalEdit};
use crate::session::Identity;

/// What an inbound event changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    Board,
    Locks,
    Chat,
    PlayerJoined(String),
    PlayerLeft(String),
    /// Event was for another puzzle or could not be applied.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct PuzzleRoom {
    puzzle_id: PuzzleId,
    identity: Identity,
    pub board: BoardState,
    pub locks: LockTracker,
    pub chat: ChatLog,
}

impl PuzzleRoom {
    pub fn new(puzzle_id: PuzzleId, identity: Identity) -> Self {
        Self {
            puzzle_id,
            board: BoardState::new(puzzle_id),
            locks: LockTracker::new(puzzle_id, identity.clone()),
            chat: ChatLog::new(puzzle_id, identity.clone()),
            identity,
        }
    }

    pub fn puzzle_id(&self) -> PuzzleId {
        self.puzzle_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn join_event(&self, token: &str) -> ClientEvent {
        ClientEvent::Join {
            puzzle_id: self.puzzle_id,
            token: token.to_string(),
        }
    }

    pub fn leave_event(&self) -> ClientEvent {
        ClientEvent::Leave {
            puzzle_id: self.puzzle_id,
        }
    }

    pub fn move_event(&self) -> ClientEvent {
        ClientEvent::Move {
            puzzle_id: self.puzzle_id,
        }
    }

    /// Merge an inbound channel event.
    pub fn apply(&mut self, event: ServerEvent) -> RoomUpdate {
        if let Some(id) = event.puzzle_id() {
            if id != self.puzzle_id {
                debug!(expected = self.puzzle_id, got = id, "event for another puzzle");
                return RoomUpdate::Ignored;
            }
        }

        match event {
            ServerEvent::PuzzleUpdate(dto) => match Puzzle::try_from(dto) {
                Ok(puzzle) => {
                    self.apply_snapshot(puzzle);
                    RoomUpdate::Board
                }
                Err(e) => {
                    warn!(puzzle_id = self.puzzle_id, error = %e, "malformed puzzle_update");
                    RoomUpdate::Ignored
                }
            },
            ServerEvent::MessageUpdate { author, text, .. } => {
                self.chat.receive(author, text);
                RoomUpdate::Chat
            }
            ServerEvent::LockUpdateAdd { x, y, player, .. } => {
                if !in_range(x, y) {
                    return RoomUpdate::Ignored;
                }
                self.locks.on_lock_added(x, y, player, self.board.players());
                RoomUpdate::Locks
            }
            ServerEvent::LockUpdateRemove { x, y, .. } => {
                self.locks.on_lock_removed(x, y);
                RoomUpdate::Locks
            }
            ServerEvent::PlayerJoined { msg } => RoomUpdate::PlayerJoined(msg),
            ServerEvent::PlayerLeft { msg } => RoomUpdate::PlayerLeft(msg),
        }
    }

    /// Authoritative state from a channel push or an HTTP fetch.
    pub fn apply_snapshot(&mut self, puzzle: Puzzle) {
        self.board.apply_snapshot(puzzle);
        self.locks.recolor(self.board.players());
    }

    pub fn apply_solution(&mut self, solution: &SolutionResponse) {
        self.board.apply_solution(&solution.discrepancy);
    }

    /// Optimistic edit. Cells held by another player are read-only here,
    /// the backend still has the final say.
    pub fn edit(&mut self, x: u8, y: u8, value: Option<u8>) -> Result<LocalEdit, EditRejected> {
        if self.locks.locked_by_other(x, y).is_some() {
            return Err(EditRejected::LockedByOther { x, y });
        }
        self.board.apply_local_edit(x, y, value)
    }

    /// Claim a cell on focus. Nothing is sent for cells the player cannot
    /// edit anyway.
    pub fn focus(&mut self, x: u8, y: u8) -> Option<ClientEvent> {
        let editable = matches!(self.cell_view(x, y)?, CellView::Editable(_));
        editable.then(|| self.locks.acquire(x, y))
    }

    /// Release the held cell on blur.
    pub fn blur(&mut self) -> Option<ClientEvent> {
        let (x, y) = self.locks.held()?;
        Some(self.locks.release(x, y))
    }

    pub fn send_chat(&self, draft: &mut String) -> Option<ClientEvent> {
        self.chat.send(draft)
    }

    /// Channel dropped: lock state is unknown until peers re-announce.
    pub fn on_disconnected(&mut self) {
        self.locks.clear();
    }

    /// Who is editing a cell held by another player: their roster display
    /// name, or the name they announced when they are not on the roster.
    pub fn lock_holder_name(&self, x: u8, y: u8) -> Option<String> {
        let lock = self.locks.locked_by_other(x, y)?;
        let name = self
            .board
            .players()
            .iter()
            .find(|p| p.is(&lock.holder))
            .map(|p| p.display_name())
            .unwrap_or_else(|| lock.holder.name.clone());
        Some(name)
    }

    /// Render variant for a cell, `None` before the first snapshot.
    pub fn cell_view(&self, x: u8, y: u8) -> Option<CellView<'_>> {
        let cell = self.board.cell(x, y)?;
        if cell.is_fixed() {
            return cell.value().map(CellView::Fixed);
        }
        if self.board.is_completed() {
            if let Some(v) = cell.value() {
                return Some(CellView::Fixed(v));
            }
        }
        match self.locks.locked_by_other(x, y) {
            Some(lock) => Some(CellView::LockedByOther {
                value: cell.value(),
                lock,
            }),
            None => Some(CellView::Editable(cell.value())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PieceDto, PuzzleDto};
    use crate::puzzle::Player;

    fn me() -> Identity {
        Identity::new("Me", "me@example.com")
    }

    fn other() -> Identity {
        Identity::new("Other", "other@example.com")
    }

    fn dto(puzzle_id: PuzzleId, completed: bool) -> PuzzleDto {
        let mut pieces = Vec::new();
        for y in 0..9u8 {
            for x in 0..9u8 {
                pieces.push(PieceDto {
                    x_coordinate: x,
                    y_coordinate: y,
                    static_piece: x == 0,
                    value: if x == 0 { Some(y + 1) } else if completed { Some(1) } else { None },
                });
            }
        }
        PuzzleDto {
            puzzle_id,
            completed,
            difficulty: 0.4,
            point_value: 20,
            pieces,
            players: vec![
                Player {
                    id: 1,
                    first_name: "me".into(),
                    last_name: None,
                    email: "me@example.com".into(),
                },
                Player {
                    id: 2,
                    first_name: "other".into(),
                    last_name: None,
                    email: "other@example.com".into(),
                },
            ],
        }
    }

    fn room() -> PuzzleRoom {
        let mut room = PuzzleRoom::new(3, me());
        assert_eq!(room.apply(ServerEvent::PuzzleUpdate(dto(3, false))), RoomUpdate::Board);
        room
    }

    #[test]
    fn lock_holder_is_named_from_the_roster() {
        let mut room = room();
        room.apply(ServerEvent::LockUpdateAdd {
            puzzle_id: 3,
            x: 2,
            y: 2,
            player: Identity::new("ignored", "OTHER@example.com"),
        });
        room.apply(ServerEvent::LockUpdateAdd {
            puzzle_id: 3,
            x: 3,
            y: 3,
            player: Identity::new("Stranger", "stranger@example.com"),
        });
        room.focus(4, 4);

        assert_eq!(room.lock_holder_name(2, 2).as_deref(), Some("Other"));
        assert_eq!(room.lock_holder_name(3, 3).as_deref(), Some("Stranger"));
        assert_eq!(room.lock_holder_name(4, 4), None);
        assert_eq!(room.lock_holder_name(5, 5), None);
    }

    #[test]
    fn events_for_other_puzzles_are_ignored() {
        let mut room = room();
        let update = room.apply(ServerEvent::MessageUpdate {
            puzzle_id: 4,
            author: other(),
            text: "wrong room".into(),
        });
        assert_eq!(update, RoomUpdate::Ignored);
        assert!(room.chat.is_empty());
    }

    #[test]
    fn cell_views_cover_each_variant() {
        let mut room = room();
        room.apply(ServerEvent::LockUpdateAdd {
            puzzle_id: 3,
            x: 2,
            y: 2,
            player: other(),
        });

        assert_eq!(room.cell_view(0, 4), Some(CellView::Fixed(5)));
        assert_eq!(room.cell_view(1, 1), Some(CellView::Editable(None)));
        match room.cell_view(2, 2) {
            Some(CellView::LockedByOther { value: None, lock }) => {
                assert_eq!(lock.holder, other());
                assert_eq!(lock.color_index, Some(1));
            }
            view => panic!("expected locked cell, got {:?}", view),
        }
        assert!(room.cell_view(9, 9).is_none());
    }

    #[test]
    fn locked_cell_refuses_focus_and_edit() {
        let mut room = room();
        room.apply(ServerEvent::LockUpdateAdd {
            puzzle_id: 3,
            x: 2,
            y: 2,
            player: other(),
        });
        assert!(room.focus(2, 2).is_none());
        assert_eq!(
            room.edit(2, 2, Some(4)),
            Err(EditRejected::LockedByOther { x: 2, y: 2 })
        );

        room.apply(ServerEvent::LockUpdateRemove {
            puzzle_id: 3,
            x: 2,
            y: 2,
        });
        assert!(room.focus(2, 2).is_some());
        assert!(room.edit(2, 2, Some(4)).is_ok());
    }

    #[test]
    fn own_lock_echo_keeps_cell_editable() {
        let mut room = room();
        let event = room.focus(1, 1).unwrap();
        let ClientEvent::AddLock { x, y, player, .. } = event else {
            panic!("expected add_lock");
        };
        room.apply(ServerEvent::LockUpdateAdd {
            puzzle_id: 3,
            x,
            y,
            player,
        });
        assert_eq!(room.cell_view(1, 1), Some(CellView::Editable(None)));
        assert!(room.blur().is_some());
        assert!(room.blur().is_none());
        assert!(room.locks.is_empty());
    }

    #[test]
    fn fixed_cells_are_not_focusable() {
        let mut room = room();
        assert!(room.focus(0, 0).is_none());
        assert!(room.locks.held().is_none());
    }

    #[test]
    fn completed_board_renders_read_only() {
        let mut room = PuzzleRoom::new(3, me());
        room.apply(ServerEvent::PuzzleUpdate(dto(3, true)));
        assert_eq!(room.cell_view(5, 5), Some(CellView::Fixed(1)));
        assert!(room.focus(5, 5).is_none());
    }

    #[test]
    fn solution_response_updates_completion() {
        let mut room = room();
        room.apply_solution(&SolutionResponse::default());
        assert!(room.board.is_completed());
    }

    #[test]
    fn disconnect_clears_locks() {
        let mut room = room();
        room.apply(ServerEvent::LockUpdateAdd {
            puzzle_id: 3,
            x: 4,
            y: 4,
            player: other(),
        });
        room.on_disconnected();
        assert!(room.locks.is_empty());
    }

    #[test]
    fn malformed_snapshot_is_ignored() {
        let mut room = room();
        let mut broken = dto(3, false);
        broken.pieces.truncate(10);
        assert_eq!(room.apply(ServerEvent::PuzzleUpdate(broken)), RoomUpdate::Ignored);
        assert_eq!(room.board.cells().len(), 81);
    }

    #[test]
    fn presence_events_pass_through() {
        let mut room = room();
        assert_eq!(
            room.apply(ServerEvent::PlayerJoined { msg: "hi".into() }),
            RoomUpdate::PlayerJoined("hi".into())
        );
        assert_eq!(
            room.apply(ServerEvent::PlayerLeft { msg: "bye".into() }),
            RoomUpdate::PlayerLeft("bye".into())
        );
    }
}
