use serde::{Deserialize, Serialize};

use crate::puzzle::{Player, PuzzleId};
use crate::session::Identity;

// ── REST payloads ───────────────────────────────────────────────────────

/// One cell as the backend serialises it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceDto {
    pub x_coordinate: u8,
    pub y_coordinate: u8,
    pub static_piece: bool,
    pub value: Option<u8>,
}

/// Full puzzle state, returned by `GET /puzzles/:id` and pushed as
/// `puzzle_update` over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleDto {
    pub puzzle_id: PuzzleId,
    pub completed: bool,
    pub difficulty: f64,
    pub point_value: i64,
    /// Absent from some list responses.
    #[serde(default)]
    pub pieces: Vec<PieceDto>,
    #[serde(default)]
    pub players: Vec<Player>,
}

/// `GET /puzzles`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleListResponse {
    #[serde(default)]
    pub puzzles: Vec<PuzzleDto>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /puzzles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePuzzleResponse {
    pub puzzle_id: PuzzleId,
    #[serde(default)]
    pub unregistered_emails: Vec<String>,
}

/// Body of `POST /puzzles/:id/piece`. A `None` value clears the cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePieceRequest {
    pub x_coordinate: u8,
    pub y_coordinate: u8,
    pub value: Option<u8>,
}

/// Body of `PATCH /puzzles/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidePuzzleRequest {
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x_coordinate: u8,
    pub y_coordinate: u8,
}

/// `GET /puzzles/:id/solution`. An empty discrepancy list means solved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionResponse {
    #[serde(default)]
    pub discrepancy: Vec<Coordinate>,
}

impl SolutionResponse {
    pub fn is_solved(&self) -> bool {
        self.discrepancy.is_empty()
    }
}

/// Leaderboard row returned by REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub score: i64,
}

/// `GET /leaderboard`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub players: Vec<LeaderboardEntry>,
}

/// Generic `{message, reason?}` body the backend answers with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ApiMessage {
    pub fn describe(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{}: {}", self.message, reason),
            None => self.message.clone(),
        }
    }
}

// ── Channel events ──────────────────────────────────────────────────────

/// Events sent from client to server over the puzzle channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        puzzle_id: PuzzleId,
        token: String,
    },
    Leave {
        puzzle_id: PuzzleId,
    },
    /// Tells peers a move was persisted; they re-read the authoritative state.
    Move {
        puzzle_id: PuzzleId,
    },
    AddLock {
        puzzle_id: PuzzleId,
        x: u8,
        y: u8,
        player: Identity,
    },
    RemoveLock {
        puzzle_id: PuzzleId,
        x: u8,
        y: u8,
    },
    Message {
        puzzle_id: PuzzleId,
        author: Identity,
        text: String,
    },
}

/// Events sent from server to client over the puzzle channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Authoritative full-state replace.
    PuzzleUpdate(PuzzleDto),
    MessageUpdate {
        puzzle_id: PuzzleId,
        author: Identity,
        text: String,
    },
    LockUpdateAdd {
        puzzle_id: PuzzleId,
        x: u8,
        y: u8,
        player: Identity,
    },
    LockUpdateRemove {
        puzzle_id: PuzzleId,
        x: u8,
        y: u8,
    },
    PlayerJoined {
        #[serde(default)]
        msg: String,
    },
    PlayerLeft {
        #[serde(default)]
        msg: String,
    },
}

impl ServerEvent {
    /// Puzzle the event is scoped to, if it carries one.
    pub fn puzzle_id(&self) -> Option<PuzzleId> {
        match self {
            ServerEvent::PuzzleUpdate(dto) => Some(dto.puzzle_id),
            ServerEvent::MessageUpdate { puzzle_id, .. }
            | ServerEvent::LockUpdateAdd { puzzle_id, .. }
            | ServerEvent::LockUpdateRemove { puzzle_id, .. } => Some(*puzzle_id),
            ServerEvent::PlayerJoined { .. } | ServerEvent::PlayerLeft { .. } => None,
        }
    }
}
