pub mod board;
pub mod chat;
pub mod difficulty;
pub mod locks;
pub mod protocol;
pub mod puzzle;
pub mod reducer;
pub mod room;
pub mod session;
pub mod validation;

pub use board::{Cell, CellView, Entry, Grid, GridError};
pub use chat::{ChatLog, ChatMessage};
pub use difficulty::Difficulty;
pub use locks::{CellLock, LockTracker, PALETTE_SIZE};
pub use protocol::{ClientEvent, ServerEvent};
pub use puzzle::{Player, Puzzle, PuzzleId};
pub use reducer::{BoardState, EditRejected, LocalEdit};
pub use room::{PuzzleRoom, RoomUpdate};
pub use session::{Identity, Session};
pub use validation::{CreatePuzzle, ValidationError};
