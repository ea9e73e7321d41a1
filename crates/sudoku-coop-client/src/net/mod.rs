pub mod api;
pub mod backoff;
pub mod channel;

pub use api::ApiClient;
pub use channel::{ChannelEvent, PuzzleChannel};
