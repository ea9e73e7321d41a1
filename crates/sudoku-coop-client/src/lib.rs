//! Terminal client for cooperative Sudoku.
//!
//! The networking pieces ([`net::ApiClient`], [`net::PuzzleChannel`]) and the
//! puzzle lifecycle ([`view::PuzzleView`]) are usable without the terminal UI.

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod net;
pub mod ui;
pub mod view;

pub use config::{ClientConfig, ReconnectPolicy};
pub use error::{ClientError, Result};
pub use net::{ApiClient, ChannelEvent, PuzzleChannel};
pub use view::{ConnectionStatus, PuzzleView, ViewUpdate};
