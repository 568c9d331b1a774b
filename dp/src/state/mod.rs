//! State management with actor pattern
//!
//! StateManager owns the SQLite store and processes messages via channels,
//! providing serialized access to persistent state from async code.

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
