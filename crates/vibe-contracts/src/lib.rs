//! Wire and data contracts shared by the vibe engine and CLI.

pub mod api;
pub mod chat;
pub mod events;
pub mod models;
pub mod session;
pub mod stream;
