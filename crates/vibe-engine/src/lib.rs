//! Engine behind `vibe-rs`: backend clients, the session store, players and
//! the ambience renderers that project a plan onto the car interior.

pub mod api;
pub mod audio;
pub mod client;
pub mod config;
pub mod demo;
pub mod error;
pub mod feed;
pub mod render;
pub mod store;

#[cfg(test)]
mod test_support;

pub use api::VibeApi;
pub use client::{StreamClient, StreamOutcome, StreamRequest};
pub use config::EngineConfig;
pub use demo::{DemoControl, DemoRunner};
pub use error::ApiError;
pub use feed::VibeEventFeed;
pub use render::AmbienceScene;
pub use store::{StoreChange, Theme, VibeStore};
