//! State Management Module
//!
//! Handles per-session visibility watermarks and the static peer table.

mod tracker;
mod membership;

pub use tracker::SessionTracker;
pub use membership::{Peer, PeerRegistry};
