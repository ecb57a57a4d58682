//! Contracts for collaborators the broker notifies but never waits on.

pub mod analytics;

pub use analytics::*;
