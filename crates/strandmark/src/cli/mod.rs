//! CLI command implementations.

pub mod config;
pub mod verify;
pub mod watch;
