//! GrantScope CLI library.
//!
//! This module exposes internal types for testing purposes.
//! The main entry point is the `grantscope` binary.

pub mod cli;
pub mod config;
pub mod connector;
pub mod output;

pub use cli::Args;
