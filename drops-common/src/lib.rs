//! # Drops Common Library
//!
//! Shared plumbing for the release curation workspace:
//! - Error type and result alias
//! - TOML bootstrap configuration and root folder resolution
//! - SQLite database initialization
//! - Time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
