//! SQLite persistence for the curator
//!
//! Schema creation lives in `drops_common::db`; this module holds the
//! curator's typed accessors on top of it.

pub mod blacklist;
pub mod identity;
pub mod settings;
pub mod targets;

pub use blacklist::{load_blacklist, remove_blacklist, set_blacklist};
pub use identity::SqliteIdentityStore;
pub use targets::SqliteTargetStore;
