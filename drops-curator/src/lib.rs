//! drops-curator: release classification and collection curation
//!
//! Takes newly discovered releases of followed artists, remembers what was
//! already seen, classifies each release into a fine-grained category and
//! files its tracks into that category's capacity-limited collection.
//!
//! External services (catalog, track listings, collections) are reached
//! through the traits in [`providers`]; durable state goes through [`store`].

pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod providers;
pub mod services;
pub mod store;

pub use error::{CurationError, ProviderError, WriteStage};
