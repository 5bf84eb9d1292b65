//! Curation services

pub mod curator;
pub mod executor;
pub mod fingerprint;
pub mod identity_cache;
pub mod pipeline;
pub mod track_fetch;

pub use curator::{plan_batches, CollectionCurator, CurationReport, GroupReport, GroupState};
pub use executor::BoundedExecutor;
pub use identity_cache::{CacheStats, IdentityCache};
pub use pipeline::{ArtistRefresh, Collaborators, DiscoveryPipeline, RunReport};
pub use track_fetch::{FetchOutcome, TrackFetchScheduler};
