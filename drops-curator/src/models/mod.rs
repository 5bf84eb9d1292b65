//! Data model shared by the cache, classifier and curator

pub mod category;
pub mod release;
pub mod target;

pub use category::{BaseCategory, ExtendedCategory};
pub use release::{Release, Track};
pub use target::{CollectionTarget, CollectionTargets};
