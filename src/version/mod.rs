//! Version model and range parsing
//!
//! # Modules
//!
//! - [`number`]: dotted version numbers and their (partial) ordering
//! - [`reference`]: single interval ranges with a dedup coordinate
//! - [`nuget`]: NuGet interval notation
//! - [`npm`]: npm ranges and comparator lists
//! - [`multi_range`]: unions of ranges and per-ecosystem dispatch
//! - [`error`]: range parse errors

pub mod error;
pub mod multi_range;
pub mod npm;
pub mod nuget;
pub mod number;
pub mod reference;

pub use error::RangeError;
pub use multi_range::{MultiRangeReference, VersionConstraint};
pub use number::{Padding, VersionLevel, VersionNumber};
pub use reference::ArtifactReference;
