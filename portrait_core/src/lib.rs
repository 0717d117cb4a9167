//! # Portrait Core
//!
//! Shared types and traits for the portrait generation workspace.
//!
//! This crate provides:
//! - `ProfileIdentity`, the immutable subset of a profile used for generation
//! - `ProfileRecord`, the profile shape owned by the CRUD layer
//! - The `ProfileSource` seam through which the core obtains identities
//!
//! The generation core never reads or writes profile persistence directly;
//! it only ever sees identities produced by a `ProfileSource`.

pub mod traits;
pub mod types;

pub use traits::{ProfileSource, RecordProjection};
pub use types::{DEFAULT_IMAGE_EXTENSION, Gender, ProfileIdentity, ProfileRecord};
