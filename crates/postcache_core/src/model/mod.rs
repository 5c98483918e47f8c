//! Domain model for posts and their rendered artifacts.
//!
//! # Responsibility
//! - Define canonical data structures used by store, cache and service layers.
//! - Keep record validation next to the record shape.
//!
//! # Invariants
//! - Every post is identified by a stable `PostId` that is never reassigned.
//! - Artifacts are derived data; a post is the only source of truth.

pub mod post;
