//! Derived artifact cache.
//!
//! # Responsibility
//! - Store one pre-rendered artifact per post id.
//! - Treat a missing artifact as "not rendered yet", never as failure.

pub mod artifact_cache;
