//! File persistence primitives shared by the record store, artifact cache and
//! render journal.
//!
//! # Responsibility
//! - Encode/decode whole collections to and from text.
//! - Replace files all-or-nothing so readers never see partial writes.
//!
//! # Invariants
//! - Every persisted write goes through `atomic::replace_file`.

pub mod atomic;
pub mod codec;
