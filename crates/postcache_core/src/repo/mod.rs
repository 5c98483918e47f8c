//! Record store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the post record store contract used by the service layer.
//! - Isolate collection file format details from orchestration.
//!
//! # Invariants
//! - Write paths validate posts before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Corrupt`) in
//!   addition to I/O errors.

pub mod post_repo;
