//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store, artifact cache and render journal into
//!   use-case level APIs.
//! - Keep front ends decoupled from file layout details.

pub mod post_service;
