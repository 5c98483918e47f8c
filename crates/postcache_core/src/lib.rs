//! Core domain logic for postcache.
//! Owns the post records, their pre-rendered artifacts and the contract that
//! keeps the two in sync.

pub mod cache;
pub mod config;
pub mod journal;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod service;
pub mod store;

pub use cache::artifact_cache::{ArtifactCache, CacheError, CacheResult, FsArtifactCache};
pub use config::{resolve_data_dir, StorageLayout, DATA_DIR_ENV};
pub use journal::{JournalError, RenderJournal};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::post::{Artifact, Post, PostId, PostValidationError};
pub use render::render_post;
pub use repo::post_repo::{JsonPostRepository, PostRepository, RepoError, RepoResult};
pub use service::post_service::{
    PostCommit, PostDeletion, PostService, PostServiceError, PostView, RegenerationFailure,
    RepairReport,
};
