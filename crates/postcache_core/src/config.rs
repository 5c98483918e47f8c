//! Storage layout resolution.
//!
//! # Responsibility
//! - Derive every persisted path from a single data directory.
//! - Resolve the data directory from explicit input, environment or default.
//!
//! # Invariants
//! - Collection, artifacts and markers always live under the same root.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "POSTCACHE_DATA_DIR";

const DEFAULT_DATA_DIR_NAME: &str = "postcache";
const COLLECTION_FILE_NAME: &str = "posts.json";
const ARTIFACT_DIR_NAME: &str = "pages";
const PENDING_DIR_NAME: &str = "pending";

/// On-disk layout rooted at one data directory.
///
/// ```text
/// <data_dir>/
/// ├── posts.json
/// ├── pages/<id>.html
/// └── pending/<id>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    data_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn collection_path(&self) -> PathBuf {
        self.data_dir.join(COLLECTION_FILE_NAME)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.data_dir.join(ARTIFACT_DIR_NAME)
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.data_dir.join(PENDING_DIR_NAME)
    }
}

/// Resolves the data directory.
///
/// Precedence: `explicit` argument, then `POSTCACHE_DATA_DIR` (when
/// non-blank), then `<temp_dir>/postcache`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    data_dir_from_env(std::env::var(DATA_DIR_ENV).ok().as_deref())
}

fn data_dir_from_env(raw: Option<&str>) -> PathBuf {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME),
    }
}
