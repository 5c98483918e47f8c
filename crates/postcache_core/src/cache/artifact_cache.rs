//! Artifact cache contract and directory-backed implementation.
//!
//! # Responsibility
//! - Persist, load and remove rendered artifacts keyed by post id.
//! - Enumerate stored artifact ids for orphan collection.
//!
//! # Invariants
//! - One file per id: `<dir>/<id>.html`.
//! - `store` replaces the file atomically; readers never see partial markup.
//! - `load` of an absent id returns `Artifact::empty()`.

use crate::model::post::{Artifact, PostId};
use crate::store::atomic::{remove_if_exists, replace_file};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;
use uuid::Uuid;

const ARTIFACT_EXTENSION: &str = "html";

pub type CacheResult<T> = Result<T, CacheError>;

/// Artifact cache I/O failure.
#[derive(Debug)]
pub struct CacheError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "artifact cache io error at `{}`: {}",
            self.path.display(),
            self.source
        )
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Cache interface for rendered artifacts.
pub trait ArtifactCache {
    /// Stores `artifact` under `id`, replacing any prior artifact.
    fn store(&self, id: PostId, artifact: &Artifact) -> CacheResult<()>;
    /// Loads the artifact for `id`, or an empty artifact when absent.
    fn load(&self, id: PostId) -> CacheResult<Artifact>;
    /// Removes the artifact for `id`. Returns whether one existed.
    fn remove(&self, id: PostId) -> CacheResult<bool>;
    /// Lists ids that currently have a stored artifact.
    fn list_ids(&self) -> CacheResult<Vec<PostId>>;
}

/// Artifact cache backed by one directory of `.html` files.
pub struct FsArtifactCache {
    dir: PathBuf,
}

impl FsArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the file path that holds the artifact for `id`.
    pub fn artifact_path(&self, id: PostId) -> PathBuf {
        self.dir.join(format!("{id}.{ARTIFACT_EXTENSION}"))
    }
}

impl ArtifactCache for FsArtifactCache {
    fn store(&self, id: PostId, artifact: &Artifact) -> CacheResult<()> {
        let path = self.artifact_path(id);
        replace_file(&path, artifact.as_str().as_bytes()).map_err(|source| CacheError {
            path,
            source,
        })
    }

    fn load(&self, id: PostId) -> CacheResult<Artifact> {
        let path = self.artifact_path(id);
        match fs::read_to_string(&path) {
            Ok(markup) => Ok(Artifact::new(markup)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Artifact::empty()),
            Err(source) => Err(CacheError { path, source }),
        }
    }

    fn remove(&self, id: PostId) -> CacheResult<bool> {
        let path = self.artifact_path(id);
        remove_if_exists(&path).map_err(|source| CacheError { path, source })
    }

    fn list_ids(&self) -> CacheResult<Vec<PostId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CacheError {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArtifactCache, FsArtifactCache};
    use crate::model::post::Artifact;
    use std::fs;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn load_absent_returns_empty_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path().join("pages"));
        let loaded = cache.load(Uuid::new_v4()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn store_replaces_prior_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path().join("pages"));
        let id = Uuid::new_v4();

        cache.store(id, &Artifact::new("<p>old</p>")).unwrap();
        cache.store(id, &Artifact::new("<p>new</p>")).unwrap();

        assert_eq!(cache.load(id).unwrap().as_str(), "<p>new</p>");
        assert!(cache.artifact_path(id).ends_with(format!("{id}.html")));
    }

    #[test]
    fn list_ids_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path());
        let id = Uuid::new_v4();
        cache.store(id, &Artifact::new("x")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("not-a-uuid.html"), "ignored").unwrap();

        assert_eq!(cache.list_ids().unwrap(), vec![id]);
    }

    #[test]
    fn remove_reports_whether_artifact_existed() {
        let dir = TempDir::new().unwrap();
        let cache = FsArtifactCache::new(dir.path());
        let id = Uuid::new_v4();

        assert!(!cache.remove(id).unwrap());
        cache.store(id, &Artifact::new("x")).unwrap();
        assert!(cache.remove(id).unwrap());
        assert!(cache.load(id).unwrap().is_empty());
    }
}
