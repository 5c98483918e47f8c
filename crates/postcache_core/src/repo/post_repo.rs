//! Post record store contract and JSON-file implementation.
//!
//! # Responsibility
//! - Provide create/read-all/read-by-id/update/delete over the canonical
//!   post collection.
//! - Persist the whole collection as one unit on every mutation.
//!
//! # Invariants
//! - Every mutation is read-full, mutate in memory, write-full.
//! - Mutations on one collection file are serialized by a process-wide
//!   writer lock keyed by path, shared by every repository instance in the
//!   process. Separate processes sharing a file can still lose updates and
//!   must be serialized by the caller.
//! - A collection that fails to decode is reported, never overwritten.
//! - Lookups compare stored ids against the requested id.

use crate::model::post::{Post, PostId, PostValidationError};
use crate::store::atomic::replace_file;
use crate::store::codec::{decode_collection, encode_collection, CodecError};
use log::{debug, error};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

static WRITER_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = Lazy::new(Default::default);

/// Record store error.
#[derive(Debug)]
pub enum RepoError {
    /// Caller-supplied post violates record invariants.
    Validation(PostValidationError),
    /// No post with this id exists.
    NotFound(PostId),
    /// A post with this id already exists.
    DuplicateId(PostId),
    /// Persisted collection cannot be decoded.
    Corrupt { path: PathBuf, reason: String },
    /// Collection could not be encoded.
    Encode(CodecError),
    /// Filesystem failure while reading or writing the collection.
    Io { path: PathBuf, source: io::Error },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "post not found: {id}"),
            Self::DuplicateId(id) => write!(f, "post id already exists: {id}"),
            Self::Corrupt { path, reason } => write!(
                f,
                "post collection `{}` is corrupt: {reason}",
                path.display()
            ),
            Self::Encode(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "post collection io error at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::NotFound(_) | Self::DuplicateId(_) | Self::Corrupt { .. } => None,
        }
    }
}

impl From<PostValidationError> for RepoError {
    fn from(value: PostValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for post records.
pub trait PostRepository {
    /// Loads the full collection in insertion order.
    ///
    /// A missing collection file is an empty collection.
    fn load_all(&self) -> RepoResult<Vec<Post>>;

    /// Appends an already-identified post.
    fn insert(&self, post: &Post) -> RepoResult<Post>;

    /// Replaces the post with the same id, keeping its position.
    fn update(&self, post: &Post) -> RepoResult<Post>;

    /// Removes the post with this id.
    fn delete(&self, id: PostId) -> RepoResult<()>;

    /// Finds one post by linear scan of `load_all`.
    fn find_by_id(&self, id: PostId) -> RepoResult<Option<Post>> {
        Ok(self.load_all()?.into_iter().find(|post| post.id == id))
    }

    /// Creates a post with a fresh id and appends it.
    fn create(&self, title: &str, body: &str) -> RepoResult<Post> {
        let post = Post::new(title, body)?;
        self.insert(&post)
    }
}

/// Post repository backed by one JSON array file.
pub struct JsonPostRepository {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonPostRepository {
    /// Constructs a repository over `path`. The file is created lazily on
    /// first mutation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = writer_lock_for(&path);
        Self { path, write_lock }
    }

    /// Returns the collection file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_collection(&self) -> RepoResult<Vec<Post>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RepoError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let posts: Vec<Post> = decode_collection(&text).map_err(|err| self.corrupt(err))?;
        let mut seen = HashSet::with_capacity(posts.len());
        for post in &posts {
            post.validate().map_err(|err| {
                self.corrupt(format!("post {} is invalid: {err}", post.id))
            })?;
            if !seen.insert(post.id) {
                return Err(self.corrupt(format!("duplicate post id {}", post.id)));
            }
        }
        Ok(posts)
    }

    fn write_collection(&self, posts: &[Post]) -> RepoResult<()> {
        let started_at = Instant::now();
        let text = encode_collection(posts).map_err(RepoError::Encode)?;
        if let Err(source) = replace_file(&self.path, text.as_bytes()) {
            error!(
                "event=collection_write module=repo status=error count={} duration_ms={} error={}",
                posts.len(),
                started_at.elapsed().as_millis(),
                source
            );
            return Err(RepoError::Io {
                path: self.path.clone(),
                source,
            });
        }
        debug!(
            "event=collection_write module=repo status=ok count={} duration_ms={}",
            posts.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn corrupt(&self, reason: impl Display) -> RepoError {
        error!(
            "event=collection_read module=repo status=error error_code=corrupt_store path={}",
            self.path.display()
        );
        RepoError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Runs one read-modify-write cycle under the writer lock.
    fn mutate<T>(&self, apply: impl FnOnce(&mut Vec<Post>) -> RepoResult<T>) -> RepoResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut posts = self.read_collection()?;
        let value = apply(&mut posts)?;
        self.write_collection(&posts)?;
        Ok(value)
    }
}

impl PostRepository for JsonPostRepository {
    fn load_all(&self) -> RepoResult<Vec<Post>> {
        self.read_collection()
    }

    fn insert(&self, post: &Post) -> RepoResult<Post> {
        post.validate()?;
        self.mutate(|posts| {
            if posts.iter().any(|existing| existing.id == post.id) {
                return Err(RepoError::DuplicateId(post.id));
            }
            posts.push(post.clone());
            Ok(post.clone())
        })
    }

    fn update(&self, post: &Post) -> RepoResult<Post> {
        post.validate()?;
        self.mutate(|posts| {
            let slot = posts
                .iter_mut()
                .find(|existing| existing.id == post.id)
                .ok_or(RepoError::NotFound(post.id))?;
            *slot = post.clone();
            Ok(post.clone())
        })
    }

    fn delete(&self, id: PostId) -> RepoResult<()> {
        self.mutate(|posts| {
            let index = posts
                .iter()
                .position(|existing| existing.id == id)
                .ok_or(RepoError::NotFound(id))?;
            posts.remove(index);
            Ok(())
        })
    }
}

/// Returns the writer lock shared by all repositories on `path`.
///
/// The key uses the canonical parent directory when it exists so that
/// `./posts.json` and its absolute spelling map to one lock.
fn writer_lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            fs::canonicalize(parent)
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    };
    let mut locks = WRITER_LOCKS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

#[cfg(test)]
mod tests {
    use super::{JsonPostRepository, PostRepository, RepoError};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_collection() {
        let dir = TempDir::new().unwrap();
        let repo = JsonPostRepository::new(dir.path().join("posts.json"));
        assert!(repo.load_all().unwrap().is_empty());
        assert!(!repo.path().exists());
    }

    #[test]
    fn not_found_mutation_does_not_write_file() {
        let dir = TempDir::new().unwrap();
        let repo = JsonPostRepository::new(dir.path().join("posts.json"));
        let err = repo.delete(uuid::Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
        assert!(!repo.path().exists());
    }

    #[test]
    fn instances_on_same_file_share_writer_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posts.json");
        let first = JsonPostRepository::new(&path);
        let second = JsonPostRepository::new(dir.path().join(".").join("posts.json"));
        let other = JsonPostRepository::new(dir.path().join("other.json"));

        assert!(Arc::ptr_eq(&first.write_lock, &second.write_lock));
        assert!(!Arc::ptr_eq(&first.write_lock, &other.write_lock));
    }

    #[test]
    fn duplicate_ids_on_disk_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posts.json");
        let id = "11111111-2222-4333-8444-555555555555";
        fs::write(
            &path,
            format!(
                r#"[{{"id":"{id}","title":"a","body":"b"}},{{"id":"{id}","title":"c","body":"d"}}]"#
            ),
        )
        .unwrap();

        let repo = JsonPostRepository::new(&path);
        let err = repo.load_all().unwrap_err();
        assert!(matches!(err, RepoError::Corrupt { .. }));
    }
}
