//! Render-pending markers.
//!
//! # Responsibility
//! - Record that a post mutation is in flight and its artifact may be stale.
//! - Enumerate unfinished mutations for the repair pass.
//!
//! # Invariants
//! - A marker is written before the record commit and cleared only after the
//!   artifact write (or artifact removal) succeeds.
//! - Marker files are empty and named by post id alone.

use crate::model::post::PostId;
use crate::store::atomic::{remove_if_exists, replace_file};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;
use uuid::Uuid;

pub type JournalResult<T> = Result<T, JournalError>;

/// Marker directory I/O failure.
#[derive(Debug)]
pub struct JournalError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl Display for JournalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "render journal io error at `{}`: {}",
            self.path.display(),
            self.source
        )
    }
}

impl Error for JournalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Directory of render-pending markers.
pub struct RenderJournal {
    dir: PathBuf,
}

impl RenderJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn marker_path(&self, id: PostId) -> PathBuf {
        self.dir.join(id.to_string())
    }

    /// Marks `id` as render-pending. Idempotent.
    pub fn mark(&self, id: PostId) -> JournalResult<()> {
        let path = self.marker_path(id);
        replace_file(&path, b"").map_err(|source| JournalError { path, source })
    }

    /// Clears the marker for `id`. Clearing an absent marker is a no-op.
    pub fn clear(&self, id: PostId) -> JournalResult<()> {
        let path = self.marker_path(id);
        remove_if_exists(&path)
            .map(|_| ())
            .map_err(|source| JournalError { path, source })
    }

    pub fn is_pending(&self, id: PostId) -> bool {
        self.marker_path(id).is_file()
    }

    /// Lists all pending ids, sorted.
    pub fn pending(&self) -> JournalResult<Vec<PostId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(JournalError {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| JournalError {
                path: self.dir.clone(),
                source,
            })?;
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| Uuid::parse_str(name).ok())
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
    use super::RenderJournal;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn mark_and_clear_roundtrip() {
        let dir = TempDir::new().unwrap();
        let journal = RenderJournal::new(dir.path().join("pending"));
        let id = Uuid::new_v4();

        assert!(journal.pending().unwrap().is_empty());
        journal.mark(id).unwrap();
        journal.mark(id).unwrap();
        assert!(journal.is_pending(id));
        assert_eq!(journal.pending().unwrap(), vec![id]);

        journal.clear(id).unwrap();
        journal.clear(id).unwrap();
        assert!(!journal.is_pending(id));
        assert!(journal.pending().unwrap().is_empty());
    }
}
