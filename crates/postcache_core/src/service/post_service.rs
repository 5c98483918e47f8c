//! Post use-case service.
//!
//! # Responsibility
//! - Sequence record mutations with artifact regeneration so callers observe
//!   one operation.
//! - Serve post views (record + pre-rendered artifact).
//! - Recover artifacts left stale by interrupted mutations.
//!
//! # Invariants
//! - A render-pending marker is written before every record commit and
//!   cleared only after the artifact catches up.
//! - Regeneration failures never roll back a committed record change; they
//!   are reported as warnings and left for `repair`.
//! - Deleting a post removes its artifact.
//! - Logs carry ids and counts only, never titles or bodies.

use crate::cache::artifact_cache::{ArtifactCache, CacheError, FsArtifactCache};
use crate::config::StorageLayout;
use crate::journal::{JournalError, RenderJournal};
use crate::model::post::{Artifact, Post, PostId, PostValidationError};
use crate::render::render_post;
use crate::repo::post_repo::{JsonPostRepository, PostRepository, RepoError};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for post use-cases.
#[derive(Debug)]
pub enum PostServiceError {
    /// Title or body violates record invariants.
    Validation(PostValidationError),
    /// Target post does not exist.
    NotFound(PostId),
    /// Persisted collection cannot be decoded.
    CorruptStore(RepoError),
    /// Other record store failure.
    Repo(RepoError),
    /// Artifact cache failure on a path where the artifact is required.
    Cache(CacheError),
    /// Render-pending marker could not be written or read.
    Journal(JournalError),
}

impl Display for PostServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "post not found: {id}"),
            Self::CorruptStore(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
            Self::Journal(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PostServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::CorruptStore(err) | Self::Repo(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::Journal(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<RepoError> for PostServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            corrupt @ RepoError::Corrupt { .. } => Self::CorruptStore(corrupt),
            other => Self::Repo(other),
        }
    }
}

impl From<PostValidationError> for PostServiceError {
    fn from(value: PostValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CacheError> for PostServiceError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<JournalError> for PostServiceError {
    fn from(value: JournalError) -> Self {
        Self::Journal(value)
    }
}

/// Artifact work that failed after the record change was committed.
///
/// The record is valid; its artifact is stale or missing until the next
/// successful update, `rerender_post` or `repair`.
#[derive(Debug)]
pub enum RegenerationFailure {
    /// Artifact could not be stored or removed.
    Artifact { post_id: PostId, source: CacheError },
    /// Artifact is current but its pending marker could not be cleared.
    Marker {
        post_id: PostId,
        source: JournalError,
    },
}

impl RegenerationFailure {
    pub fn post_id(&self) -> PostId {
        match self {
            Self::Artifact { post_id, .. } | Self::Marker { post_id, .. } => *post_id,
        }
    }
}

impl Display for RegenerationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Artifact { post_id, source } => {
                write!(f, "artifact regeneration failed for {post_id}: {source}")
            }
            Self::Marker { post_id, source } => {
                write!(f, "render marker not cleared for {post_id}: {source}")
            }
        }
    }
}

impl Error for RegenerationFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Artifact { source, .. } => Some(source),
            Self::Marker { source, .. } => Some(source),
        }
    }
}

/// Result of a committed create/update.
#[derive(Debug)]
pub struct PostCommit {
    /// The committed record.
    pub post: Post,
    /// Set when the artifact could not be brought up to date.
    pub regeneration: Option<RegenerationFailure>,
}

impl PostCommit {
    pub fn is_clean(&self) -> bool {
        self.regeneration.is_none()
    }

    pub fn into_post(self) -> Post {
        self.post
    }
}

/// Result of a committed delete.
#[derive(Debug)]
pub struct PostDeletion {
    pub post_id: PostId,
    /// Whether an artifact file existed and was removed.
    pub artifact_removed: bool,
    /// Set when the artifact could not be removed (left as an orphan).
    pub cleanup: Option<RegenerationFailure>,
}

/// Record plus its pre-rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub post: Post,
    /// Empty when the post has not been rendered yet.
    pub artifact: Artifact,
}

/// Outcome counters of one `repair` pass.
#[derive(Debug, Default)]
pub struct RepairReport {
    /// Pending posts whose artifact was re-rendered.
    pub rerendered: usize,
    /// Existing posts that had no artifact and got one.
    pub rendered_missing: usize,
    /// Artifacts removed because their post no longer exists.
    pub orphans_removed: usize,
    /// Work that still failed; markers stay in place.
    pub failures: Vec<RegenerationFailure>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Post service facade over a record store and an artifact cache.
pub struct PostService<R: PostRepository, C: ArtifactCache> {
    repo: R,
    cache: C,
    journal: RenderJournal,
}

impl PostService<JsonPostRepository, FsArtifactCache> {
    /// Opens the file-backed service rooted at `layout`.
    pub fn open(layout: &StorageLayout) -> Self {
        info!(
            "event=service_open module=service status=ok data_dir={}",
            layout.data_dir().display()
        );
        Self::new(
            JsonPostRepository::new(layout.collection_path()),
            FsArtifactCache::new(layout.artifact_dir()),
            RenderJournal::new(layout.pending_dir()),
        )
    }
}

impl<R: PostRepository, C: ArtifactCache> PostService<R, C> {
    /// Creates a service from explicit store, cache and journal.
    pub fn new(repo: R, cache: C, journal: RenderJournal) -> Self {
        Self {
            repo,
            cache,
            journal,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn journal(&self) -> &RenderJournal {
        &self.journal
    }

    /// Creates a post and renders its artifact.
    ///
    /// # Errors
    /// - `Validation` for blank title/body; nothing is written.
    /// - `CorruptStore`/`Repo` when the record could not be committed.
    /// - `Journal` when the pending marker could not be written; nothing is
    ///   committed.
    pub fn create_post(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<PostCommit, PostServiceError> {
        let post = Post::new(title, body)?;
        self.journal.mark(post.id)?;

        if let Err(err) = self.repo.insert(&post) {
            self.abandon_marker(post.id, false);
            return Err(err.into());
        }

        let regeneration = self.regenerate(&post);
        info!(
            "event=post_create module=service status={} post_id={}",
            commit_status(&regeneration),
            post.id
        );
        Ok(PostCommit { post, regeneration })
    }

    /// Replaces title/body of an existing post and re-renders its artifact.
    ///
    /// # Errors
    /// - `Validation` for blank title/body.
    /// - `NotFound` when no post has `post.id`; nothing is written.
    pub fn update_post(&self, post: &Post) -> Result<PostCommit, PostServiceError> {
        post.validate()?;
        if self.repo.find_by_id(post.id)?.is_none() {
            return Err(PostServiceError::NotFound(post.id));
        }

        let was_pending = self.journal.is_pending(post.id);
        self.journal.mark(post.id)?;
        let updated = match self.repo.update(post) {
            Ok(updated) => updated,
            Err(err) => {
                self.abandon_marker(post.id, was_pending);
                return Err(err.into());
            }
        };

        let regeneration = self.regenerate(&updated);
        info!(
            "event=post_update module=service status={} post_id={}",
            commit_status(&regeneration),
            updated.id
        );
        Ok(PostCommit {
            post: updated,
            regeneration,
        })
    }

    /// Returns the post and its artifact, or `None` when the id is unknown.
    ///
    /// A post that was never rendered comes back with an empty artifact.
    pub fn get_post_view(&self, id: PostId) -> Result<Option<PostView>, PostServiceError> {
        let Some(post) = self.repo.find_by_id(id)? else {
            debug!("event=post_view module=service status=absent post_id={id}");
            return Ok(None);
        };
        let artifact = self.cache.load(id)?;
        debug!(
            "event=post_view module=service status=ok post_id={} rendered={}",
            id,
            !artifact.is_empty()
        );
        Ok(Some(PostView { post, artifact }))
    }

    /// Deletes a post and removes its artifact.
    ///
    /// # Errors
    /// - `NotFound` when the id is unknown; nothing is written.
    pub fn delete_post(&self, id: PostId) -> Result<PostDeletion, PostServiceError> {
        if self.repo.find_by_id(id)?.is_none() {
            return Err(PostServiceError::NotFound(id));
        }

        let was_pending = self.journal.is_pending(id);
        self.journal.mark(id)?;
        if let Err(err) = self.repo.delete(id) {
            self.abandon_marker(id, was_pending);
            return Err(err.into());
        }

        let (artifact_removed, cleanup) = match self.cache.remove(id) {
            Ok(removed) => (removed, self.clear_marker(id)),
            Err(source) => (
                false,
                Some(RegenerationFailure::Artifact {
                    post_id: id,
                    source,
                }),
            ),
        };
        if let Some(failure) = &cleanup {
            warn!(
                "event=post_delete module=service status=degraded post_id={} error={}",
                id, failure
            );
        } else {
            info!(
                "event=post_delete module=service status=ok post_id={} artifact_removed={}",
                id, artifact_removed
            );
        }

        Ok(PostDeletion {
            post_id: id,
            artifact_removed,
            cleanup,
        })
    }

    /// Lists all posts in insertion order.
    pub fn list_posts(&self) -> Result<Vec<Post>, PostServiceError> {
        Ok(self.repo.load_all()?)
    }

    /// Re-renders one post on demand.
    ///
    /// Unlike mutation paths, an artifact failure here is a hard error since
    /// rendering is the whole operation.
    pub fn rerender_post(&self, id: PostId) -> Result<PostView, PostServiceError> {
        let post = self
            .repo
            .find_by_id(id)?
            .ok_or(PostServiceError::NotFound(id))?;
        let artifact = render_post(&post);
        self.cache.store(id, &artifact)?;
        self.journal.clear(id)?;
        info!("event=post_rerender module=service status=ok post_id={id}");
        Ok(PostView { post, artifact })
    }

    /// Brings artifacts back in line with the record store.
    ///
    /// - Pending markers: re-render the post, or remove its artifact if the
    ///   post is gone.
    /// - Posts with no artifact file: render them.
    /// - Artifacts without a post: remove them.
    ///
    /// # Errors
    /// - `CorruptStore`/`Repo` when the collection cannot be read.
    /// - `Journal`/`Cache` when markers or artifacts cannot be listed.
    pub fn repair(&self) -> Result<RepairReport, PostServiceError> {
        let mut report = RepairReport::default();
        let posts = self.repo.load_all()?;

        for id in self.journal.pending()? {
            match posts.iter().find(|post| post.id == id) {
                Some(post) => match self.regenerate(post) {
                    None => report.rerendered += 1,
                    Some(failure) => report.failures.push(failure),
                },
                None => match self.cache.remove(id) {
                    Ok(removed) => {
                        if removed {
                            report.orphans_removed += 1;
                        }
                        if let Some(failure) = self.clear_marker(id) {
                            report.failures.push(failure);
                        }
                    }
                    Err(source) => report.failures.push(RegenerationFailure::Artifact {
                        post_id: id,
                        source,
                    }),
                },
            }
        }

        let stored: HashSet<PostId> = self.cache.list_ids()?.into_iter().collect();
        for post in posts.iter().filter(|post| !stored.contains(&post.id)) {
            if self.journal.is_pending(post.id) {
                // Already attempted above.
                continue;
            }
            match self.regenerate(post) {
                None => report.rendered_missing += 1,
                Some(failure) => report.failures.push(failure),
            }
        }

        let live: HashSet<PostId> = posts.iter().map(|post| post.id).collect();
        for id in stored.iter().filter(|id| !live.contains(*id)) {
            match self.cache.remove(*id) {
                Ok(true) => report.orphans_removed += 1,
                Ok(false) => {}
                Err(source) => report.failures.push(RegenerationFailure::Artifact {
                    post_id: *id,
                    source,
                }),
            }
        }

        let status = if report.is_clean() { "ok" } else { "degraded" };
        info!(
            "event=repair module=service status={} rerendered={} rendered_missing={} orphans_removed={} failures={}",
            status,
            report.rerendered,
            report.rendered_missing,
            report.orphans_removed,
            report.failures.len()
        );
        Ok(report)
    }

    /// Renders and stores the artifact, then clears the pending marker.
    ///
    /// On failure the marker stays so `repair` can retry.
    fn regenerate(&self, post: &Post) -> Option<RegenerationFailure> {
        let artifact = render_post(post);
        if let Err(source) = self.cache.store(post.id, &artifact) {
            let failure = RegenerationFailure::Artifact {
                post_id: post.id,
                source,
            };
            warn!(
                "event=artifact_regenerate module=service status=error post_id={} error={}",
                post.id, failure
            );
            return Some(failure);
        }
        self.clear_marker(post.id)
    }

    fn clear_marker(&self, id: PostId) -> Option<RegenerationFailure> {
        match self.journal.clear(id) {
            Ok(()) => None,
            Err(source) => {
                warn!(
                    "event=render_marker_clear module=service status=error post_id={} error={}",
                    id, source
                );
                Some(RegenerationFailure::Marker { post_id: id, source })
            }
        }
    }

    /// Drops a marker written for a mutation that did not commit, keeping any
    /// marker that predates it.
    fn abandon_marker(&self, id: PostId, was_pending: bool) {
        if was_pending {
            return;
        }
        if let Err(err) = self.journal.clear(id) {
            warn!(
                "event=render_marker_clear module=service status=error post_id={} error={}",
                id, err
            );
        }
    }
}

fn commit_status(regeneration: &Option<RegenerationFailure>) -> &'static str {
    if regeneration.is_some() {
        "degraded"
    } else {
        "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::{PostService, PostServiceError};
    use crate::config::StorageLayout;
    use crate::repo::post_repo::RepoError;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_to_service_taxonomy() {
        let id = Uuid::new_v4();
        assert!(matches!(
            PostServiceError::from(RepoError::NotFound(id)),
            PostServiceError::NotFound(found) if found == id
        ));
        assert!(matches!(
            PostServiceError::from(RepoError::Corrupt {
                path: "posts.json".into(),
                reason: "bad".to_string(),
            }),
            PostServiceError::CorruptStore(_)
        ));
        assert!(matches!(
            PostServiceError::from(RepoError::DuplicateId(id)),
            PostServiceError::Repo(_)
        ));
    }

    #[test]
    fn rejected_update_leaves_existing_marker() {
        let dir = TempDir::new().unwrap();
        let service = PostService::open(&StorageLayout::new(dir.path()));
        let post = service.create_post("a", "b").unwrap().into_post();
        service.journal().mark(post.id).unwrap();

        let mut invalid = post.clone();
        invalid.title.clear();
        assert!(service.update_post(&invalid).is_err());
        assert!(service.journal().is_pending(post.id));
    }
}
