//! Post record and artifact model.
//!
//! # Responsibility
//! - Define the persisted post record (`id`, `title`, `body`).
//! - Define the rendered artifact value keyed by post id.
//!
//! # Invariants
//! - `id` is stable and never reused for another post.
//! - `title` and `body` are non-blank for every persisted post.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a post and its artifact.
pub type PostId = Uuid;

/// Validation failures for post write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostValidationError {
    /// Title is empty or whitespace-only.
    EmptyTitle,
    /// Body is empty or whitespace-only.
    EmptyBody,
    /// Id is the nil UUID.
    NilId,
}

impl Display for PostValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "post title must not be empty"),
            Self::EmptyBody => write!(f, "post body must not be empty"),
            Self::NilId => write!(f, "post id must not be the nil uuid"),
        }
    }
}

impl Error for PostValidationError {}

/// Canonical post record.
///
/// Field names are part of the persisted collection format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,
}

impl Post {
    /// Creates a post with a freshly generated id.
    ///
    /// # Errors
    /// - Returns `EmptyTitle`/`EmptyBody` for blank input.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, PostValidationError> {
        Self::with_id(Uuid::new_v4(), title, body)
    }

    /// Creates a post with a caller-provided id.
    ///
    /// Used by update paths where identity already exists.
    ///
    /// # Errors
    /// - Returns `NilId` for `Uuid::nil()`.
    /// - Returns `EmptyTitle`/`EmptyBody` for blank input.
    pub fn with_id(
        id: PostId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, PostValidationError> {
        let post = Self {
            id,
            title: title.into(),
            body: body.into(),
        };
        post.validate()?;
        Ok(post)
    }

    /// Checks record invariants.
    ///
    /// Title is checked before body so `("", "")` reports `EmptyTitle`.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        if self.id.is_nil() {
            return Err(PostValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(PostValidationError::EmptyTitle);
        }
        if self.body.trim().is_empty() {
            return Err(PostValidationError::EmptyBody);
        }
        Ok(())
    }
}

/// Pre-rendered markup for one post.
///
/// An empty artifact means "not rendered yet", not failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// The "not yet rendered" artifact.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
