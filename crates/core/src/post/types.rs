//! Post types and data structures.

use chrono::{DateTime, Utc};
use picshare_shared::PostId;

use super::error::PostError;
use crate::media::public_id_from_url;

/// Name stored when a post is submitted without one.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Post domain model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Unique identifier.
    pub id: PostId,
    /// Display name of the poster.
    pub name: String,
    /// Caption text.
    pub caption: String,
    /// Durable URL of the hosted photo.
    pub photo: String,
    /// Media store identifier of the photo. `None` on legacy records.
    pub photo_public_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Identifier to destroy the hosted photo with.
    ///
    /// Prefers the stored identifier and falls back to deriving one from the
    /// photo URL.
    #[must_use]
    pub fn media_public_id(&self) -> Option<String> {
        self.photo_public_id
            .clone()
            .or_else(|| public_id_from_url(&self.photo))
    }
}

/// Photo as received from the client.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// File name supplied by the client.
    pub file_name: Option<String>,
    /// MIME type supplied by the client.
    pub content_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    /// Display name; blank or missing becomes [`ANONYMOUS_NAME`].
    pub name: Option<String>,
    /// Caption; required.
    pub caption: Option<String>,
    /// Photo; required.
    pub photo: Option<PhotoUpload>,
}

/// Input for updating a post.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    /// New display name; required.
    pub name: Option<String>,
    /// New caption; required.
    pub caption: Option<String>,
}

/// Validated record for the repository to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Display name.
    pub name: String,
    /// Caption text.
    pub caption: String,
    /// Durable URL of the hosted photo.
    pub photo: String,
    /// Media store identifier of the photo.
    pub photo_public_id: Option<String>,
}

/// Validated field changes for the repository to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    /// New display name.
    pub name: String,
    /// New caption.
    pub caption: String,
}

impl UpdatePostInput {
    /// Validate into repository changes.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either field is missing or blank.
    pub fn into_changes(self) -> Result<PostChanges, PostError> {
        match (non_blank(self.name), non_blank(self.caption)) {
            (Some(name), Some(caption)) => Ok(PostChanges { name, caption }),
            _ => Err(PostError::validation("Name and caption are required.")),
        }
    }
}

/// Trimmed value, or `None` if missing or whitespace only.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Display name to store for a submitted name.
pub(crate) fn display_name(name: Option<String>) -> String {
    non_blank(name).unwrap_or_else(|| ANONYMOUS_NAME.to_string())
}
