//! Post error types.

use picshare_shared::{AppError, PostId};
use thiserror::Error;

use crate::media::MediaError;

/// Post operation errors.
#[derive(Debug, Error)]
pub enum PostError {
    /// The create request carried no photo file.
    #[error("No photo uploaded.")]
    NoPhoto,

    /// A required field is missing or blank.
    #[error("{0}")]
    Validation(String),

    /// Photo exceeds the configured size limit.
    #[error("Photo is {size} bytes, larger than the {max} byte limit.")]
    PhotoTooLarge {
        /// Actual photo size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Photo type is not accepted.
    #[error("Photo type '{0}' is not allowed.")]
    UnsupportedPhotoType(String),

    /// No post with this id.
    #[error("Post not found")]
    NotFound(PostId),

    /// The transient local copy could not be written.
    #[error("failed to store upload locally: {0}")]
    TransientFile(#[source] std::io::Error),

    /// The media store failed during upload.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The record was deleted but its hosted photo could not be destroyed.
    #[error("post {id} was deleted but its photo could not be removed: {reason}")]
    MediaCleanup {
        /// The deleted post.
        id: PostId,
        /// Why the destroy failed.
        reason: String,
    },

    /// Repository operation failed.
    #[error("{0}")]
    Repository(String),
}

impl PostError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Whether the caller sent something unacceptable.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoPhoto
                | Self::Validation(_)
                | Self::PhotoTooLarge { .. }
                | Self::UnsupportedPhotoType(_)
                | Self::NotFound(_)
        )
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        let message = err.to_string();
        match err {
            PostError::NoPhoto
            | PostError::Validation(_)
            | PostError::PhotoTooLarge { .. }
            | PostError::UnsupportedPhotoType(_) => Self::Validation(message),
            PostError::NotFound(_) => Self::NotFound(message),
            PostError::Media(_) | PostError::MediaCleanup { .. } => {
                Self::ExternalService(message)
            }
            PostError::Repository(_) => Self::Database(message),
            PostError::TransientFile(_) => Self::Internal(message),
        }
    }
}
