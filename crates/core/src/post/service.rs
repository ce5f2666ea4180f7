//! Post service implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use picshare_shared::PostId;
use tracing::{info, warn};

use super::compensation::{Compensation, CompensationPolicy};
use super::error::PostError;
use super::types::{
    CreatePostInput, NewPost, PhotoUpload, Post, PostChanges, UpdatePostInput, display_name,
    non_blank,
};
use crate::media::MediaStore;
use crate::search::filter_posts;
use crate::upload::{TransientFile, UploadPolicy};

/// Repository trait for post persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post, assigning its id and timestamps.
    async fn create(&self, input: NewPost) -> Result<Post, PostError>;

    /// All posts, oldest first.
    async fn list(&self) -> Result<Vec<Post>, PostError>;

    /// Find post by ID.
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError>;

    /// Apply name/caption changes. `None` if the post does not exist.
    async fn update(&self, id: PostId, changes: PostChanges) -> Result<Option<Post>, PostError>;

    /// Delete a post and return it. `None` if it did not exist.
    async fn delete(&self, id: PostId) -> Result<Option<Post>, PostError>;
}

/// Post service orchestrating the repository and the media store.
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    media: Arc<dyn MediaStore>,
    upload_policy: UploadPolicy,
    compensation: CompensationPolicy,
    temp_dir: PathBuf,
}

impl PostService {
    /// Create a new post service with default upload and compensation policies.
    #[must_use]
    pub fn new(
        repo: Arc<dyn PostRepository>,
        media: Arc<dyn MediaStore>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            media,
            upload_policy: UploadPolicy::default(),
            compensation: CompensationPolicy::default(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Set the upload policy.
    #[must_use]
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    /// Set the compensation policy.
    #[must_use]
    pub fn with_compensation(mut self, policy: CompensationPolicy) -> Self {
        self.compensation = policy;
        self
    }

    /// The upload policy in effect.
    #[must_use]
    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.upload_policy
    }

    /// Name of the media store provider.
    #[must_use]
    pub fn media_provider(&self) -> &'static str {
        self.media.provider_name()
    }

    /// List posts in store order, optionally filtered by a search string.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Post>, PostError> {
        let posts = self.repo.list().await?;

        Ok(match search.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => filter_posts(&posts, query).into_iter().cloned().collect(),
            None => posts,
        })
    }

    /// Get a single post.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist or the repository fails.
    pub async fn get(&self, id: PostId) -> Result<Post, PostError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound(id))
    }

    /// Create a post.
    ///
    /// The record is inserted only after the photo is hosted. The transient
    /// file never outlives the call, and a failed insert destroys the hosted
    /// photo again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No photo is attached, or the caption is missing
    /// - The photo is too large or not an allowed type
    /// - Writing the transient file, uploading, or inserting fails
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostError> {
        let photo = input.photo.ok_or(PostError::NoPhoto)?;
        let caption =
            non_blank(input.caption).ok_or_else(|| PostError::validation("Caption is required."))?;
        self.upload_policy
            .validate(
                &photo.content_type,
                u64::try_from(photo.bytes.len()).unwrap_or(u64::MAX),
            )?;
        let name = display_name(input.name);

        let transient =
            TransientFile::write(&self.temp_dir, photo.file_name.as_deref(), &photo.bytes)
                .await
                .map_err(PostError::TransientFile)?;

        match self.publish(&transient, &photo, name, caption).await {
            Ok(post) => {
                if let Err(e) = transient.remove().await {
                    warn!(
                        path = %transient.path().display(),
                        error = %e,
                        "Failed to remove transient upload"
                    );
                }
                info!(
                    post_id = %post.id,
                    provider = self.media.provider_name(),
                    "Post created"
                );
                Ok(post)
            }
            Err(e) => {
                Compensation::RemoveTransientFile(transient.path().to_path_buf())
                    .run(self.media.as_ref(), self.compensation)
                    .await;
                Err(e)
            }
        }
    }

    /// Upload the transient file, then insert the record pointing at it.
    async fn publish(
        &self,
        transient: &TransientFile,
        photo: &PhotoUpload,
        name: String,
        caption: String,
    ) -> Result<Post, PostError> {
        let uploaded = self
            .media
            .upload(transient.path(), &photo.content_type)
            .await?;

        let new_post = NewPost {
            name,
            caption,
            photo: uploaded.url,
            photo_public_id: Some(uploaded.public_id.clone()),
        };

        match self.repo.create(new_post).await {
            Ok(post) => Ok(post),
            Err(e) => {
                warn!(
                    public_id = %uploaded.public_id,
                    error = %e,
                    "Insert failed after upload, destroying hosted photo"
                );
                Compensation::DestroyMedia(uploaded.public_id)
                    .run(self.media.as_ref(), self.compensation)
                    .await;
                Err(e)
            }
        }
    }

    /// Change a post's name and caption. The photo is never touched.
    ///
    /// # Errors
    ///
    /// Returns an error if either field is missing or blank, the post does not
    /// exist, or the repository fails.
    pub async fn update(&self, id: PostId, input: UpdatePostInput) -> Result<Post, PostError> {
        let changes = input.into_changes()?;

        let post = self
            .repo
            .update(id, changes)
            .await?
            .ok_or(PostError::NotFound(id))?;

        info!(post_id = %id, "Post updated");
        Ok(post)
    }

    /// Delete a post and then its hosted photo.
    ///
    /// If the photo cannot be destroyed the record stays deleted and the
    /// failure is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist, the repository fails, or
    /// the media store cannot destroy the photo.
    pub async fn delete(&self, id: PostId) -> Result<Post, PostError> {
        let post = self
            .repo
            .delete(id)
            .await?
            .ok_or(PostError::NotFound(id))?;

        let public_id = post.media_public_id().ok_or_else(|| PostError::MediaCleanup {
            id,
            reason: format!("cannot determine media id from '{}'", post.photo),
        })?;

        self.media
            .destroy(&public_id)
            .await
            .map_err(|e| PostError::MediaCleanup {
                id,
                reason: e.to_string(),
            })?;

        info!(post_id = %id, public_id = %public_id, "Post deleted");
        Ok(post)
    }
}
