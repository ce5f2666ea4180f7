//! In-memory fakes for tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for downstream crates that need a `PostService` without a database or a
//! real media store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use picshare_shared::PostId;

use crate::media::{MediaError, MediaStore, UploadedMedia};
use crate::post::{NewPost, Post, PostChanges, PostError, PostRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Post repository backed by a `Vec`, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryPostRepository {
    posts: Mutex<Vec<Post>>,
    fail_create: AtomicBool,
}

impl InMemoryPostRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `posts`.
    #[must_use]
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            fail_create: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `create` fail.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Number of stored posts.
    #[must_use]
    pub fn count(&self) -> usize {
        lock(&self.posts).len()
    }

    /// Snapshot of stored posts.
    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        lock(&self.posts).clone()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create(&self, input: NewPost) -> Result<Post, PostError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PostError::repository("insert rejected"));
        }

        let now = Utc::now();
        let post = Post {
            id: PostId::new(),
            name: input.name,
            caption: input.caption,
            photo: input.photo,
            photo_public_id: input.photo_public_id,
            created_at: now,
            updated_at: now,
        };
        lock(&self.posts).push(post.clone());
        Ok(post)
    }

    async fn list(&self) -> Result<Vec<Post>, PostError> {
        Ok(self.posts())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        Ok(lock(&self.posts).iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, id: PostId, changes: PostChanges) -> Result<Option<Post>, PostError> {
        let mut posts = lock(&self.posts);
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.name = changes.name;
        post.caption = changes.caption;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: PostId) -> Result<Option<Post>, PostError> {
        let mut posts = lock(&self.posts);
        Ok(posts
            .iter()
            .position(|p| p.id == id)
            .map(|index| posts.remove(index)))
    }
}

/// A recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Public id handed back to the caller.
    pub public_id: String,
    /// Content type passed in.
    pub content_type: String,
    /// Bytes read from the transient file.
    pub bytes: Vec<u8>,
}

/// Media store that remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct FakeMediaStore {
    uploads: Mutex<Vec<RecordedUpload>>,
    destroyed: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
    failing_destroys: AtomicU32,
    destroy_attempts: AtomicU32,
}

impl FakeMediaStore {
    /// Store that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make the next `n` destroys fail.
    pub fn fail_next_destroys(&self, n: u32) {
        self.failing_destroys.store(n, Ordering::SeqCst);
    }

    /// Uploads so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        lock(&self.uploads).clone()
    }

    /// Public ids destroyed so far.
    #[must_use]
    pub fn destroyed(&self) -> Vec<String> {
        lock(&self.destroyed).clone()
    }

    /// Destroy calls so far, failed ones included.
    #[must_use]
    pub fn destroy_attempts(&self) -> u32 {
        self.destroy_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(&self, file: &Path, content_type: &str) -> Result<UploadedMedia, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Rejected {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }

        let bytes = tokio::fs::read(file).await?;
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_string();

        let mut uploads = lock(&self.uploads);
        let public_id = format!("picshare/{}", uploads.len() + 1);
        uploads.push(RecordedUpload {
            public_id: public_id.clone(),
            content_type: content_type.to_string(),
            bytes,
        });

        Ok(UploadedMedia {
            url: format!("https://media.test/{public_id}.{ext}"),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        self.destroy_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_destroys.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_destroys.store(failing - 1, Ordering::SeqCst);
            return Err(MediaError::Request("connection reset".to_string()));
        }

        lock(&self.destroyed).push(public_id.to_string());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
