//! Media store clients.
//!
//! A media store takes a local file, hosts it, and hands back a durable public
//! URL plus the identifier needed to destroy it later. Two families of store are
//! supported:
//!
//! - Cloudinary, through its signed REST API
//! - Object storage through Apache OpenDAL (S3-compatible, Azure Blob, local fs),
//!   served from a configured public base URL
//!
//! Destroying a resource that no longer exists is not an error, so callers can
//! repeat a destroy safely.

mod cloudinary;
mod error;
mod object_store;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use picshare_shared::{MediaConfig, MediaProvider};

pub use cloudinary::CloudinaryStore;
pub use error::MediaError;
pub use object_store::ObjectMediaStore;

/// A successfully hosted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Durable, publicly fetchable URL.
    pub url: String,
    /// Store-specific identifier used to destroy the resource.
    pub public_id: String,
}

/// External store for uploaded photos.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload the file at `file` and return where it is hosted.
    async fn upload(&self, file: &Path, content_type: &str) -> Result<UploadedMedia, MediaError>;

    /// Remove a previously uploaded resource.
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;

    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Build the configured media store.
///
/// # Errors
///
/// Returns an error if the provider cannot be initialized.
pub fn build_media_store(config: &MediaConfig) -> Result<Arc<dyn MediaStore>, MediaError> {
    let folder = config.folder.clone();
    let store: Arc<dyn MediaStore> = match &config.store {
        MediaProvider::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
            api_base,
        } => Arc::new(CloudinaryStore::new(
            api_base, cloud_name, api_key, api_secret, folder,
        )),
        provider => Arc::new(ObjectMediaStore::from_provider(provider, folder)?),
    };
    Ok(store)
}

/// Derive a resource identifier from a hosted URL.
///
/// Takes the final path segment and strips its extension, which is how
/// Cloudinary names assets uploaded without a folder. Only used for records
/// created before the identifier was stored explicitly.
#[must_use]
pub fn public_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = match segment.rfind('.') {
        Some(0) | None => segment,
        Some(dot) => &segment[..dot],
    };

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Normalized folder prefix, or `None` when uploads go to the root.
pub(crate) fn normalized_folder(folder: Option<&str>) -> Option<&str> {
    folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty())
}
