//! Object storage media store using Apache OpenDAL.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ op.write("key", data)      │ op.delete("key")                   │
//! └─────────────────────────────────────────────────────────────────┘
//!          key = {folder}/{uuid}.{ext}
//!          url = {public_base_url}/{key}
//! ```

use std::path::Path;

use async_trait::async_trait;
use opendal::{ErrorKind, Operator, services};
use picshare_shared::MediaProvider;
use tracing::debug;
use uuid::Uuid;

use super::{MediaError, MediaStore, UploadedMedia, normalized_folder};
use crate::upload::sanitized_extension;

/// Media store backed by an object storage bucket.
pub struct ObjectMediaStore {
    operator: Operator,
    provider: &'static str,
    public_base_url: String,
    folder: Option<String>,
}

impl ObjectMediaStore {
    /// Create a store from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not an object storage provider or
    /// cannot be initialized.
    pub fn from_provider(
        provider: &MediaProvider,
        folder: Option<String>,
    ) -> Result<Self, MediaError> {
        let (operator, public_base_url) = match provider {
            MediaProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
                public_base_url,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                (finish(builder)?, public_base_url)
            }
            MediaProvider::AzureBlob {
                account,
                access_key,
                container,
                public_base_url,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                (finish(builder)?, public_base_url)
            }
            MediaProvider::LocalFs {
                root,
                public_base_url,
            } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| MediaError::configuration("invalid path"))?,
                );
                (finish(builder)?, public_base_url)
            }
            MediaProvider::Cloudinary { .. } => {
                return Err(MediaError::configuration(
                    "cloudinary is not an object storage provider",
                ));
            }
        };

        Ok(Self {
            operator,
            provider: provider.name(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            folder,
        })
    }

    /// Generate a fresh object key for an upload.
    ///
    /// Format: `{folder}/{uuid}.{ext}`, folder omitted when not configured.
    #[must_use]
    pub fn generate_key(&self, file: &Path) -> String {
        let name = match sanitized_extension(file.to_str()) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4().simple()),
            None => Uuid::new_v4().simple().to_string(),
        };

        match normalized_folder(self.folder.as_deref()) {
            Some(folder) => format!("{folder}/{name}"),
            None => name,
        }
    }

    /// Public URL for a stored key.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }
}

fn finish(builder: impl opendal::Builder) -> Result<Operator, MediaError> {
    Ok(Operator::new(builder)
        .map_err(|e| MediaError::configuration(e.to_string()))?
        .finish())
}

#[async_trait]
impl MediaStore for ObjectMediaStore {
    async fn upload(&self, file: &Path, content_type: &str) -> Result<UploadedMedia, MediaError> {
        let bytes = tokio::fs::read(file).await?;
        let key = self.generate_key(file);

        // Services without content-type support reject the option outright.
        if self.operator.info().full_capability().write_with_content_type {
            self.operator
                .write_with(&key, bytes)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(&key, bytes).await?;
        }

        debug!(key = %key, provider = self.provider, "Object stored");

        Ok(UploadedMedia {
            url: self.public_url(&key),
            public_id: key,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        match self.operator.delete(public_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }
}
