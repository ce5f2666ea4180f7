//! Upload acceptance rules.

use picshare_shared::UploadConfig;

use crate::post::PostError;

/// Size and type limits for incoming photos.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Maximum photo size in bytes.
    pub max_file_size: u64,
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl UploadPolicy {
    /// Build the policy from upload configuration.
    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }

    /// Check if a MIME type is allowed. Parameters such as `; charset=` are ignored.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        self.allowed_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
    }

    /// Validate a photo against the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the photo is empty, too large, or of a type that is
    /// not allowed.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), PostError> {
        if size == 0 {
            return Err(PostError::validation("Uploaded photo is empty."));
        }

        if size > self.max_file_size {
            return Err(PostError::PhotoTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        if !self.is_mime_type_allowed(content_type) {
            return Err(PostError::UnsupportedPhotoType(content_type.to_string()));
        }

        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}
