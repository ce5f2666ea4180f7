//! Incoming photo uploads.
//!
//! - `UploadPolicy` decides whether a photo is acceptable before anything is
//!   written anywhere.
//! - `TransientFile` is the local copy of the bytes that lives only until the
//!   media store has them.

mod policy;
mod transient;

pub use policy::UploadPolicy;
pub use transient::TransientFile;
pub(crate) use transient::remove_if_exists;

use std::path::Path;

/// Lowercase ASCII extension of a file name, if it has a usable one.
///
/// Anything that is not short and alphanumeric is dropped rather than
/// carried into storage paths.
#[must_use]
pub fn sanitized_extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
