//! Cloudinary media store.
//!
//! Uses the signed upload API: every request carries the API key, a unix
//! timestamp, and a SHA-1 signature over the sorted request parameters
//! followed by the API secret.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::debug;

use super::{MediaError, MediaStore, UploadedMedia, normalized_folder};

/// Media store backed by the Cloudinary REST API.
pub struct CloudinaryStore {
    client: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryStore {
    /// Create a new Cloudinary client.
    #[must_use]
    pub fn new(
        api_base: &str,
        cloud_name: &str,
        api_key: &str,
        api_secret: &str,
        folder: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            folder,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{action}", self.api_base, self.cloud_name)
    }

    fn signed_params(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.api_secret);
        params.push(("api_key", self.api_key.clone()));
        params.push(("signature", signature));
        params
    }
}

/// Compute a Cloudinary request signature.
///
/// Parameters are sorted by name, joined as `k=v` pairs with `&`, suffixed
/// with the API secret, and hashed with SHA-1 (lowercase hex).
#[must_use]
pub(crate) fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Interpret the body of an upload call.
fn parse_upload_response(status: u16, body: &str) -> Result<UploadedMedia, MediaError> {
    if !(200..300).contains(&status) {
        return Err(rejection(status, body));
    }

    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| MediaError::invalid_response(e.to_string()))?;

    Ok(UploadedMedia {
        url: parsed.secure_url,
        public_id: parsed.public_id,
    })
}

/// Interpret the body of a destroy call. A missing resource counts as destroyed.
fn parse_destroy_response(status: u16, body: &str) -> Result<(), MediaError> {
    if !(200..300).contains(&status) {
        return Err(rejection(status, body));
    }

    let parsed: DestroyResponse = serde_json::from_str(body)
        .map_err(|e| MediaError::invalid_response(e.to_string()))?;

    match parsed.result.as_str() {
        "ok" | "not found" => Ok(()),
        other => Err(MediaError::invalid_response(format!(
            "destroy returned '{other}'"
        ))),
    }
}

fn rejection(status: u16, body: &str) -> MediaError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |e| e.error.message);
    MediaError::Rejected { status, message }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, file: &Path, content_type: &str) -> Result<UploadedMedia, MediaError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut params = vec![("timestamp", Utc::now().timestamp().to_string())];
        if let Some(folder) = normalized_folder(self.folder.as_deref()) {
            params.push(("folder", folder.to_string()));
        }

        let mut form = Form::new();
        for (name, value) in self.signed_params(params) {
            form = form.text(name, value);
        }
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)?;
        form = form.part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let uploaded = parse_upload_response(status, &body)?;
        debug!(public_id = %uploaded.public_id, "Cloudinary upload complete");
        Ok(uploaded)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let params = self.signed_params(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        parse_destroy_response(status, &body)
    }

    fn provider_name(&self) -> &'static str {
        "cloudinary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha1_hex(input: &str) -> String {
        hex::encode(Sha1::digest(input.as_bytes()))
    }

    #[test]
    fn test_sign_sorts_params_and_appends_secret() {
        let params = vec![
            ("timestamp", "1315060510".to_string()),
            ("public_id", "sample_image".to_string()),
        ];

        assert_eq!(
            sign(&params, "abcd"),
            sha1_hex("public_id=sample_image&timestamp=1315060510abcd")
        );
    }

    #[test]
    fn test_sign_is_order_independent() {
        let a = vec![
            ("folder", "picshare".to_string()),
            ("timestamp", "1".to_string()),
        ];
        let b = vec![
            ("timestamp", "1".to_string()),
            ("folder", "picshare".to_string()),
        ];
        assert_eq!(sign(&a, "s"), sign(&b, "s"));
        assert_eq!(sign(&a, "s").len(), 40);
    }

    #[test]
    fn test_signed_params_exclude_key_from_signature() {
        let store = CloudinaryStore::new("https://api.example/v1_1/", "demo", "key", "secret", None);
        let params = store.signed_params(vec![("timestamp", "42".to_string())]);

        let signature = params
            .iter()
            .find(|(k, _)| *k == "signature")
            .map(|(_, v)| v.clone())
            .expect("signature present");
        assert_eq!(signature, sha1_hex("timestamp=42secret"));
        assert!(params.iter().any(|(k, v)| *k == "api_key" && v == "key"));
        assert_eq!(
            store.endpoint("upload"),
            "https://api.example/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn test_parse_upload_response() {
        let body = r#"{"public_id":"abc123","secure_url":"https://res.cloudinary.com/demo/image/upload/v1/abc123.jpg","bytes":1024}"#;
        let uploaded = parse_upload_response(200, body).expect("should parse");
        assert_eq!(uploaded.public_id, "abc123");
        assert!(uploaded.url.starts_with("https://"));
    }

    #[test]
    fn test_parse_upload_error() {
        let body = r#"{"error":{"message":"Invalid Signature"}}"#;
        let err = parse_upload_response(401, body).unwrap_err();
        match err {
            MediaError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_upload_garbage() {
        let err = parse_upload_response(200, "<html>").unwrap_err();
        assert!(matches!(err, MediaError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_destroy_response() {
        assert!(parse_destroy_response(200, r#"{"result":"ok"}"#).is_ok());
        assert!(parse_destroy_response(200, r#"{"result":"not found"}"#).is_ok());
        assert!(parse_destroy_response(200, r#"{"result":"error"}"#).is_err());
        assert!(matches!(
            parse_destroy_response(500, "upstream down"),
            Err(MediaError::Rejected { status: 500, .. })
        ));
    }
}
