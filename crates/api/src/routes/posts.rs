//! Post routes.
//!
//! `POST /post` takes a multipart form with `name`, `caption` and a `photo`
//! file. `PUT /post/{id}` takes JSON `{ name, caption }`.

use axum::{
    Json, Router,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::Response,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    AppState,
    response::{self, ApiError},
};
use picshare_core::post::{CreatePostInput, PhotoUpload, Post, UpdatePostInput};
use picshare_shared::PostId;

/// Prefix for server-side create failures.
const CREATE_FAILED: &str = "Failed to create post. ";

/// Creates the post routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/post", get(list_posts).post(create_post))
        .route(
            "/post/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    /// Case-insensitive filter over name and caption.
    pub search: Option<String>,
}

/// Request body for updating a post.
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New caption.
    #[serde(default)]
    pub caption: Option<String>,
}

/// Response for a post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    /// Post ID.
    #[serde(rename = "_id")]
    pub id: PostId,
    /// Display name.
    pub name: String,
    /// Caption.
    pub caption: String,
    /// Hosted photo URL.
    pub photo: String,
    /// Created at timestamp (ISO 8601).
    pub created_at: String,
    /// Updated at timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            name: post.name,
            caption: post.caption,
            photo: post.photo,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a path id. Anything that is not a post id cannot name a post.
fn parse_post_id(raw: &str) -> Result<PostId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("Post not found"))
}

/// A body cut off by the request limit is an oversized photo, which is a
/// client error like any other rejected upload.
fn multipart_error(err: &MultipartError, max_file_size: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::bad_request(format!(
            "Photo is larger than the {max_file_size} byte limit."
        ));
    }
    ApiError::new(err.status(), err.body_text())
}

/// Collect the create form. Unknown fields are ignored.
async fn read_create_form(
    mut multipart: Multipart,
    max_file_size: u64,
) -> Result<CreatePostInput, ApiError> {
    let mut input = CreatePostInput::default();
    let rejected = |e: MultipartError| multipart_error(&e, max_file_size);

    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("name") => {
                input.name = Some(field.text().await.map_err(rejected)?);
            }
            Some("caption") => {
                input.caption = Some(field.text().await.map_err(rejected)?);
            }
            Some("photo") => {
                let file_name = field.file_name().map(ToString::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(rejected)?;

                // Browsers send an empty, unnamed part when no file was picked.
                if file_name.as_deref().is_none_or(str::is_empty) && bytes.is_empty() {
                    continue;
                }

                input.photo = Some(PhotoUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(input)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/post`
/// List posts in creation order, optionally filtered.
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Response, ApiError> {
    let posts = state.posts.list(query.search.as_deref()).await?;
    let data: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();

    Ok(response::data(StatusCode::OK, data))
}

/// GET `/post/{id}`
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&id)?;
    let post = state.posts.get(id).await?;

    Ok(response::data(StatusCode::OK, PostResponse::from(post)))
}

/// POST `/post`
/// Upload the photo, then store the post.
async fn create_post(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let max_file_size = state.posts.upload_policy().max_file_size;
    let input = read_create_form(multipart, max_file_size).await?;

    match state.posts.create(input).await {
        Ok(post) => {
            info!(post_id = %post.id, "Post created via API");
            Ok(response::data(StatusCode::CREATED, PostResponse::from(post)))
        }
        Err(e) => {
            if !e.is_client_error() {
                warn!(error = %e, "Failed to create post");
            }
            Err(ApiError::from(e).with_server_context(CREATE_FAILED))
        }
    }
}

/// PUT `/post/{id}`
/// Change name and caption.
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&id)?;
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let post = state
        .posts
        .update(
            id,
            UpdatePostInput {
                name: payload.name,
                caption: payload.caption,
            },
        )
        .await?;

    Ok(response::data(StatusCode::OK, PostResponse::from(post)))
}

/// DELETE `/post/{id}`
/// Remove the post and its hosted photo.
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&id)?;
    state.posts.delete(id).await?;

    Ok(response::message("Post deleted successfully"))
}


/// Router tests against in-memory fakes of the repository and media store.
#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, header},
    };
    use http_body_util::BodyExt;
    use picshare_core::post::{CompensationPolicy, PostService};
    use picshare_core::testing::{FakeMediaStore, InMemoryPostRepository};
    use picshare_core::upload::UploadPolicy;
    use picshare_shared::{CorsConfig, UploadConfig};
    use rstest::rstest;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::create_router;

    const BOUNDARY: &str = "picshare-test-boundary";
    const ORIGIN: &str = "http://localhost:5173";

    struct TestApp {
        router: Router,
        repo: Arc<InMemoryPostRepository>,
        media: Arc<FakeMediaStore>,
        temp: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_upload(UploadConfig::default())
        }

        fn with_upload(upload: UploadConfig) -> Self {
            let repo = Arc::new(InMemoryPostRepository::new());
            let media = Arc::new(FakeMediaStore::new());
            let temp = tempfile::tempdir().expect("tempdir");
            let service = PostService::new(repo.clone(), media.clone(), temp.path().join("uploads"))
                .with_upload_policy(UploadPolicy::from_config(&upload))
                .with_compensation(CompensationPolicy {
                    attempts: 2,
                    retry_delay: Duration::ZERO,
                });

            let cors = CorsConfig {
                allowed_origins: vec![ORIGIN.to_string()],
            };
            let router = create_router(
                AppState {
                    posts: Arc::new(service),
                },
                &cors,
                &upload,
            );

            Self {
                router,
                repo,
                media,
                temp,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible")
        }

        async fn create(&self, name: &str, caption: &str) -> Value {
            let response = self
                .send(create_request(
                    &[("name", name), ("caption", caption)],
                    Some(("sunset.png", "image/png", b"\x89PNG-bytes")),
                ))
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            body_json(response).await["data"].clone()
        }

        fn upload_dir_is_empty(&self) -> bool {
            std::fs::read_dir(self.temp.path().join("uploads"))
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(true)
        }
    }

    fn multipart_body(fields: &[(&str, &str)], photo: Option<(&str, &str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn create_request(
        fields: &[(&str, &str)],
        photo: Option<(&str, &str, &[u8])>,
    ) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/post")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, photo)))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn test_root_greeting() {
        let app = TestApp::new();

        let response = app.send(empty_request("GET", "/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Hello from Picshare!");
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();

        let response = app.send(empty_request("GET", "/api/v1/health")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["media_store"], "fake");
    }

    #[tokio::test]
    async fn test_create_post() {
        let app = TestApp::new();

        let data = app.create("Ann", "Sunset").await;

        assert_eq!(data["name"], "Ann");
        assert_eq!(data["caption"], "Sunset");
        assert_eq!(data["photo"], "https://media.test/picshare/1.png");
        assert!(data["_id"].is_string());
        assert!(data["createdAt"].is_string());
        assert_eq!(app.repo.count(), 1);
        assert_eq!(app.media.uploads()[0].bytes, b"\x89PNG-bytes");
        assert!(app.upload_dir_is_empty());
    }

    #[tokio::test]
    async fn test_create_post_without_photo() {
        let app = TestApp::new();

        let response = app
            .send(create_request(&[("name", "Ann"), ("caption", "Sunset")], None))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "message": "No photo uploaded." })
        );
        assert_eq!(app.repo.count(), 0);
    }

    #[tokio::test]
    async fn test_create_post_without_name_is_anonymous() {
        let app = TestApp::new();

        let data = app.create("", "Sunset").await;

        assert_eq!(data["name"], "Anonymous");
    }

    #[tokio::test]
    async fn test_create_post_rejects_non_image() {
        let app = TestApp::new();

        let response = app
            .send(create_request(
                &[("caption", "Sunset")],
                Some(("notes.txt", "text/plain", b"hello")),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.media.uploads().is_empty());
    }

    #[rstest]
    #[case::under_body_limit(2048)]
    #[case::over_body_limit(200 * 1024)]
    #[tokio::test]
    async fn test_create_post_rejects_oversized_photo(#[case] size: usize) {
        let app = TestApp::with_upload(UploadConfig {
            max_file_size: 1024,
            ..UploadConfig::default()
        });
        let photo = vec![0x42; size];

        let response = app
            .send(create_request(
                &[("name", "Ann"), ("caption", "Sunset")],
                Some(("sunset.png", "image/png", &photo)),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        let message = body["message"].as_str().unwrap_or_default();
        assert!(message.contains("larger than the 1024 byte limit"), "{message}");
        assert_eq!(app.repo.count(), 0);
        assert!(app.media.uploads().is_empty());
        assert!(app.upload_dir_is_empty());
    }

    #[tokio::test]
    async fn test_create_post_insert_failure() {
        let app = TestApp::new();
        app.repo.fail_creates(true);

        let response = app
            .send(create_request(
                &[("name", "Ann"), ("caption", "Sunset")],
                Some(("sunset.png", "image/png", b"png")),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to create post. insert rejected");
        assert_eq!(app.media.destroyed(), vec!["picshare/1".to_string()]);
        assert!(app.upload_dir_is_empty());
    }

    #[tokio::test]
    async fn test_create_post_upload_failure() {
        let app = TestApp::new();
        app.media.fail_uploads(true);

        let response = app
            .send(create_request(
                &[("caption", "Sunset")],
                Some(("sunset.png", "image/png", b"png")),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        let message = body["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("Failed to create post. "));
        assert_eq!(app.repo.count(), 0);
        assert!(app.upload_dir_is_empty());
    }

    #[tokio::test]
    async fn test_list_posts() {
        let app = TestApp::new();
        app.create("Ann", "Sunset").await;
        app.create("Bob", "Harbor at dawn").await;
        app.create("Cleo", "Another sunset").await;

        let response = app.send(empty_request("GET", "/api/v1/post")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let names: Vec<&str> = body["data"]
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Ann", "Bob", "Cleo"]);

        let response = app
            .send(empty_request("GET", "/api/v1/post?search=SUNSET"))
            .await;
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_get_post() {
        let app = TestApp::new();
        let created = app.create("Ann", "Sunset").await;
        let id = created["_id"].as_str().expect("id");

        let response = app
            .send(empty_request("GET", &format!("/api/v1/post/{id}")))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], created);
    }

    #[tokio::test]
    async fn test_update_post() {
        let app = TestApp::new();
        let created = app.create("Ann", "Sunset").await;
        let id = created["_id"].as_str().expect("id");

        let response = app
            .send(json_request(
                "PUT",
                &format!("/api/v1/post/{id}"),
                &json!({ "name": "Anna", "caption": "Sunset view" }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let data = body_json(response).await["data"].clone();
        assert_eq!(data["name"], "Anna");
        assert_eq!(data["caption"], "Sunset view");
        assert_eq!(data["photo"], created["photo"]);
        assert_eq!(data["_id"], created["_id"]);
    }

    #[rstest]
    #[case(json!({ "name": "", "caption": "New" }))]
    #[case(json!({ "name": "Anna" }))]
    #[case(json!({ "name": "   ", "caption": "   " }))]
    #[tokio::test]
    async fn test_update_post_requires_fields(#[case] payload: Value) {
        let app = TestApp::new();
        let created = app.create("Ann", "Sunset").await;
        let id = created["_id"].as_str().expect("id");

        let response = app
            .send(json_request("PUT", &format!("/api/v1/post/{id}"), &payload))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["message"],
            "Name and caption are required."
        );
        assert_eq!(app.repo.posts()[0].name, "Ann");
    }

    #[tokio::test]
    async fn test_update_post_malformed_json() {
        let app = TestApp::new();
        let created = app.create("Ann", "Sunset").await;
        let id = created["_id"].as_str().expect("id");

        let response = app
            .send(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/post/{id}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_update_unknown_post() {
        let app = TestApp::new();

        let response = app
            .send(json_request(
                "PUT",
                &format!("/api/v1/post/{}", PostId::new()),
                &json!({ "name": "Anna", "caption": "Sunset view" }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let app = TestApp::new();
        let created = app.create("Ann", "Sunset").await;
        let uri = format!("/api/v1/post/{}", created["_id"].as_str().expect("id"));

        let response = app.send(empty_request("DELETE", &uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "success": true, "message": "Post deleted successfully" })
        );
        assert_eq!(app.repo.count(), 0);
        assert_eq!(app.media.destroyed(), vec!["picshare/1".to_string()]);

        let response = app.send(empty_request("DELETE", &uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "Post not found");
    }

    #[rstest]
    #[case("65f1c0ffee0123456789abcd")]
    #[case("not-an-id")]
    #[tokio::test]
    async fn test_delete_invalid_id_is_not_found(#[case] id: &str) {
        let app = TestApp::new();
        app.create("Ann", "Sunset").await;

        let response = app
            .send(empty_request("DELETE", &format!("/api/v1/post/{id}")))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.repo.count(), 1);
    }

    #[tokio::test]
    async fn test_delete_post_media_failure() {
        let app = TestApp::new();
        let created = app.create("Ann", "Sunset").await;
        app.media.fail_next_destroys(1);

        let response = app
            .send(empty_request(
                "DELETE",
                &format!("/api/v1/post/{}", created["_id"].as_str().expect("id")),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["success"], false);
        assert_eq!(app.repo.count(), 0);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = TestApp::new();

        let response = app
            .send(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/post")
                    .header(header::ORIGIN, ORIGIN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some(ORIGIN)
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .and_then(|v| v.to_str().ok()),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_cors_ignores_unknown_origin() {
        let app = TestApp::new();

        let response = app
            .send(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/post")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}
