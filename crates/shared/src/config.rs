//! Application configuration management.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Cross-origin request configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Media store configuration.
    pub media: MediaConfig,
    /// Incoming upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Cross-origin request configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Browser origins allowed to call the API.
    ///
    /// Accepts a list, or a single comma-separated string so it can be set
    /// from one environment variable.
    #[serde(
        default = "default_allowed_origins",
        deserialize_with = "deserialize_origins"
    )]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OriginList {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match OriginList::deserialize(deserializer)? {
        OriginList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        OriginList::List(list) => list,
    };

    Ok(raw
        .into_iter()
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect())
}

/// Media store provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaProvider {
    /// Cloudinary hosted media API.
    Cloudinary {
        /// Cloud name (account identifier in API URLs).
        cloud_name: String,
        /// API key.
        api_key: String,
        /// API secret used to sign requests.
        api_secret: String,
        /// API base URL.
        #[serde(default = "default_cloudinary_api_base")]
        api_base: String,
    },
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces.
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
        /// Public URL prefix under which stored objects are served.
        public_base_url: String,
    },
    /// Azure Blob Storage.
    AzureBlob {
        /// Storage account name.
        account: String,
        /// Storage access key.
        access_key: String,
        /// Container name.
        container: String,
        /// Public URL prefix under which stored objects are served.
        public_base_url: String,
    },
    /// Local filesystem (development only).
    LocalFs {
        /// Root directory path.
        root: PathBuf,
        /// Public URL prefix under which stored objects are served.
        public_base_url: String,
    },
}

fn default_cloudinary_api_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

impl MediaProvider {
    /// Provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cloudinary { .. } => "cloudinary",
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Media store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Which store to use and its credentials.
    pub store: MediaProvider,
    /// Folder (key prefix) uploads are placed under.
    #[serde(default)]
    pub folder: Option<String>,
    /// Attempts made for each compensating action.
    #[serde(default = "default_compensation_attempts")]
    pub compensation_attempts: u32,
    /// Delay between compensation attempts in milliseconds.
    #[serde(default = "default_compensation_retry_delay_ms")]
    pub compensation_retry_delay_ms: u64,
}

fn default_compensation_attempts() -> u32 {
    3
}

fn default_compensation_retry_delay_ms() -> u64 {
    200
}

/// Incoming upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory transient files are written to.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Maximum photo size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// MIME types accepted for photos.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_file_size: default_max_file_size(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PICSHARE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
