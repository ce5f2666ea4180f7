//! Shared types, errors, and configuration for Picshare.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, CorsConfig, MediaConfig, MediaProvider, UploadConfig};
pub use error::AppError;
pub use types::PostId;
