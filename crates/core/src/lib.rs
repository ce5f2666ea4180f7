//! Core post lifecycle logic for Picshare.
//!
//! This crate contains the domain logic with ZERO web or database dependencies.
//! Persistence is reached through the [`post::PostRepository`] trait, which the
//! db crate implements.
//!
//! # Modules
//!
//! - `post` - Post domain types and the create/update/delete/list lifecycle
//! - `media` - Clients for the external media store (hosted API or object storage)
//! - `upload` - Upload validation and transient local files
//! - `search` - Case-insensitive post filtering

pub mod media;
pub mod post;
pub mod search;
pub mod upload;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
