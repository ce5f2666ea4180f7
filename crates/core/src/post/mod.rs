//! Post lifecycle.
//!
//! This module provides the business logic for posts:
//! - Create: validate, stage a transient file, upload, insert, clean up
//! - Update: change name and caption only
//! - Delete: remove the record, then destroy the hosted photo
//! - List: every post in store order, optionally filtered
//!
//! Creating and deleting span two stores with no shared transaction. Each step
//! that can leave something behind has a [`Compensation`] that undoes it.

mod compensation;
mod error;
mod service;
mod types;


pub use compensation::{Compensation, CompensationPolicy};
pub use error::PostError;
pub use service::{PostRepository, PostService};
pub use types::{
    ANONYMOUS_NAME, CreatePostInput, NewPost, PhotoUpload, Post, PostChanges, UpdatePostInput,
};
