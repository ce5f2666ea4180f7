//! Case-insensitive post search.
//!
//! A pure function over an immutable snapshot of posts. A post matches when
//! its name or caption contains the query, ignoring case.

use crate::post::Post;

/// Whether `post` matches `query`. An empty query matches everything.
#[must_use]
pub fn matches(post: &Post, query: &str) -> bool {
    matches_lowered(post, &query.to_lowercase())
}

/// Posts from `posts` matching `query`, in their original order.
#[must_use]
pub fn filter_posts<'a>(posts: &'a [Post], query: &str) -> Vec<&'a Post> {
    let needle = query.to_lowercase();
    posts
        .iter()
        .filter(|post| matches_lowered(post, &needle))
        .collect()
}

/// `needle` must already be lowercase.
fn matches_lowered(post: &Post, needle: &str) -> bool {
    post.name.to_lowercase().contains(needle) || post.caption.to_lowercase().contains(needle)
}
