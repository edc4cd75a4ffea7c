//! Common types and utilities shared across deploylink crates.
//!
//! This crate holds the logging bootstrap and the shared error type used by
//! the binary and the library crates. It stays dependency-light so every
//! other crate can pull it in.
//!
//! # Overview
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`DeployLinkError`] and [`Result`]: shared error handling
//! - [`Target`]: which GitHub object a deployment link is attached to
//!
//! # Examples
//!
//! ```rust
//! use deploylink_common::Target;
//!
//! let target = Target::PullRequest { number: 42 };
//! assert_eq!(target.to_string(), "pull request #42");
//! ```
use std::fmt;

pub mod observability;

/// The GitHub object a deployment comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Commit { sha: String },
    PullRequest { number: u64 },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Commit { sha } => write!(f, "commit {}", short_sha(sha)),
            Target::PullRequest { number } => write!(f, "pull request #{number}"),
        }
    }
}

/// First seven characters of a commit SHA, or the whole string when shorter.
///
/// ```
/// use deploylink_common::short_sha;
///
/// assert_eq!(short_sha("abcdef0123456789"), "abcdef0");
/// assert_eq!(short_sha("abc"), "abc");
/// ```
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(7) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

/// Error types used across the deploylink workspace.
#[derive(thiserror::Error, Debug)]
pub enum DeployLinkError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`DeployLinkError`].
pub type Result<T> = std::result::Result<T, DeployLinkError>;
