//! GitHub side of deploylink: credentials, app auth, comments, upsert.
//!
//! The flow for one invocation is: read the app credentials from the auth
//! directory, exchange a signed JWT for an installation token, list the
//! comments on the target, then append to the bot's comment or create one.
//! Failures in that flow are logged and swallowed by [`DeployCommenter`].
pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;
pub mod handler;
pub mod types;
pub mod upsert;

pub use client::{CommentsApi, GithubClient};
pub use credentials::{Credentials, load_credentials};
pub use error::GithubError;
pub use handler::DeployCommenter;
pub use types::{Comment, RepoRef, User};
pub use upsert::{SkipReason, UpsertOutcome, UpsertPolicy, deployment_fragment};
