use deploylink_http::HttpError;

#[derive(thiserror::Error, Debug)]
pub enum GithubError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("invalid pull request number: {0:?}")]
    InvalidPullRequestNumber(String),
}
