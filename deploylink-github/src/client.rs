//! Installation-scoped REST client for commit and issue comments.
//!
//! Pull request conversation comments live under the issues API, so a
//! [`Target::PullRequest`] is addressed by its issue number.
use async_trait::async_trait;
use deploylink_common::Target;
use deploylink_config::GithubSettings;
use deploylink_http::{HttpClient, HttpError, RequestOpts};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::borrow::Cow;

use crate::auth::AppAuth;
use crate::credentials::Credentials;
use crate::error::GithubError;
use crate::types::{Comment, CommentBody, RepoRef};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";

/// Comment operations the upsert flow needs; the seam tests fake.
#[async_trait]
pub trait CommentsApi: Send + Sync {
    async fn list_comments(
        &self,
        repo: &RepoRef,
        target: &Target,
    ) -> Result<Vec<Comment>, GithubError>;

    async fn create_comment(
        &self,
        repo: &RepoRef,
        target: &Target,
        body: &str,
    ) -> Result<Comment, GithubError>;

    async fn update_comment(
        &self,
        repo: &RepoRef,
        target: &Target,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, GithubError>;
}

#[derive(Clone)]
pub struct GithubClient {
    http: HttpClient,
    token: String,
}

impl GithubClient {
    /// Authenticate as the app installation described by `creds`.
    pub async fn connect(
        settings: &GithubSettings,
        creds: &Credentials,
    ) -> Result<Self, GithubError> {
        let auth = AppAuth::from_credentials(creds)?;
        let http = http_client(settings)?;
        let issued = auth.installation_token(&http).await?;
        tracing::info!(
            app_id = auth.app_id(),
            installation_id = %auth.installation_id(),
            "github.client.authenticated"
        );
        Ok(Self {
            http,
            token: issued.token,
        })
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            bearer: Some(&self.token),
            ..Default::default()
        }
    }
}

fn http_client(settings: &GithubSettings) -> Result<HttpClient, HttpError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        HeaderName::from_static("x-github-api-version"),
        HeaderValue::from_static(GITHUB_API_VERSION),
    );
    let agent = HeaderValue::from_str(&settings.user_agent)
        .map_err(|e| HttpError::Build(format!("invalid user agent: {e}")))?;
    headers.insert(USER_AGENT, agent);

    Ok(HttpClient::new(&settings.api_base)?.with_default_headers(headers))
}

fn comments_path(repo: &RepoRef, target: &Target) -> String {
    match target {
        Target::Commit { sha } => format!(
            "repos/{}/{}/commits/{}/comments",
            repo.owner, repo.repo, sha
        ),
        Target::PullRequest { number } => format!(
            "repos/{}/{}/issues/{}/comments",
            repo.owner, repo.repo, number
        ),
    }
}

fn comment_path(repo: &RepoRef, target: &Target, comment_id: u64) -> String {
    match target {
        Target::Commit { .. } => {
            format!("repos/{}/{}/comments/{}", repo.owner, repo.repo, comment_id)
        }
        Target::PullRequest { .. } => format!(
            "repos/{}/{}/issues/comments/{}",
            repo.owner, repo.repo, comment_id
        ),
    }
}

#[async_trait]
impl CommentsApi for GithubClient {
    async fn list_comments(
        &self,
        repo: &RepoRef,
        target: &Target,
    ) -> Result<Vec<Comment>, GithubError> {
        let opts = RequestOpts {
            query: vec![("per_page", Cow::Borrowed(PER_PAGE))],
            ..self.opts()
        };
        let comments: Vec<Comment> = self
            .http
            .get_json(&comments_path(repo, target), opts)
            .await?;
        tracing::debug!(%repo, %target, count = comments.len(), "github.comments.listed");
        Ok(comments)
    }

    async fn create_comment(
        &self,
        repo: &RepoRef,
        target: &Target,
        body: &str,
    ) -> Result<Comment, GithubError> {
        let comment: Comment = self
            .http
            .post_json(&comments_path(repo, target), &CommentBody { body }, self.opts())
            .await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        repo: &RepoRef,
        target: &Target,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, GithubError> {
        let comment: Comment = self
            .http
            .patch_json(
                &comment_path(repo, target, comment_id),
                &CommentBody { body },
                self.opts(),
            )
            .await?;
        Ok(comment)
    }
}
