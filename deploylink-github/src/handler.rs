//! Entry points invoked by the CI step after a deployment.
//!
//! Both handlers are best-effort: every failure (missing credentials, token
//! exchange, list/create/update) is logged at error level and swallowed so a
//! comment problem never fails the surrounding job.
use deploylink_common::Target;
use deploylink_config::DeployLinkConfig;

use crate::client::{CommentsApi, GithubClient};
use crate::credentials::{load_credentials, log_file_tree};
use crate::error::GithubError;
use crate::types::RepoRef;
use crate::upsert::{UpsertOutcome, UpsertPolicy, upsert_deployment_comment};

pub struct DeployCommenter {
    config: DeployLinkConfig,
}

impl DeployCommenter {
    pub fn new(config: DeployLinkConfig) -> Self {
        Self { config }
    }

    pub fn policy(&self) -> UpsertPolicy {
        UpsertPolicy {
            bot_user_id: self.config.github.bot_user_id,
            skip_duplicate_links: self.config.upsert.skip_duplicate_links,
        }
    }

    /// Read credentials from the configured directory and authenticate.
    pub async fn connect(&self) -> Result<GithubClient, GithubError> {
        let creds_cfg = &self.config.credentials;
        if creds_cfg.list_tree {
            log_file_tree(&creds_cfg.auth_dir, &creds_cfg.tree_excludes);
        }
        let creds = load_credentials(&creds_cfg.auth_dir).await;
        GithubClient::connect(&self.config.github, &creds).await
    }

    pub async fn handle_commit(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        deployment_link: &str,
    ) {
        let target = Target::Commit {
            sha: commit_sha.to_string(),
        };
        self.run(RepoRef::new(owner, repo), target, deployment_link, commit_sha)
            .await;
    }

    /// `pull_request_number` arrives as text from the workflow inputs.
    pub async fn handle_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pull_request_number: &str,
        deployment_link: &str,
        commit_sha: &str,
    ) {
        let number = match parse_pull_request_number(pull_request_number) {
            Ok(number) => number,
            Err(err) => {
                tracing::error!(error=%err, "deploylink.upsert.failed");
                return;
            }
        };
        let target = Target::PullRequest { number };
        self.run(RepoRef::new(owner, repo), target, deployment_link, commit_sha)
            .await;
    }

    async fn run(
        &self,
        repo: RepoRef,
        target: Target,
        deployment_link: &str,
        commit_sha: &str,
    ) {
        let result = match self.connect().await {
            Ok(client) => {
                self.upsert_with(&client, &repo, &target, deployment_link, commit_sha)
                    .await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => {
                tracing::info!(%repo, %target, ?outcome, "deploylink.upsert.done");
            }
            Err(err) => {
                tracing::error!(%repo, %target, error=%err, "deploylink.upsert.failed");
            }
        }
    }

    /// Upsert through an already connected API.
    pub async fn upsert_with<A>(
        &self,
        api: &A,
        repo: &RepoRef,
        target: &Target,
        deployment_link: &str,
        commit_sha: &str,
    ) -> Result<UpsertOutcome, GithubError>
    where
        A: CommentsApi + ?Sized,
    {
        upsert_deployment_comment(
            api,
            repo,
            target,
            deployment_link,
            commit_sha,
            self.policy(),
        )
        .await
    }
}

fn parse_pull_request_number(raw: &str) -> Result<u64, GithubError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| GithubError::InvalidPullRequestNumber(raw.to_string()))
}
