use anyhow::Result;
use clap::{Parser, Subcommand};
use deploylink_common::DeployLinkError;
use deploylink_common::observability::{LogConfig, init_logging};
use deploylink_config::{DeployLinkConfig, DeployLinkConfigLoader};
use deploylink_github::DeployCommenter;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "deploylink.yaml";

/// Post a deployment preview link on a commit or pull request.
#[derive(Parser, Debug)]
#[command(name = "deploylink", version)]
struct Cli {
    /// YAML config; when omitted `deploylink.yaml` is used if present
    #[arg(long, env = "DEPLOYLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert the bot comment on a commit
    Commit {
        #[arg(long, env = "DEPLOYLINK_OWNER")]
        owner: String,
        #[arg(long, env = "DEPLOYLINK_REPO")]
        repo: String,
        #[arg(long, env = "DEPLOYLINK_SHA")]
        sha: String,
        #[arg(long, env = "DEPLOYLINK_LINK")]
        link: String,
    },
    /// Upsert the bot comment on a pull request conversation
    PullRequest {
        #[arg(long, env = "DEPLOYLINK_OWNER")]
        owner: String,
        #[arg(long, env = "DEPLOYLINK_REPO")]
        repo: String,
        /// Kept as text; invalid numbers are logged, not rejected here
        #[arg(long, env = "DEPLOYLINK_PR_NUMBER")]
        number: String,
        #[arg(long, env = "DEPLOYLINK_LINK")]
        link: String,
        #[arg(long, env = "DEPLOYLINK_SHA")]
        sha: String,
    },
}

fn load_config(path: Option<PathBuf>) -> deploylink_common::Result<DeployLinkConfig> {
    let loader = match path {
        Some(path) => DeployLinkConfigLoader::new().with_file(path),
        None => DeployLinkConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    loader
        .load()
        .map_err(|e| DeployLinkError::Config(e.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config errors end the process; comment errors never do.
    let cfg = load_config(cli.config)?;

    init_logging(LogConfig {
        app_name: "deploylink",
        log_dir: cfg.logging.dir.clone(),
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;

    let commenter = DeployCommenter::new(cfg);
    match cli.command {
        Command::Commit {
            owner,
            repo,
            sha,
            link,
        } => commenter.handle_commit(&owner, &repo, &sha, &link).await,
        Command::PullRequest {
            owner,
            repo,
            number,
            link,
            sha,
        } => {
            commenter
                .handle_pull_request(&owner, &repo, &number, &link, &sha)
                .await
        }
    }

    tracing::debug!("deploylink.exit");
    Ok(())
}
