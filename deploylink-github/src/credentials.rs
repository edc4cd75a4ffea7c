//! GitHub App credentials provisioned as plain files next to the action.
//!
//! The auth directory holds `app-id`, `installation-id` and a single `*.pem`
//! private key. Every reader degrades to `None` with an error log instead of
//! failing; whoever builds the authenticated client decides what a missing
//! value means.
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use walkdir::{DirEntry, WalkDir};

pub const APP_ID_FILE: &str = "app-id";
pub const INSTALLATION_ID_FILE: &str = "installation-id";

#[derive(Clone, Default)]
pub struct Credentials {
    pub app_id: Option<u64>,
    pub installation_id: Option<String>,
    pub private_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

pub async fn read_app_id(dir: &Path) -> Option<u64> {
    let path = dir.join(APP_ID_FILE);
    let data = read_trimmed(&path).await?;
    match data.parse::<u64>() {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::error!(path=%path.display(), error=%err, "credentials.app_id_not_numeric");
            None
        }
    }
}

pub async fn read_installation_id(dir: &Path) -> Option<String> {
    read_trimmed(&dir.join(INSTALLATION_ID_FILE)).await
}

/// Read the first `*.pem` file (by name) in `dir`.
pub async fn read_private_key(dir: &Path) -> Option<String> {
    let pem = match find_pem(dir).await {
        Ok(Some(pem)) => pem,
        Ok(None) => {
            tracing::error!(dir=%dir.display(), "credentials.pem_not_found");
            return None;
        }
        Err(err) => {
            tracing::error!(dir=%dir.display(), error=%err, "credentials.read_error");
            return None;
        }
    };
    read_trimmed(&pem).await
}

/// Read all three credentials concurrently.
pub async fn load_credentials(dir: &Path) -> Credentials {
    let (app_id, installation_id, private_key) = tokio::join!(
        read_app_id(dir),
        read_installation_id(dir),
        read_private_key(dir)
    );
    let creds = Credentials {
        app_id,
        installation_id,
        private_key,
    };
    tracing::debug!(?creds, "credentials.loaded");
    creds
}

async fn read_trimmed(path: &Path) -> Option<String> {
    match fs::read_to_string(path).await {
        Ok(data) => Some(data.trim().to_string()),
        Err(err) => {
            tracing::error!(path=%path.display(), error=%err, "credentials.read_error");
            None
        }
    }
}

async fn find_pem(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut pems = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let named_pem = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(".pem"));
        if !named_pem {
            continue;
        }
        // Follows symlinks, so mounted secrets count as files.
        let path = entry.path();
        if fs::metadata(&path).await.is_ok_and(|meta| meta.is_file()) {
            pems.push(path);
        }
    }
    pems.sort();
    if pems.len() > 1 {
        tracing::warn!(count = pems.len(), chosen=%pems[0].display(), "credentials.multiple_pem_files");
    }
    Ok(pems.into_iter().next())
}

/// Newline-separated listing of `location`, skipping excluded directory names.
pub fn file_tree(location: &Path, excludes: &[String]) -> String {
    let skip = |entry: &DirEntry| {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| excludes.iter().any(|ex| ex == name))
    };

    let mut listing = String::new();
    for entry in WalkDir::new(location)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !skip(e))
    {
        match entry {
            Ok(entry) => {
                listing.push_str(&entry.path().display().to_string());
                listing.push('\n');
            }
            Err(err) => tracing::warn!(error=%err, "credentials.tree_walk_error"),
        }
    }
    listing
}

/// Diagnostic dump of the auth directory tree.
pub fn log_file_tree(location: &Path, excludes: &[String]) {
    if !tracing::enabled!(tracing::Level::INFO) {
        return;
    }
    let listing = file_tree(location, excludes);
    tracing::info!(location = %location.display(), "File structure:\n{listing}");
}
