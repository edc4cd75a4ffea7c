//! Loader for deploylink configuration with YAML + environment overlays.
//!
//! Sources are merged in order: optional YAML file, inline YAML snippets, then
//! `DEPLOYLINK__`-prefixed environment variables (`__` separates nesting, so
//! `DEPLOYLINK__GITHUB__BOT_USER_ID` sets `github.bot_user_id`). String values
//! may contain `${VAR}` placeholders, expanded after merging.
use config::{Config, ConfigError, Environment, File};
use deploylink_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "DEPLOYLINK";

#[derive(Debug, Clone, Deserialize)]
pub struct DeployLinkConfig {
    pub github: GithubSettings,
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub upsert: UpsertSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the API lives and which account counts as "ours".
#[derive(Debug, Clone, Deserialize)]
pub struct GithubSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Numeric account id of the bot whose comments get extended.
    pub bot_user_id: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSettings {
    /// Directory holding `app-id`, `installation-id` and one `*.pem` key.
    pub auth_dir: PathBuf,
    /// Log the directory tree at debug level before reading.
    #[serde(default = "default_true")]
    pub list_tree: bool,
    /// Directory names skipped by the tree listing.
    #[serde(default = "default_tree_excludes")]
    pub tree_excludes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertSettings {
    /// Skip the update when the bot comment already links the deployment URL.
    #[serde(default)]
    pub skip_duplicate_links: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Optional directory for a rolling file sink.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
            dir: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_user_agent() -> String {
    "deploylink".into()
}
fn default_true() -> bool {
    true
}
fn default_tree_excludes() -> Vec<String> {
    vec!["node_modules".into()]
}
fn default_filter() -> String {
    "info".into()
}

impl DeployLinkConfig {
    /// Reject values that deserialize fine but can never work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.github.api_base).map_err(|e| {
            ConfigError::Message(format!(
                "github.api_base `{}` is not a URL: {e}",
                self.github.api_base
            ))
        })?;
        if self.github.bot_user_id == 0 {
            return Err(ConfigError::Message(
                "github.bot_user_id must be a non-zero account id".into(),
            ));
        }
        if self.credentials.auth_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "credentials.auth_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct DeployLinkConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for DeployLinkConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployLinkConfigLoader {
    /// Start with no files; environment overrides are attached at [`load`](Self::load)
    /// so they always win over files added in between.
    ///
    /// ```
    /// use deploylink_config::DeployLinkConfigLoader;
    ///
    /// let config = DeployLinkConfigLoader::new()
    ///     .with_yaml_str("github:\n  bot_user_id: 7\ncredentials:\n  auth_dir: /tmp/auth")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.github.bot_user_id, 7);
    /// assert_eq!(config.github.api_base, "https://api.github.com");
    /// assert!(!config.upsert.skip_duplicate_links);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so CI jobs can rely purely on
    /// environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use deploylink_config::DeployLinkConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_AUTH_ROOT", "/opt/action"); }
    ///
    /// let config = DeployLinkConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// github:
    ///   bot_user_id: 165700353
    /// credentials:
    ///   auth_dir: "${DOCTEST_AUTH_ROOT}/auth"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.credentials.auth_dir.to_str(), Some("/opt/action/auth"));
    ///
    /// unsafe { std::env::remove_var("DOCTEST_AUTH_ROOT"); }
    /// ```
    pub fn load(self) -> Result<DeployLinkConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("credentials.tree_excludes"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // `try_parsing` turns `1234` into an integer even for string fields;
        // the `config` deserializer coerces scalars back to the field's type.
        let typed: DeployLinkConfig = Config::try_from(&v)?.try_deserialize()?;
        typed.validate()?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("ORG", Some("acme")), ("SITE", Some("docs"))], || {
            let mut v = json!([
                "dir-$ORG",
                { "path": "${ORG}/${SITE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["dir-acme", { "path": "acme/docs" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST_DEPLOYLINK}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST_DEPLOYLINK}"));
    }

    fn base() -> DeployLinkConfig {
        serde_json::from_value(json!({
            "github": { "bot_user_id": 1 },
            "credentials": { "auth_dir": "/auth" }
        }))
        .unwrap()
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = base();
        assert_eq!(cfg.github.user_agent, "deploylink");
        assert!(cfg.credentials.list_tree);
        assert_eq!(cfg.credentials.tree_excludes, vec!["node_modules"]);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = base();
        cfg.github.api_base = "not a url".into();
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.github.bot_user_id = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.credentials.auth_dir = PathBuf::new();
        assert!(cfg.validate().is_err());
    }
}
