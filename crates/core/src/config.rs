//! TOML-based configuration for gitmerge.
//!
//! Secrets (the clone token) are stored as `_env` fields naming an
//! environment variable. The value itself is resolved at runtime via
//! [`AppConfig::resolve_env_vars`]. Every section has defaults, so an empty
//! file (or no file at all) yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::alignment_by_name;
use crate::errors::ConfigError;
use crate::models::BranchScope;

/// Default file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "gitmerge.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub compare: CompareConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Which repository to bind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Local repository path (default `.`).
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,

    /// Remote to clone into `path` when no repository exists there yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Environment variable holding an HTTPS token used when cloning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Resolved token (populated at runtime, never serialized).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            remote_url: None,
            token_env: None,
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

/// Defaults for branch comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Base branch used when a command omits one.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Which branches `branches` lists.
    #[serde(default)]
    pub branch_scope: BranchScope,

    /// Line alignment strategy for conflict diffs.
    #[serde(default = "default_alignment")]
    pub alignment: String,
}

fn default_base_branch() -> String {
    "main".into()
}
fn default_alignment() -> String {
    "positional".into()
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
            branch_scope: BranchScope::default(),
            alignment: default_alignment(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output & logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination directory for downloaded files. Cleared before each run.
    #[serde(default = "default_dest_dir")]
    pub dest_dir: PathBuf,
}

fn default_dest_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dest_dir: default_dest_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from the environment. A missing variable logs
    /// a warning and leaves the resolved field empty.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.repository.token_env {
            self.repository.token = resolve_optional_env(env_name, "repository.token_env");
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compare.base_branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "compare.base_branch".into(),
                detail: "base branch must not be empty".into(),
            });
        }
        if alignment_by_name(&self.compare.alignment).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "compare.alignment".into(),
                detail: format!("unknown alignment strategy '{}'", self.compare.alignment),
            });
        }
        if self.output.dest_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.dest_dir".into(),
                detail: "destination directory must not be empty".into(),
            });
        }
        // The destination is wiped before every download.
        if crate::materialize::overlaps_repository(&self.output.dest_dir, &self.repository.path) {
            return Err(ConfigError::InvalidValue {
                field: "output.dest_dir".into(),
                detail: "destination directory must not be the repository or contain it".into(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.logging.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if let Some(ref url) = self.repository.remote_url {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "repository.remote_url".into(),
                    detail: "remote URL must not be empty when set".into(),
                });
            }
        }
        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. for writing a starter file.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[repository]
path = "/srv/repos/app"
remote_url = "https://git.example.com/acme/app.git"
token_env = "GITMERGE_TOKEN"

[compare]
base_branch = "develop"
branch_scope = "local"
alignment = "positional"

[output]
dest_dir = "/tmp/gitmerge-out"

[logging]
log_level = "debug"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.repository.path, PathBuf::from("/srv/repos/app"));
        assert_eq!(config.compare.base_branch, "develop");
        assert_eq!(config.compare.branch_scope, BranchScope::Local);
        assert_eq!(config.output.dest_dir, PathBuf::from("/tmp/gitmerge-out"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitmerge.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/gitmerge.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitmerge.toml");
        std::fs::write(&path, "[compare\nbase_branch = ").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.repository.path, PathBuf::from("."));
        assert!(config.repository.remote_url.is_none());
        assert_eq!(config.compare.base_branch, "main");
        assert_eq!(config.compare.branch_scope, BranchScope::All);
        assert_eq!(config.compare.alignment, "positional");
        assert_eq!(config.output.dest_dir, PathBuf::from("output"));
        assert_eq!(config.logging.log_level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_base_branch() {
        let mut config = AppConfig::default();
        config.compare.base_branch = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "compare.base_branch"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_alignment() {
        let mut config = AppConfig::default();
        config.compare.alignment = "patience".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "compare.alignment"
        ));
    }

    #[test]
    fn test_validate_rejects_dest_equal_to_repo() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.repository.path = dir.path().to_path_buf();
        config.output.dest_dir = dir.path().join(".");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "output.dest_dir"
        ));
    }

    #[test]
    fn test_validate_rejects_dest_containing_repo() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.repository.path = dir.path().join("repo");
        std::fs::create_dir_all(&config.repository.path).unwrap();
        config.output.dest_dir = dir.path().to_path_buf();
        assert!(config.validate().is_err());

        config.output.dest_dir = dir.path().join("out");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.logging.log_level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.log_level"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_GITMERGE_TOKEN", "tok_abc");

        let mut config: AppConfig = toml::from_str(
            r#"
[repository]
token_env = "TEST_GITMERGE_TOKEN"
"#,
        )
        .unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.repository.token.as_deref(), Some("tok_abc"));

        std::env::remove_var("TEST_GITMERGE_TOKEN");
    }

    #[test]
    fn test_missing_env_var_is_not_fatal() {
        let mut config = AppConfig::default();
        config.repository.token_env = Some("TEST_GITMERGE_UNSET_TOKEN".into());
        config.resolve_env_vars().unwrap();
        assert!(config.repository.token.is_none());
    }

    #[test]
    fn test_to_toml_round_trips_defaults() {
        let rendered = AppConfig::default().to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.compare.base_branch, "main");
        assert_eq!(parsed.output.dest_dir, PathBuf::from("output"));
    }
}
