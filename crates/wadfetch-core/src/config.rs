//! Server-manager configuration (`/etc/odasrvmgr/odasrvmgr.toml`).
//!
//! The file is shared with the service manager; wadfetch only needs
//! `settings.waddownloaddir` plus its own optional `[wadfetch]` tunables, but
//! `validate` checks the whole document so `wadfetch check-config` can be used
//! before reloading servers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the shared configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/odasrvmgr/odasrvmgr.toml";

/// Environment variable that overrides the configuration path.
pub const CONFIG_ENV: &str = "WADFETCH_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `[settings]` table. Every key is optional here so `validate` can name the
/// missing ones instead of failing the whole parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub odasrvpath: Option<String>,
    pub configdir: Option<String>,
    pub wadpaths: Option<Vec<String>>,
    /// Kept as a raw value: the directory resolver reports "not a string"
    /// separately from "absent".
    pub waddownloaddir: Option<toml::Value>,
}

/// One `[servers.<name>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub config: String,
    pub port: i64,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Transfer tunables (optional `[wadfetch]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Connect timeout per mirror attempt.
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/sec...
    pub low_speed_limit_bytes: u32,
    /// ...for this many seconds.
    pub low_speed_time_secs: u64,
    /// Minimum interval between progress updates.
    pub progress_interval_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            progress_interval_ms: 250,
        }
    }
}

impl FetchSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OdasrvConfig {
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub servers: Option<BTreeMap<String, ServerConfig>>,
    #[serde(default)]
    pub branches: BTreeMap<String, String>,
    #[serde(default)]
    pub wadfetch: FetchSettings,
}

impl OdasrvConfig {
    /// Raw `settings.waddownloaddir` value, if any.
    pub fn download_dir_value(&self) -> Option<&toml::Value> {
        self.settings.as_ref()?.waddownloaddir.as_ref()
    }
}

/// Load configuration from `path`.
pub fn load(path: &Path) -> Result<OdasrvConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = parse(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(cfg)
}

/// Parse configuration text.
pub fn parse(data: &str) -> Result<OdasrvConfig, toml::de::Error> {
    toml::from_str(data)
}

/// A single problem found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("missing [settings] table")]
    MissingSettings,
    #[error("missing [servers] table")]
    MissingServers,
    #[error("settings.{0} is required")]
    MissingSetting(&'static str),
    #[error("settings.waddownloaddir must be a string")]
    DownloadDirNotString,
    #[error("invalid server instance name '{0}' (allowed: A-Z a-z 0-9 _ -)")]
    BadInstanceName(String),
    #[error("invalid branch name '{0}' (allowed: A-Z a-z 0-9 _ -)")]
    BadBranchName(String),
    #[error("server '{name}' has port {port}, expected 1-65535")]
    PortOutOfRange { name: String, port: i64 },
    #[error("duplicate port {port} used by servers {names:?}")]
    DuplicatePort { port: i64, names: Vec<String> },
    #[error("server '{name}' references undefined branch '{branch}'")]
    UnknownBranch { name: String, branch: String },
}

fn is_valid_instance_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check the document against the server-manager schema. Returns every issue
/// found; an empty vector means the configuration is valid.
pub fn validate(cfg: &OdasrvConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    match &cfg.settings {
        None => issues.push(ConfigIssue::MissingSettings),
        Some(s) => {
            if s.odasrvpath.is_none() {
                issues.push(ConfigIssue::MissingSetting("odasrvpath"));
            }
            if s.configdir.is_none() {
                issues.push(ConfigIssue::MissingSetting("configdir"));
            }
            if s.wadpaths.is_none() {
                issues.push(ConfigIssue::MissingSetting("wadpaths"));
            }
            match &s.waddownloaddir {
                None => issues.push(ConfigIssue::MissingSetting("waddownloaddir")),
                Some(v) if !v.is_str() => issues.push(ConfigIssue::DownloadDirNotString),
                Some(_) => {}
            }
        }
    }

    for name in cfg.branches.keys() {
        if !is_valid_instance_name(name) {
            issues.push(ConfigIssue::BadBranchName(name.clone()));
        }
    }

    let Some(servers) = &cfg.servers else {
        issues.push(ConfigIssue::MissingServers);
        return issues;
    };

    let mut by_port: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (name, server) in servers {
        if !is_valid_instance_name(name) {
            issues.push(ConfigIssue::BadInstanceName(name.clone()));
        }
        if !(1..=65535).contains(&server.port) {
            issues.push(ConfigIssue::PortOutOfRange {
                name: name.clone(),
                port: server.port,
            });
        }
        if let Some(branch) = &server.branch {
            if !cfg.branches.contains_key(branch) {
                issues.push(ConfigIssue::UnknownBranch {
                    name: name.clone(),
                    branch: branch.clone(),
                });
            }
        }
        by_port.entry(server.port).or_default().push(name.clone());
    }
    for (port, names) in by_port {
        if names.len() > 1 {
            issues.push(ConfigIssue::DuplicatePort { port, names });
        }
    }

    issues
}
