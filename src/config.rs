use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::notifications::senders::dingtalk::DEFAULT_ROBOT_URL;
use crate::service_monitor::models::{
    HttpTarget, MysqlTarget, ProtocolKind, RedisTarget, TargetSpec, TcpTarget, from_value_or,
    lenient, lenient_bool, lenient_list, lenient_string,
};

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 1;

pub const TOKEN_ENV: &str = "DD_ROBOT_TOKEN";
pub const ROBOT_URL_ENV: &str = "DD_ROBOT_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse YAML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("No usable config file found, tried {tried:?}")]
    NotFound { tried: Vec<PathBuf> },
}

/// Targets grouped by protocol, each list in check order.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Instances {
    #[serde(default, deserialize_with = "lenient_list")]
    pub http: Vec<HttpTarget>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub mysql: Vec<MysqlTarget>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub redis: Vec<RedisTarget>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tcp: Vec<TcpTarget>,
}

/// Run configuration. Fields are decoded independently: a mistyped value is
/// logged and falls back to its default without discarding the rest.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: bool,

    #[serde(default, deserialize_with = "lenient")]
    pub instances: Instances,

    #[serde(default, rename = "ddRobotToken", deserialize_with = "lenient_string")]
    pub webhook_token: String,

    #[serde(
        default = "default_webhook_url",
        rename = "ddRobotUrl",
        deserialize_with = "webhook_url_or_default"
    )]
    pub webhook_url: String,

    #[serde(default = "default_timeout_secs", deserialize_with = "timeout_secs_or_default")]
    pub timeout_secs: u64,

    #[serde(default = "default_concurrency", deserialize_with = "concurrency_or_default")]
    pub concurrency: usize,
}

fn default_webhook_url() -> String {
    DEFAULT_ROBOT_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn webhook_url_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let url = lenient_string(deserializer)?;
    if url.trim().is_empty() {
        Ok(default_webhook_url())
    } else {
        Ok(url)
    }
}

fn timeout_secs_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(from_value_or(Value::deserialize(deserializer)?, DEFAULT_TIMEOUT_SECS))
}

fn concurrency_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(from_value_or(Value::deserialize(deserializer)?, DEFAULT_CONCURRENCY))
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            instances: Instances::default(),
            webhook_token: String::new(),
            webhook_url: default_webhook_url(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl MonitorConfig {
    /// Loads the configuration for a run from the working directory, then
    /// applies `.env` and environment overrides.
    pub fn load(explicit: Option<&str>, only: Option<ProtocolKind>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = Self::load_from_dir(Path::new("."), explicit.map(Path::new), only)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Resolves and parses the config file relative to `base`.
    ///
    /// An explicit path is used as-is. Otherwise the candidates from
    /// [`candidate_paths`](Self::candidate_paths) are tried in order, moving
    /// on when a file is missing or empty.
    pub fn load_from_dir(
        base: &Path,
        explicit: Option<&Path>,
        only: Option<ProtocolKind>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let path = base.join(path);
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                warn!(path = ?path, "Config file is empty; using defaults.");
                return Ok(Self::default());
            }
            return Self::parse(&path, &contents);
        }

        let tried = Self::candidate_paths(base, only);
        for path in &tried {
            let contents = match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    info!(path = ?path, "Config file not found, trying next candidate.");
                    continue;
                }
                Err(source) => {
                    return Err(ConfigError::Read {
                        path: path.clone(),
                        source,
                    });
                }
            };
            if contents.trim().is_empty() {
                warn!(path = ?path, "Config file is empty, trying next candidate.");
                continue;
            }
            return Self::parse(path, &contents);
        }

        Err(ConfigError::NotFound { tried })
    }

    /// `config.yml`, preceded by the protocol's own file when the run is
    /// restricted to one protocol.
    pub fn candidate_paths(base: &Path, only: Option<ProtocolKind>) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(kind) = only {
            paths.push(base.join(kind.dedicated_config_file()));
        }
        paths.push(base.join(DEFAULT_CONFIG_FILE));
        paths
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let config = Self::from_yaml_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = ?path,
            enabled = config.enabled,
            targets = config.target_count(),
            "Loaded config successfully."
        );
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Environment wins over the file for the robot token and url; empty
    /// values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.webhook_token = token;
        }
        if let Some(url) = lookup(ROBOT_URL_ENV).filter(|v| !v.is_empty()) {
            self.webhook_url = url;
        }
    }

    /// Per-call network timeout, never below one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn targets(&self, kind: ProtocolKind) -> Vec<TargetSpec> {
        match kind {
            ProtocolKind::Http => specs(&self.instances.http, TargetSpec::Http),
            ProtocolKind::Mysql => specs(&self.instances.mysql, TargetSpec::Mysql),
            ProtocolKind::Redis => specs(&self.instances.redis, TargetSpec::Redis),
            ProtocolKind::Tcp => specs(&self.instances.tcp, TargetSpec::Tcp),
        }
    }

    pub fn target_count(&self) -> usize {
        self.instances.http.len()
            + self.instances.mysql.len()
            + self.instances.redis.len()
            + self.instances.tcp.len()
    }
}

fn specs<T: Clone>(targets: &[T], wrap: fn(T) -> TargetSpec) -> Vec<TargetSpec> {
    targets.iter().cloned().map(wrap).collect()
}
