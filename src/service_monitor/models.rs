use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fmt;
use tracing::warn;

use super::error::CheckError;

/// Protocol categories, in the order a run checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ProtocolKind {
    Http,
    Mysql,
    Redis,
    Tcp,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 4] = [
        ProtocolKind::Http,
        ProtocolKind::Mysql,
        ProtocolKind::Redis,
        ProtocolKind::Tcp,
    ];

    /// Label used in alert titles.
    pub fn label(&self) -> &'static str {
        match self {
            ProtocolKind::Http => "HTTP",
            ProtocolKind::Mysql => "MySQL",
            ProtocolKind::Redis => "Redis",
            ProtocolKind::Tcp => "TCP",
        }
    }

    /// Per-protocol config file tried before `config.yml` when a run is
    /// restricted to this category.
    pub fn dedicated_config_file(&self) -> &'static str {
        match self {
            ProtocolKind::Http => "httpcheck-config.yml",
            ProtocolKind::Mysql => "mysql-config.yml",
            ProtocolKind::Redis => "redis-config.yml",
            ProtocolKind::Tcp => "tcpcheck-config.yml",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::Http => "http",
            ProtocolKind::Mysql => "mysql",
            ProtocolKind::Redis => "redis",
            ProtocolKind::Tcp => "tcp",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HttpTarget {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    // Basic-auth credentials are accepted for schema compatibility but are
    // not sent with the probe request.
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content_match: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status_code: Option<u16>,
}

impl HttpTarget {
    pub const DEFAULT_STATUS: u16 = 200;

    /// Status the response must carry; unset or zero means 200.
    pub fn expected_status(&self) -> u16 {
        match self.status_code {
            None | Some(0) => Self::DEFAULT_STATUS,
            Some(code) => code,
        }
    }

    pub fn content_pattern(&self) -> Option<&str> {
        if self.content_match.is_empty() {
            None
        } else {
            Some(&self.content_match)
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MysqlTarget {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: String,
    #[serde(default, rename = "pass", deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub port: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RedisTarget {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(default, rename = "pass", deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub port: String,
}

impl RedisTarget {
    pub fn auth_password(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(&self.password)
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TcpTarget {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub port: String,
}

/// One monitored endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    Http(HttpTarget),
    Mysql(MysqlTarget),
    Redis(RedisTarget),
    Tcp(TcpTarget),
}

impl TargetSpec {
    pub fn kind(&self) -> ProtocolKind {
        match self {
            TargetSpec::Http(_) => ProtocolKind::Http,
            TargetSpec::Mysql(_) => ProtocolKind::Mysql,
            TargetSpec::Redis(_) => ProtocolKind::Redis,
            TargetSpec::Tcp(_) => ProtocolKind::Tcp,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TargetSpec::Http(t) => &t.name,
            TargetSpec::Mysql(t) => &t.name,
            TargetSpec::Redis(t) => &t.name,
            TargetSpec::Tcp(t) => &t.name,
        }
    }

    /// The url for HTTP targets, `host:port` as configured otherwise.
    pub fn address(&self) -> String {
        match self {
            TargetSpec::Http(t) => t.url.clone(),
            TargetSpec::Mysql(t) => format!("{}:{}", t.host, t.port),
            TargetSpec::Redis(t) => format!("{}:{}", t.host, t.port),
            TargetSpec::Tcp(t) => format!("{}:{}", t.host, t.port),
        }
    }

    /// Alert title, e.g. `TCP -> gateway【10.0.0.1:22】`.
    pub fn title(&self) -> String {
        format!("{} -> {}【{}】", self.kind().label(), self.name(), self.address())
    }

    /// Checks the per-variant invariants: non-empty name, non-empty url/host,
    /// and a port that parses.
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.name().trim().is_empty() {
            return Err(CheckError::InvalidTarget("target name is empty".to_string()));
        }
        match self {
            TargetSpec::Http(t) => {
                if t.url.trim().is_empty() {
                    return Err(CheckError::InvalidTarget("url is empty".to_string()));
                }
                Ok(())
            }
            TargetSpec::Mysql(MysqlTarget { host, port, .. })
            | TargetSpec::Redis(RedisTarget { host, port, .. })
            | TargetSpec::Tcp(TcpTarget { host, port, .. }) => {
                if host.trim().is_empty() {
                    return Err(CheckError::InvalidTarget("host is empty".to_string()));
                }
                parse_port(port).map(|_| ())
            }
        }
    }
}

pub fn parse_port(raw: &str) -> Result<u16, CheckError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(CheckError::InvalidTarget(format!("invalid port '{raw}'"))),
        Ok(port) => Ok(port),
    }
}

// Config decoding is per field: a value of the wrong type is logged and
// replaced by the field's zero value, and the rest of the file still loads.

/// Decodes `value` as `T`, falling back to `fallback` when it is null or of
/// the wrong type.
pub(crate) fn from_value_or<T: DeserializeOwned>(value: Value, fallback: T) -> T {
    if value.is_null() {
        return fallback;
    }
    match serde_yaml::from_value(value.clone()) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(value = ?value, error = %e, "Ignoring config value of the wrong type.");
            fallback
        }
    }
}

pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(from_value_or(Value::deserialize(deserializer)?, T::default()))
}

/// Any scalar is taken as its text, so `port: 6379` and `port: "6379"` read
/// the same. `null` and non-scalars become an empty string.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        other => {
            warn!(value = ?other, "Expected a scalar config value; using an empty string.");
            String::new()
        }
    }
}

/// YAML 1.1 booleans (`yes`, `on`, ...) are still common in hand-written
/// files.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "on" => Some(true),
            "n" | "no" | "false" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        warn!(value = ?value, "Expected a boolean config value; using false.");
        false
    }))
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(value = ?value, "Ignoring status_code that is not a status number; expecting 200.");
    }
    Ok(parsed)
}

/// A list whose entries are decoded one by one. An entry that cannot be
/// decoded at all is kept as an empty target, so it fails validation and
/// shows up in the alert instead of vanishing.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(entries) => Ok(entries
            .into_iter()
            .map(|entry| from_value_or(entry, T::default()))
            .collect()),
        other => {
            warn!(value = ?other, "Expected a list of targets; ignoring it.");
            Ok(Vec::new())
        }
    }
}
