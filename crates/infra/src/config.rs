//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | `5` |
//! | `ROUTING_EDGE_TABLE` | `nav_edges_final` |
//! | `ROUTING_NODE_TABLE` | `nav_nodes` |
//! | `TOPOLOGY_TOLERANCE` | `0.00001` |
//! | `CORS_ALLOWED_ORIGINS` | empty (any origin) |
//!
//! `CORS_ALLOWED_ORIGINS` is a comma-separated list of `scheme://host[:port]`
//! origins.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::schema::Ident;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

// Keep credentials out of logs.
impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

/// Tables and tolerances used by the route planner.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub edge_table: String,
    pub node_table: String,
    /// Snapping tolerance handed to `pgr_createTopology`.
    pub topology_tolerance: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            edge_table: "nav_edges_final".to_string(),
            node_table: "nav_nodes".to_string(),
            topology_tolerance: 0.00001,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub bind_addr: SocketAddr,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub routing: RoutingConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database = DatabaseConfig {
            url,
            max_connections: parsed(&get, "DB_MAX_CONNECTIONS")?
                .unwrap_or_else(default_max_connections),
            acquire_timeout: parsed::<u64>(&get, "DB_ACQUIRE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or_else(default_acquire_timeout),
        };
        if database.max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "0", "must be at least 1"));
        }
        if database.acquire_timeout.is_zero() {
            return Err(invalid("DB_ACQUIRE_TIMEOUT_SECS", "0", "must be at least 1"));
        }

        let defaults = RoutingConfig::default();
        let routing = RoutingConfig {
            edge_table: table_name(&get, "ROUTING_EDGE_TABLE")?.unwrap_or(defaults.edge_table),
            node_table: table_name(&get, "ROUTING_NODE_TABLE")?.unwrap_or(defaults.node_table),
            topology_tolerance: parsed(&get, "TOPOLOGY_TOLERANCE")?
                .unwrap_or(defaults.topology_tolerance),
        };
        if !(routing.topology_tolerance.is_finite() && routing.topology_tolerance >= 0.0) {
            return Err(invalid(
                "TOPOLOGY_TOLERANCE",
                &routing.topology_tolerance.to_string(),
                "must be a non-negative number",
            ));
        }

        let http = HttpConfig {
            bind_addr: parsed(&get, "BIND_ADDR")?.unwrap_or_else(default_bind_addr),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|v| cors_origins(&v))
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(Self {
            database,
            routing,
            http,
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parsed<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    get(var)
        .map(|raw| raw.parse::<T>().map_err(|e| invalid(var, &raw, e.to_string())))
        .transpose()
}

fn table_name(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<String>, ConfigError> {
    get(var)
        .map(|raw| {
            Ident::new(raw.as_str())
                .map(|ident| ident.to_string())
                .map_err(|e| invalid(var, &raw, e.to_string()))
        })
        .transpose()
}

fn cors_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            check_origin(o)
                .map(|()| o.to_string())
                .map_err(|reason| invalid("CORS_ALLOWED_ORIGINS", o, reason))
        })
        .collect()
}

/// `scheme://host[:port]`, visible ASCII, no path.
fn check_origin(origin: &str) -> Result<(), &'static str> {
    if !origin.bytes().all(|b| b.is_ascii_graphic()) {
        return Err("origins must be visible ASCII without spaces");
    }
    let Some((scheme, authority)) = origin.split_once("://") else {
        return Err("expected scheme://host[:port]");
    };
    let scheme_ok = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err("invalid scheme");
    }
    if authority.is_empty() || authority.contains(['/', '?', '#', '@']) {
        return Err("expected scheme://host[:port] without path or credentials");
    }
    Ok(())
}
