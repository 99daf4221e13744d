//! Sidecar configuration resolved from environment variables
//!
//! Resolution never fails: a missing or empty variable simply turns the
//! dependent feature off. Each lookup is logged (missing / empty /
//! present) so operators can see what the pod actually received, but
//! values themselves are never logged.
//!
//! | Variable | Effect |
//! |---|---|
//! | `LISTEN_ADDR` | Comma-separated listen addresses (default `:80,:8080`) |
//! | `METRICS_PATH` | Metrics route (default `/metrics`, empty disables) |
//! | `PRE_STOP_ADDR` | Address of the pre-stop listener (absent disables) |
//! | `DB_ADDR` | Database host; enables the prober when non-empty |
//! | `DB_PORT`, `DB_DATABASE`, `DB_USER`, `DB_PASSWORD` | Connection parameters |
//! | `DB_SSL_MODE` | `allow`, `prefer`, `require`, `verify-ca`, `verify-full`; anything else disables TLS |
//! | `DB_SSL_CERT`, `DB_SSL_KEY`, `DB_SSL_ROOT_CERT` | Only read when TLS is enabled |

mod database;

pub use database::{DatabaseConfig, SslMode, UnknownSslMode};

use tracing::{info, warn};

/// Listen addresses used when `LISTEN_ADDR` is not set
pub const DEFAULT_LISTEN_ADDRS: [&str; 2] = [":80", ":8080"];

/// Metrics route used when `METRICS_PATH` is not set
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Route served by the pre-stop listener
pub const PRE_STOP_PATH: &str = "/k8s/preStop";

/// Immutable configuration for one sidecar process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarConfig {
    /// Normalized bind addresses, one listener each
    pub listen_addrs: Vec<String>,
    /// Metrics route, `None` when disabled
    pub metrics_path: Option<String>,
    /// Database settings, `None` when no host is configured
    pub database: Option<DatabaseConfig>,
    /// Normalized bind address of the pre-stop listener
    pub pre_stop_addr: Option<String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            listen_addrs: DEFAULT_LISTEN_ADDRS
                .iter()
                .map(|addr| normalize_listen_addr(addr))
                .collect(),
            metrics_path: Some(DEFAULT_METRICS_PATH.to_string()),
            database: None,
            pre_stop_addr: None,
        }
    }
}

impl SidecarConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary key lookup
    ///
    /// `lookup` returns `None` for a missing key and `Some("")` for a key
    /// that is set but empty; the two are logged differently.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = resolve_database(&lookup);
        let listen_addrs = resolve_listen_addrs(&lookup);
        let metrics_path = resolve_metrics_path(&lookup);
        let pre_stop_addr = lookup_logged(&lookup, "PRE_STOP_ADDR")
            .filter(|addr| !addr.is_empty())
            .map(|addr| normalize_listen_addr(&addr));

        Self {
            listen_addrs,
            metrics_path,
            database,
            pre_stop_addr,
        }
    }
}

/// Look up one key and log whether it is missing, empty or set
fn lookup_logged<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name);
    match value.as_deref() {
        None => warn!(env = name, "ENV missing"),
        Some("") => warn!(env = name, "ENV present, but value is empty"),
        Some(_) => info!(env = name, "ENV present and value is NOT empty"),
    }
    value
}

/// Like [`lookup_logged`] but folds empty values into `None`
fn lookup_non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_logged(lookup, name).filter(|value| !value.is_empty())
}

fn resolve_database<F>(lookup: &F) -> Option<DatabaseConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(host) = lookup_non_empty(lookup, "DB_ADDR") else {
        info!("no database host, won't try connect");
        return None;
    };
    info!("will try connect to database");

    let mut config = DatabaseConfig {
        host,
        port: lookup_non_empty(lookup, "DB_PORT"),
        database: lookup_non_empty(lookup, "DB_DATABASE"),
        user: lookup_non_empty(lookup, "DB_USER"),
        password: lookup_non_empty(lookup, "DB_PASSWORD"),
        ..Default::default()
    };

    let ssl_mode = lookup_non_empty(lookup, "DB_SSL_MODE")
        .and_then(|mode| mode.parse::<SslMode>().ok())
        .filter(SslMode::enables_tls);
    if let Some(mode) = ssl_mode {
        config.ssl_mode = mode;
        config.ssl_cert = lookup_non_empty(lookup, "DB_SSL_CERT");
        config.ssl_key = lookup_non_empty(lookup, "DB_SSL_KEY");
        config.ssl_root_cert = lookup_non_empty(lookup, "DB_SSL_ROOT_CERT");
    } else {
        config.ssl_mode = SslMode::Disable;
    }

    info!(
        params = %config.param_names().join(","),
        "database connection string has params"
    );
    Some(config)
}

fn resolve_listen_addrs<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup_logged(lookup, "LISTEN_ADDR") {
        Some(list) => {
            let addrs: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(normalize_listen_addr)
                .collect();
            if addrs.is_empty() {
                warn!("LISTEN_ADDR has no addresses, no echo listener will start");
            }
            addrs
        }
        None => SidecarConfig::default().listen_addrs,
    }
}

fn resolve_metrics_path<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup_logged(lookup, "METRICS_PATH") {
        None => Some(DEFAULT_METRICS_PATH.to_string()),
        Some(path) if path.is_empty() => {
            info!("skip metrics registration");
            None
        }
        Some(path) => Some(normalize_metrics_path(&path)),
    }
}

/// Turn a user supplied metrics path into a literal route
///
/// A leading `/` is added when missing. Route pattern syntax (`{`, `}`,
/// `*`, or a segment starting with `:`) and the pre-stop route cannot be
/// served literally, so those fall back to the default path.
pub fn normalize_metrics_path(path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let pattern_like =
        path.contains(['{', '}', '*']) || path.split('/').any(|segment| segment.starts_with(':'));
    if pattern_like || path == PRE_STOP_PATH {
        warn!(
            path = %path,
            fallback = DEFAULT_METRICS_PATH,
            "metrics path cannot be used as a literal route"
        );
        return DEFAULT_METRICS_PATH.to_string();
    }
    path
}

/// Expand the `:port` shorthand into an all-interfaces bind address
///
/// Anything else (`127.0.0.1:8080`, `localhost:9000`, `[::]:80`) is kept
/// as given and resolved at bind time.
pub fn normalize_listen_addr(addr: &str) -> String {
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => addr.to_string(),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
