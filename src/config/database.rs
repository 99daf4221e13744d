//! Database connection parameters for the liveness prober

use std::fmt;
use std::str::FromStr;

/// Postgres `sslmode` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    #[default]
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// Whether this mode may negotiate TLS (and therefore uses cert settings)
    pub fn enables_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for any value outside the six libpq mode names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sslmode: {0:?}")]
pub struct UnknownSslMode(pub String);

impl FromStr for SslMode {
    type Err = UnknownSslMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(UnknownSslMode(other.to_string())),
        }
    }
}

/// Resolved database settings
///
/// Only built when a non-empty host is configured. Every other field is
/// optional and left to the driver's defaults when absent. The cert paths
/// are only ever set when `ssl_mode` enables TLS.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: SslMode,
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
    pub ssl_root_cert: Option<String>,
}

impl DatabaseConfig {
    /// Names of the connection parameters in use, for logging
    ///
    /// Values are deliberately left out; the password must never reach logs.
    pub fn param_names(&self) -> Vec<&'static str> {
        let mut names = vec!["host"];
        let optional = [
            ("port", self.port.is_some()),
            ("dbname", self.database.is_some()),
            ("user", self.user.is_some()),
            ("password", self.password.is_some()),
            ("sslmode", true),
            ("sslcert", self.ssl_cert.is_some()),
            ("sslkey", self.ssl_key.is_some()),
            ("sslrootcert", self.ssl_root_cert.is_some()),
        ];
        names.extend(
            optional
                .into_iter()
                .filter(|(_, present)| *present)
                .map(|(name, _)| name),
        );
        names
    }
}

// Manual impl keeps the password out of debug output
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_mode", &self.ssl_mode)
            .field("ssl_cert", &self.ssl_cert)
            .field("ssl_key", &self.ssl_key)
            .field("ssl_root_cert", &self.ssl_root_cert)
            .finish()
    }
}
