//! Postgres liveness probe built on sqlx
//!
//! Each probe opens a fresh connection, so a database that comes back
//! after an outage is picked up on the next tick without pool state.

use super::{DatabaseProbe, ProbeError, ProbeOutcome};
use crate::config::{DatabaseConfig, SslMode};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use std::time::Duration;
use tracing::{error, info};

/// Build sqlx connect options from resolved settings
///
/// Only fails when the configured port is not a valid port number.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, ProbeError> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .ssl_mode(pg_ssl_mode(config.ssl_mode));

    if let Some(port) = &config.port {
        let port: u16 = port
            .parse()
            .map_err(|_| ProbeError::InvalidPort(port.clone()))?;
        options = options.port(port);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(cert) = &config.ssl_cert {
        options = options.ssl_client_cert(cert);
    }
    if let Some(key) = &config.ssl_key {
        options = options.ssl_client_key(key);
    }
    if let Some(root_cert) = &config.ssl_root_cert {
        options = options.ssl_root_cert(root_cert);
    }

    Ok(options)
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Probe that connects to Postgres, pings, and runs `SELECT 1`
pub struct PostgresProbe {
    config: DatabaseConfig,
    timeout: Duration,
}

impl PostgresProbe {
    /// `timeout` bounds connect plus ping together
    pub fn new(config: DatabaseConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    async fn check_liveness(&self, options: &PgConnectOptions) -> Result<PgConnection, ProbeError> {
        let attempt = async {
            let mut conn = PgConnection::connect_with(options)
                .await
                .map_err(ProbeError::Connect)?;
            conn.ping().await.map_err(ProbeError::Ping)?;
            Ok::<_, ProbeError>(conn)
        };

        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl DatabaseProbe for PostgresProbe {
    async fn probe(&self) -> ProbeOutcome {
        let options = match connect_options(&self.config) {
            Ok(options) => options,
            Err(e) => {
                // Counted like a failed ping: the database is not reachable
                // with these settings
                error!(error = %e, "ping database");
                return ProbeOutcome::Unreachable;
            }
        };

        let mut conn = match self.check_liveness(&options).await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, host = %self.config.host, "ping database");
                return ProbeOutcome::Unreachable;
            }
        };
        info!(host = %self.config.host, "connected to database");

        // Validates query execution, not just transport; not counted
        if let Err(e) = sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(ProbeError::Query)
        {
            error!(error = %e, "database query validation");
        }

        if let Err(e) = conn.close().await.map_err(ProbeError::Close) {
            error!(error = %e, "closing database connection");
        }

        ProbeOutcome::Alive
    }
}
