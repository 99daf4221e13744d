//! Periodic database liveness probing
//!
//! The prober wakes every [`PROBE_INTERVAL`] and asks a [`DatabaseProbe`]
//! whether the configured database answers. With no database configured
//! it still ticks and counts a `skip`, so `database_ping_total` keeps
//! moving either way.
//!
//! ```text
//! Disabled ──tick──▶ record skip
//! Idle ──tick──▶ Probing ──▶ record success | fail ──▶ Idle
//! any ──shutdown──▶ exit loop, release barrier slot
//! ```

pub mod postgres;
mod prober;

pub use postgres::{connect_options, PostgresProbe};
pub use prober::{Prober, PROBE_INTERVAL, PROBE_TIMEOUT};

use crate::server::PingStatus;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid database port {0:?}")]
    InvalidPort(String),

    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database ping failed: {0}")]
    Ping(#[source] sqlx::Error),

    #[error("database did not answer within {0:?}")]
    Timeout(Duration),

    #[error("database cannot SELECT 1: {0}")]
    Query(#[source] sqlx::Error),

    #[error("closing database connection failed: {0}")]
    Close(#[source] sqlx::Error),
}

/// Result of one probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Connection parameters unusable, liveness check failed or timed out
    Unreachable,
    /// Liveness check answered in time
    Alive,
}

impl ProbeOutcome {
    /// Counter label for this outcome
    pub fn ping_status(&self) -> PingStatus {
        match self {
            ProbeOutcome::Unreachable => PingStatus::Fail,
            ProbeOutcome::Alive => PingStatus::Success,
        }
    }
}

/// One liveness check against an external store
///
/// Implementations log their own failures; the prober only counts.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;
}

#[cfg(test)]
#[path = "prober_test.rs"]
mod prober_tests;

#[cfg(test)]
#[path = "postgres_test.rs"]
mod postgres_tests;
