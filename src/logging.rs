//! Log output setup
//!
//! Inside a Kubernetes pod (`KUBERNETES_SERVICE_HOST` set) logs are JSON
//! lines for the cluster log collector; anywhere else they are colored
//! human-readable lines. `RUST_LOG` filters both, defaulting to `info`.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Variable whose presence marks a Kubernetes pod
const KUBERNETES_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened to the top level
    Json,
    /// Colored single-line text
    Text,
}

impl LogFormat {
    /// Pick the format from an environment lookup
    pub fn detect<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(KUBERNETES_HOST_ENV).is_some() {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Install the global subscriber
///
/// Fails when a subscriber is already installed.
pub fn init_logging() -> Result<LogFormat, TryInitError> {
    let format = LogFormat::detect(|name| std::env::var(name).ok());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().flatten_event(true).with_filter(filter))
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_filter(filter))
            .try_init()?,
    }

    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_json_inside_kubernetes() {
        let format = LogFormat::detect(|name| {
            (name == "KUBERNETES_SERVICE_HOST").then(|| "10.96.0.1".to_string())
        });
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_detect_json_even_when_empty() {
        let format = LogFormat::detect(|_| Some(String::new()));
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_detect_text_outside_kubernetes() {
        assert_eq!(LogFormat::detect(|_| None), LogFormat::Text);
    }
}
