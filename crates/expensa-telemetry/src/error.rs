//! Telemetry failures.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Point in a collector's lifecycle where it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Constructing the collector from its options.
    Build,
    /// Adding the collector to the registry.
    Register,
}

/// Errors raised while setting up logging or metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed, or installing failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A configured log format name was not recognised.
    UnknownLogFormat {
        /// The rejected value.
        value: String,
    },
    /// A gate collector could not be built or registered.
    Collector {
        /// Metric name.
        name: &'static str,
        /// Where it failed.
        stage: CollectorStage,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The registry could not be rendered in the text exposition format.
    Render {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The rendered exposition was not valid UTF-8.
    RenderUtf8 {
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => formatter.write_str("tracing subscriber not installed"),
            Self::UnknownLogFormat { .. } => formatter.write_str("unknown log format"),
            Self::Collector {
                stage: CollectorStage::Build,
                ..
            } => formatter.write_str("gate metric could not be built"),
            Self::Collector {
                stage: CollectorStage::Register,
                ..
            } => formatter.write_str("gate metric could not be registered"),
            Self::Render { .. } | Self::RenderUtf8 { .. } => {
                formatter.write_str("gate metrics could not be rendered")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::Collector { source, .. } | Self::Render { source } => Some(source),
            Self::RenderUtf8 { source } => Some(source),
            Self::UnknownLogFormat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prometheus_error() -> PrometheusError {
        PrometheusError::Msg("duplicate".to_string())
    }

    #[test]
    fn collector_stage_selects_message() {
        let build = TelemetryError::Collector {
            name: "auth_cycles_total",
            stage: CollectorStage::Build,
            source: prometheus_error(),
        };
        let register = TelemetryError::Collector {
            name: "auth_cycles_total",
            stage: CollectorStage::Register,
            source: prometheus_error(),
        };
        assert_eq!(build.to_string(), "gate metric could not be built");
        assert_eq!(register.to_string(), "gate metric could not be registered");
        assert!(register.source().is_some());
    }

    #[test]
    fn unknown_log_format_has_no_source() {
        let err = TelemetryError::UnknownLogFormat {
            value: "xml".into(),
        };
        assert_eq!(err.to_string(), "unknown log format");
        assert!(err.source().is_none());
    }

    #[test]
    fn render_failures_share_a_message() {
        let encode = TelemetryError::Render {
            source: prometheus_error(),
        };
        let utf8 = String::from_utf8(vec![0, 159]).map_err(|source| TelemetryError::RenderUtf8 { source });
        assert_eq!(encode.to_string(), "gate metrics could not be rendered");
        assert!(matches!(utf8, Err(ref err) if err.to_string() == encode.to_string()));
    }
}
