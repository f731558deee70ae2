//! Prometheus-backed metrics for the authentication gate.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters/gauges the gate and coordinator update.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{CollectorStage, Result, TelemetryError};

/// Prometheus-backed metrics registry shared by gate handles.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    auth_cycles_total: IntCounterVec,
    auth_cycle_joins_total: IntCounter,
    auth_cycle_latency_ms: IntGauge,
    gate_held_requests: IntGauge,
    gate_released_requests_total: IntCounterVec,
    sign_in_redirects_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Requests currently held behind an in-flight cycle.
    pub held_requests: i64,
    /// Duration (ms) of the most recent cycle.
    pub last_cycle_latency_ms: i64,
    /// Callers that joined an already in-flight cycle.
    pub cycle_joins_total: u64,
    /// Sign-in redirects issued.
    pub sign_in_redirects_total: u64,
}

impl Metrics {
    /// Construct a new registry with the gate collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let auth_cycles_total = IntCounterVec::new(
            Opts::new("auth_cycles_total", "Re-authentication cycles by outcome"),
            &["outcome"],
        )
        .map_err(|source| collector("auth_cycles_total", source))?;
        let auth_cycle_joins_total = IntCounter::with_opts(Opts::new(
            "auth_cycle_joins_total",
            "Callers that awaited an in-flight cycle instead of starting one",
        ))
        .map_err(|source| collector("auth_cycle_joins_total", source))?;
        let auth_cycle_latency_ms = IntGauge::with_opts(Opts::new(
            "auth_cycle_latency_ms",
            "Duration of the most recent re-authentication cycle (ms)",
        ))
        .map_err(|source| collector("auth_cycle_latency_ms", source))?;
        let gate_held_requests = IntGauge::with_opts(Opts::new(
            "gate_held_requests",
            "Requests held while a cycle is in flight",
        ))
        .map_err(|source| collector("gate_held_requests", source))?;
        let gate_released_requests_total = IntCounterVec::new(
            Opts::new(
                "gate_released_requests_total",
                "Held requests released by disposition",
            ),
            &["disposition"],
        )
        .map_err(|source| collector("gate_released_requests_total", source))?;
        let sign_in_redirects_total = IntCounter::with_opts(Opts::new(
            "sign_in_redirects_total",
            "Redirects to sign-in after rejected credentials",
        ))
        .map_err(|source| collector("sign_in_redirects_total", source))?;

        register(&registry, "auth_cycles_total", auth_cycles_total.clone())?;
        register(
            &registry,
            "auth_cycle_joins_total",
            auth_cycle_joins_total.clone(),
        )?;
        register(
            &registry,
            "auth_cycle_latency_ms",
            auth_cycle_latency_ms.clone(),
        )?;
        register(&registry, "gate_held_requests", gate_held_requests.clone())?;
        register(
            &registry,
            "gate_released_requests_total",
            gate_released_requests_total.clone(),
        )?;
        register(
            &registry,
            "sign_in_redirects_total",
            sign_in_redirects_total.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                auth_cycles_total,
                auth_cycle_joins_total,
                auth_cycle_latency_ms,
                gate_held_requests,
                gate_released_requests_total,
                sign_in_redirects_total,
            }),
        })
    }

    /// Record a finished cycle and its duration.
    pub fn observe_cycle(&self, outcome: &str, duration: Duration) {
        self.inner
            .auth_cycles_total
            .with_label_values(&[outcome])
            .inc();
        self.inner
            .auth_cycle_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Count a caller that joined an in-flight cycle.
    pub fn inc_cycle_join(&self) {
        self.inner.auth_cycle_joins_total.inc();
    }

    /// Set the number of requests currently held.
    pub fn set_held_requests(&self, count: usize) {
        self.inner
            .gate_held_requests
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Count held requests released with the given disposition.
    pub fn inc_released(&self, disposition: &str, count: usize) {
        self.inner
            .gate_released_requests_total
            .with_label_values(&[disposition])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Count a sign-in redirect.
    pub fn inc_sign_in_redirect(&self) {
        self.inner.sign_in_redirects_total.inc();
    }

    /// Cycles recorded with the given outcome label.
    #[must_use]
    pub fn cycles(&self, outcome: &str) -> u64 {
        self.inner
            .auth_cycles_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Released requests recorded with the given disposition label.
    #[must_use]
    pub fn released(&self, disposition: &str) -> u64 {
        self.inner
            .gate_released_requests_total
            .with_label_values(&[disposition])
            .get()
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderUtf8 { source })
    }

    /// Take a point-in-time snapshot of the gate gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            held_requests: self.inner.gate_held_requests.get(),
            last_cycle_latency_ms: self.inner.auth_cycle_latency_ms.get(),
            cycle_joins_total: self.inner.auth_cycle_joins_total.get(),
            sign_in_redirects_total: self.inner.sign_in_redirects_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

const fn collector(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::Collector {
        name,
        stage: CollectorStage::Build,
        source,
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::Collector {
            name,
            stage: CollectorStage::Register,
            source,
        })
}
