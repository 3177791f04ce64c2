//! Prometheus metrics registry for handshake outcomes.

use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

/// Outcome of the inbound (Discourse to local) leg.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum InboundOutcome {
    Accepted,
    Rejected,
}

/// Outcome of the completion (local to Discourse) leg.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum CompletionOutcome {
    Redirected,
    Rejected,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct InboundLabels {
    pub outcome: InboundOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CompletionLabels {
    pub outcome: CompletionOutcome,
}

/// Metrics registry holding all SSO service metrics.
pub struct MetricsRegistry {
    /// The prometheus-client registry for encoding.
    pub registry: Registry,

    pub inbound_total: Family<InboundLabels, Counter>,
    pub completions_total: Family<CompletionLabels, Counter>,
    pub nonces_expired_total: Counter,
    pub pending_nonces: Gauge,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let inbound_total = Family::<InboundLabels, Counter>::default();
        registry.register(
            "discourse_sso_inbound",
            "Inbound SSO requests from Discourse by outcome",
            inbound_total.clone(),
        );

        let completions_total = Family::<CompletionLabels, Counter>::default();
        registry.register(
            "discourse_sso_completions",
            "Local login completions by outcome",
            completions_total.clone(),
        );

        let nonces_expired_total = Counter::default();
        registry.register(
            "discourse_sso_nonces_expired",
            "Nonce entries evicted after their TTL elapsed",
            nonces_expired_total.clone(),
        );

        let pending_nonces = Gauge::default();
        registry.register(
            "discourse_sso_pending_nonces",
            "Nonce entries held at the last sweep",
            pending_nonces.clone(),
        );

        Self {
            registry,
            inbound_total,
            completions_total,
            nonces_expired_total,
            pending_nonces,
        }
    }

    pub fn record_inbound(&self, outcome: InboundOutcome) {
        self.inbound_total
            .get_or_create(&InboundLabels { outcome })
            .inc();
    }

    pub fn record_completion(&self, outcome: CompletionOutcome) {
        self.completions_total
            .get_or_create(&CompletionLabels { outcome })
            .inc();
    }

    /// Record the result of a nonce sweep.
    pub fn record_sweep(&self, expired: usize, pending: usize) {
        self.nonces_expired_total.inc_by(expired as u64);
        self.pending_nonces
            .set(i64::try_from(pending).unwrap_or(i64::MAX));
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
