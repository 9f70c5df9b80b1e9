use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    enquiries_created_total: AtomicU64,
    drafts_generated_total: AtomicU64,
    generation_failures_total: AtomicU64,
    discovery_fallback_total: AtomicU64,
    quotes_rendered_total: AtomicU64,
    generation_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub enquiries_created_total: u64,
    pub drafts_generated_total: u64,
    pub generation_failures_total: u64,
    pub discovery_fallback_total: u64,
    pub quotes_rendered_total: u64,
    pub avg_generation_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_enquiry_created(&self) {
        self.enquiries_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_draft_generated(&self) {
        self.drafts_generated_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_generation_failure(&self) {
        self.generation_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_discovery_fallback(&self) {
        self.discovery_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_quote_rendered(&self) {
        self.quotes_rendered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_generation_latency(&self, duration: Duration) {
        self.generation_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let drafts = self.drafts_generated_total.load(Ordering::Relaxed);
        let latency = self.generation_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            enquiries_created_total: self.enquiries_created_total.load(Ordering::Relaxed),
            drafts_generated_total: drafts,
            generation_failures_total: self.generation_failures_total.load(Ordering::Relaxed),
            discovery_fallback_total: self.discovery_fallback_total.load(Ordering::Relaxed),
            quotes_rendered_total: self.quotes_rendered_total.load(Ordering::Relaxed),
            avg_generation_millis: if drafts == 0 {
                0.0
            } else {
                latency as f64 / drafts as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,meridian_api=info,meridian_agents=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
