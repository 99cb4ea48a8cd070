//! Simple metrics collection for observability
//!
//! This module provides lightweight metrics collection using atomic counters.
//! Recording a decision never allocates; formatting only happens when
//! `/metrics` is scraped.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tollgate::SweepReport;

/// Core metrics collected by the server
pub struct Metrics {
    /// Server start time
    start_time: Instant,

    /// Total requests that reached a limited route
    pub total_requests: AtomicU64,

    /// Requests by identity strategy
    pub remote_addr_requests: AtomicU64,
    pub body_field_requests: AtomicU64,
    pub global_requests: AtomicU64,

    /// Admission decisions
    pub requests_allowed: AtomicU64,
    pub requests_denied: AtomicU64,
    pub identity_errors: AtomicU64,

    /// Decision latency buckets (in microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_under_10ms: AtomicU64,
    pub latency_under_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,

    pub latency_sum_micros: AtomicU64,
    pub latency_count: AtomicU64,

    /// Store metrics, refreshed after every sweep
    pub active_keys: AtomicUsize,
    pub store_evictions: AtomicU64,
    pub sweeps: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            remote_addr_requests: AtomicU64::new(0),
            body_field_requests: AtomicU64::new(0),
            global_requests: AtomicU64::new(0),
            requests_allowed: AtomicU64::new(0),
            requests_denied: AtomicU64::new(0),
            identity_errors: AtomicU64::new(0),
            latency_under_1ms: AtomicU64::new(0),
            latency_under_10ms: AtomicU64::new(0),
            latency_under_100ms: AtomicU64::new(0),
            latency_over_100ms: AtomicU64::new(0),
            latency_sum_micros: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            active_keys: AtomicUsize::new(0),
            store_evictions: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
        }
    }

    /// Record an admission decision and how long it took
    pub fn record_decision(&self, identity: IdentityKind, latency_us: u64, allowed: bool) {
        self.record_identity(identity);

        if allowed {
            self.requests_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_denied.fetch_add(1, Ordering::Relaxed);
        }

        match latency_us {
            0..=999 => self.latency_under_1ms.fetch_add(1, Ordering::Relaxed),
            1000..=9999 => self.latency_under_10ms.fetch_add(1, Ordering::Relaxed),
            10000..=99999 => self.latency_under_100ms.fetch_add(1, Ordering::Relaxed),
            _ => self.latency_over_100ms.fetch_add(1, Ordering::Relaxed),
        };

        self.latency_sum_micros
            .fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request whose client key could not be derived
    pub fn record_identity_error(&self, identity: IdentityKind) {
        self.record_identity(identity);
        self.identity_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_identity(&self, identity: IdentityKind) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match identity {
            IdentityKind::RemoteAddr => self.remote_addr_requests.fetch_add(1, Ordering::Relaxed),
            IdentityKind::BodyField => self.body_field_requests.fetch_add(1, Ordering::Relaxed),
            IdentityKind::Global => self.global_requests.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record the outcome of an eviction sweep
    pub fn record_sweep(&self, report: SweepReport) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.store_evictions
            .fetch_add(report.removed as u64, Ordering::Relaxed);
        self.set_active_keys(report.remaining);
    }

    /// Record the current number of buckets in the store
    pub fn set_active_keys(&self, count: usize) {
        self.active_keys.store(count, Ordering::Relaxed);
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(1500);

        output.push_str("# HELP tollgate_uptime_seconds Time since server start in seconds\n");
        output.push_str("# TYPE tollgate_uptime_seconds gauge\n");
        output.push_str(&format!(
            "tollgate_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        output.push_str("# HELP tollgate_requests_total Total number of limited requests\n");
        output.push_str("# TYPE tollgate_requests_total counter\n");
        output.push_str(&format!(
            "tollgate_requests_total {}\n\n",
            self.total_requests.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP tollgate_requests_by_identity Total requests by identity strategy\n");
        output.push_str("# TYPE tollgate_requests_by_identity counter\n");
        output.push_str(&format!(
            "tollgate_requests_by_identity{{identity=\"remote_addr\"}} {}\n",
            self.remote_addr_requests.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "tollgate_requests_by_identity{{identity=\"body_field\"}} {}\n",
            self.body_field_requests.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "tollgate_requests_by_identity{{identity=\"global\"}} {}\n\n",
            self.global_requests.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP tollgate_requests_allowed Total requests admitted\n");
        output.push_str("# TYPE tollgate_requests_allowed counter\n");
        output.push_str(&format!(
            "tollgate_requests_allowed {}\n\n",
            self.requests_allowed.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP tollgate_requests_denied Total requests rejected with 429\n");
        output.push_str("# TYPE tollgate_requests_denied counter\n");
        output.push_str(&format!(
            "tollgate_requests_denied {}\n\n",
            self.requests_denied.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP tollgate_identity_errors Total requests rejected with 400\n");
        output.push_str("# TYPE tollgate_identity_errors counter\n");
        output.push_str(&format!(
            "tollgate_identity_errors {}\n\n",
            self.identity_errors.load(Ordering::Relaxed)
        ));

        let under_1ms = self.latency_under_1ms.load(Ordering::Relaxed);
        let under_10ms = under_1ms + self.latency_under_10ms.load(Ordering::Relaxed);
        let under_100ms = under_10ms + self.latency_under_100ms.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);

        output.push_str("# HELP tollgate_decision_duration_seconds Admission decision latency\n");
        output.push_str("# TYPE tollgate_decision_duration_seconds histogram\n");
        output.push_str(&format!(
            "tollgate_decision_duration_seconds_bucket{{le=\"0.001\"}} {under_1ms}\n"
        ));
        output.push_str(&format!(
            "tollgate_decision_duration_seconds_bucket{{le=\"0.01\"}} {under_10ms}\n"
        ));
        output.push_str(&format!(
            "tollgate_decision_duration_seconds_bucket{{le=\"0.1\"}} {under_100ms}\n"
        ));
        output.push_str(&format!(
            "tollgate_decision_duration_seconds_bucket{{le=\"+Inf\"}} {count}\n"
        ));
        let latency_sum_seconds =
            self.latency_sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        output.push_str(&format!(
            "tollgate_decision_duration_seconds_sum {latency_sum_seconds:.6}\n"
        ));
        output.push_str(&format!("tollgate_decision_duration_seconds_count {count}\n\n"));

        output.push_str("# HELP tollgate_active_keys Buckets currently in the store\n");
        output.push_str("# TYPE tollgate_active_keys gauge\n");
        output.push_str(&format!(
            "tollgate_active_keys {}\n\n",
            self.active_keys.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP tollgate_store_evictions Total number of idle buckets evicted\n");
        output.push_str("# TYPE tollgate_store_evictions counter\n");
        output.push_str(&format!(
            "tollgate_store_evictions {}\n\n",
            self.store_evictions.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP tollgate_sweeps_total Total number of eviction sweeps\n");
        output.push_str("# TYPE tollgate_sweeps_total counter\n");
        output.push_str(&format!(
            "tollgate_sweeps_total {}\n",
            self.sweeps.load(Ordering::Relaxed)
        ));

        output
    }
}

/// Identity strategy a limited route uses, for metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    RemoteAddr,
    BodyField,
    Global,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.requests_denied.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.identity_errors.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_decision() {
        let metrics = Metrics::new();

        metrics.record_decision(IdentityKind::RemoteAddr, 500, true);

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.remote_addr_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_denied.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.latency_under_1ms.load(Ordering::Relaxed), 1);

        metrics.record_decision(IdentityKind::Global, 50000, false);

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.global_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_denied.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_under_100ms.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_identity_errors_skip_latency() {
        let metrics = Metrics::new();

        metrics.record_identity_error(IdentityKind::BodyField);

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.body_field_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.identity_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_sweep() {
        let metrics = Metrics::new();

        metrics.record_sweep(SweepReport {
            removed: 3,
            remaining: 7,
        });
        metrics.record_sweep(SweepReport {
            removed: 2,
            remaining: 5,
        });

        assert_eq!(metrics.sweeps.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.store_evictions.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.active_keys.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();

        metrics.record_decision(IdentityKind::RemoteAddr, 500, true);
        metrics.record_decision(IdentityKind::BodyField, 1500, false);
        metrics.record_sweep(SweepReport {
            removed: 4,
            remaining: 1,
        });

        let output = metrics.export_prometheus();

        assert!(output.contains("tollgate_uptime_seconds"));
        assert!(output.contains("tollgate_requests_total 2"));
        assert!(output.contains("tollgate_requests_allowed 1"));
        assert!(output.contains("tollgate_requests_denied 1"));
        assert!(output.contains("tollgate_requests_by_identity{identity=\"remote_addr\"} 1"));
        assert!(output.contains("tollgate_requests_by_identity{identity=\"body_field\"} 1"));
        assert!(output.contains("tollgate_decision_duration_seconds_bucket{le=\"0.001\"} 1"));
        assert!(output.contains("tollgate_decision_duration_seconds_bucket{le=\"0.01\"} 2"));
        assert!(output.contains("tollgate_store_evictions 4"));
        assert!(output.contains("tollgate_decision_duration_seconds_sum 0.002000"));
        assert!(output.contains("tollgate_decision_duration_seconds_count 2"));
        assert!(!output.contains("tollgate_decision_duration{"));
        assert!(output.contains("tollgate_active_keys 1"));

        metrics.set_active_keys(9);
        assert!(metrics.export_prometheus().contains("tollgate_active_keys 9"));
    }
}
