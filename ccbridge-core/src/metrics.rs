// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Call statistics

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Latency samples kept before the oldest half is discarded
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Shared call statistics
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    calls_total: AtomicU64,
    calls_failed: AtomicU64,

    // Outbound buffer writes
    echoes_total: AtomicU64,
    bytes_returned: AtomicU64,

    // Latency tracking (microseconds)
    call_latencies: RwLock<Vec<u64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                calls_total: AtomicU64::new(0),
                calls_failed: AtomicU64::new(0),
                echoes_total: AtomicU64::new(0),
                bytes_returned: AtomicU64::new(0),
                call_latencies: RwLock::new(Vec::with_capacity(1024)),
            }),
        }
    }

    /// Record a successful call; `echoed_bytes` is `Some` when the outbound buffer was written
    pub fn record_call(&self, echoed_bytes: Option<usize>, latency_micros: u64) {
        self.inner.calls_total.fetch_add(1, Ordering::Relaxed);
        if let Some(bytes) = echoed_bytes {
            self.inner.echoes_total.fetch_add(1, Ordering::Relaxed);
            self.inner.bytes_returned.fetch_add(bytes as u64, Ordering::Relaxed);
        }
        self.record_latency(latency_micros);
    }

    pub fn record_failure(&self, latency_micros: u64) {
        self.inner.calls_total.fetch_add(1, Ordering::Relaxed);
        self.inner.calls_failed.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_micros);
    }

    fn record_latency(&self, latency_micros: u64) {
        let mut latencies = self.inner.call_latencies.write();
        latencies.push(latency_micros);
        if latencies.len() > MAX_LATENCY_SAMPLES {
            latencies.drain(0..MAX_LATENCY_SAMPLES / 2);
        }
    }

    pub fn calls_total(&self) -> u64 {
        self.inner.calls_total.load(Ordering::Relaxed)
    }

    pub fn calls_failed(&self) -> u64 {
        self.inner.calls_failed.load(Ordering::Relaxed)
    }

    pub fn echoes_total(&self) -> u64 {
        self.inner.echoes_total.load(Ordering::Relaxed)
    }

    pub fn bytes_returned(&self) -> u64 {
        self.inner.bytes_returned.load(Ordering::Relaxed)
    }

    // Derived metrics
    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    pub fn latency_percentile(&self, percentile: f64) -> Option<u64> {
        let latencies = self.inner.call_latencies.read();
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.clone();
        sorted.sort_unstable();
        let index = ((sorted.len() as f64 * percentile).ceil() as usize).min(sorted.len() - 1);
        Some(sorted[index])
    }

    pub fn latency_p50(&self) -> Option<u64> {
        self.latency_percentile(0.50)
    }

    pub fn latency_p95(&self) -> Option<u64> {
        self.latency_percentile(0.95)
    }

    pub fn latency_p99(&self) -> Option<u64> {
        self.latency_percentile(0.99)
    }
}
