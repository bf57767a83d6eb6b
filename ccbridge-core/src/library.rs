// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Process-wide transport library state
//!
//! The host brings the transport up once when it loads the plug-in and tears it down when it
//! unloads it. While up, the library owns the I/O runtime that drives HTTP connections and one
//! pooled client per distinct [`TransportSettings`]. Both calls are idempotent and safe to race.

use crate::{
    metrics::Metrics,
    transport::{build_client, HttpTransport, TransportSettings},
    Error, Result,
};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

/// Worker threads of the I/O runtime
const IO_WORKER_THREADS: usize = 2;

/// How long shutdown waits for in-flight I/O
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

static GLOBAL: OnceLock<TransportLibrary> = OnceLock::new();

/// Transport library lifecycle and client cache
pub struct TransportLibrary {
    state: Mutex<Option<LibraryState>>,
    metrics: Metrics,
}

struct LibraryState {
    runtime: Runtime,
    clients: HashMap<TransportSettings, Client>,
}

impl Default for TransportLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportLibrary {
    /// Create an uninitialized library
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
            metrics: Metrics::new(),
        }
    }

    /// The process-wide instance used by the C ABI
    pub fn global() -> &'static TransportLibrary {
        GLOBAL.get_or_init(TransportLibrary::new)
    }

    /// Bring the transport up. Calling it again while up does nothing.
    pub fn init(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.is_some() {
            debug!("Transport library already initialized");
            return Ok(());
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(IO_WORKER_THREADS)
            .thread_name("ccbridge-io")
            .enable_all()
            .build()
            .map_err(|e| Error::TransportInitFailed(format!("Failed to start I/O runtime: {}", e)))?;

        *state = Some(LibraryState {
            runtime,
            clients: HashMap::new(),
        });

        info!("Transport library initialized");
        Ok(())
    }

    /// Tear the transport down, dropping cached clients and the I/O runtime.
    /// Calling it while down does nothing.
    pub fn shutdown(&self) {
        let Some(LibraryState { runtime, clients }) = self.state.lock().take() else {
            return;
        };

        drop(clients);
        runtime.shutdown_timeout(SHUTDOWN_GRACE);

        info!(
            uptime_s = self.metrics.uptime_seconds(),
            calls = self.metrics.calls_total(),
            failed = self.metrics.calls_failed(),
            echoed = self.metrics.echoes_total(),
            bytes_returned = self.metrics.bytes_returned(),
            p50_us = self.metrics.latency_p50(),
            p95_us = self.metrics.latency_p95(),
            p99_us = self.metrics.latency_p99(),
            "Transport library shut down"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Transport for one call, reusing the pooled client for `settings` when there is one
    pub fn transport(&self, settings: &TransportSettings) -> Result<HttpTransport> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or_else(|| {
            Error::TransportInitFailed("transport library is not initialized".to_string())
        })?;

        let client = match state.clients.get(settings) {
            Some(client) => client.clone(),
            None => {
                let client = build_client(settings)?;
                state.clients.insert(settings.clone(), client.clone());
                debug!(cached = state.clients.len(), "Created HTTP client for new settings");
                client
            }
        };

        Ok(HttpTransport::new(client, state.runtime.handle().clone()))
    }

    /// Number of pooled clients
    pub fn cached_clients(&self) -> usize {
        self.state.lock().as_ref().map_or(0, |s| s.clients.len())
    }

    /// Call statistics shared by every bridge using this library
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
