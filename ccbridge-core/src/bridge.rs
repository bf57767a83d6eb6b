// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Per-call orchestration
//!
//! ```text
//! decode ──> build_url ──> Transport::get ──> status check ──> map_response
//!   │            │               │                 │                │
//!   └────────────┴───────────────┴─────────────────┴────────────────┴──> Error
//! ```
//!
//! Each step either advances or ends the call; nothing is retried.

use crate::{
    codec,
    config::RequestConfig,
    last_error,
    metrics::Metrics,
    request, response,
    response::WriteOutcome,
    transport::Transport,
    Error, Result,
};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of a successful call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Parameters decoded from the inbound buffer
    pub parameters: usize,
    /// Backend HTTP status
    pub status: u16,
    /// What happened to the outbound buffer
    pub response: WriteOutcome,
}

/// One configured bridge: request settings plus a transport
pub struct Bridge<T> {
    config: RequestConfig,
    transport: T,
    metrics: Option<Metrics>,
}

impl<T: Transport> Bridge<T> {
    pub fn new(config: RequestConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            metrics: None,
        }
    }

    /// Record every call into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Run one call: decode `input`, query the backend, and fill `output` when asked to
    pub fn process(&self, input: &[u8], output: Option<&mut [u8]>) -> Result<Outcome> {
        let started = Instant::now();
        let result = self.run(input, output);
        let latency_micros = started.elapsed().as_micros() as u64;

        match &result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    let echoed = match outcome.response {
                        WriteOutcome::Written { value_len } => Some(value_len),
                        _ => None,
                    };
                    metrics.record_call(echoed, latency_micros);
                }
            }
            Err(e) => {
                let stage = if e.is_decode() {
                    "decode"
                } else if e.is_transport() {
                    "transport"
                } else {
                    "response"
                };
                warn!(kind = e.kind(), stage, "Bridge call failed: {}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(latency_micros);
                }
            }
        }

        result
    }

    /// Like [`Bridge::process`], reduced to the host result code with the detail left in the
    /// thread's last-error slot
    pub fn call(&self, input: &[u8], output: Option<&mut [u8]>) -> i32 {
        last_error::record(self.process(input, output))
    }

    fn run(&self, input: &[u8], output: Option<&mut [u8]>) -> Result<Outcome> {
        let params = codec::decode(input)?;
        let echo = response::control_flag(&params);
        let url = request::build_url(&params, &self.config);

        debug!(parameters = params.len(), echo, "Decoded request");

        // The GET may have side effects on the backend; refuse before sending it.
        if let (true, Some(buffer)) = (echo, output.as_deref()) {
            if buffer.len() < codec::RESPONSE_SIZE {
                return Err(Error::OutputBufferTooSmall {
                    required: codec::RESPONSE_SIZE,
                    actual: buffer.len(),
                });
            }
        }

        let reply = self.transport.get(&url)?;
        if !reply.is_success() {
            return Err(Error::RequestFailed(format!(
                "backend returned HTTP {}",
                reply.status
            )));
        }

        let written = response::map_response(echo, &reply.body, output)?;
        debug!(status = reply.status, ?written, "Call completed");

        Ok(Outcome {
            parameters: params.len(),
            status: reply.status,
            response: written,
        })
    }
}
