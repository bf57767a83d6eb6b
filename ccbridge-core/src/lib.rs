// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Contact Center Bridge Core Library
//!
//! This crate translates the fixed-width key/value buffers exchanged with a contact-center dialer
//! into HTTP GET requests against a configurable backend, and packs the backend's answer back into
//! the same binary layout.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `codec`: Fixed-width parameter buffer decoding and encoding
//! - `request`: Query string construction with percent-encoding
//! - `response`: Control flag evaluation and outbound buffer mapping
//! - `transport`: HTTP GET abstraction and the reqwest-backed implementation
//! - `library`: Process-wide transport initialization and teardown
//! - `bridge`: Per-call orchestration
//! - `config`: Configuration management with validation
//! - `last_error`: Thread-local last-error slot for C hosts
//! - `metrics`: Call statistics
//! - `error`: Unified error types
//!
//! # Data flow
//!
//! ```text
//! inbound buffer ──> decode ──> ParameterSet ──> build_url ──> Transport::get
//!                                                                  │
//! outbound buffer <── map_response <────────── (status, body) <────┘
//! ```

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod last_error;
pub mod library;
pub mod metrics;
pub mod request;
pub mod response;
pub mod transport;

pub use bridge::{Bridge, Outcome};
pub use codec::ParameterSet;
pub use config::RequestConfig;
pub use error::{Error, Result};
pub use library::TransportLibrary;
pub use response::WriteOutcome;
pub use transport::{HttpResponse, HttpTransport, Transport, TransportSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserved parameter that asks for the backend response to be echoed back
pub const CONTROL_PARAMETER: &str = "CFResp";

/// The only value of the control parameter that enables the echo
pub const CONTROL_ENABLED: &str = "yes";

/// Result code returned to the host on success
pub const RESULT_SUCCESS: i32 = 0;

/// Result code returned to the host on any failure
pub const RESULT_FAILURE: i32 = 1;
