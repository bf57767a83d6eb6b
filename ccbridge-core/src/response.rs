// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Mapping of backend responses into the outbound buffer

use crate::{codec, codec::ParameterSet, Result, CONTROL_ENABLED, CONTROL_PARAMETER};

/// What happened to the outbound buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The caller did not ask for the response
    NotRequested,
    /// The response was requested but the host passed no buffer
    NoBuffer,
    /// The buffer was written; `value_len` response bytes fit in the value field
    Written { value_len: usize },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// True iff `CFResp` is present with the exact value `"yes"`.
///
/// `"1"`, `"true"` and `"YES"` do not count.
pub fn control_flag(params: &ParameterSet) -> bool {
    params.get(CONTROL_PARAMETER) == Some(CONTROL_ENABLED.as_bytes())
}

/// Copy the response body into the outbound buffer when the caller asked for it.
///
/// The body keeps at most 127 bytes and stops early at an embedded zero byte.
pub fn map_response(echo: bool, body: &[u8], out: Option<&mut [u8]>) -> Result<WriteOutcome> {
    if !echo {
        return Ok(WriteOutcome::NotRequested);
    }

    match out {
        None => Ok(WriteOutcome::NoBuffer),
        Some(buffer) => {
            let value_len = codec::encode_response(buffer, CONTROL_PARAMETER, body)?;
            Ok(WriteOutcome::Written { value_len })
        }
    }
}
