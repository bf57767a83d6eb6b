// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! C ABI for contact-center dialer hosts
//!
//! The host loads this library, resolves the exports by name and calls them with raw buffers in
//! the fixed-width layout described in [`ccbridge_core::codec`]. Every call returns `0` on
//! success or `1` on failure; [`GetLastErrorMessage`] then explains the failure.
//!
//! | Export | Purpose |
//! |---|---|
//! | `ProcessContactCenterRequest(in, out)` | one bridge call |
//! | `CustomFunctionExample(in, out)` | legacy name of the same call |
//! | `ProcessContactCenterRequestEx(in, in_len, out, out_len)` | bridge call with buffer lengths |
//! | `GetLastErrorMessage()` | failure detail for the calling thread |
//! | `CCBridgeAttach()` / `CCBridgeDetach()` | bring the transport up / down |
//!
//! Hosts that never call `CCBridgeAttach` get the transport brought up on their first call.

use ccbridge_core::{
    codec::{self, HEADER_SIZE, RESPONSE_SIZE},
    last_error, Bridge, Error, Result, TransportLibrary,
};
use std::any::Any;
use std::ffi::{c_char, c_long, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::slice;
use std::sync::Once;
use tracing::{info, warn};

pub mod logging;
pub mod settings;

static ATTACH: Once = Once::new();

/// Empty C string handed out when the calling thread has no error
static NO_ERROR: &[u8] = b"\0";

fn attach() -> Result<()> {
    logging::init();
    TransportLibrary::global().init()?;
    info!(version = ccbridge_core::VERSION, "Contact center bridge attached");
    Ok(())
}

/// Bring the transport up on the first call of a host that skipped `CCBridgeAttach`
fn ensure_attached() {
    ATTACH.call_once(|| {
        if let Err(e) = attach() {
            warn!(kind = e.kind(), "Lazy attach failed: {}", e);
        }
    });
}

/// Run `f`, turning a panic into an ordinary failure so it never unwinds into the host
fn guarded(f: impl FnOnce() -> Result<()>) -> c_long {
    let result = catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(Error::RequestFailed(format!(
            "unexpected internal failure: {}",
            panic_detail(payload.as_ref())
        )))
    });
    c_long::from(last_error::record(result))
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn process(input: &[u8], output: Option<&mut [u8]>) -> Result<()> {
    ensure_attached();

    let config = settings::request_config()?;
    let library = TransportLibrary::global();
    let transport = library.transport(&config.transport_settings())?;

    Bridge::new(config, transport)
        .with_metrics(library.metrics().clone())
        .process(input, output)?;
    Ok(())
}

/// View the inbound buffer of a length-less call.
///
/// The extent is taken from the count header, after the count has been checked against the
/// maximum.
///
/// # Safety
///
/// `input` must be null or point to a buffer holding at least the header, and the records it
/// declares when the header is valid.
unsafe fn inbound_from_header<'a>(input: *const c_char) -> Result<&'a [u8]> {
    if input.is_null() {
        return Err(Error::InvalidInput("inbound buffer is null".to_string()));
    }

    let bytes = input.cast::<u8>();
    let header = slice::from_raw_parts(bytes, HEADER_SIZE);
    let count = codec::checked_count(codec::parse_count(header))?;
    Ok(slice::from_raw_parts(bytes, codec::inbound_len(count)))
}

/// # Safety
///
/// `ptr` must be null or valid for `len` bytes.
unsafe fn inbound_with_len<'a>(ptr: *const c_char, len: usize) -> Result<&'a [u8]> {
    if ptr.is_null() {
        return Err(Error::InvalidInput("inbound buffer is null".to_string()));
    }
    Ok(slice::from_raw_parts(ptr.cast::<u8>(), len))
}

/// # Safety
///
/// `ptr` must be null or valid for writes of `len` bytes.
unsafe fn outbound<'a>(ptr: *mut c_char, len: usize) -> Option<&'a mut [u8]> {
    (!ptr.is_null()).then(|| slice::from_raw_parts_mut(ptr.cast::<u8>(), len))
}

/// Run one bridge call.
///
/// Returns `0` on success and `1` on failure.
///
/// # Safety
///
/// `input` must be null or point to a readable buffer laid out as a count header followed by
/// the records it declares. `output` must be null or point to a writable buffer of at least
/// 162 bytes. Neither pointer is retained after the call returns.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn ProcessContactCenterRequest(
    input: *const c_char,
    output: *mut c_char,
) -> c_long {
    guarded(|| {
        let input = inbound_from_header(input)?;
        process(input, outbound(output, RESPONSE_SIZE))
    })
}

/// Legacy export name of [`ProcessContactCenterRequest`]
///
/// # Safety
///
/// Same contract as [`ProcessContactCenterRequest`].
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn CustomFunctionExample(
    input: *const c_char,
    output: *mut c_char,
) -> c_long {
    ProcessContactCenterRequest(input, output)
}

/// Run one bridge call with explicit buffer lengths, bounds-checking both buffers.
///
/// # Safety
///
/// `input` must be null or readable for `input_len` bytes. `output` must be null or writable
/// for `output_len` bytes.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn ProcessContactCenterRequestEx(
    input: *const c_char,
    input_len: usize,
    output: *mut c_char,
    output_len: usize,
) -> c_long {
    guarded(|| {
        let input = inbound_with_len(input, input_len)?;
        process(input, outbound(output, output_len))
    })
}

/// Failure detail of the last call made on this thread.
///
/// The string reads `KIND: detail` after a failure and is empty after a success. It stays valid
/// until the next call on the same thread. Never null.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn GetLastErrorMessage() -> *const c_char {
    last_error::with_c_str(|message| {
        message.map_or(NO_ERROR.as_ptr().cast::<c_char>(), CStr::as_ptr)
    })
}

/// Bring the transport up. Safe to call more than once.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn CCBridgeAttach() -> c_long {
    // An explicit attach replaces the lazy one.
    ATTACH.call_once(|| {});
    guarded(attach)
}

/// Tear the transport down. Calls made afterwards fail until `CCBridgeAttach` runs again.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn CCBridgeDetach() -> c_long {
    ATTACH.call_once(|| {});
    guarded(|| {
        TransportLibrary::global().shutdown();
        Ok(())
    })
}
