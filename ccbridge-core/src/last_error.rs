//! Per-thread last-error slot
//!
//! C hosts only see `0` or `1` from a call. The failure detail is parked here, one message per
//! thread, overwritten by every call made on that thread.

use crate::{Error, Result, RESULT_SUCCESS};
use std::cell::RefCell;
use std::ffi::{CStr, CString};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store `error` as this thread's last error, formatted `KIND: detail`
pub fn set(error: &Error) {
    let message = format!("{}: {}", error.kind(), error);
    // Interior zero bytes would cut the message short on the C side.
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

pub fn clear() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// This thread's last error message, if the last call failed
pub fn message() -> Option<String> {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|m| m.to_string_lossy().into_owned())
    })
}

/// Borrow the message as a C string.
///
/// The heap buffer behind the `CStr` stays put until the next [`set`] or [`clear`] on this
/// thread, which is what lets the C ABI hand out its pointer.
pub fn with_c_str<R>(f: impl FnOnce(Option<&CStr>) -> R) -> R {
    LAST_ERROR.with(|slot| f(slot.borrow().as_deref()))
}

/// Reduce a call result to the host result code, updating the slot on the way
pub fn record<T>(result: Result<T>) -> i32 {
    match result {
        Ok(_) => {
            clear();
            RESULT_SUCCESS
        }
        Err(e) => {
            set(&e);
            e.result_code()
        }
    }
}
