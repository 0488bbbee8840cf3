//! C-ABI wrapper around `api-handler-core`.
//!
//! # Overview
//! Lets a native host build requests and parse responses through the same
//! contract as the Rust dispatcher, while executing the HTTP round-trip with
//! its own networking stack. Also exposes the reachability probe.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A call is assembled on an opaque `FfiCall` handle, then turned into an
//!   `FfiHttpRequest` by `api_build_request`.
//! - `api_parse_response` returns the call outcome as status, error and body
//!   JSON text.
//! - The C caller owns all returned pointers and must call the matching
//!   `api_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use api_handler_core::{
    ApiClient, CachedResponse, Call, ClientConfig, CompatMode, HttpResponse, ReachabilityProbe,
    SystemProbe,
};

use types::*;

/// Borrow a C string as `&str`. Null or invalid UTF-8 gives `None`.
fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`.
///
/// `timeout_secs` of 0 keeps the default (100 s). `legacy` selects the
/// original silent handling of encoding and decoding failures.
/// Returns null if `base_url` is null or not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn api_client_new(
    base_url: *const c_char,
    timeout_secs: u64,
    legacy: bool,
) -> *mut FfiApiClient {
    catch_unwind(|| {
        let Some(url) = c_str(base_url) else {
            return std::ptr::null_mut();
        };
        let mut config = ClientConfig::new(url);
        if timeout_secs > 0 {
            config = config.with_timeout(Duration::from_secs(timeout_secs));
        }
        if legacy {
            config = config.with_mode(CompatMode::Legacy);
        }
        Box::into_raw(Box::new(FfiApiClient {
            inner: ApiClient::new(config),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `api_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_client_free(client: *mut FfiApiClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Call construction
// ---------------------------------------------------------------------------

/// Start a call. Returns null if `endpoint` is null or not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn api_call_new(
    endpoint: *const c_char,
    method: FfiHttpMethod,
    encoding: FfiRequestEncoding,
) -> *mut FfiCall {
    catch_unwind(|| {
        let Some(endpoint) = c_str(endpoint) else {
            return std::ptr::null_mut();
        };
        let call = Call::new(method.into(), endpoint).encoding(encoding.into());
        Box::into_raw(Box::new(FfiCall { inner: call }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Set a header, replacing any header with the same name.
/// Returns false on a null or non-UTF-8 argument.
#[unsafe(no_mangle)]
pub extern "C" fn api_call_set_header(
    call: *mut FfiCall,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    if call.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(name), Some(value)) = (c_str(name), c_str(value)) else {
            return false;
        };
        let call = unsafe { &mut *call };
        let inner = std::mem::replace(&mut call.inner, Call::get(""));
        call.inner = inner.header(name, value);
        true
    }))
    .unwrap_or(false)
}

/// Set a parameter. `value` is parsed as JSON text; anything that is not
/// valid JSON is stored as a plain string.
/// Returns false on a null or non-UTF-8 argument.
#[unsafe(no_mangle)]
pub extern "C" fn api_call_set_parameter(
    call: *mut FfiCall,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    if call.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(name), Some(raw)) = (c_str(name), c_str(value)) else {
            return false;
        };
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        let call = unsafe { &mut *call };
        let inner = std::mem::replace(&mut call.inner, Call::get(""));
        call.inner = inner.parameter(name, value);
        true
    }))
    .unwrap_or(false)
}

/// Mark the call as cacheable. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_call_set_cache_enabled(call: *mut FfiCall, enabled: bool) {
    if !call.is_null() {
        let _ = catch_unwind(|| {
            unsafe { &mut *call }.inner.cache_enabled = enabled;
        });
    }
}

/// Free a call created by `api_call_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_call_free(call: *mut FfiCall) {
    if !call.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(call) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build and parse
// ---------------------------------------------------------------------------

/// Build the outbound request for `call`.
///
/// Never returns null. Free with `api_free_build_result`.
#[unsafe(no_mangle)]
pub extern "C" fn api_build_request(
    client: *const FfiApiClient,
    call: *const FfiCall,
) -> *mut FfiBuildResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiBuildResult::error(FfiErrorCode::NullArg, "null argument: client".into());
        }
        if call.is_null() {
            return FfiBuildResult::error(FfiErrorCode::NullArg, "null argument: call".into());
        }
        let client = unsafe { &*client };
        let call = unsafe { &*call };
        match client.inner.build_request(&call.inner) {
            Ok(req) => FfiBuildResult::ok(req),
            Err(e) => FfiBuildResult::error(FfiErrorCode::from(&e), e.to_string()),
        }
    })
    .unwrap_or_else(|_| {
        FfiBuildResult::error(FfiErrorCode::Panic, "panic in api_build_request".into())
    })
}

/// Parse a response the host received.
///
/// With `from_cache` set the body is treated as a cache hit and reported
/// with status 200. Never returns null. Free with `api_free_call_result`.
#[unsafe(no_mangle)]
pub extern "C" fn api_parse_response(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
    from_cache: bool,
) -> *mut FfiCallResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCallResult::error(FfiErrorCode::NullArg, "null argument: client".into());
        }
        if response.is_null() {
            return FfiCallResult::error(FfiErrorCode::NullArg, "null argument: response".into());
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        let body = if resp.body.is_null() || resp.body_len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(resp.body, resp.body_len) }.to_vec()
        };

        let outcome = if from_cache {
            client.inner.parse_cached(CachedResponse {
                status: resp.status,
                headers: Vec::new(),
                body,
            })
        } else {
            client.inner.parse_response(HttpResponse {
                status: resp.status,
                headers: Vec::new(),
                body,
            })
        };
        FfiCallResult::from_outcome(outcome)
    })
    .unwrap_or_else(|_| {
        FfiCallResult::error(FfiErrorCode::Panic, "panic in api_parse_response".into())
    })
}

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

/// Whether the default network route is usable right now.
#[unsafe(no_mangle)]
pub extern "C" fn api_is_connected_to_network() -> bool {
    catch_unwind(|| SystemProbe::new().is_connected_to_network()).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` and everything it points to.
fn free_request(req: *mut FfiHttpRequest) {
    let req = unsafe { Box::from_raw(req) };
    if !req.url.is_null() {
        drop(unsafe { CString::from_raw(req.url) });
    }
    if !req.body.is_null() {
        drop(unsafe { CString::from_raw(req.body) });
    }
    if !req.headers.is_null() && req.headers_len > 0 {
        let headers = unsafe {
            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                req.headers,
                req.headers_len as usize,
            ))
        };
        for h in headers.iter() {
            if !h.key.is_null() {
                drop(unsafe { CString::from_raw(h.key) });
            }
            if !h.value.is_null() {
                drop(unsafe { CString::from_raw(h.value) });
            }
        }
    }
}

/// Free an `FfiHttpRequest` detached from its build result. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| free_request(req));
}

/// Free an `FfiBuildResult`, including its request. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_free_build_result(result: *mut FfiBuildResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.request.is_null() {
            free_request(result.request);
        }
    });
}

/// Free an `FfiCallResult`. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_free_call_result(result: *mut FfiCallResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body_json.is_null() {
            drop(unsafe { CString::from_raw(result.body_json) });
        }
    });
}

/// Free a C string allocated by this library. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn api_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
