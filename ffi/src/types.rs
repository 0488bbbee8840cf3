//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointer + length instead of `Vec`,
//! and enums with explicit discriminants. Conversion functions live here to
//! keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use api_handler_core::{ApiClient, ApiError, Call, CallOutcome, HttpMethod, RequestEncoding};

/// Opaque handle to an `ApiClient`.
pub struct FfiApiClient {
    pub(crate) inner: ApiClient,
}

/// Opaque handle to a `Call` under construction.
pub struct FfiCall {
    pub(crate) inner: Call,
}

/// Copy `s` into a C string owned by the caller. Interior NULs truncate, so
/// request data goes through `FfiBuildResult::ok`, which rejects them first.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().take_while(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Delete => HttpMethod::Delete,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiRequestEncoding {
    FormData = 0,
    UrlEncoded = 1,
    Json = 2,
}

impl From<FfiRequestEncoding> for RequestEncoding {
    fn from(e: FfiRequestEncoding) -> Self {
        match e {
            FfiRequestEncoding::FormData => RequestEncoding::FormData,
            FfiRequestEncoding::UrlEncoded => RequestEncoding::UrlEncoded,
            FfiRequestEncoding::Json => RequestEncoding::Json,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An outbound request for the host to execute.
///
/// `body` is null when the request carries no body.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub timeout_ms: u64,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: api_handler_core::HttpRequest) -> *mut Self {
        let url = into_c_string(req.url);
        let body = match req.body {
            Some(b) => into_c_string(b),
            None => std::ptr::null_mut(),
        };
        let timeout_ms = req.timeout.as_millis().min(u64::MAX as u128) as u64;

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Vec<FfiHeader> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers.into_boxed_slice()) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
            timeout_ms,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// A response the host received, described as C-compatible data.
///
/// The FFI layer reads but does not free these fields. `body` may be null
/// when `body_len` is 0.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const u8,
    pub body_len: usize,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidUrl = 1,
    Transport = 2,
    EncodingFailed = 3,
    DecodingFailed = 4,
    Panic = 5,
    NullArg = 6,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::InvalidUrl { .. } => FfiErrorCode::InvalidUrl,
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::EncodingFailed(_) => FfiErrorCode::EncodingFailed,
            ApiError::DecodingFailed(_) => FfiErrorCode::DecodingFailed,
        }
    }
}

/// Result of `api_build_request`.
///
/// On success `error_code` is `Ok` and `request` is non-null. On failure
/// `request` is null and `error_message` describes the problem.
#[repr(C)]
pub struct FfiBuildResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub request: *mut FfiHttpRequest,
}

impl FfiBuildResult {
    /// A request with a NUL byte in its URL, headers or body cannot cross as
    /// C strings without being cut short, so it becomes `EncodingFailed`.
    pub(crate) fn ok(req: api_handler_core::HttpRequest) -> *mut Self {
        if let Some(part) = nul_in_request(&req) {
            return Self::error(
                FfiErrorCode::EncodingFailed,
                format!("request {part} contains a NUL byte"),
            );
        }
        Box::into_raw(Box::new(FfiBuildResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            request: FfiHttpRequest::from_core(req),
        }))
    }

    pub(crate) fn error(code: FfiErrorCode, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiBuildResult {
            error_code: code,
            error_message: into_c_string(msg),
            request: std::ptr::null_mut(),
        }))
    }
}

fn has_nul(s: &str) -> bool {
    s.contains('\0')
}

fn nul_in_request(req: &api_handler_core::HttpRequest) -> Option<&'static str> {
    if has_nul(&req.url) {
        Some("URL")
    } else if req.headers.iter().any(|(k, v)| has_nul(k) || has_nul(v)) {
        Some("header")
    } else if req.body.as_deref().is_some_and(has_nul) {
        Some("body")
    } else {
        None
    }
}

/// Result of `api_parse_response`: the three-part call outcome.
///
/// `body_json` is the decoded body re-serialized as JSON text, or null when
/// there is no body. A `DecodingFailed` result still carries the HTTP status.
#[repr(C)]
pub struct FfiCallResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status: u16,
    pub body_json: *mut c_char,
}

impl FfiCallResult {
    pub(crate) fn from_outcome(outcome: CallOutcome) -> *mut Self {
        let (error_code, error_message) = match &outcome.error {
            Some(err) => (FfiErrorCode::from(err), into_c_string(err.to_string())),
            None => (FfiErrorCode::Ok, std::ptr::null_mut()),
        };
        let body_json = match outcome.body {
            Some(value) => into_c_string(value.to_string()),
            None => std::ptr::null_mut(),
        };
        Box::into_raw(Box::new(FfiCallResult {
            error_code,
            error_message,
            status: outcome.status,
            body_json,
        }))
    }

    pub(crate) fn error(code: FfiErrorCode, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiCallResult {
            error_code: code,
            error_message: into_c_string(msg),
            status: 0,
            body_json: std::ptr::null_mut(),
        }))
    }
}
