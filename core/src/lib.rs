//! HTTP client facade for outbound API calls.
//!
//! # Overview
//! One entry point turns a method, endpoint, headers and parameters into a
//! request, encodes the body (multipart, URL-encoded or JSON), serves from a
//! response cache when asked, executes the network call, and decodes the
//! result as a generic JSON value. A separate synchronous probe reports
//! whether the default network route is usable.
//!
//! # Design
//! - `ApiClient` is pure: `build_request` and `parse_response` never touch the
//!   network, so hosts with their own HTTP stack can use them directly.
//! - `Dispatcher` adds the I/O: a `Transport` (reqwest by default), a
//!   `ResponseCache` (mini-moka by default) and an `ActivityIndicator` hook.
//! - Every call yields exactly one `CallOutcome { body, error, status }`.
//! - `CompatMode::Legacy` keeps the silent handling of encoding and decoding
//!   failures for callers that depend on it.

pub mod activity;
pub mod cache;
pub mod call;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod http;
pub mod outcome;
pub mod reachability;
pub mod transport;

pub use activity::{ActivityFlag, ActivityIndicator, NoopIndicator};
pub use cache::{CacheConfig, CacheKey, CachedResponse, MemoryCache, NoCache, ResponseCache};
pub use call::{Call, Parameters, RequestEncoding};
pub use client::ApiClient;
pub use config::{ClientConfig, CompatMode, DEFAULT_TIMEOUT};
pub use dispatcher::{CallHandle, Dispatcher, DispatcherBuilder};
pub use error::{ApiError, ConfigError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::CallOutcome;
pub use reachability::{
    is_connected_to_network, ReachabilityFlags, ReachabilityProbe, StaticProbe, SystemProbe,
};
pub use transport::{ReqwestTransport, Transport};
