//! Stateless request builder and response parser.
//!
//! # Design
//! `ApiClient` holds only an immutable `ClientConfig`. `build_request` turns a
//! `Call` into an `HttpRequest` and `parse_response` turns an `HttpResponse`
//! into a `CallOutcome`. Neither touches the network: the `Dispatcher` (or a
//! host with its own HTTP stack) executes the round-trip in between.

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::CachedResponse;
use crate::call::Call;
use crate::config::{ClientConfig, CompatMode};
use crate::encoding;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::outcome::CallOutcome;

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the outbound request for `call`.
    ///
    /// The URL is the configured base URL joined with the endpoint, then
    /// normalized by `Url::parse` (lower-cased host, dot segments resolved,
    /// `/` path for a bare host). Body headers are set first so caller headers
    /// can override them.
    pub fn build_request(&self, call: &Call) -> Result<HttpRequest, ApiError> {
        let url = self.resolve_url(&call.endpoint)?;
        let mut request = HttpRequest {
            method: call.method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: call.timeout.unwrap_or(self.config.timeout),
        };

        let has_parameters = call.parameters.is_some() || call.encoding_error.is_some();
        if call.method == HttpMethod::Get {
            if has_parameters {
                debug!(endpoint = %call.endpoint, "parameters ignored for GET");
            }
        } else if let Some(reason) = &call.encoding_error {
            match self.config.mode {
                CompatMode::Strict => {
                    warn!(endpoint = %call.endpoint, %reason, "could not encode request body");
                    return Err(ApiError::EncodingFailed(reason.clone()));
                }
                CompatMode::Legacy => {
                    debug!(endpoint = %call.endpoint, %reason, "sending request without body");
                }
            }
        } else if let Some(parameters) = &call.parameters {
            let encoded = encoding::encode(call.encoding, parameters, self.config.mode);
            for (name, value) in &encoded.headers {
                request.set_header(name, value);
            }
            request.body = Some(encoded.body);
        }

        for (name, value) in &call.headers {
            request.set_header(name, value);
        }
        Ok(request)
    }

    /// Interpret a network response.
    pub fn parse_response(&self, response: HttpResponse) -> CallOutcome {
        self.decode(&response.body, response.status)
    }

    /// Interpret a cache hit. The stored status is not reported: hits are 200.
    pub fn parse_cached(&self, cached: CachedResponse) -> CallOutcome {
        self.decode(&cached.body, 200)
    }

    fn decode(&self, body: &[u8], status: u16) -> CallOutcome {
        if body.iter().all(u8::is_ascii_whitespace) {
            return CallOutcome::success(None, status);
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => CallOutcome::success(Some(value), status),
            Err(e) => match self.config.mode {
                CompatMode::Legacy => {
                    debug!(status, error = %e, "response body is not JSON");
                    CallOutcome::success(None, status)
                }
                CompatMode::Strict => CallOutcome {
                    body: None,
                    error: Some(ApiError::DecodingFailed(e.to_string())),
                    status,
                },
            },
        }
    }

    fn resolve_url(&self, endpoint: &str) -> Result<String, ApiError> {
        let raw = format!("{}{}", self.config.base_url, endpoint);
        let invalid = |reason: String| {
            warn!(url = %raw, %reason, "unsupported URL, check the configured base URL");
            ApiError::InvalidUrl {
                url: raw.clone(),
                reason,
            }
        };
        let url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url.into()),
            other => Err(invalid(format!("unsupported scheme `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::RequestEncoding;
    use serde_json::json;
    use std::time::Duration;

    fn client() -> ApiClient {
        ApiClient::new(ClientConfig::new("http://localhost:3000"))
    }

    fn legacy_client() -> ApiClient {
        ApiClient::new(ClientConfig::new("http://localhost:3000").with_mode(CompatMode::Legacy))
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn build_get_produces_bare_request() {
        let req = client().build_request(&Call::get("/users")).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/users");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
        assert_eq!(req.timeout, Duration::from_secs(100));
    }

    #[test]
    fn get_never_carries_a_body() {
        let call = Call::get("/search")
            .encoding(RequestEncoding::UrlEncoded)
            .parameter("q", "rust");
        let req = client().build_request(&call).unwrap();
        assert!(req.body.is_none());
        assert!(req.header("Content-Type").is_none());
    }

    #[test]
    fn post_json_sets_body_and_headers() {
        let call = Call::post("/users").parameter("a", 1).parameter("b", "x");
        let req = client().build_request(&call).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("Accept"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"a": 1, "b": "x"}));
    }

    #[test]
    fn post_without_parameters_has_no_body() {
        let req = client().build_request(&Call::post("/ping")).unwrap();
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn delete_with_parameters_carries_a_body() {
        let call = Call::delete("/users/7")
            .encoding(RequestEncoding::UrlEncoded)
            .parameter("reason", "spam");
        let req = client().build_request(&call).unwrap();
        assert_eq!(req.body.as_deref(), Some("reason=spam"));
    }

    #[test]
    fn caller_headers_override_body_headers() {
        let call = Call::post("/notes")
            .parameter("text", "hi")
            .header("content-type", "text/plain")
            .header("X-Trace", "abc");
        let req = client().build_request(&call).unwrap();
        assert_eq!(req.header("Content-Type"), Some("text/plain"));
        assert_eq!(req.header("x-trace"), Some("abc"));
        let content_types = req
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .count();
        assert_eq!(content_types, 1);
    }

    #[test]
    fn multipart_boundary_matches_content_type() {
        let call = Call::put("/upload")
            .encoding(RequestEncoding::FormData)
            .parameter("f", "v");
        let req = client().build_request(&call).unwrap();
        let content_type = req.header("Content-Type").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = req.body.as_deref().unwrap();
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("Content-Disposition: form-data; name=\"f\"\r\n\r\nv\r\n"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn non_finite_parameter_fails_encoding_in_strict_mode() {
        let call = Call::post("/a")
            .parameter("x", f64::NAN)
            .parameter("y", f64::INFINITY);
        let err = client().build_request(&call).unwrap_err();
        assert!(matches!(err, ApiError::EncodingFailed(ref reason) if reason.contains("`x`")));
    }

    #[test]
    fn non_string_map_key_fails_encoding_in_strict_mode() {
        let keyed = std::collections::BTreeMap::from([(vec![1u8], "v")]);
        let call = Call::put("/a")
            .encoding(RequestEncoding::UrlEncoded)
            .parameter("m", keyed);
        let err = client().build_request(&call).unwrap_err();
        assert!(matches!(err, ApiError::EncodingFailed(_)));
    }

    #[test]
    fn non_finite_parameter_drops_body_in_legacy_mode() {
        let call = Call::post("/a")
            .parameter("ok", 1)
            .parameter("x", f64::NAN)
            .header("X-Trace", "abc");
        let req = legacy_client().build_request(&call).unwrap();
        assert!(req.body.is_none());
        assert!(req.header("Content-Type").is_none());
        assert_eq!(req.header("X-Trace"), Some("abc"));
    }

    #[test]
    fn get_ignores_unencodable_parameters() {
        let call = Call::get("/a").parameter("x", f64::NAN);
        let req = client().build_request(&call).unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn url_is_normalized() {
        let client = ApiClient::new(ClientConfig::new("HTTP://API.Example.com"));
        let req = client.build_request(&Call::get("/v1/../users")).unwrap();
        assert_eq!(req.url, "http://api.example.com/users");
    }

    #[test]
    fn per_call_timeout_overrides_config() {
        let call = Call::get("/slow").timeout(Duration::from_secs(3));
        let req = client().build_request(&call).unwrap();
        assert_eq!(req.timeout, Duration::from_secs(3));
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let client = ApiClient::new(ClientConfig::default());
        let err = client.build_request(&Call::get("/users")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { ref url, .. } if url == "/users"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let client = ApiClient::new(ClientConfig::new("ftp://files.example.com"));
        let err = client.build_request(&Call::get("/a")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn parse_json_body_keeps_status() {
        let outcome = client().parse_response(response(404, r#"{"error":"missing"}"#));
        assert_eq!(outcome.status, 404);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.body.unwrap()["error"], "missing");
    }

    #[test]
    fn parse_empty_body_is_not_an_error() {
        let outcome = client().parse_response(response(204, ""));
        assert_eq!(outcome, CallOutcome::success(None, 204));
    }

    #[test]
    fn parse_bad_json_strict_reports_decoding_failure() {
        let outcome = client().parse_response(response(200, "not json"));
        assert_eq!(outcome.status, 200);
        assert!(outcome.body.is_none());
        assert!(matches!(outcome.error, Some(ApiError::DecodingFailed(_))));
    }

    #[test]
    fn parse_bad_json_legacy_is_silent() {
        let outcome = legacy_client().parse_response(response(200, "not json"));
        assert_eq!(outcome, CallOutcome::success(None, 200));
    }

    #[test]
    fn parse_cached_reports_200() {
        let cached = CachedResponse {
            status: 500,
            headers: Vec::new(),
            body: br#"[1,2,3]"#.to_vec(),
        };
        let outcome = client().parse_cached(cached);
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, Some(json!([1, 2, 3])));
    }
}
