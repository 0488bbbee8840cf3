//! Per-call parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::encoding::to_json_value;
use crate::http::HttpMethod;

/// Ordered parameter map. Iteration follows insertion order.
pub type Parameters = Map<String, Value>;

/// Body serialization strategy for non-GET requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEncoding {
    /// `multipart/form-data`
    FormData,
    /// `application/x-www-form-urlencoded`
    UrlEncoded,
    #[default]
    Json,
}

/// Everything a single API call needs. Built by the caller, consumed by
/// `Dispatcher::call` or `ApiClient::build_request`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: String,
    pub method: HttpMethod,
    pub encoding: RequestEncoding,
    pub headers: Vec<(String, String)>,
    pub parameters: Option<Parameters>,
    pub cache_enabled: bool,
    /// Overrides `ClientConfig::timeout` when set.
    pub timeout: Option<Duration>,
    /// First parameter that could not be converted to JSON. The parameter
    /// itself is left out of `parameters`.
    pub encoding_error: Option<String>,
}

impl Call {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            encoding: RequestEncoding::default(),
            headers: Vec::new(),
            parameters: None,
            cache_enabled: false,
            timeout: None,
            encoding_error: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    pub fn encoding(mut self, encoding: RequestEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Add a header. A header with the same name (any case) is replaced.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Add a parameter. Re-inserting a key replaces its value in place.
    ///
    /// A value with no JSON form (NaN, infinities, non-string map keys) is
    /// recorded in `encoding_error` and reported when the request is built.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match to_json_value(&value) {
            Ok(value) => {
                self.parameters
                    .get_or_insert_with(Map::new)
                    .insert(name, value);
            }
            Err(reason) => {
                self.encoding_error
                    .get_or_insert_with(|| format!("parameter `{name}`: {reason}"));
            }
        }
        self
    }

    /// Replace all parameters, discarding any recorded encoding failure.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self.encoding_error = None;
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let call = Call::get("/users");
        assert_eq!(call.method, HttpMethod::Get);
        assert_eq!(call.encoding, RequestEncoding::Json);
        assert!(call.headers.is_empty());
        assert!(call.parameters.is_none());
        assert!(!call.cache_enabled);
        assert!(call.timeout.is_none());
    }

    #[test]
    fn parameters_keep_insertion_order() {
        let call = Call::post("/form")
            .parameter("zeta", 1)
            .parameter("alpha", "a")
            .parameter("mid", true);
        let keys: Vec<&str> = call
            .parameters
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn header_names_are_unique_ignoring_case() {
        let call = Call::get("/").header("X-Token", "a").header("x-token", "b");
        assert_eq!(call.headers, vec![("x-token".to_string(), "b".to_string())]);
    }

    #[test]
    fn unencodable_parameter_is_recorded_once() {
        let call = Call::post("/a")
            .parameter("ok", 1)
            .parameter("x", f64::NAN)
            .parameter("y", f64::INFINITY);
        let reason = call.encoding_error.as_deref().unwrap();
        assert!(reason.starts_with("parameter `x`"), "{reason}");
        let params = call.parameters.unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["ok"], 1);
    }

    #[test]
    fn replacing_parameters_clears_encoding_error() {
        let call = Call::post("/a")
            .parameter("x", f64::NAN)
            .parameters(Map::new());
        assert!(call.encoding_error.is_none());
    }
}
