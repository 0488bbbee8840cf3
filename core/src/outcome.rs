//! The completion value of a call.

use serde_json::Value;

use crate::error::ApiError;

/// Parsed body, error and status of one call.
///
/// `status` is 0 when no response was received. A cache hit always reports
/// 200. A body and an error can both be absent (empty or, in legacy mode,
/// undecodable responses).
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub body: Option<Value>,
    pub error: Option<ApiError>,
    pub status: u16,
}

impl CallOutcome {
    pub fn success(body: Option<Value>, status: u16) -> Self {
        Self {
            body,
            error: None,
            status,
        }
    }

    /// A failure before any response arrived.
    pub fn failed(error: ApiError) -> Self {
        Self {
            body: None,
            error: Some(error),
            status: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse into a `Result`, dropping the status on error.
    pub fn into_result(self) -> Result<(Option<Value>, u16), ApiError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.body, self.status)),
        }
    }
}
