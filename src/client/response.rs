use crate::error::VerificationError;
use serde_json::Value;

/// A backend reply parsed without trusting its shape.
///
/// Bodies that are not JSON objects are kept as `Value::Null` so that every
/// lookup simply misses.
#[derive(Debug)]
pub(super) struct Reply {
    status: u16,
    body: Value,
}

impl Reply {
    pub(super) fn parse(status: u16, body: &[u8]) -> Self {
        let body = match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Null,
        };
        Self { status, body }
    }

    pub(super) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Non-empty string field
    pub(super) fn string(&self, name: &str) -> Option<String> {
        match self.body.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub(super) fn boolean(&self, name: &str) -> Option<bool> {
        self.body.get(name).and_then(Value::as_bool)
    }

    /// Machine-readable rejection reason, if the backend supplied one
    pub(super) fn error_reason(&self) -> Option<String> {
        match self.body.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Map the reply onto an operation result.
    ///
    /// A reason in the body is an application rejection whatever the status;
    /// a non-2xx without one, or a 2xx missing the expected fields, is a
    /// server error.
    pub(super) fn interpret<T>(
        &self,
        rejected: impl FnOnce(String) -> VerificationError,
        extract: impl FnOnce(&Reply) -> Option<T>,
        expected: &str,
    ) -> Result<T, VerificationError> {
        if let Some(reason) = self.error_reason() {
            return Err(rejected(reason));
        }

        if !self.is_success() {
            return Err(VerificationError::server(format!(
                "HTTP status {} without a reason",
                self.status
            )));
        }

        extract(self).ok_or_else(|| {
            VerificationError::server(format!(
                "HTTP status {} response missing {}",
                self.status, expected
            ))
        })
    }
}
