//! Common response envelope of the platform backend

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Codes the backend uses for success
const SUCCESS_CODES: [i64; 2] = [0, 200];

/// `{ "code": 0, "msg": "...", "data": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default, alias = "message")]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.code)
    }

    /// Unwrap the payload, mapping backend-level failures to `ApiError`
    pub fn into_data(self, endpoint: &str) -> Result<T> {
        if !self.is_success() {
            return Err(Error::ApiError(format!(
                "{} returned code {}: {}",
                endpoint, self.code, self.msg
            )));
        }
        self.data
            .ok_or_else(|| Error::InvalidData(format!("{} returned no data", endpoint)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_code() {
        let env: ApiEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"code": 1001, "message": "Invalid amount"}"#).unwrap();
        let err = env.into_data("/api/deposit").unwrap_err();
        assert!(err.to_string().contains("Invalid amount"));
    }

    #[test]
    fn test_missing_data() {
        let env: ApiEnvelope<serde_json::Value> = serde_json::from_str(r#"{"code": 0}"#).unwrap();
        assert!(matches!(env.into_data("/api/x"), Err(Error::InvalidData(_))));
    }
}
