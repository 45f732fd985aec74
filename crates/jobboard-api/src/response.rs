//! The JSON envelope every API response is wrapped in.

use serde::{Deserialize, Serialize};

/// `{ "success": bool, "message": string, "data": payload | null }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload; `data` serializes as `null`.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::ok("done", vec![1, 2])).unwrap();
        assert_eq!(ok, json!({ "success": true, "message": "done", "data": [1, 2] }));

        let empty = serde_json::to_value(ApiResponse::empty("cookie set")).unwrap();
        assert_eq!(empty["data"], json!(null));
        assert_eq!(empty["success"], json!(true));

        let failed = serde_json::to_value(ApiResponse::<()>::failure("nope")).unwrap();
        assert_eq!(failed, json!({ "success": false, "message": "nope", "data": null }));
    }
}
