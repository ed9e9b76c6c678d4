use serde::{Deserialize, Serialize};

use crate::error::FieldIssue;

/// The `{ success, data?, error? }` envelope every HTTP response uses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: &str, code: &str, details: Option<&[FieldIssue]>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                message: message.to_string(),
                code: code.to_string(),
                details: details.and_then(|d| serde_json::to_value(d).ok()),
            }),
        }
    }
}
