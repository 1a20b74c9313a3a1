//! Client Error Types
//!
//! Every failure the client can hit ends up as one line of text on screen.
//! `ClientError` keeps enough structure to log usefully and to pick that line.

use thiserror::Error;

use crate::models::ApiErrorBody;

/// Errors from talking to the backend or local storage
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Decode(String),

    /// Local token/cache storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// An authenticated call was attempted without a token
    #[error("Not logged in")]
    NotLoggedIn,
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Text to show the user.
    ///
    /// Prefers the backend's `detail`, then the raw response body, then the
    /// caller's fallback for the operation.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Status { body, .. } => {
                error_text_from_body(body).unwrap_or_else(|| fallback.to_string())
            }
            ClientError::NotLoggedIn => "请先登录".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }
}

/// Extract a display string from an error response body
pub fn error_text_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(trimmed) {
        match parsed.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => return Some(s),
            // Validation errors come back as a list of objects with a `msg`
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            _ => {}
        }
    }

    Some(trimmed.to_string())
}

/// Fallback messages per operation
pub mod fallback {
    pub const SEND_CODE: &str = "发送验证码失败";
    pub const VERIFY_CODE: &str = "验证码验证失败";
    pub const LOGIN: &str = "登录失败";
    pub const GET_ME: &str = "获取用户信息失败";
    pub const CALCULATE_BAZI: &str = "八字排盘失败";
    pub const CREATE_ANALYSIS: &str = "创建分析任务失败";
    pub const GET_ANALYSIS: &str = "获取分析任务失败";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_is_preferred() {
        let err = ClientError::Status {
            status: 400,
            body: r#"{"detail":"Invalid or expired verification code"}"#.to_string(),
        };
        assert_eq!(
            err.user_message(fallback::VERIFY_CODE),
            "Invalid or expired verification code"
        );
    }

    #[test]
    fn test_raw_body_and_fallback() {
        let raw = ClientError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(raw.user_message(fallback::GET_ANALYSIS), "Bad Gateway");

        let empty = ClientError::Status {
            status: 500,
            body: "  ".to_string(),
        };
        assert_eq!(empty.user_message(fallback::GET_ANALYSIS), "获取分析任务失败");

        let network = ClientError::Network("connection refused".to_string());
        assert_eq!(network.user_message(fallback::SEND_CODE), "发送验证码失败");
    }

    #[test]
    fn test_validation_detail_list() {
        let body = r#"{"detail":[{"loc":["body","phone"],"msg":"field required"}]}"#;
        assert_eq!(error_text_from_body(body).as_deref(), Some("field required"));
    }
}
