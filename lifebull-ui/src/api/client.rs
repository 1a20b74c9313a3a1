//! HTTP API Client
//!
//! Fetch wrappers for the Life Bull Market REST API. Every function returns
//! the text to show on failure, already reduced from the response.

use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;

use lifebull::error::{fallback, ClientError};
use lifebull::models::{
    AnalysisCreateResponse, AnalysisDetail, AnalysisInput, BasicProfileInput, BaziResult,
    SendCodeRequest, SendCodeResponse, TokenResponse, UserMeResponse, VerifyCodeRequest,
};
use lifebull::session::API_URL_KEY;
use lifebull::KeyValueStore;

use crate::state::LocalStorage;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// API base URL: local storage override, then the build-time value, then the default
pub fn get_api_base() -> String {
    let url = LocalStorage
        .get(API_URL_KEY)
        .filter(|u| !u.trim().is_empty())
        .or_else(|| option_env!("LIFEBULL_API_BASE").map(str::to_string))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    normalize_base(&url)
}

fn normalize_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn url(path: &str) -> String {
    format!("{}{}", get_api_base(), path)
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn read<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, String> {
    if !response.ok() {
        let error = ClientError::Status {
            status: response.status(),
            body: response.text().await.unwrap_or_default(),
        };
        return Err(error.user_message(fallback));
    }
    response
        .json()
        .await
        .map_err(|e| format!("Parse error: {}", e))
}

fn network(fallback: &'static str) -> impl Fn(gloo_net::Error) -> String {
    move |e| {
        web_sys::console::error_1(&format!("Network error: {}", e).into());
        fallback.to_string()
    }
}

// ============ Auth ============

pub async fn send_code(phone: &str) -> Result<SendCodeResponse, String> {
    let response = Request::post(&url("/auth/send-code"))
        .json(&SendCodeRequest {
            phone: phone.trim().to_string(),
        })
        .map_err(|e| format!("Request build error: {}", e))?
        .send()
        .await
        .map_err(network(fallback::SEND_CODE))?;

    read(response, fallback::SEND_CODE).await
}

pub async fn verify_code(
    phone: &str,
    code: &str,
    inviter_code: Option<String>,
) -> Result<TokenResponse, String> {
    let response = Request::post(&url("/auth/verify-code"))
        .json(&VerifyCodeRequest {
            phone: phone.trim().to_string(),
            code: code.trim().to_string(),
            inviter_code,
        })
        .map_err(|e| format!("Request build error: {}", e))?
        .send()
        .await
        .map_err(network(fallback::VERIFY_CODE))?;

    read(response, fallback::VERIFY_CODE).await
}

// ============ User ============

pub async fn get_me(token: &str) -> Result<UserMeResponse, String> {
    let response = Request::get(&url("/user/me"))
        .header("Authorization", &bearer(token))
        .send()
        .await
        .map_err(network(fallback::GET_ME))?;

    read(response, fallback::GET_ME).await
}

// ============ Bazi & analysis ============

pub async fn calculate_bazi(token: &str, profile: &BasicProfileInput) -> Result<BaziResult, String> {
    let response = Request::post(&url("/bazi/calculate"))
        .header("Authorization", &bearer(token))
        .json(profile)
        .map_err(|e| format!("Request build error: {}", e))?
        .send()
        .await
        .map_err(network(fallback::CALCULATE_BAZI))?;

    read(response, fallback::CALCULATE_BAZI).await
}

pub async fn create_analysis(
    token: &str,
    input: &AnalysisInput,
) -> Result<AnalysisCreateResponse, String> {
    let response = Request::post(&url("/analysis"))
        .header("Authorization", &bearer(token))
        .json(input)
        .map_err(|e| format!("Request build error: {}", e))?
        .send()
        .await
        .map_err(network(fallback::CREATE_ANALYSIS))?;

    read(response, fallback::CREATE_ANALYSIS).await
}

pub async fn get_analysis(token: &str, id: i64) -> Result<AnalysisDetail, String> {
    let response = Request::get(&url(&format!("/analysis/{}", id)))
        .header("Authorization", &bearer(token))
        .send()
        .await
        .map_err(network(fallback::GET_ANALYSIS))?;

    read(response, fallback::GET_ANALYSIS).await
}

/// Latest analysis of the user; 404 or `null` means none
pub async fn get_latest_analysis(token: &str) -> Result<Option<AnalysisDetail>, String> {
    let response = Request::get(&url("/analysis/latest"))
        .header("Authorization", &bearer(token))
        .send()
        .await
        .map_err(network(fallback::GET_ANALYSIS))?;

    if response.status() == 404 {
        return Ok(None);
    }
    read::<Option<AnalysisDetail>>(response, fallback::GET_ANALYSIS).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("http://localhost:8000/"), "http://localhost:8000");
        assert_eq!(normalize_base(" https://api.example.com// "), "https://api.example.com");
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(bearer("abc"), "Bearer abc");
    }
}
