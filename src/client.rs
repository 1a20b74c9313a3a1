//! Life Bull Market REST API Client
//!
//! HTTP client for the backend's auth, user, bazi and analysis endpoints.
//! Authenticated calls take the bearer token explicitly; the caller decides
//! where it comes from.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AnalysisCreateResponse, AnalysisDetail, AnalysisInput, BasicProfileInput, BaziResult,
    SendCodeRequest, SendCodeResponse, TokenResponse, UserMeResponse, VerifyCodeRequest,
};
use crate::poll::AnalysisSource;

/// REST API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> ClientResult<Self> {
        Self::new(&config.api.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request an SMS code for `phone`
    pub async fn send_code(&self, phone: &str) -> ClientResult<SendCodeResponse> {
        let body = SendCodeRequest {
            phone: phone.to_string(),
        };
        self.execute(self.http.post(self.url("/auth/send-code")).json(&body))
            .await
    }

    /// Exchange phone + code (and an optional inviter code) for a token
    pub async fn verify_code(
        &self,
        phone: &str,
        code: &str,
        inviter_code: Option<&str>,
    ) -> ClientResult<TokenResponse> {
        let body = VerifyCodeRequest {
            phone: phone.to_string(),
            code: code.to_string(),
            inviter_code: inviter_code
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        };
        self.execute(self.http.post(self.url("/auth/verify-code")).json(&body))
            .await
    }

    pub async fn me(&self, token: &str) -> ClientResult<UserMeResponse> {
        self.execute(self.http.get(self.url("/user/me")).bearer_auth(token))
            .await
    }

    /// Deterministic four-pillar calculation for a birth profile
    pub async fn calculate_bazi(
        &self,
        token: &str,
        profile: &BasicProfileInput,
    ) -> ClientResult<BaziResult> {
        self.execute(
            self.http
                .post(self.url("/bazi/calculate"))
                .bearer_auth(token)
                .json(profile),
        )
        .await
    }

    /// Queue an analysis job
    pub async fn create_analysis(
        &self,
        token: &str,
        input: &AnalysisInput,
    ) -> ClientResult<AnalysisCreateResponse> {
        self.execute(
            self.http
                .post(self.url("/analysis"))
                .bearer_auth(token)
                .json(input),
        )
        .await
    }

    pub async fn get_analysis(&self, token: &str, id: i64) -> ClientResult<AnalysisDetail> {
        self.execute(
            self.http
                .get(self.url(&format!("/analysis/{}", id)))
                .bearer_auth(token),
        )
        .await
    }

    /// The user's most recent analysis, `None` if there is none yet
    pub async fn latest_analysis(&self, token: &str) -> ClientResult<Option<AnalysisDetail>> {
        let response = self
            .http
            .get(self.url("/analysis/latest"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let value: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Bind a token for polling
    pub fn analysis_source<'a>(&'a self, token: &'a str) -> TokenAnalysisSource<'a> {
        TokenAnalysisSource {
            client: self,
            token,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await.map_err(transport_error)?;
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// [`ApiClient`] plus a token, as an [`AnalysisSource`]
pub struct TokenAnalysisSource<'a> {
    client: &'a ApiClient,
    token: &'a str,
}

#[async_trait]
impl AnalysisSource for TokenAnalysisSource<'_> {
    async fn fetch_analysis(&self, id: i64) -> ClientResult<AnalysisDetail> {
        self.client.get_analysis(self.token, id).await
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Network(format!("request timed out: {}", e))
    } else if e.is_connect() {
        ClientError::Network(format!("backend unavailable: {}", e))
    } else {
        ClientError::Network(e.to_string())
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), "Backend returned error: {}", body);
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::fallback;
    use crate::models::Gender;
    use crate::poll::{PollOutcome, Poller};
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    const GOOD_CODE: &str = "123456";
    const PENDING_POLLS: u32 = 2;

    #[derive(Default)]
    struct FakeBackend {
        polls: AtomicU32,
        inviters: Mutex<Vec<Option<String>>>,
        created: Mutex<Vec<Value>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("Bearer tok-"))
            .unwrap_or(false)
    }

    fn unauthorized() -> AxumResponse {
        (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"}))).into_response()
    }

    fn sample_bazi_json(profile: &Value) -> Value {
        json!({
            "userInput": profile,
            "solarTime": "04:30",
            "lunarDate": "癸未年九月十七",
            "bazi": {
                "year": {"gan": "癸", "zhi": "未"},
                "month": {"gan": "壬", "zhi": "戌"},
                "day": {"gan": "丙", "zhi": "子"},
                "hour": {"gan": "庚", "zhi": "寅"}
            },
            "startAge": 8,
            "direction": "Backward",
            "daYun": ["辛酉", "庚申", "己未"]
        })
    }

    fn done_output() -> Value {
        json!({
            "summary": "先抑后扬",
            "summaryScore": 7,
            "chartPoints": [
                {"age": 1, "year": 2004, "daYun": "童限", "ganZhi": "甲申",
                 "open": 50, "close": 55, "high": 60, "low": 45, "score": 55, "reason": "起"},
                {"age": 2, "year": 2005, "daYun": "童限", "ganZhi": "乙酉",
                 "open": 55, "close": 48, "high": 57, "low": 44, "score": 48, "reason": "落"}
            ]
        })
    }

    async fn send_code(Json(body): Json<Value>) -> AxumResponse {
        match body["phone"].as_str() {
            Some(phone) if !phone.is_empty() => Json(json!({"success": true})).into_response(),
            _ => (AxumStatus::BAD_REQUEST, Json(json!({"detail": "手机号不能为空"}))).into_response(),
        }
    }

    async fn verify_code(
        State(state): State<Arc<FakeBackend>>,
        Json(body): Json<Value>,
    ) -> AxumResponse {
        if body["code"] != GOOD_CODE {
            return (
                AxumStatus::BAD_REQUEST,
                Json(json!({"detail": "Invalid or expired verification code"})),
            )
                .into_response();
        }
        state
            .inviters
            .lock()
            .unwrap()
            .push(body["inviterCode"].as_str().map(str::to_string));
        let phone = body["phone"].as_str().unwrap_or_default();
        Json(json!({"access_token": format!("tok-{}", phone), "token_type": "bearer"})).into_response()
    }

    async fn me(headers: HeaderMap) -> AxumResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        Json(json!({
            "user": {"id": 1, "phone": "13900000001", "referral_code": "ABC123", "inviter_code": null},
            "todayBaseQuota": 5,
            "todayExtraQuota": 2,
            "todayUsed": 1,
            "todayRemaining": 6,
            "totalInvited": 2,
            "invitedToday": 2,
            "myReferralUrl": "http://localhost:5173/auth?ref=ABC123"
        }))
        .into_response()
    }

    async fn calculate(headers: HeaderMap, Json(profile): Json<Value>) -> AxumResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        Json(sample_bazi_json(&profile)).into_response()
    }

    async fn create(
        State(state): State<Arc<FakeBackend>>,
        headers: HeaderMap,
        Json(input): Json<Value>,
    ) -> AxumResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        let mut created = state.created.lock().unwrap();
        created.push(input);
        Json(json!({"id": created.len() as i64 + 6, "status": "pending"})).into_response()
    }

    async fn detail(
        State(state): State<Arc<FakeBackend>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> AxumResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        if id == 404 {
            return (AxumStatus::NOT_FOUND, Json(json!({"detail": "Analysis not found"}))).into_response();
        }
        if id == 500 {
            return (AxumStatus::INTERNAL_SERVER_ERROR, "boom").into_response();
        }
        if id == 13 {
            return Json(json!({
                "id": 13, "status": "error", "input": {},
                "error_message": "LLM 调用失败", "created_at": "2025-01-01T00:00:00"
            }))
            .into_response();
        }

        let seen = state.polls.fetch_add(1, Ordering::SeqCst);
        if seen < PENDING_POLLS {
            Json(json!({"id": id, "status": "pending", "input": {}, "created_at": "2025-01-01T00:00:00"}))
                .into_response()
        } else {
            Json(json!({
                "id": id, "status": "done", "input": {"gender": "Female", "birth_year": 2003},
                "output": done_output(), "created_at": "2025-01-01T00:00:00",
                "completed_at": "2025-01-01T00:01:00"
            }))
            .into_response()
        }
    }

    async fn latest(State(state): State<Arc<FakeBackend>>, headers: HeaderMap) -> AxumResponse {
        if !authorized(&headers) {
            return unauthorized();
        }
        let created = state.created.lock().unwrap();
        match created.last() {
            None => Json(Value::Null).into_response(),
            Some(input) => Json(json!({
                "id": created.len() as i64 + 6, "status": "pending", "input": input,
                "created_at": "2025-01-01T00:00:00"
            }))
            .into_response(),
        }
    }

    /// Start the fake backend on an ephemeral port
    async fn spawn_backend() -> (String, Arc<FakeBackend>) {
        let state = Arc::new(FakeBackend::default());
        let app = Router::new()
            .route("/auth/send-code", post(send_code))
            .route("/auth/verify-code", post(verify_code))
            .route("/user/me", get(me))
            .route("/bazi/calculate", post(calculate))
            .route("/analysis", post(create))
            .route("/analysis/latest", get(latest))
            .route("/analysis/:id", get(detail))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state)
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(format!("{}/", base), Duration::from_secs(5)).unwrap()
    }

    fn profile() -> BasicProfileInput {
        BasicProfileInput {
            name: Some("测试用户".to_string()),
            gender: Gender::Female,
            birth_date: "2003-10-12".to_string(),
            birth_time: "04:30".to_string(),
            birth_location: "杭州".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_flow() {
        let (base, state) = spawn_backend().await;
        let api = client(&base);
        assert_eq!(api.base_url(), base);

        assert!(api.send_code("13900000001").await.unwrap().success);

        let err = api.verify_code("13900000001", "000000", None).await.unwrap_err();
        assert_eq!(
            err.user_message(fallback::VERIFY_CODE),
            "Invalid or expired verification code"
        );

        let token = api
            .verify_code("13900000001", GOOD_CODE, Some("  "))
            .await
            .unwrap();
        assert_eq!(token.access_token, "tok-13900000001");

        api.verify_code("13900000001", GOOD_CODE, Some("ABC123")).await.unwrap();
        assert_eq!(
            *state.inviters.lock().unwrap(),
            vec![None, Some("ABC123".to_string())]
        );

        let me = api.me(&token.access_token).await.unwrap();
        assert_eq!(me.user.referral_code, "ABC123");
        assert_eq!(me.today_total_quota(), 7);

        let anonymous = api.me("garbage").await.unwrap_err();
        assert!(anonymous.is_unauthorized());
    }

    #[tokio::test]
    async fn test_profile_submission_and_latest() {
        let (base, state) = spawn_backend().await;
        let api = client(&base);
        let token = "tok-1";

        assert_eq!(api.latest_analysis(token).await.unwrap(), None);

        let form = profile();
        let bazi = api.calculate_bazi(token, &form).await.unwrap();
        assert_eq!(bazi.bazi.year.label(), "癸未");
        assert_eq!(bazi.user_input, form);

        let input = form.build_analysis_input(&bazi, 2025);
        let created = api.create_analysis(token, &input).await.unwrap();
        assert_eq!(created.id, 7);
        assert!(created.status.is_pending());

        let sent = state.created.lock().unwrap()[0].clone();
        assert_eq!(sent["first_da_yun"], "辛酉");
        assert_eq!(sent["birthLocation"], "杭州");

        let latest = api.latest_analysis(token).await.unwrap().unwrap();
        assert_eq!(latest.input.birth_location.as_deref(), Some("杭州"));
        assert_eq!(latest.input.gender, Gender::Female);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (base, _) = spawn_backend().await;
        let api = client(&base);

        let missing = api.get_analysis("tok-1", 404).await.unwrap_err();
        assert!(missing.is_not_found());
        assert_eq!(missing.user_message(fallback::GET_ANALYSIS), "Analysis not found");

        let broken = api.get_analysis("tok-1", 500).await.unwrap_err();
        assert_eq!(broken.user_message(fallback::GET_ANALYSIS), "boom");

        let failed = api.get_analysis("tok-1", 13).await.unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("LLM 调用失败"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(&format!("http://{}", addr));
        let err = api.send_code("13900000001").await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(err.user_message(fallback::SEND_CODE), "发送验证码失败");
    }

    #[tokio::test]
    async fn test_poll_until_done_against_backend() {
        let (base, state) = spawn_backend().await;
        let api = client(&base);
        let source = api.analysis_source("tok-1");
        let mut statuses = Vec::new();

        let outcome = Poller::new(Duration::from_millis(10))
            .run(&source, 7, |d| statuses.push(d.status.to_string()), std::future::pending())
            .await;

        let done = match outcome {
            PollOutcome::Settled(detail) => detail,
            other => panic!("expected settled poll, got {:?}", other),
        };
        assert_eq!(statuses, vec!["pending", "pending", "done"]);
        assert_eq!(state.polls.load(Ordering::SeqCst), PENDING_POLLS + 1);

        let destiny = done.destiny().unwrap();
        assert_eq!(destiny.chart_data.len(), 2);
        assert_eq!(destiny.analysis.summary, "先抑后扬");
    }
}
