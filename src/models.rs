//! Wire Types
//!
//! Request and response shapes of the Life Bull Market REST API. Field names
//! follow the backend exactly (a mix of snake_case and camelCase), so most
//! structs carry explicit serde renames.
//!
//! Everything the client only displays is decoded leniently: missing fields
//! fall back to their defaults instead of failing the whole response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============ Auth ============

#[derive(Debug, Clone, Serialize)]
pub struct SendCodeRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendCodeResponse {
    #[serde(default = "default_true")]
    pub success: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
    /// Sent as `null` when the user left the field blank
    #[serde(rename = "inviterCode")]
    pub inviter_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// ============ User ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMe {
    pub id: i64,
    pub phone: String,
    pub referral_code: String,
    #[serde(default)]
    pub inviter_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

/// `GET /user/me`: the user plus today's quota and invite statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMeResponse {
    pub user: UserMe,
    #[serde(default, deserialize_with = "lenient::count")]
    pub today_base_quota: i64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub today_extra_quota: i64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub today_used: i64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub today_remaining: i64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_invited: i64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub invited_today: i64,
    #[serde(default)]
    pub my_referral_url: String,
}

impl UserMeResponse {
    /// Base plus referral-earned analyses for today
    pub fn today_total_quota(&self) -> i64 {
        self.today_base_quota + self.today_extra_quota
    }
}

// ============ Birth profile & Bazi ============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Traditional chart label: 乾造 for male, 坤造 for female
    pub fn chart_label(&self) -> &'static str {
        match self {
            Gender::Male => "乾造 (男)",
            Gender::Female => "坤造 (女)",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "男" => Ok(Gender::Male),
            "female" | "f" | "女" => Ok(Gender::Female),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}

/// Raw birth information as typed by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicProfileInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    /// `YYYY-MM-DD`, Gregorian calendar
    #[serde(default)]
    pub birth_date: String,
    /// `HH:mm`
    #[serde(default)]
    pub birth_time: String,
    /// Free-text city or place
    #[serde(default)]
    pub birth_location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaziPillar {
    pub gan: String,
    pub zhi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

impl BaziPillar {
    /// Stem-branch pair, e.g. `癸未`
    pub fn label(&self) -> String {
        format!("{}{}", self.gan, self.zhi)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaziChart {
    pub year: BaziPillar,
    pub month: BaziPillar,
    pub day: BaziPillar,
    pub hour: BaziPillar,
}

impl BaziChart {
    /// Pillars in year, month, day, hour order with their Chinese names
    pub fn pillars(&self) -> [(&'static str, &BaziPillar); 4] {
        [
            ("年柱", &self.year),
            ("月柱", &self.month),
            ("日柱", &self.day),
            ("时柱", &self.hour),
        ]
    }
}

/// Result of the backend's deterministic Bazi pre-calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaziResult {
    pub user_input: BasicProfileInput,
    #[serde(default)]
    pub solar_time: String,
    #[serde(default)]
    pub lunar_date: String,
    pub bazi: BaziChart,
    #[serde(default)]
    pub start_age: i32,
    /// `Forward` or `Backward`
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub da_yun: Vec<String>,
}

impl BaziResult {
    pub fn is_forward(&self) -> bool {
        self.direction.eq_ignore_ascii_case("forward")
    }
}

// ============ Analysis ============

/// Payload of `POST /analysis`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub gender: Gender,
    pub birth_year: i32,
    pub year_pillar: String,
    pub month_pillar: String,
    pub day_pillar: String,
    pub hour_pillar: String,
    pub start_age: i32,
    pub first_da_yun: String,
    /// Original birth info, kept for history and form prefill
    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(rename = "birthTime", skip_serializing_if = "Option::is_none")]
    pub birth_time: Option<String>,
    #[serde(rename = "birthLocation", skip_serializing_if = "Option::is_none")]
    pub birth_location: Option<String>,
}

/// Analysis job status. Anything other than `pending` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisStatus {
    Pending,
    Done,
    Error,
    Other(String),
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Done => "done",
            AnalysisStatus::Error => "error",
            AnalysisStatus::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnalysisStatus::Pending)
    }
}

impl From<String> for AnalysisStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => AnalysisStatus::Pending,
            "done" => AnalysisStatus::Done,
            "error" => AnalysisStatus::Error,
            _ => AnalysisStatus::Other(s),
        }
    }
}

impl From<AnalysisStatus> for String {
    fn from(status: AnalysisStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisCreateResponse {
    pub id: i64,
    pub status: AnalysisStatus,
}

/// `GET /analysis/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetail {
    pub id: i64,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub input: AnalysisInput,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl AnalysisDetail {
    /// Decoded report, available once the job produced output
    pub fn destiny(&self) -> Option<LifeDestinyResult> {
        self.output.as_ref().and_then(LifeDestinyResult::from_output)
    }
}

/// One candle of the life chart: a single year of age
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KLinePoint {
    #[serde(deserialize_with = "lenient::age")]
    pub age: u32,
    #[serde(deserialize_with = "lenient::year")]
    pub year: i32,
    #[serde(deserialize_with = "lenient::text")]
    pub gan_zhi: String,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub da_yun: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub open: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub close: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub high: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub low: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub reason: String,
}

/// Narrative report sections with 0-10 scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisData {
    #[serde(deserialize_with = "lenient::text_list")]
    pub bazi: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(deserialize_with = "lenient::number")]
    pub summary_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub personality: String,
    #[serde(deserialize_with = "lenient::number")]
    pub personality_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub industry: String,
    #[serde(deserialize_with = "lenient::number")]
    pub industry_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub feng_shui: String,
    #[serde(deserialize_with = "lenient::number")]
    pub feng_shui_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub wealth: String,
    #[serde(deserialize_with = "lenient::number")]
    pub wealth_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub marriage: String,
    #[serde(deserialize_with = "lenient::number")]
    pub marriage_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub health: String,
    #[serde(deserialize_with = "lenient::number")]
    pub health_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub family: String,
    #[serde(deserialize_with = "lenient::number")]
    pub family_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub crypto: String,
    #[serde(deserialize_with = "lenient::number")]
    pub crypto_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub crypto_year: String,
    #[serde(deserialize_with = "lenient::text")]
    pub crypto_style: String,
}

/// A titled, scored block of report text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSection<'a> {
    pub title: &'static str,
    pub text: &'a str,
    pub score: f64,
}

impl AnalysisData {
    /// Report sections in display order
    pub fn sections(&self) -> Vec<ReportSection<'_>> {
        vec![
            ReportSection { title: "命理总评", text: &self.summary, score: self.summary_score },
            ReportSection { title: "性格分析", text: &self.personality, score: self.personality_score },
            ReportSection { title: "事业行业", text: &self.industry, score: self.industry_score },
            ReportSection { title: "发展风水", text: &self.feng_shui, score: self.feng_shui_score },
            ReportSection { title: "财富层级", text: &self.wealth, score: self.wealth_score },
            ReportSection { title: "婚姻情感", text: &self.marriage, score: self.marriage_score },
            ReportSection { title: "身体健康", text: &self.health, score: self.health_score },
            ReportSection { title: "六亲关系", text: &self.family, score: self.family_score },
            ReportSection { title: "币圈交易运势", text: &self.crypto, score: self.crypto_score },
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeDestinyResult {
    pub chart_data: Vec<KLinePoint>,
    pub analysis: AnalysisData,
}

impl LifeDestinyResult {
    /// Decode an analysis `output` value.
    ///
    /// Accepts the nested `{ chartData, analysis }` shape as well as a flat
    /// analysis object that carries its points under `chartPoints`. The output
    /// may also arrive as a JSON-encoded string.
    pub fn from_output(output: &Value) -> Option<Self> {
        if let Value::String(raw) = output {
            let parsed: Value = serde_json::from_str(raw).ok()?;
            return Self::from_output(&parsed);
        }

        let obj = output.as_object()?;
        let analysis_value = obj
            .get("analysis")
            .filter(|v| v.is_object())
            .unwrap_or(output);

        let analysis: AnalysisData =
            serde_json::from_value(analysis_value.clone()).unwrap_or_default();

        let points = obj
            .get("chartData")
            .or_else(|| obj.get("chartPoints"))
            .or_else(|| analysis_value.get("chartPoints"));

        let chart_data = points
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<KLinePoint>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            chart_data,
            analysis,
        })
    }
}

/// FastAPI-style error body: `{"detail": "..."}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

/// Field decoders that coerce instead of failing: numeric strings count as
/// numbers, numbers as text, and anything unusable becomes the default.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_f64(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    }

    fn as_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(as_f64(&Value::deserialize(d)?).unwrap_or_default())
    }

    /// Integer counters; float casts saturate
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(as_f64(&Value::deserialize(d)?).map(|n| n as i64).unwrap_or_default())
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        Ok(as_f64(&Value::deserialize(d)?).map(|n| n as i32).unwrap_or_default())
    }

    /// Negative ages clamp to 0
    pub fn age<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(as_f64(&Value::deserialize(d)?).map(|n| n as u32).unwrap_or_default())
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(as_text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(as_text(Value::deserialize(d)?))
    }

    /// A list of strings; a lone string becomes a one-item list
    pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(as_text).collect(),
            other => as_text(other).into_iter().collect(),
        })
    }
}
