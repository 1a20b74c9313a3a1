//! Form State
//!
//! Login and birth-profile forms: what gates their buttons, and how the
//! profile plus the backend's Bazi pre-calculation becomes an analysis request.

use chrono::{Datelike, NaiveDate, NaiveTime};
use thiserror::Error;

use crate::models::{AnalysisInput, BasicProfileInput, BaziResult, Gender};

/// Phone + SMS code login form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub phone: String,
    pub code: String,
    /// Optional referral code of whoever invited this user
    pub inviter_code: String,
}

impl LoginForm {
    pub fn can_send_code(&self) -> bool {
        !self.phone.trim().is_empty()
    }

    pub fn can_submit(&self) -> bool {
        !self.phone.trim().is_empty() && !self.code.trim().is_empty()
    }

    /// Inviter code to send, `None` when blank
    pub fn inviter(&self) -> Option<String> {
        let code = self.inviter_code.trim();
        (!code.is_empty()).then(|| code.to_string())
    }
}

/// Reasons a birth profile cannot be submitted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("请填写出生日期")]
    MissingBirthDate,

    #[error("出生日期格式无效: {0}")]
    InvalidBirthDate(String),

    #[error("请填写出生时间")]
    MissingBirthTime,

    #[error("出生时间格式无效: {0}")]
    InvalidBirthTime(String),

    #[error("请填写出生地点")]
    MissingBirthLocation,
}

/// The birth form is exactly the profile payload
pub type ProfileForm = BasicProfileInput;

impl Default for BasicProfileInput {
    fn default() -> Self {
        Self {
            name: Some(String::new()),
            gender: Gender::Male,
            birth_date: "1990-01-01".to_string(),
            birth_time: "06:00".to_string(),
            birth_location: String::new(),
        }
    }
}

impl BasicProfileInput {
    pub fn validate(&self) -> Result<(), FormError> {
        let date = self.birth_date.trim();
        if date.is_empty() {
            return Err(FormError::MissingBirthDate);
        }
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| FormError::InvalidBirthDate(date.to_string()))?;

        let time = self.birth_time.trim();
        if time.is_empty() {
            return Err(FormError::MissingBirthTime);
        }
        NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
            .map_err(|_| FormError::InvalidBirthTime(time.to_string()))?;

        if self.birth_location.trim().is_empty() {
            return Err(FormError::MissingBirthLocation);
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Leading `YYYY` of the birth date, or `fallback` if it is not a positive number
    pub fn birth_year(&self, fallback: i32) -> i32 {
        self.birth_date
            .split('-')
            .next()
            .and_then(|y| y.trim().parse::<i32>().ok())
            .filter(|y| *y > 0)
            .unwrap_or(fallback)
    }

    /// Name to send, `None` when blank
    pub fn trimmed_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    /// Combine the form with the Bazi pre-calculation into an analysis request
    pub fn build_analysis_input(&self, bazi: &BaziResult, fallback_year: i32) -> AnalysisInput {
        AnalysisInput {
            name: self.name.clone(),
            gender: self.gender,
            birth_year: self.birth_year(fallback_year),
            year_pillar: bazi.bazi.year.label(),
            month_pillar: bazi.bazi.month.label(),
            day_pillar: bazi.bazi.day.label(),
            hour_pillar: bazi.bazi.hour.label(),
            start_age: bazi.start_age,
            first_da_yun: bazi.da_yun.first().cloned().unwrap_or_default(),
            birth_date: Some(self.birth_date.clone()),
            birth_time: Some(self.birth_time.clone()),
            birth_location: Some(self.birth_location.clone()),
        }
    }

    /// Refill the form from the user's latest analysis, keeping current values
    /// for anything the old input lacks
    pub fn prefill_from(&mut self, latest: &AnalysisInput) {
        if let Some(name) = latest.name.as_deref().filter(|n| !n.is_empty()) {
            self.name = Some(name.to_string());
        }
        self.gender = latest.gender;

        if let Some(date) = latest.birth_date.as_deref().filter(|d| !d.is_empty()) {
            self.birth_date = date.to_string();
        } else if self.birth_date.is_empty() && latest.birth_year > 0 {
            self.birth_date = format!("{}-01-01", latest.birth_year);
        }

        if let Some(time) = latest.birth_time.as_deref().filter(|t| !t.is_empty()) {
            self.birth_time = time.to_string();
        }
        if let Some(location) = latest.birth_location.as_deref().filter(|l| !l.is_empty()) {
            self.birth_location = location.to_string();
        }
    }
}

/// Current calendar year, the fallback when the birth date has no usable year
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaziChart, BaziPillar};

    fn pillar(gan: &str, zhi: &str) -> BaziPillar {
        BaziPillar {
            gan: gan.to_string(),
            zhi: zhi.to_string(),
            element: None,
        }
    }

    fn bazi_for(form: &ProfileForm) -> BaziResult {
        BaziResult {
            user_input: form.clone(),
            solar_time: form.birth_time.clone(),
            lunar_date: String::new(),
            bazi: BaziChart {
                year: pillar("癸", "未"),
                month: pillar("壬", "戌"),
                day: pillar("丙", "子"),
                hour: pillar("庚", "寅"),
            },
            start_age: 8,
            direction: "Backward".to_string(),
            da_yun: vec!["辛酉".to_string(), "庚申".to_string()],
        }
    }

    #[test]
    fn test_login_gates() {
        let mut form = LoginForm::default();
        assert!(!form.can_send_code());
        assert!(!form.can_submit());

        form.phone = "13900000001".to_string();
        assert!(form.can_send_code());
        assert!(!form.can_submit());

        form.code = "123456".to_string();
        assert!(form.can_submit());
        assert_eq!(form.inviter(), None);

        form.inviter_code = " ABC123 ".to_string();
        assert_eq!(form.inviter().as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_default_profile_needs_location() {
        let mut form = ProfileForm::default();
        assert_eq!(form.birth_date, "1990-01-01");
        assert_eq!(form.birth_time, "06:00");
        assert_eq!(form.validate(), Err(FormError::MissingBirthLocation));

        form.birth_location = "中国上海".to_string();
        assert!(form.is_valid());
    }

    #[test]
    fn test_profile_rejects_bad_date_and_time() {
        let mut form = ProfileForm {
            birth_location: "北京".to_string(),
            ..Default::default()
        };

        form.birth_date = "1990-13-40".to_string();
        assert!(matches!(form.validate(), Err(FormError::InvalidBirthDate(_))));

        form.birth_date = "1990-02-03".to_string();
        form.birth_time = String::new();
        assert_eq!(form.validate(), Err(FormError::MissingBirthTime));

        form.birth_time = "25:61".to_string();
        assert!(matches!(form.validate(), Err(FormError::InvalidBirthTime(_))));
    }

    #[test]
    fn test_birth_year_fallback() {
        let mut form = ProfileForm::default();
        assert_eq!(form.birth_year(2025), 1990);

        form.birth_date = String::new();
        assert_eq!(form.birth_year(2025), 2025);

        form.birth_date = "0000-01-01".to_string();
        assert_eq!(form.birth_year(2025), 2025);
    }

    #[test]
    fn test_build_analysis_input() {
        let form = ProfileForm {
            name: Some("测试用户".to_string()),
            gender: Gender::Female,
            birth_date: "2003-10-12".to_string(),
            birth_time: "04:30".to_string(),
            birth_location: "杭州".to_string(),
        };
        let input = form.build_analysis_input(&bazi_for(&form), 2025);

        assert_eq!(input.birth_year, 2003);
        assert_eq!(input.year_pillar, "癸未");
        assert_eq!(input.hour_pillar, "庚寅");
        assert_eq!(input.start_age, 8);
        assert_eq!(input.first_da_yun, "辛酉");
        assert_eq!(input.gender, Gender::Female);
        assert_eq!(input.birth_location.as_deref(), Some("杭州"));

        let mut no_da_yun = bazi_for(&form);
        no_da_yun.da_yun.clear();
        assert_eq!(form.build_analysis_input(&no_da_yun, 2025).first_da_yun, "");
    }

    #[test]
    fn test_prefill_keeps_missing_fields() {
        let mut form = ProfileForm {
            birth_location: "广州".to_string(),
            ..Default::default()
        };
        let latest = AnalysisInput {
            name: Some("李四".to_string()),
            gender: Gender::Female,
            birth_year: 1985,
            birth_time: Some("23:15".to_string()),
            ..Default::default()
        };

        form.prefill_from(&latest);
        assert_eq!(form.name.as_deref(), Some("李四"));
        assert_eq!(form.gender, Gender::Female);
        assert_eq!(form.birth_date, "1990-01-01");
        assert_eq!(form.birth_time, "23:15");
        assert_eq!(form.birth_location, "广州");

        form.birth_date.clear();
        form.prefill_from(&latest);
        assert_eq!(form.birth_date, "1985-01-01");
    }
}
