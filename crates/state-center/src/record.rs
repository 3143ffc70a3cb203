use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use formpilot_core_types::UserId;
use serde::{Deserialize, Serialize};

/// Progress markers persisted across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    RateStepCompleted,
    OnboardingCompleted,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password_len", &self.password.chars().count())
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmploymentEntry {
    pub title: String,
    pub company: String,
    pub location: String,
    pub start_year: String,
    pub end_year: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub school: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_year: String,
    pub end_year: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageEntry {
    pub language: String,
    pub proficiency: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Values the wizard handlers enter on the user's behalf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileData {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    /// Dialling code used when asking OTP providers for a code ("1", "44").
    pub country_code: String,
    pub phone: String,
    pub experience_level: String,
    pub goal: String,
    pub work_preferences: Vec<String>,
    pub title: String,
    pub overview: String,
    pub hourly_rate: String,
    pub skills: Vec<String>,
    pub categories: Vec<String>,
    pub languages: Vec<LanguageEntry>,
    pub employment: Vec<EmploymentEntry>,
    pub education: Vec<EducationEntry>,
    pub address: Address,
    pub birth_date: String,
    pub photo_path: Option<PathBuf>,
}

/// Per-user row owned by the store. The runner reads it once per run and
/// only ever requests field-level updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub credentials: Credentials,
    #[serde(default)]
    pub profile: ProfileData,
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
    #[serde(default)]
    pub session_blob: Option<String>,
    #[serde(default)]
    pub proxy_port: Option<u16>,
    #[serde(default)]
    pub captcha_flagged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub milestones: BTreeMap<Milestone, DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(user_id: UserId, credentials: Credentials) -> Self {
        Self {
            user_id,
            credentials,
            profile: ProfileData::default(),
            resume_path: None,
            session_blob: None,
            proxy_port: None,
            captcha_flagged_at: None,
            milestones: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, profile: ProfileData) -> Self {
        self.profile = profile;
        self
    }

    pub fn reached(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        self.milestones.get(&milestone).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_password() {
        let creds = Credentials {
            email: "a@b.test".into(),
            password: "hunter22".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("password_len: 8"));
    }

    #[test]
    fn minimal_json_record_parses() {
        let raw = r#"{"user_id":"u1","credentials":{"email":"a@b.test","password":"x"}}"#;
        let record: UserRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.user_id.as_str(), "u1");
        assert!(record.milestones.is_empty());
        assert_eq!(record.profile, ProfileData::default());
    }
}
