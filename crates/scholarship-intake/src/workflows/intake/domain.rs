use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a persisted applicant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased, sanitized email used as the uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedEmail(String);

impl NormalizedEmail {
    pub fn parse(raw: &str) -> Self {
        Self(super::sanitize::sanitize(raw).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Domain portion, safe to log without exposing the mailbox.
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("")
    }
}

impl AsRef<str> for NormalizedEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternetType {
    Wifi,
    MobileData,
}

impl InternetType {
    pub const ALL: [InternetType; 2] = [InternetType::Wifi, InternetType::MobileData];

    pub const fn label(self) -> &'static str {
        match self {
            InternetType::Wifi => "wifi",
            InternetType::MobileData => "mobile_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    PreferNotToSay,
    Female,
    Male,
    Nonbinary,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 5] = [
        Gender::PreferNotToSay,
        Gender::Female,
        Gender::Male,
        Gender::Nonbinary,
        Gender::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Gender::PreferNotToSay => "prefer_not_to_say",
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Nonbinary => "nonbinary",
            Gender::Other => "other",
        }
    }
}

/// Submission after every field passed its constraint. Strings are trimmed but not yet sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedSubmission {
    pub full_name: String,
    pub email: String,
    pub university: String,
    pub motivation: String,
    pub year_level: String,
    pub location: Option<String>,
    pub device: String,
    pub learning_hopes: String,
    pub goal: String,
    pub commitment_hours: u8,
    pub internet_type: InternetType,
    pub age: u8,
    pub gender: Option<Gender>,
    pub facebook_link: String,
    pub social_share_link: String,
}

/// Review status tracked on the persisted applicant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantStatus {
    Pending,
}

impl ApplicantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantStatus::Pending => "pending",
        }
    }
}

/// Row handed to the store for insertion. Column names follow the applicants table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplicant {
    pub full_name: String,
    pub email: NormalizedEmail,
    pub university: String,
    pub motivation: String,
    pub status: ApplicantStatus,
    pub age: u8,
    pub gender: Option<Gender>,
    pub course_year: String,
    pub facebook_link: String,
    pub learning_topic: String,
    pub connection_type: InternetType,
    pub consent: bool,
    pub goal: String,
}

/// Applicant row as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub id: ApplicantId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub applicant: NewApplicant,
}

impl ApplicantRecord {
    pub fn email(&self) -> &NormalizedEmail {
        &self.applicant.email
    }
}

/// Payload for the best-effort confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEmail {
    pub to: String,
    pub name: String,
}

/// Workflow states. Each transition is logged with its stage, and server errors record the
/// stage they interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    Received,
    Validated,
    CheckedForDuplicate,
    Persisted,
    Notified,
}

impl SubmissionStage {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStage::Received => "received",
            SubmissionStage::Validated => "validated",
            SubmissionStage::CheckedForDuplicate => "checked_for_duplicate",
            SubmissionStage::Persisted => "persisted",
            SubmissionStage::Notified => "notified",
        }
    }
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
