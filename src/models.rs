use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    OnSite,
    #[default]
    Unknown,
}

impl WorkArrangement {
    /// Label used inside digest lines. Unknown renders as the em-dash placeholder.
    pub fn label(&self) -> &'static str {
        match self {
            WorkArrangement::Remote => "Remote",
            WorkArrangement::Hybrid => "Hybrid",
            WorkArrangement::OnSite => "On-site",
            WorkArrangement::Unknown => "—",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "remote" => WorkArrangement::Remote,
            "hybrid" => WorkArrangement::Hybrid,
            "on-site" | "onsite" | "on site" | "office" => WorkArrangement::OnSite,
            _ => WorkArrangement::Unknown,
        }
    }
}

/// One candidate record as produced by a source collaborator (mail, feed, scrape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawJobRecord {
    pub title: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub work_arrangement: Option<WorkArrangement>,
    #[serde(default)]
    pub description_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub source_tag: String,
    /// Ranking score assigned by the source; decides the digest section.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Which source supplied each free-text field, for priority tie-breaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSources {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub work_arrangement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub identity: String,
    pub url: String,
    pub title: String,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub work_arrangement: WorkArrangement,
    pub description_text: Option<String>,
    pub source_tag: String,
    pub score: Option<f64>,
    pub excluded: bool,
    pub sources: FieldSources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Pending,
    Removed,
    Enriched,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Removed => "removed",
            Stage::Enriched => "enriched",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Stage::Removed | Stage::Enriched)
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(Stage::Pending),
            "removed" => Ok(Stage::Removed),
            "enriched" => Ok(Stage::Enriched),
            other => Err(anyhow::anyhow!("Unknown enrichment stage '{}'", other)),
        }
    }
}

/// Fields produced by enrichment and written back into the digest line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFields {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub work_arrangement: Option<WorkArrangement>,
    /// Why the job was removed (closed posting, arrangement not wanted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentRecord {
    pub stage: Stage,
    pub result_fields: ResultFields,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Responded,
    Interview,
    Offer,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Responded,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Responded => "responded",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Position on the progress ladder; `None` for the definitive negative outcomes.
    pub fn progress_rank(&self) -> Option<u8> {
        match self {
            ApplicationStatus::Applied => Some(0),
            ApplicationStatus::Responded => Some(1),
            ApplicationStatus::Interview => Some(2),
            ApplicationStatus::Offer => Some(3),
            ApplicationStatus::Rejected | ApplicationStatus::Withdrawn => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, TrackerError> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| TrackerError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: ApplicationStatus,
    pub date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: String,
    pub text: String,
}

/// The ingestion path that produced an application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Manual,
    DigestMark,
    ResumeScan,
    ReplyEmail,
}

impl Origin {
    pub const ALL: [Origin; 4] = [
        Origin::Manual,
        Origin::DigestMark,
        Origin::ResumeScan,
        Origin::ReplyEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Manual => "manual",
            Origin::DigestMark => "digest-mark",
            Origin::ResumeScan => "resume-scan",
            Origin::ReplyEmail => "reply-email",
        }
    }
}

impl FromStr for Origin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Origin::ALL
            .into_iter()
            .find(|origin| origin.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                anyhow::anyhow!("Unknown origin '{}' (expected manual, digest-mark, resume-scan, reply-email)", s)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub role: String,
    pub organization: String,
    pub applied_date: NaiveDate,
    pub source: String,
    pub url: Option<String>,
    pub job_identity: Option<String>,
    pub status: ApplicationStatus,
    pub status_history: Vec<StatusEntry>,
    pub response_date: Option<NaiveDate>,
    pub response_days: Option<i64>,
    pub interview_dates: Vec<NaiveDate>,
    pub offer_date: Option<NaiveDate>,
    pub rejection_date: Option<NaiveDate>,
    pub feedback: Option<Feedback>,
    pub has_cover_letter: bool,
    pub resume_sent: bool,
}
