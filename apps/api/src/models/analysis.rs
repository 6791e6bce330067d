use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::workflow::machine::SUBMISSION_FAILED_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisState {
    Processing,
    Completed,
    Failed,
}

impl AnalysisState {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisState::Processing => "processing",
            AnalysisState::Completed => "completed",
            AnalysisState::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "processing" => Some(AnalysisState::Processing),
            "completed" => Some(AnalysisState::Completed),
            "failed" => Some(AnalysisState::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRow {
    #[serde(skip_serializing)]
    pub id: Uuid,
    pub analysis_id: String,
    pub resume_filename: String,
    pub job_description_filename: Option<String>,
    pub resume_text: String,
    pub job_description_text: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub result: Option<Value>,
    pub source_format: Option<String>,
    pub score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisRow {
    pub fn state(&self) -> Option<AnalysisState> {
        AnalysisState::parse(&self.status)
    }
}

/// List projection without the large text and result columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummaryRow {
    pub analysis_id: String,
    pub resume_filename: String,
    pub job_description_filename: Option<String>,
    pub status: String,
    pub score: Option<i32>,
    pub source_format: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Progress record kept in the cache while an analysis runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    pub status: AnalysisState,
    pub progress: u8,
    pub current_stage: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisStatus {
    pub fn processing(started_at: DateTime<Utc>) -> Self {
        Self {
            status: AnalysisState::Processing,
            progress: 10,
            current_stage: "queued".to_string(),
            started_at,
            completed_at: None,
            failed_at: None,
            error: None,
        }
    }

    pub fn stage(mut self, stage: &str, progress: u8) -> Self {
        self.current_stage = stage.to_string();
        self.progress = progress.min(100);
        self
    }

    pub fn completed(started_at: DateTime<Utc>, at: DateTime<Utc>) -> Self {
        Self {
            status: AnalysisState::Completed,
            progress: 100,
            current_stage: "completed".to_string(),
            started_at,
            completed_at: Some(at),
            failed_at: None,
            error: None,
        }
    }

    pub fn failed(started_at: DateTime<Utc>, at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            status: AnalysisState::Failed,
            progress: 0,
            current_stage: "failed".to_string(),
            started_at,
            completed_at: None,
            failed_at: Some(at),
            error: Some(error.into()),
        }
    }

    /// Rebuilds the status from a stored row when the cache entry has expired.
    /// The stored error detail stays in the row; clients only see the generic message.
    pub fn from_row(row: &AnalysisRow) -> Self {
        match row.state() {
            Some(AnalysisState::Completed) => {
                Self::completed(row.created_at, row.completed_at.unwrap_or(row.updated_at))
            }
            Some(AnalysisState::Failed) => {
                Self::failed(row.created_at, row.updated_at, SUBMISSION_FAILED_MESSAGE)
            }
            _ => Self::processing(row.created_at).stage("analyzing", 50),
        }
    }
}
