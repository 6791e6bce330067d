use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    #[default]
    General,
    Accuracy,
    Usefulness,
    Interface,
    Other,
}

impl FeedbackCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackCategory::General => "general",
            FeedbackCategory::Accuracy => "accuracy",
            FeedbackCategory::Usefulness => "usefulness",
            FeedbackCategory::Interface => "interface",
            FeedbackCategory::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "general" => Some(FeedbackCategory::General),
            "accuracy" => Some(FeedbackCategory::Accuracy),
            "usefulness" => Some(FeedbackCategory::Usefulness),
            "interface" => Some(FeedbackCategory::Interface),
            "other" => Some(FeedbackCategory::Other),
            _ => None,
        }
    }
}

/// Review state set by admins. New feedback starts as `pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Reviewed,
    Addressed,
    Closed,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Addressed => "addressed",
            FeedbackStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(FeedbackStatus::Pending),
            "reviewed" => Some(FeedbackStatus::Reviewed),
            "addressed" => Some(FeedbackStatus::Addressed),
            "closed" => Some(FeedbackStatus::Closed),
            _ => None,
        }
    }

    /// Moving to one of these stamps `reviewed_at`.
    pub fn marks_review(self) -> bool {
        matches!(self, FeedbackStatus::Reviewed | FeedbackStatus::Addressed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRow {
    #[serde(skip_serializing)]
    pub id: Uuid,
    pub feedback_id: String,
    pub analysis_id: String,
    pub rating: i32,
    pub helpful: bool,
    pub suggestions: String,
    pub category: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Feedback joined with the analysis it rates, for the admin views.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub feedback: FeedbackRow,
    pub resume_filename: String,
    pub job_description_filename: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}
