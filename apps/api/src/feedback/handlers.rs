use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::admin::guard::Admin;
use crate::admin::permissions::Permission;
use crate::analysis::id::{is_valid_analysis_id, AnalysisId, INVALID_ANALYSIS_ID};
use crate::analysis::store::{self as analyses, PageInfo, PageQuery};
use crate::errors::AppError;
use crate::feedback::store::{
    self, FeedbackFilter, FeedbackStats, FeedbackUpdate, NewFeedback, FEEDBACK_PAGE_SIZE,
};
use crate::models::feedback::{FeedbackCategory, FeedbackEntry, FeedbackRow, FeedbackStatus};
use crate::state::AppState;

pub const MAX_SUGGESTIONS_CHARS: usize = 1000;
pub const MAX_ADMIN_NOTES_CHARS: usize = 500;

const MISSING_FIELDS: &str = "Missing required fields: analysisId, rating, helpful, suggestions";

// ────────────────────────────────────────────────────────────────────────────
// Request parsing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub analysis_id: Option<String>,
    pub rating: Option<i64>,
    pub helpful: Option<bool>,
    pub suggestions: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidFeedback {
    pub analysis_id: String,
    pub rating: i32,
    pub helpful: bool,
    pub suggestions: String,
    pub category: FeedbackCategory,
}

impl FeedbackRequest {
    pub fn validate(self) -> Result<ValidFeedback, AppError> {
        let missing = || AppError::Validation(MISSING_FIELDS.to_string());
        let analysis_id = self.analysis_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;
        let rating = self.rating.ok_or_else(missing)?;
        let helpful = self.helpful.ok_or_else(missing)?;
        let suggestions = self
            .suggestions
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(missing)?;

        if !is_valid_analysis_id(&analysis_id) {
            return Err(AppError::Validation(INVALID_ANALYSIS_ID.to_string()));
        }
        let rating = i32::try_from(rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| AppError::Validation("Rating must be between 1 and 5".to_string()))?;
        if suggestions.chars().count() > MAX_SUGGESTIONS_CHARS {
            return Err(AppError::Validation(format!(
                "Suggestions must be less than {MAX_SUGGESTIONS_CHARS} characters"
            )));
        }
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => FeedbackCategory::default(),
            Some(raw) => FeedbackCategory::parse(raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown category '{raw}' (expected general, accuracy, usefulness, interface or other)"
                ))
            })?,
        };

        Ok(ValidFeedback {
            analysis_id,
            rating,
            helpful,
            suggestions,
            category,
        })
    }
}

fn blank_to_none(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Accepts `YYYY-MM-DD` (start or end of that UTC day) or an RFC 3339 timestamp.
fn parse_date_bound(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let invalid = || {
        AppError::Validation(format!(
            "{field} must be a date (YYYY-MM-DD) or an RFC 3339 timestamp"
        ))
    };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    naive.map(|n| Utc.from_utc_datetime(&n)).ok_or_else(invalid)
}

fn parse_range(
    start: Option<String>,
    end: Option<String>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let start = blank_to_none(start)
        .map(|raw| parse_date_bound("startDate", &raw, false))
        .transpose()?;
    let end = blank_to_none(end)
        .map(|raw| parse_date_bound("endDate", &raw, true))
        .transpose()?;
    Ok((start, end))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub rating: Option<String>,
    pub helpful: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl FeedbackListQuery {
    fn filter(self) -> Result<(PageQuery, FeedbackFilter), AppError> {
        let status = blank_to_none(self.status)
            .map(|raw| {
                FeedbackStatus::parse(&raw).ok_or_else(|| {
                    AppError::Validation(format!(
                        "Unknown status '{raw}' (expected pending, reviewed, addressed or closed)"
                    ))
                })
            })
            .transpose()?;
        let category = blank_to_none(self.category)
            .map(|raw| {
                FeedbackCategory::parse(&raw)
                    .ok_or_else(|| AppError::Validation(format!("Unknown category '{raw}'")))
            })
            .transpose()?;
        let rating = blank_to_none(self.rating)
            .map(|raw| {
                raw.parse::<i32>()
                    .ok()
                    .filter(|r| (1..=5).contains(r))
                    .ok_or_else(|| AppError::Validation("Rating must be between 1 and 5".to_string()))
            })
            .transpose()?;
        let helpful = blank_to_none(self.helpful)
            .map(|raw| match raw.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(AppError::Validation(
                    "helpful must be true or false".to_string(),
                )),
            })
            .transpose()?;
        let (start, end) = parse_range(self.start_date, self.end_date)?;

        Ok((
            PageQuery {
                page: self.page,
                limit: Some(self.limit.unwrap_or(FEEDBACK_PAGE_SIZE)),
                ..Default::default()
            },
            FeedbackFilter {
                status,
                category,
                rating,
                helpful,
                start,
                end,
                search: self.search,
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackUpdateRequest {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

impl FeedbackUpdateRequest {
    pub fn validate(self) -> Result<FeedbackUpdate, AppError> {
        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => Some(FeedbackStatus::parse(raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown status '{raw}' (expected pending, reviewed, addressed or closed)"
                ))
            })?),
        };
        let admin_notes = self.admin_notes.map(|s| s.trim().to_string());
        if admin_notes
            .as_deref()
            .is_some_and(|n| n.chars().count() > MAX_ADMIN_NOTES_CHARS)
        {
            return Err(AppError::Validation(format!(
                "Admin notes must be less than {MAX_ADMIN_NOTES_CHARS} characters"
            )));
        }
        if status.is_none() && admin_notes.is_none() {
            return Err(AppError::Validation(
                "Nothing to update: provide status or adminNotes".to_string(),
            ));
        }
        Ok(FeedbackUpdate {
            status,
            admin_notes,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CSV export
// ────────────────────────────────────────────────────────────────────────────

const CSV_COLUMNS: [&str; 11] = [
    "feedbackId",
    "analysisId",
    "resumeFilename",
    "rating",
    "helpful",
    "category",
    "status",
    "suggestions",
    "adminNotes",
    "createdAt",
    "reviewedAt",
];

/// Quotes a field when it holds a delimiter, quote or line break. User text that a
/// spreadsheet would read as a formula gets a leading apostrophe.
fn csv_field(raw: &str) -> String {
    let guarded = match raw.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{raw}"),
        _ => raw.to_string(),
    };
    if guarded.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", guarded.replace('"', "\"\""))
    } else {
        guarded
    }
}

pub fn render_csv(entries: &[FeedbackEntry]) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push_str("\r\n");
    for entry in entries {
        let fb = &entry.feedback;
        let fields = [
            csv_field(&fb.feedback_id),
            csv_field(&fb.analysis_id),
            csv_field(&entry.resume_filename),
            fb.rating.to_string(),
            fb.helpful.to_string(),
            csv_field(&fb.category),
            csv_field(&fb.status),
            csv_field(&fb.suggestions),
            csv_field(fb.admin_notes.as_deref().unwrap_or_default()),
            fb.created_at.to_rfc3339(),
            fb.reviewed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmitted {
    pub message: String,
    pub feedback_id: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub feedback: Vec<FeedbackEntry>,
    pub pagination: PageInfo,
}

/// POST /api/feedback/submit
/// One feedback per analysis; a second submission is a conflict.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackSubmitted>), AppError> {
    let feedback = request.validate()?;

    if analyses::get(&state.db, &feedback.analysis_id).await?.is_none() {
        return Err(AppError::NotFound("Analysis not found".to_string()));
    }

    let feedback_id = Uuid::new_v4().to_string();
    let row = store::insert(
        &state.db,
        NewFeedback {
            feedback_id: &feedback_id,
            analysis_id: &feedback.analysis_id,
            rating: feedback.rating,
            helpful: feedback.helpful,
            suggestions: &feedback.suggestions,
            category: feedback.category,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Feedback already submitted for this analysis".to_string())
        }
        other => AppError::Database(other),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(FeedbackSubmitted {
            message: "Feedback submitted successfully".to_string(),
            feedback_id: row.feedback_id,
        }),
    ))
}

/// GET /api/feedback/analysis/:analysisId
pub async fn handle_for_analysis(
    State(state): State<AppState>,
    AnalysisId(analysis_id): AnalysisId,
) -> Result<Json<FeedbackRow>, AppError> {
    store::for_analysis(&state.db, &analysis_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))
}

/// GET /api/feedback/admin/all
pub async fn handle_list(
    admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<FeedbackListQuery>,
) -> Result<Json<FeedbackListResponse>, AppError> {
    admin.require(Permission::ViewAnalyses)?;
    let (page_query, filter) = query.filter()?;
    let page = page_query.resolve();
    let (feedback, total) = store::list(&state.db, &page, &filter).await?;
    Ok(Json(FeedbackListResponse {
        feedback,
        pagination: PageInfo::new(&page, total),
    }))
}

/// GET /api/feedback/admin/stats
pub async fn handle_stats(
    admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<FeedbackStats>, AppError> {
    admin.require(Permission::ViewAnalytics)?;
    let (start, end) = parse_range(query.start_date, query.end_date)?;
    Ok(Json(store::stats(&state.db, start, end).await?))
}

/// GET /api/feedback/admin/export
/// Same filters as the list, as a CSV download.
pub async fn handle_export(
    admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<FeedbackListQuery>,
) -> Result<impl IntoResponse, AppError> {
    admin.require(Permission::ExportData)?;
    let (_, filter) = query.filter()?;
    let entries = store::export_rows(&state.db, &filter).await?;
    info!("Admin exported {} feedback entries", entries.len());

    let filename = format!("feedback-export-{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        render_csv(&entries),
    ))
}

/// GET /api/feedback/admin/:feedbackId
pub async fn handle_get(
    admin: Admin,
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
) -> Result<Json<FeedbackEntry>, AppError> {
    admin.require(Permission::ViewAnalyses)?;
    store::get(&state.db, &feedback_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))
}

/// PUT /api/feedback/admin/:feedbackId
pub async fn handle_update(
    admin: Admin,
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
    Json(request): Json<FeedbackUpdateRequest>,
) -> Result<Json<FeedbackRow>, AppError> {
    admin.require(Permission::ManageSystem)?;
    let changes = request.validate()?;
    let row = store::update(&state.db, &feedback_id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))?;
    info!(
        "Admin updated feedback {feedback_id} (status {}, notes {})",
        row.status,
        if changes.admin_notes.is_some() { "changed" } else { "kept" }
    );
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn request() -> FeedbackRequest {
        FeedbackRequest {
            analysis_id: Some("a-1".into()),
            rating: Some(4),
            helpful: Some(true),
            suggestions: Some("  Clearer skill gaps please  ".into()),
            category: None,
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request_defaults_category() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.category, FeedbackCategory::General);
        assert_eq!(valid.suggestions, "Clearer skill gaps please");
        assert_eq!(valid.rating, 4);
    }

    #[test]
    fn test_missing_fields() {
        for broken in [
            FeedbackRequest {
                analysis_id: None,
                ..request()
            },
            FeedbackRequest {
                rating: None,
                ..request()
            },
            FeedbackRequest {
                helpful: None,
                ..request()
            },
            FeedbackRequest {
                suggestions: Some("   ".into()),
                ..request()
            },
        ] {
            assert_eq!(message(broken.validate().unwrap_err()), MISSING_FIELDS);
        }
    }

    #[test]
    fn test_rating_bounds() {
        for rating in [0, 6, -1, i64::MAX] {
            let err = FeedbackRequest {
                rating: Some(rating),
                ..request()
            }
            .validate()
            .unwrap_err();
            assert_eq!(message(err), "Rating must be between 1 and 5");
        }
    }

    #[test]
    fn test_suggestions_length_and_id_format() {
        let err = FeedbackRequest {
            suggestions: Some("x".repeat(MAX_SUGGESTIONS_CHARS + 1)),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert_eq!(message(err), "Suggestions must be less than 1000 characters");

        let err = FeedbackRequest {
            analysis_id: Some("a_1; DROP".into()),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert_eq!(message(err), INVALID_ANALYSIS_ID);
    }

    #[test]
    fn test_unknown_category_is_refused() {
        let err = FeedbackRequest {
            category: Some("pricing".into()),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert!(message(err).starts_with("Unknown category 'pricing'"));
    }

    #[test]
    fn test_date_bounds() {
        let start = parse_date_bound("startDate", "2024-03-01", false).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        let end = parse_date_bound("endDate", "2024-03-01", true).unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        let exact = parse_date_bound("startDate", "2024-03-01T12:30:00+02:00", false).unwrap();
        assert_eq!(exact.hour(), 10);
        assert!(parse_date_bound("startDate", "last tuesday", false).is_err());
    }

    #[test]
    fn test_list_query_filters() {
        let query = FeedbackListQuery {
            status: Some("reviewed".into()),
            rating: Some("5".into()),
            helpful: Some("false".into()),
            category: Some("".into()),
            start_date: Some("2024-01-01".into()),
            ..Default::default()
        };
        let (page, filter) = query.filter().unwrap();
        assert_eq!(page.resolve().limit, FEEDBACK_PAGE_SIZE);
        assert_eq!(filter.status, Some(FeedbackStatus::Reviewed));
        assert_eq!(filter.rating, Some(5));
        assert_eq!(filter.helpful, Some(false));
        assert_eq!(filter.category, None);
        assert!(filter.start.is_some());

        let bad = FeedbackListQuery {
            helpful: Some("maybe".into()),
            ..Default::default()
        };
        assert!(bad.filter().is_err());
    }

    #[test]
    fn test_update_request_validation() {
        let changes = FeedbackUpdateRequest {
            status: Some("addressed".into()),
            admin_notes: None,
        }
        .validate()
        .unwrap();
        assert_eq!(changes.status, Some(FeedbackStatus::Addressed));

        assert!(FeedbackUpdateRequest::default().validate().is_err());
        assert!(FeedbackUpdateRequest {
            status: Some("archived".into()),
            admin_notes: None,
        }
        .validate()
        .is_err());
        assert!(FeedbackUpdateRequest {
            status: None,
            admin_notes: Some("n".repeat(MAX_ADMIN_NOTES_CHARS + 1)),
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_field("=SUM(A1)"), "'=SUM(A1)");
    }

    #[test]
    fn test_render_csv() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let entry = FeedbackEntry {
            feedback: FeedbackRow {
                id: Uuid::new_v4(),
                feedback_id: "f-1".into(),
                analysis_id: "a-1".into(),
                rating: 2,
                helpful: false,
                suggestions: "Too vague, needs examples".into(),
                category: "usefulness".into(),
                status: "pending".into(),
                admin_notes: None,
                created_at: at,
                updated_at: at,
                reviewed_at: None,
            },
            resume_filename: "cv.pdf".into(),
            job_description_filename: None,
            analyzed_at: at,
        };
        let csv = render_csv(&[entry]);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "f-1,a-1,cv.pdf,2,false,usefulness,pending,\"Too vague, needs examples\",,2024-05-01T09:00:00+00:00,"
        );
        assert_eq!(lines[2], "");
    }
}
