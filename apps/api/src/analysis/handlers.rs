use axum::{
    extract::{multipart::Field, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::id::AnalysisId;
use crate::analysis::service;
use crate::analysis::status;
use crate::analysis::store::{self, ListFilter, PageInfo, PageQuery};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRow, AnalysisState, AnalysisStatus, AnalysisSummaryRow};
use crate::state::AppState;
use crate::workflow::machine::SUBMISSION_FAILED_MESSAGE;
use crate::workflow::{FileRef, WorkflowState};

pub const ESTIMATED_TIME: &str = "15-45 seconds";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAccepted {
    pub message: String,
    pub analysis_id: String,
    pub status: AnalysisState,
    pub estimated_time: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ResultResponse {
    Completed {
        analysis_id: String,
        result: Value,
        retrieved_at: DateTime<Utc>,
    },
    Processing {
        analysis_id: String,
        progress: u8,
        current_stage: String,
        started_at: DateTime<Utc>,
    },
    Failed {
        analysis_id: String,
        error: String,
    },
}

impl ResultResponse {
    /// Public view of a failed analysis. The stored detail is admin-only.
    pub fn failed(analysis_id: String) -> Self {
        ResultResponse::Failed {
            analysis_id,
            error: SUBMISSION_FAILED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub analyses: Vec<AnalysisSummaryRow>,
    pub pagination: PageInfo,
}

async fn read_upload(field: Field<'_>) -> Result<Option<FileRef>, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let content = field.bytes().await?;
    // An empty, unnamed part is what browsers send for an untouched file input.
    if content.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
        return Ok(None);
    }
    Ok(Some(FileRef::from_upload(
        file_name.as_deref(),
        content_type.as_deref(),
        content,
    )))
}

/// POST /api/resume/analyze
///
/// Multipart fields: `resume` (file), and either `jobDescription` (file) or
/// `jobDescriptionText`. A job file wins when both are present.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnalyzeAccepted>), AppError> {
    let mut workflow = WorkflowState::new();
    let mut job_file = None;
    let mut job_text = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                if let Some(file) = read_upload(field).await? {
                    workflow.select_resume(file)?;
                }
            }
            "jobDescription" => job_file = read_upload(field).await?,
            "jobDescriptionText" => job_text = Some(field.text().await?),
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    workflow.go_to_next_step()?;
    if let Some(file) = job_file {
        workflow.select_job_file(file)?;
    } else if let Some(text) = job_text {
        workflow.set_job_description(text);
    }
    let submission = workflow.begin_submission()?;

    let analysis_id = service::submit(&state, workflow, submission).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalyzeAccepted {
            message: "Comprehensive analysis started".to_string(),
            analysis_id,
            status: AnalysisState::Processing,
            estimated_time: ESTIMATED_TIME.to_string(),
        }),
    ))
}

/// GET /api/resume/status/:analysisId
pub async fn handle_status(
    State(state): State<AppState>,
    AnalysisId(analysis_id): AnalysisId,
) -> Result<Json<AnalysisStatus>, AppError> {
    let cache = state.store.as_ref();
    match status::get_status(cache, &analysis_id).await {
        Ok(Some(cached)) => return Ok(Json(cached)),
        Ok(None) => {}
        Err(e) => warn!("Status cache read failed for {analysis_id}: {e}"),
    }

    let row = store::get(&state.db, &analysis_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Analysis not found or expired".to_string()))?;

    let rebuilt = AnalysisStatus::from_row(&row);
    if let Err(e) = status::put_status(cache, &analysis_id, &rebuilt).await {
        warn!("Could not re-cache status for {analysis_id}: {e}");
    }
    Ok(Json(rebuilt))
}

/// Adds the identifying fields clients show next to a report.
pub fn decorate_result(mut report: Value, row: Option<&AnalysisRow>, analysis_id: &str) -> Value {
    if let Value::Object(map) = &mut report {
        map.insert("analysisId".into(), Value::from(analysis_id));
        if let Some(row) = row {
            map.insert("resumeFilename".into(), Value::from(row.resume_filename.as_str()));
            map.insert(
                "jobDescriptionFilename".into(),
                Value::from(row.job_description_filename.as_deref().unwrap_or("Text Input")),
            );
            map.insert("analyzedAt".into(), Value::from(row.created_at.to_rfc3339()));
            if let Some(format) = &row.source_format {
                map.insert("sourceFormat".into(), Value::from(format.as_str()));
            }
        }
    }
    report
}

/// GET /api/resume/result/:analysisId
pub async fn handle_result(
    State(state): State<AppState>,
    AnalysisId(analysis_id): AnalysisId,
) -> Result<Json<ResultResponse>, AppError> {
    let cache = state.store.as_ref();
    let row = store::get(&state.db, &analysis_id).await?;

    if let Some(row) = &row {
        if let Some(result) = &row.result {
            info!("Serving analysis {analysis_id} from the database");
            return Ok(Json(ResultResponse::Completed {
                result: decorate_result(result.clone(), Some(row), &analysis_id),
                analysis_id,
                retrieved_at: Utc::now(),
            }));
        }
        if row.state() == Some(AnalysisState::Failed) {
            return Ok(Json(ResultResponse::failed(analysis_id)));
        }
    }

    if let Some(result) = status::get_result(cache, &analysis_id).await? {
        return Ok(Json(ResultResponse::Completed {
            result: decorate_result(result, row.as_ref(), &analysis_id),
            analysis_id,
            retrieved_at: Utc::now(),
        }));
    }

    let current = match status::get_status(cache, &analysis_id).await? {
        Some(cached) => Some(cached),
        None => row.as_ref().map(AnalysisStatus::from_row),
    };
    match current {
        Some(s) if s.status == AnalysisState::Processing => Ok(Json(ResultResponse::Processing {
            analysis_id,
            progress: s.progress,
            current_stage: s.current_stage,
            started_at: s.started_at,
        })),
        _ => Err(AppError::NotFound(
            "Analysis result not found or expired".to_string(),
        )),
    }
}

/// GET /api/resume/history
pub async fn handle_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let page = query.resolve();
    let (analyses, total) = store::list(&state.db, &page, &ListFilter::default()).await?;
    Ok(Json(HistoryResponse {
        analyses,
        pagination: PageInfo::new(&page, total),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_decorate_result_adds_metadata() {
        let now = Utc::now();
        let row = AnalysisRow {
            id: Uuid::new_v4(),
            analysis_id: "a1".into(),
            resume_filename: "cv.pdf".into(),
            job_description_filename: None,
            resume_text: String::new(),
            job_description_text: None,
            status: "completed".into(),
            error: None,
            result: None,
            source_format: Some("basic".into()),
            score: Some(50),
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        };
        let decorated = decorate_result(json!({"score_out_of_100": 50}), Some(&row), "a1");
        assert_eq!(decorated["analysisId"], "a1");
        assert_eq!(decorated["resumeFilename"], "cv.pdf");
        assert_eq!(decorated["jobDescriptionFilename"], "Text Input");
        assert_eq!(decorated["sourceFormat"], "basic");
        assert_eq!(decorated["score_out_of_100"], 50);
    }

    #[test]
    fn test_failed_result_carries_generic_message() {
        let body = serde_json::to_value(ResultResponse::failed("a1".into())).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "failed",
                "analysisId": "a1",
                "error": "Analysis failed. Please try again."
            })
        );
    }

    #[test]
    fn test_accepted_body_shape() {
        let body = serde_json::to_value(AnalyzeAccepted {
            message: "Comprehensive analysis started".into(),
            analysis_id: "a1".into(),
            status: AnalysisState::Processing,
            estimated_time: ESTIMATED_TIME.into(),
        })
        .unwrap();
        assert_eq!(body["status"], "processing");
        assert_eq!(body["analysisId"], "a1");
        assert_eq!(body["estimatedTime"], "15-45 seconds");
    }
}
