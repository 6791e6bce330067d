//! Server-side copies of the `pendingAnalysis` wizard snapshot.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::cache::{get_json, put_json};
use crate::errors::AppError;
use crate::state::AppState;
use crate::workflow::{PersistError, PersistedWorkflow, Step, WorkflowState};

pub const DRAFT_TTL: Duration = Duration::from_secs(60 * 60);

pub fn draft_key(draft_id: &str) -> String {
    format!("draft:{draft_id}")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSaved {
    pub draft_id: String,
    pub current_step: Step,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub draft_id: String,
    pub current_step: Step,
    pub draft: PersistedWorkflow,
}

/// Replays a snapshot through the wizard and returns the normalised snapshot plus
/// the step it actually lands on.
pub fn normalize(blob: &PersistedWorkflow) -> Result<(PersistedWorkflow, Step), PersistError> {
    let state = WorkflowState::from_snapshot(blob)?;
    Ok((state.snapshot(), state.step()))
}

/// POST /api/drafts
pub async fn handle_save_draft(
    State(state): State<AppState>,
    Json(blob): Json<PersistedWorkflow>,
) -> Result<(StatusCode, Json<DraftSaved>), AppError> {
    let (draft, current_step) = normalize(&blob)?;
    let draft_id = Uuid::new_v4().to_string();
    put_json(state.store.as_ref(), &draft_key(&draft_id), &draft, DRAFT_TTL).await?;

    info!("Saved draft {draft_id} at step {}", current_step.as_str());
    Ok((
        StatusCode::CREATED,
        Json(DraftSaved {
            draft_id,
            current_step,
            expires_in: DRAFT_TTL.as_secs(),
        }),
    ))
}

/// GET /api/drafts/:draftId
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<DraftResponse>, AppError> {
    let stored: PersistedWorkflow = get_json(state.store.as_ref(), &draft_key(&draft_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Draft {draft_id} not found or expired")))?;
    let (draft, current_step) = normalize(&stored)?;
    Ok(Json(DraftResponse {
        draft_id,
        current_step,
        draft,
    }))
}

/// DELETE /api/drafts/:draftId
pub async fn handle_delete_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.store.delete(&draft_key(&draft_id)).await? {
        info!("Deleted draft {draft_id}");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Draft {draft_id} not found or expired")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::validation::MIME_PDF;
    use crate::workflow::{FileRef, PersistedFile};

    fn resume_blob(step: Step) -> PersistedWorkflow {
        let file = FileRef::new("cv.pdf", MIME_PDF, b"%PDF-1.4 resume".to_vec());
        PersistedWorkflow {
            resume_file: Some(PersistedFile::from_file(&file)),
            current_step: Some(step),
        }
    }

    #[test]
    fn test_normalize_keeps_reachable_step() {
        let (draft, step) = normalize(&resume_blob(Step::JobDescription)).unwrap();
        assert_eq!(step, Step::JobDescription);
        assert_eq!(draft.current_step, Some(Step::JobDescription));
        assert_eq!(draft.resume_file.unwrap().name, "cv.pdf");
    }

    #[test]
    fn test_normalize_clamps_unreachable_step() {
        // no job description yet, so analyze is out of reach
        let (_, step) = normalize(&resume_blob(Step::Analyze)).unwrap();
        assert_eq!(step, Step::JobDescription);

        let blob = PersistedWorkflow {
            resume_file: None,
            current_step: Some(Step::JobDescription),
        };
        assert_eq!(normalize(&blob).unwrap().1, Step::Upload);
    }

    #[test]
    fn test_normalize_rejects_corrupt_file() {
        let mut blob = resume_blob(Step::JobDescription);
        if let Some(file) = blob.resume_file.as_mut() {
            file.data = "not a data url".into();
        }
        assert!(normalize(&blob).is_err());
    }
}
