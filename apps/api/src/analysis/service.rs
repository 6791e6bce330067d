use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::preview::text_preview;
use crate::analysis::schema::{AnalysisDocument, Report, SchemaError, SourceFormat};
use crate::analysis::status;
use crate::analysis::store::{self, NewAnalysis};
use crate::analysis_client::{AnalysisEngine, EngineError};
use crate::cache::KeyValueStore;
use crate::errors::AppError;
use crate::models::analysis::AnalysisStatus;
use crate::state::AppState;
use crate::workflow::{JobInput, Submission, WorkflowState};

#[derive(Debug, Error)]
pub enum AnalysisFailure {
    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("Report could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Detects the engine's schema and migrates the document to the current report.
pub fn interpret(document: Value) -> Result<(Report, SourceFormat), SchemaError> {
    let document = AnalysisDocument::detect(document)?;
    let format = document.source_format();
    Ok((document.into_report(), format))
}

/// Calls the engine and interprets its answer.
pub async fn analyze(
    engine: &dyn AnalysisEngine,
    submission: &Submission,
) -> Result<(Report, SourceFormat), AnalysisFailure> {
    let document = engine.analyze(submission).await?;
    Ok(interpret(document)?)
}

/// Records a new analysis and starts it in the background. Returns its public id.
///
/// `workflow` must already have handed out `submission` via `begin_submission`; the task
/// owns it from here and records the outcome on it.
pub async fn submit(
    state: &AppState,
    workflow: WorkflowState,
    submission: Submission,
) -> Result<String, AppError> {
    let analysis_id = Uuid::new_v4().to_string();
    let (job_filename, job_text) = match &submission.job {
        JobInput::Text(text) => (None, Some(text.as_str())),
        JobInput::File(file) => (Some(file.name.as_str()), None),
    };

    let row = store::insert_processing(
        &state.db,
        NewAnalysis {
            analysis_id: &analysis_id,
            resume_filename: &submission.resume.name,
            job_description_filename: job_filename,
            job_description_text: job_text,
        },
    )
    .await?;

    let started_at = row.created_at;
    status::put_status(
        state.store.as_ref(),
        &analysis_id,
        &AnalysisStatus::processing(started_at),
    )
    .await?;

    info!(
        "Analysis {analysis_id} started (resume: {}, {} bytes)",
        submission.resume.name,
        submission.resume.size()
    );

    let task_state = state.clone();
    let task_id = analysis_id.clone();
    tokio::spawn(async move {
        run(task_state, task_id, workflow, submission, started_at).await;
    });

    Ok(analysis_id)
}

/// What the background run writes to the analyses table.
#[derive(Debug, Clone, PartialEq)]
pub enum RowUpdate {
    Completed {
        result: Value,
        format: SourceFormat,
        score: i32,
    },
    /// `error` is the detailed failure, kept for admins only.
    Failed { error: String },
}

#[derive(Debug)]
pub struct Settlement {
    /// Client-facing status. A failure only ever carries the generic message.
    pub status: AnalysisStatus,
    pub update: RowUpdate,
    /// The report to cache, on success.
    pub report: Option<Report>,
}

/// Maps an analysis outcome to the cached status and the row update, and hands the
/// outcome to `workflow`.
pub fn settle(
    outcome: Result<(Report, SourceFormat), AnalysisFailure>,
    workflow: &mut WorkflowState,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Settlement {
    let encoded = outcome.and_then(|(report, format)| {
        let value = serde_json::to_value(&report)?;
        Ok((report, format, value))
    });

    match encoded {
        Ok((report, format, value)) => {
            workflow.finish_submission::<AnalysisFailure>(Ok(value.clone()));
            Settlement {
                status: AnalysisStatus::completed(started_at, now),
                update: RowUpdate::Completed {
                    result: value,
                    format,
                    score: report.score(),
                },
                report: Some(report),
            }
        }
        Err(failure) => {
            let error = failure.to_string();
            workflow.finish_submission::<AnalysisFailure>(Err(failure));
            let message = workflow.submission_error().unwrap_or_default().to_string();
            Settlement {
                status: AnalysisStatus::failed(started_at, now, message),
                update: RowUpdate::Failed { error },
                report: None,
            }
        }
    }
}

/// Runs the engine call and publishes the outcome to the cache. Returns the row update
/// for the caller to persist.
pub async fn conclude(
    engine: &dyn AnalysisEngine,
    cache: &dyn KeyValueStore,
    analysis_id: &str,
    workflow: &mut WorkflowState,
    submission: &Submission,
    started_at: DateTime<Utc>,
) -> RowUpdate {
    let outcome = analyze(engine, submission).await;
    if let Err(failure) = &outcome {
        error!("Analysis {analysis_id} failed: {failure}");
    }
    let settlement = settle(outcome, workflow, started_at, Utc::now());

    if let Some(report) = &settlement.report {
        if let Err(e) = status::put_result(cache, analysis_id, report).await {
            warn!("Could not cache result for {analysis_id}: {e}");
        }
    }
    if let Err(e) = status::put_status(cache, analysis_id, &settlement.status).await {
        warn!("Could not update status for {analysis_id}: {e}");
    }
    settlement.update
}

async fn run(
    state: AppState,
    analysis_id: String,
    mut workflow: WorkflowState,
    submission: Submission,
    started_at: DateTime<Utc>,
) {
    let cache = state.store.as_ref();

    let preview = text_preview(&submission.resume).await;
    if let Err(e) = store::set_resume_text(&state.db, &analysis_id, &preview).await {
        warn!("Could not store resume preview for {analysis_id}: {e}");
    }
    let analyzing = AnalysisStatus::processing(started_at).stage("analyzing", 40);
    if let Err(e) = status::put_status(cache, &analysis_id, &analyzing).await {
        warn!("Could not update status for {analysis_id}: {e}");
    }

    let update = conclude(
        state.engine.as_ref(),
        cache,
        &analysis_id,
        &mut workflow,
        &submission,
        started_at,
    )
    .await;

    match update {
        RowUpdate::Completed {
            result,
            format,
            score,
        } => {
            if let Err(e) = store::mark_completed(&state.db, &analysis_id, &result, format, score).await {
                error!("Analysis {analysis_id} finished but could not be stored: {e}");
            }
            info!(
                "Analysis {analysis_id} completed (score {score}, source format {})",
                format.as_str()
            );
        }
        RowUpdate::Failed { error } => {
            if let Err(e) = store::mark_failed(&state.db, &analysis_id, &error).await {
                error!("Could not mark analysis {analysis_id} as failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::cache::MemoryStore;
    use crate::models::analysis::AnalysisState;
    use crate::workflow::machine::SUBMISSION_FAILED_MESSAGE;
    use crate::workflow::validation::MIME_PDF;
    use crate::workflow::FileRef;

    struct FixedEngine(Result<Value, u16>);

    #[async_trait]
    impl AnalysisEngine for FixedEngine {
        async fn analyze(&self, _submission: &Submission) -> Result<Value, EngineError> {
            self.0.clone().map_err(|status| EngineError::Api {
                status,
                message: "boom".into(),
            })
        }

        async fn health(&self) -> bool {
            true
        }
    }

    fn submission() -> Submission {
        Submission {
            resume: FileRef::new("cv.pdf", MIME_PDF, b"%PDF".to_vec()),
            job: JobInput::Text("Rust engineer".into()),
        }
    }

    #[test]
    fn test_interpret_reports_source_format() {
        let (report, format) = interpret(json!({"overallScore": 61, "matchPercentage": 40})).unwrap();
        assert_eq!(format, SourceFormat::Legacy);
        assert_eq!(report.score(), 61);
    }

    #[tokio::test]
    async fn test_analyze_migrates_engine_answer() {
        let engine = FixedEngine(Ok(json!({"success": true, "analysis": {"score_out_of_100": 88}})));
        let (report, format) = analyze(&engine, &submission()).await.unwrap();
        assert_eq!(format, SourceFormat::Current);
        assert_eq!(report.score(), 88);
    }

    #[tokio::test]
    async fn test_analyze_surfaces_engine_failure() {
        let engine = FixedEngine(Err(400));
        let err = analyze(&engine, &submission()).await.unwrap_err();
        assert!(matches!(err, AnalysisFailure::Engine(EngineError::Api { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_analyze_rejects_unknown_documents() {
        let engine = FixedEngine(Ok(json!({"verdict": "great"})));
        let err = analyze(&engine, &submission()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unrecognised analysis document (keys: verdict)");
    }

    /// A wizard that has handed out its submission, as `submit` receives it.
    fn submitted_workflow() -> (WorkflowState, Submission) {
        let mut workflow = WorkflowState::new();
        workflow
            .select_resume(FileRef::new("cv.pdf", MIME_PDF, b"%PDF".to_vec()))
            .unwrap();
        workflow.go_to_next_step().unwrap();
        workflow.set_job_description(vec!["rust"; 60].join(" "));
        let submission = workflow.begin_submission().unwrap();
        (workflow, submission)
    }

    #[test]
    fn test_settle_success() {
        let (mut workflow, _) = submitted_workflow();
        let report = Report {
            score_out_of_100: 72.0,
            ..Default::default()
        };
        let started = Utc::now();
        let settlement = settle(Ok((report, SourceFormat::Basic)), &mut workflow, started, started);

        assert_eq!(settlement.status.status, AnalysisState::Completed);
        assert_eq!(settlement.status.progress, 100);
        assert!(matches!(
            settlement.update,
            RowUpdate::Completed { score: 72, format: SourceFormat::Basic, .. }
        ));
        assert!(settlement.report.is_some());
        assert!(!workflow.is_submitting());
        assert!(workflow.result().is_some());
        assert!(workflow.resume_file().is_none());
    }

    #[test]
    fn test_settle_failure_keeps_detail_out_of_status() {
        let (mut workflow, _) = submitted_workflow();
        let failure = AnalysisFailure::Engine(EngineError::Api {
            status: 400,
            message: "bad key".into(),
        });
        let started = Utc::now();
        let settlement = settle(Err(failure), &mut workflow, started, started);

        assert_eq!(settlement.status.status, AnalysisState::Failed);
        assert_eq!(settlement.status.error.as_deref(), Some(SUBMISSION_FAILED_MESSAGE));
        assert_eq!(
            settlement.update,
            RowUpdate::Failed {
                error: "API error (status 400): bad key".into()
            }
        );
        assert!(settlement.report.is_none());
        assert_eq!(workflow.submission_error(), Some(SUBMISSION_FAILED_MESSAGE));
        assert!(workflow.resume_file().is_some());
    }

    #[tokio::test]
    async fn test_conclude_caches_completed_result() {
        let engine = FixedEngine(Ok(json!({"score_out_of_100": 64, "resume_eligibility": "Eligible"})));
        let cache = MemoryStore::new();
        let (mut workflow, submission) = submitted_workflow();

        let update = conclude(&engine, &cache, "a-ok", &mut workflow, &submission, Utc::now()).await;

        assert!(matches!(update, RowUpdate::Completed { score: 64, .. }));
        let cached = status::get_status(&cache, "a-ok").await.unwrap().unwrap();
        assert_eq!(cached.status, AnalysisState::Completed);
        let result = status::get_result(&cache, "a-ok").await.unwrap().unwrap();
        assert_eq!(result["score_out_of_100"], 64.0);
    }

    #[tokio::test]
    async fn test_conclude_caches_generic_failure() {
        let engine = FixedEngine(Err(400));
        let cache = MemoryStore::new();
        let (mut workflow, submission) = submitted_workflow();

        let update = conclude(&engine, &cache, "a-bad", &mut workflow, &submission, Utc::now()).await;

        assert_eq!(
            update,
            RowUpdate::Failed {
                error: "API error (status 400): boom".into()
            }
        );
        let cached = status::get_status(&cache, "a-bad").await.unwrap().unwrap();
        assert_eq!(cached.status, AnalysisState::Failed);
        assert_eq!(cached.error.as_deref(), Some(SUBMISSION_FAILED_MESSAGE));
        assert!(status::get_result(&cache, "a-bad").await.unwrap().is_none());
    }
}
