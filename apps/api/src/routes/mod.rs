pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::analysis::handlers as analysis;
use crate::drafts;
use crate::feedback::handlers as feedback;
use crate::rate_limit::{limit_uploads, limit_writes};
use crate::state::AppState;
use crate::workflow::validation::MAX_FILE_SIZE;

/// Two maximum-size files plus room for text fields and multipart framing.
pub const MAX_REQUEST_BYTES: usize = 2 * MAX_FILE_SIZE as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = middleware::from_fn_with_state(state.clone(), limit_uploads);
    let write_limit = middleware::from_fn_with_state(state.clone(), limit_writes);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/detailed", get(health::detailed_health_handler))
        // Analysis pipeline
        .route(
            "/api/resume/analyze",
            post(analysis::handle_analyze).route_layer(upload_limit),
        )
        .route("/api/resume/status/:analysis_id", get(analysis::handle_status))
        .route("/api/resume/result/:analysis_id", get(analysis::handle_result))
        .route("/api/resume/history", get(analysis::handle_history))
        // Wizard drafts
        .route("/api/drafts", post(drafts::handle_save_draft))
        .route(
            "/api/drafts/:draft_id",
            get(drafts::handle_get_draft).delete(drafts::handle_delete_draft),
        )
        // Admin
        .route("/api/analyses", get(admin::handle_list))
        .route("/api/analyses/stats", get(admin::handle_stats))
        .route("/api/analyses/top", get(admin::handle_top))
        .route(
            "/api/analyses/:analysis_id",
            get(admin::handle_get).delete(admin::handle_delete),
        )
        .route(
            "/api/analyses/:analysis_id/export",
            post(admin::handle_export),
        )
        // Feedback
        .route(
            "/api/feedback/submit",
            post(feedback::handle_submit).route_layer(write_limit),
        )
        .route(
            "/api/feedback/analysis/:analysis_id",
            get(feedback::handle_for_analysis),
        )
        .route("/api/feedback/admin/all", get(feedback::handle_list))
        .route("/api/feedback/admin/stats", get(feedback::handle_stats))
        .route("/api/feedback/admin/export", get(feedback::handle_export))
        .route(
            "/api/feedback/admin/:feedback_id",
            get(feedback::handle_get).put(feedback::handle_update),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}
