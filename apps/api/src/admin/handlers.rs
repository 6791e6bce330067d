use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::admin::guard::Admin;
use crate::admin::permissions::Permission;
use crate::analysis::export::{export_report, ExportedReport};
use crate::analysis::id::AnalysisId;
use crate::analysis::schema::Report;
use crate::analysis::status;
use crate::analysis::store::{self, AnalysisStats, ListFilter, PageInfo, PageQuery, DEFAULT_TOP_LIMIT};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRow, AnalysisState, AnalysisSummaryRow};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl AdminListQuery {
    fn split(self) -> Result<(PageQuery, ListFilter), AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(AnalysisState::parse(raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown status '{raw}' (expected processing, completed or failed)"
                ))
            })?),
        };
        Ok((
            PageQuery {
                page: self.page,
                limit: self.limit,
                sort_by: self.sort_by,
                sort_order: self.sort_order,
            },
            ListFilter {
                status,
                search: self.search,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub analyses: Vec<AnalysisSummaryRow>,
    pub pagination: PageInfo,
}

/// GET /api/analyses
pub async fn handle_list(
    admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminListResponse>, AppError> {
    admin.require(Permission::ViewAnalyses)?;
    let (page_query, filter) = query.split()?;
    let page = page_query.resolve();
    let (analyses, total) = store::list(&state.db, &page, &filter).await?;
    Ok(Json(AdminListResponse {
        analyses,
        pagination: PageInfo::new(&page, total),
    }))
}

/// GET /api/analyses/stats
pub async fn handle_stats(
    admin: Admin,
    State(state): State<AppState>,
) -> Result<Json<AnalysisStats>, AppError> {
    admin.require(Permission::ViewAnalytics)?;
    Ok(Json(store::stats(&state.db).await?))
}

/// GET /api/analyses/top
pub async fn handle_top(
    admin: Admin,
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<AnalysisSummaryRow>>, AppError> {
    admin.require(Permission::ViewAnalytics)?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    Ok(Json(store::top_scores(&state.db, limit).await?))
}

async fn find(state: &AppState, analysis_id: &str) -> Result<AnalysisRow, AppError> {
    store::get(&state.db, analysis_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))
}

/// GET /api/analyses/:analysisId
pub async fn handle_get(
    admin: Admin,
    State(state): State<AppState>,
    AnalysisId(analysis_id): AnalysisId,
) -> Result<Json<AnalysisRow>, AppError> {
    admin.require(Permission::ViewAnalyses)?;
    Ok(Json(find(&state, &analysis_id).await?))
}

/// DELETE /api/analyses/:analysisId
pub async fn handle_delete(
    admin: Admin,
    State(state): State<AppState>,
    AnalysisId(analysis_id): AnalysisId,
) -> Result<StatusCode, AppError> {
    admin.require(Permission::ManageSystem)?;
    if !store::delete(&state.db, &analysis_id).await? {
        return Err(AppError::NotFound(format!("Analysis {analysis_id} not found")));
    }
    if let Err(e) = status::forget(state.store.as_ref(), &analysis_id).await {
        warn!("Deleted analysis {analysis_id} but its cache entries remain: {e}");
    }
    info!("Admin deleted analysis {analysis_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/analyses/:analysisId/export
pub async fn handle_export(
    admin: Admin,
    State(state): State<AppState>,
    AnalysisId(analysis_id): AnalysisId,
) -> Result<Json<ExportedReport>, AppError> {
    admin.require(Permission::ExportData)?;
    let row = find(&state, &analysis_id).await?;
    let result = row.result.clone().ok_or_else(|| {
        AppError::Validation(format!("Analysis {analysis_id} has no completed report"))
    })?;
    let report: Report = serde_json::from_value(result).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("stored report for {analysis_id} is unreadable: {e}"))
    })?;
    let exported = export_report(&state.s3, &state.config.s3_bucket, &row, &report).await?;
    Ok(Json(exported))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parses_status_filter() {
        let query = AdminListQuery {
            status: Some("failed".into()),
            search: Some("cv".into()),
            limit: Some(5),
            ..Default::default()
        };
        let (page, filter) = query.split().unwrap();
        assert_eq!(page.limit, Some(5));
        assert_eq!(filter.status, Some(AnalysisState::Failed));
        assert_eq!(filter.search.as_deref(), Some("cv"));
    }

    #[test]
    fn test_split_blank_status_means_any() {
        let query = AdminListQuery {
            status: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(query.split().unwrap().1.status, None);
    }

    #[test]
    fn test_split_rejects_unknown_status() {
        let query = AdminListQuery {
            status: Some("archived".into()),
            ..Default::default()
        };
        assert!(matches!(query.split(), Err(AppError::Validation(_))));
    }
}
