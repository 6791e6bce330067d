use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::analysis::schema::SourceFormat;
use crate::models::analysis::{AnalysisRow, AnalysisState, AnalysisSummaryRow};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;
pub const DEFAULT_TOP_LIMIT: i64 = 10;
/// Highest page whose offset still fits an `i64` at the largest page size.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

const SUMMARY_COLUMNS: &str = "analysis_id, resume_filename, job_description_filename, status, \
                               score, source_format, created_at, updated_at, completed_at";

// ────────────────────────────────────────────────────────────────────────────
// Paging
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    Score,
    UpdatedAt,
}

impl SortColumn {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(SortColumn::CreatedAt),
            "score" => Some(SortColumn::Score),
            "updatedAt" => Some(SortColumn::UpdatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::Score => "score",
            SortColumn::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC NULLS FIRST",
            SortOrder::Desc => "DESC NULLS LAST",
        }
    }
}

/// Raw `?page&limit&sortBy&sortOrder` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
    pub sort: SortColumn,
    pub order: SortOrder,
}

impl PageQuery {
    /// Clamps page to 1..=MAX_PAGE and limit to 1..=50. Unknown sort values use the defaults.
    pub fn resolve(&self) -> Page {
        Page {
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            sort: self
                .sort_by
                .as_deref()
                .and_then(SortColumn::parse)
                .unwrap_or_default(),
            order: match self.sort_order.as_deref() {
                Some("asc") => SortOrder::Asc,
                _ => SortOrder::Desc,
            },
        }
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    fn order_by(&self) -> String {
        format!("{} {}", self.sort.column(), self.order.sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    pub fn new(page: &Page, total: i64) -> Self {
        let total_pages = (total + page.limit - 1) / page.limit;
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
            has_next: page.page < total_pages,
            has_prev: page.page > 1,
        }
    }
}

/// Optional admin filters. `search` matches the resume filename, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<AnalysisState>,
    pub search: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Writes
// ────────────────────────────────────────────────────────────────────────────

pub struct NewAnalysis<'a> {
    pub analysis_id: &'a str,
    pub resume_filename: &'a str,
    pub job_description_filename: Option<&'a str>,
    pub job_description_text: Option<&'a str>,
}

pub async fn insert_processing(pool: &PgPool, new: NewAnalysis<'_>) -> Result<AnalysisRow, sqlx::Error> {
    let row: AnalysisRow = sqlx::query_as(
        r#"
        INSERT INTO analyses
            (analysis_id, resume_filename, job_description_filename, resume_text,
             job_description_text, status)
        VALUES ($1, $2, $3, '', $4, 'processing')
        RETURNING *
        "#,
    )
    .bind(new.analysis_id)
    .bind(new.resume_filename)
    .bind(new.job_description_filename)
    .bind(new.job_description_text)
    .fetch_one(pool)
    .await?;

    info!("Recorded analysis {} as processing", new.analysis_id);
    Ok(row)
}

pub async fn set_resume_text(pool: &PgPool, analysis_id: &str, text: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE analyses SET resume_text = $1, updated_at = now() WHERE analysis_id = $2")
        .bind(text)
        .bind(analysis_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_completed(
    pool: &PgPool,
    analysis_id: &str,
    result: &Value,
    source_format: SourceFormat,
    score: i32,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        r#"
        UPDATE analyses
        SET status = 'completed', result = $1, source_format = $2, score = $3,
            error = NULL, completed_at = now(), updated_at = now()
        WHERE analysis_id = $4
        "#,
    )
    .bind(result)
    .bind(source_format.as_str())
    .bind(score)
    .bind(analysis_id)
    .execute(pool)
    .await?;
    Ok(updated.rows_affected() > 0)
}

pub async fn mark_failed(pool: &PgPool, analysis_id: &str, error: &str) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE analyses SET status = 'failed', error = $1, updated_at = now() WHERE analysis_id = $2",
    )
    .bind(error)
    .bind(analysis_id)
    .execute(pool)
    .await?;
    Ok(updated.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, analysis_id: &str) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM analyses WHERE analysis_id = $1")
        .bind(analysis_id)
        .execute(pool)
        .await?;
    Ok(deleted.rows_affected() > 0)
}

// ────────────────────────────────────────────────────────────────────────────
// Reads
// ────────────────────────────────────────────────────────────────────────────

pub async fn get(pool: &PgPool, analysis_id: &str) -> Result<Option<AnalysisRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM analyses WHERE analysis_id = $1")
        .bind(analysis_id)
        .fetch_optional(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    page: &Page,
    filter: &ListFilter,
) -> Result<(Vec<AnalysisSummaryRow>, i64), sqlx::Error> {
    let status = filter.status.map(AnalysisState::as_str);
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM analyses
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR resume_filename ILIKE $2)
        "#,
    )
    .bind(status)
    .bind(search.as_deref())
    .fetch_one(pool)
    .await?;

    // ORDER BY comes from a closed enum, never from user text.
    let sql = format!(
        r#"
        SELECT {SUMMARY_COLUMNS} FROM analyses
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR resume_filename ILIKE $2)
        ORDER BY {}
        LIMIT $3 OFFSET $4
        "#,
        page.order_by()
    );
    let rows: Vec<AnalysisSummaryRow> = sqlx::query_as(&sql)
        .bind(status)
        .bind(search.as_deref())
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

pub async fn top_scores(pool: &PgPool, limit: i64) -> Result<Vec<AnalysisSummaryRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM analyses \
         WHERE status = 'completed' AND score IS NOT NULL \
         ORDER BY score DESC, completed_at DESC LIMIT $1"
    );
    sqlx::query_as(&sql)
        .bind(limit.clamp(1, MAX_PAGE_SIZE))
        .fetch_all(pool)
        .await
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub average_score: Option<f64>,
    pub last_24h: i64,
}

pub async fn stats(pool: &PgPool) -> Result<AnalysisStats, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            COUNT(*)                                                    AS total,
            COUNT(*) FILTER (WHERE status = 'processing')               AS processing,
            COUNT(*) FILTER (WHERE status = 'completed')                AS completed,
            COUNT(*) FILTER (WHERE status = 'failed')                   AS failed,
            CAST(AVG(score) FILTER (WHERE status = 'completed') AS float8) AS average_score,
            COUNT(*) FILTER (WHERE created_at > now() - interval '24 hours') AS last_24h
        FROM analyses
        "#,
    )
    .fetch_one(pool)
    .await
}

pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
