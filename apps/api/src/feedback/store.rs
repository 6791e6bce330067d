use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::info;

use crate::analysis::store::{escape_like, Page};
use crate::models::feedback::{FeedbackCategory, FeedbackEntry, FeedbackRow, FeedbackStatus};

pub const FEEDBACK_PAGE_SIZE: i64 = 20;
pub const EXPORT_LIMIT: i64 = 10_000;

const ENTRY_SELECT: &str = "SELECT f.*, a.resume_filename, a.job_description_filename, \
                            a.created_at AS analyzed_at \
                            FROM feedback f JOIN analyses a ON a.analysis_id = f.analysis_id";

const FILTER_WHERE: &str = r#"
    WHERE ($1::text IS NULL OR f.status = $1)
      AND ($2::text IS NULL OR f.category = $2)
      AND ($3::int IS NULL OR f.rating = $3)
      AND ($4::bool IS NULL OR f.helpful = $4)
      AND ($5::timestamptz IS NULL OR f.created_at >= $5)
      AND ($6::timestamptz IS NULL OR f.created_at <= $6)
      AND ($7::text IS NULL OR f.suggestions ILIKE $7 OR f.admin_notes ILIKE $7)
"#;

/// Admin filters. `search` matches suggestions and admin notes, case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    pub category: Option<FeedbackCategory>,
    pub rating: Option<i32>,
    pub helpful: Option<bool>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl FeedbackFilter {
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

fn bind_filter<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    filter: &FeedbackFilter,
    search: Option<&'q str>,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(filter.status.map(FeedbackStatus::as_str))
        .bind(filter.category.map(FeedbackCategory::as_str))
        .bind(filter.rating)
        .bind(filter.helpful)
        .bind(filter.start)
        .bind(filter.end)
        .bind(search)
}

// ────────────────────────────────────────────────────────────────────────────
// Writes
// ────────────────────────────────────────────────────────────────────────────

pub struct NewFeedback<'a> {
    pub feedback_id: &'a str,
    pub analysis_id: &'a str,
    pub rating: i32,
    pub helpful: bool,
    pub suggestions: &'a str,
    pub category: FeedbackCategory,
}

/// Fails with a unique violation when the analysis already has feedback.
pub async fn insert(pool: &PgPool, new: NewFeedback<'_>) -> Result<FeedbackRow, sqlx::Error> {
    let row: FeedbackRow = sqlx::query_as(
        r#"
        INSERT INTO feedback (feedback_id, analysis_id, rating, helpful, suggestions, category)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(new.feedback_id)
    .bind(new.analysis_id)
    .bind(new.rating)
    .bind(new.helpful)
    .bind(new.suggestions)
    .bind(new.category.as_str())
    .fetch_one(pool)
    .await?;

    info!(
        "Recorded feedback {} for analysis {} (rating {})",
        new.feedback_id, new.analysis_id, new.rating
    );
    Ok(row)
}

/// Admin edit. Empty notes clear the stored notes; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackUpdate {
    pub status: Option<FeedbackStatus>,
    pub admin_notes: Option<String>,
}

pub async fn update(
    pool: &PgPool,
    feedback_id: &str,
    changes: &FeedbackUpdate,
) -> Result<Option<FeedbackRow>, sqlx::Error> {
    let marks_review = changes.status.is_some_and(FeedbackStatus::marks_review);
    sqlx::query_as(
        r#"
        UPDATE feedback
        SET status = COALESCE($2, status),
            reviewed_at = CASE WHEN $3 THEN now() ELSE reviewed_at END,
            admin_notes = CASE WHEN $4::text IS NULL THEN admin_notes ELSE NULLIF($4, '') END,
            updated_at = now()
        WHERE feedback_id = $1
        RETURNING *
        "#,
    )
    .bind(feedback_id)
    .bind(changes.status.map(FeedbackStatus::as_str))
    .bind(marks_review)
    .bind(changes.admin_notes.as_deref())
    .fetch_optional(pool)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Reads
// ────────────────────────────────────────────────────────────────────────────

pub async fn for_analysis(pool: &PgPool, analysis_id: &str) -> Result<Option<FeedbackRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM feedback WHERE analysis_id = $1")
        .bind(analysis_id)
        .fetch_optional(pool)
        .await
}

pub async fn get(pool: &PgPool, feedback_id: &str) -> Result<Option<FeedbackEntry>, sqlx::Error> {
    let sql = format!("{ENTRY_SELECT} WHERE f.feedback_id = $1");
    sqlx::query_as(&sql)
        .bind(feedback_id)
        .fetch_optional(pool)
        .await
}

/// Newest first.
pub async fn list(
    pool: &PgPool,
    page: &Page,
    filter: &FeedbackFilter,
) -> Result<(Vec<FeedbackEntry>, i64), sqlx::Error> {
    let search = filter.search_pattern();

    let count_sql = format!("SELECT COUNT(*) FROM feedback f {FILTER_WHERE}");
    let (total,): (i64,) = bind_filter(sqlx::query_as(&count_sql), filter, search.as_deref())
        .fetch_one(pool)
        .await?;

    let sql = format!("{ENTRY_SELECT} {FILTER_WHERE} ORDER BY f.created_at DESC LIMIT $8 OFFSET $9");
    let rows = bind_filter(sqlx::query_as(&sql), filter, search.as_deref())
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

/// Everything matching `filter`, newest first, capped at [`EXPORT_LIMIT`].
pub async fn export_rows(pool: &PgPool, filter: &FeedbackFilter) -> Result<Vec<FeedbackEntry>, sqlx::Error> {
    let search = filter.search_pattern();
    let sql = format!("{ENTRY_SELECT} {FILTER_WHERE} ORDER BY f.created_at DESC LIMIT $8");
    bind_filter(sqlx::query_as(&sql), filter, search.as_deref())
        .bind(EXPORT_LIMIT)
        .fetch_all(pool)
        .await
}

#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct FeedbackTotals {
    pub total: i64,
    pub average_rating: f64,
    pub helpful: i64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
    pub pending: i64,
    pub reviewed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub average_rating: f64,
    pub helpful_percentage: f64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
    pub pending: i64,
    pub reviewed: i64,
    pub status_breakdown: BTreeMap<String, i64>,
    pub category_breakdown: BTreeMap<String, i64>,
    pub rating_distribution: BTreeMap<String, i64>,
}

impl FeedbackStats {
    pub fn assemble(
        totals: FeedbackTotals,
        by_status: Vec<(String, i64)>,
        by_category: Vec<(String, i64)>,
        by_rating: Vec<(i32, i64)>,
    ) -> Self {
        let helpful_percentage = if totals.total > 0 {
            totals.helpful as f64 * 100.0 / totals.total as f64
        } else {
            0.0
        };
        Self {
            total_feedback: totals.total,
            average_rating: totals.average_rating,
            helpful_percentage,
            today: totals.today,
            this_week: totals.this_week,
            this_month: totals.this_month,
            pending: totals.pending,
            reviewed: totals.reviewed,
            status_breakdown: by_status.into_iter().collect(),
            category_breakdown: by_category.into_iter().collect(),
            rating_distribution: by_rating
                .into_iter()
                .map(|(rating, count)| (rating.to_string(), count))
                .collect(),
        }
    }
}

const RANGE_WHERE: &str = "WHERE ($1::timestamptz IS NULL OR created_at >= $1) \
                           AND ($2::timestamptz IS NULL OR created_at <= $2)";

/// Aggregates over feedback created within the optional range.
pub async fn stats(
    pool: &PgPool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<FeedbackStats, sqlx::Error> {
    let totals_sql = format!(
        r#"
        SELECT
            COUNT(*)                                                        AS total,
            CAST(COALESCE(AVG(rating), 0) AS float8)                        AS average_rating,
            COUNT(*) FILTER (WHERE helpful)                                 AS helpful,
            COUNT(*) FILTER (WHERE created_at >= date_trunc('day', now()))  AS today,
            COUNT(*) FILTER (WHERE created_at >= now() - interval '7 days') AS this_week,
            COUNT(*) FILTER (WHERE created_at >= now() - interval '30 days') AS this_month,
            COUNT(*) FILTER (WHERE status = 'pending')                      AS pending,
            COUNT(*) FILTER (WHERE status = 'reviewed')                     AS reviewed
        FROM feedback {RANGE_WHERE}
        "#
    );
    let totals: FeedbackTotals = sqlx::query_as(&totals_sql)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

    let by_status: Vec<(String, i64)> = sqlx::query_as(&format!(
        "SELECT status, COUNT(*) FROM feedback {RANGE_WHERE} GROUP BY status"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let by_category: Vec<(String, i64)> = sqlx::query_as(&format!(
        "SELECT category, COUNT(*) FROM feedback {RANGE_WHERE} GROUP BY category"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let by_rating: Vec<(i32, i64)> = sqlx::query_as(&format!(
        "SELECT rating, COUNT(*) FROM feedback {RANGE_WHERE} GROUP BY rating ORDER BY rating"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(FeedbackStats::assemble(totals, by_status, by_category, by_rating))
}
