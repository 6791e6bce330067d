//! Cache records for in-flight and finished analyses.

use std::time::Duration;

use serde_json::Value;

use crate::analysis::schema::Report;
use crate::cache::{get_json, put_json, CacheError, KeyValueStore};
use crate::models::analysis::AnalysisStatus;

pub const STATUS_TTL: Duration = Duration::from_secs(60 * 60);
pub const RESULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

pub fn status_key(analysis_id: &str) -> String {
    format!("analysis:status:{analysis_id}")
}

pub fn result_key(analysis_id: &str) -> String {
    format!("analysis:result:{analysis_id}")
}

pub async fn put_status(
    store: &dyn KeyValueStore,
    analysis_id: &str,
    status: &AnalysisStatus,
) -> Result<(), CacheError> {
    put_json(store, &status_key(analysis_id), status, STATUS_TTL).await
}

pub async fn get_status(
    store: &dyn KeyValueStore,
    analysis_id: &str,
) -> Result<Option<AnalysisStatus>, CacheError> {
    get_json(store, &status_key(analysis_id)).await
}

pub async fn put_result(
    store: &dyn KeyValueStore,
    analysis_id: &str,
    report: &Report,
) -> Result<(), CacheError> {
    put_json(store, &result_key(analysis_id), report, RESULT_TTL).await
}

pub async fn get_result(
    store: &dyn KeyValueStore,
    analysis_id: &str,
) -> Result<Option<Value>, CacheError> {
    get_json(store, &result_key(analysis_id)).await
}

/// Drops both records, e.g. after the analysis row is deleted.
pub async fn forget(store: &dyn KeyValueStore, analysis_id: &str) -> Result<(), CacheError> {
    store.delete(&status_key(analysis_id)).await?;
    store.delete(&result_key(analysis_id)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use chrono::Utc;

    #[test]
    fn test_keys() {
        assert_eq!(status_key("abc"), "analysis:status:abc");
        assert_eq!(result_key("abc"), "analysis:result:abc");
    }

    #[tokio::test]
    async fn test_status_and_result_round_trip() {
        let store = MemoryStore::new();
        let status = AnalysisStatus::processing(Utc::now());
        put_status(&store, "a1", &status).await.unwrap();
        assert_eq!(get_status(&store, "a1").await.unwrap(), Some(status));

        let report = Report {
            score_out_of_100: 77.0,
            ..Default::default()
        };
        put_result(&store, "a1", &report).await.unwrap();
        let cached = get_result(&store, "a1").await.unwrap().unwrap();
        assert_eq!(cached["score_out_of_100"], 77.0);

        forget(&store, "a1").await.unwrap();
        assert!(get_status(&store, "a1").await.unwrap().is_none());
        assert!(get_result(&store, "a1").await.unwrap().is_none());
    }
}
