use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::errors::AppError;

pub const INVALID_ANALYSIS_ID: &str = "Invalid analysis ID format";

/// Public analysis ids are non-empty runs of ASCII letters, digits and dashes.
pub fn is_valid_analysis_id(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// The `:analysis_id` path segment, checked before the handler touches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AnalysisId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if !is_valid_analysis_id(&raw) {
            return Err(AppError::Validation(INVALID_ANALYSIS_ID.to_string()));
        }
        Ok(AnalysisId(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_id_format() {
        assert!(is_valid_analysis_id("0b7c1d6e-8f7a-4a51-9d1e-2f7b3c9a1e55"));
        assert!(is_valid_analysis_id("ABC-123"));
        assert!(!is_valid_analysis_id(""));
        assert!(!is_valid_analysis_id("abc_123"));
        assert!(!is_valid_analysis_id("abc 123"));
        assert!(!is_valid_analysis_id("../etc"));
        assert!(!is_valid_analysis_id("ä-1"));
    }
}
