//! Analysis engine client. The only place that talks to the external AI service.
//!
//! The engine receives the resume and the job description as a multipart form and
//! answers with a JSON analysis document. Its internals are opaque to us; see
//! `analysis::schema` for how the answer is interpreted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::workflow::{FileRef, JobInput, Submission};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Engine returned an empty body")]
    EmptyBody,
}

/// The pluggable engine seam. `AppState` holds an `Arc<dyn AnalysisEngine>`.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn analyze(&self, submission: &Submission) -> Result<Value, EngineError>;
    async fn health(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    detail: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpAnalysisEngine {
    client: Client,
    base_url: String,
}

impl HttpAnalysisEngine {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    fn build_form(submission: &Submission) -> Result<multipart::Form, EngineError> {
        let form = multipart::Form::new().part("resume", file_part(&submission.resume)?);
        let form = match &submission.job {
            JobInput::Text(text) => form.text("job_description", text.clone()),
            JobInput::File(file) => {
                // Plain-text files are also sent inline so the engine needs no decoder.
                let form = match std::str::from_utf8(&file.content) {
                    Ok(text) if file.mime_type == crate::workflow::validation::MIME_TXT => {
                        form.text("job_description", text.to_string())
                    }
                    _ => form,
                };
                form.part("job_description_file", file_part(file)?)
            }
        };
        Ok(form)
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << (attempt - 1)))
}

fn file_part(file: &FileRef) -> Result<multipart::Part, EngineError> {
    Ok(multipart::Part::bytes(file.content.to_vec())
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)?)
}

/// Outcome of one failed call: retryable (429, 5xx, transport) or final.
enum AttemptError {
    Retry(EngineError),
    Fatal(EngineError),
}

impl HttpAnalysisEngine {
    async fn attempt(&self, url: &str, submission: &Submission) -> Result<Value, AttemptError> {
        // multipart::Form is single-use, so it is rebuilt per attempt
        let form = Self::build_form(submission).map_err(AttemptError::Fatal)?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AttemptError::Retry(EngineError::Http(e)))?;

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Analysis service returned {}: {}", status, body);
            return Err(AttemptError::Retry(EngineError::Api {
                status: status.as_u16(),
                message: body,
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<EngineErrorBody>(&body)
                .ok()
                .and_then(|e| e.detail.or(e.message))
                .unwrap_or(body);
            return Err(AttemptError::Fatal(EngineError::Api {
                status: status.as_u16(),
                message,
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Fatal(EngineError::Http(e)))?;
        if body.trim().is_empty() {
            return Err(AttemptError::Fatal(EngineError::EmptyBody));
        }
        serde_json::from_str(&body).map_err(|e| {
            AttemptError::Fatal(EngineError::Api {
                status: status.as_u16(),
                message: format!("response is not JSON: {e}"),
            })
        })
    }
}

#[async_trait]
impl AnalysisEngine for HttpAnalysisEngine {
    /// Posts the submission to `/analyze`.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff; the last
    /// attempt's error is returned when all of them fail.
    async fn analyze(&self, submission: &Submission) -> Result<Value, EngineError> {
        let url = format!("{}/analyze", self.base_url);
        let mut attempt = 1;

        loop {
            match self.attempt(&url, submission).await {
                Ok(document) => {
                    debug!("Analysis call succeeded on attempt {attempt}");
                    return Ok(document);
                }
                Err(AttemptError::Retry(e)) if attempt < MAX_RETRIES => {
                    // Exponential backoff: 1s, 2s
                    let delay = backoff(attempt);
                    warn!(
                        "Analysis call attempt {} failed ({}), retrying after {}ms...",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AttemptError::Retry(e)) | Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => true,
            Ok(r) => {
                info!("Analysis service health check returned {}", r.status());
                false
            }
            Err(e) => {
                warn!("Analysis service health check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::validation::{MIME_PDF, MIME_TXT};

    fn submission(job: JobInput) -> Submission {
        Submission {
            resume: FileRef::new("cv.pdf", MIME_PDF, b"%PDF".to_vec()),
            job,
        }
    }

    #[test]
    fn test_form_builds_for_text_job() {
        assert!(HttpAnalysisEngine::build_form(&submission(JobInput::Text("jd".into()))).is_ok());
    }

    #[test]
    fn test_form_builds_for_file_job() {
        let jd = FileRef::new("jd.txt", MIME_TXT, b"Rust engineer".to_vec());
        assert!(HttpAnalysisEngine::build_form(&submission(JobInput::File(jd))).is_ok());
    }

    #[test]
    fn test_invalid_mime_is_rejected_by_form_builder() {
        let bad = Submission {
            resume: FileRef::new("cv.pdf", "not a mime", b"x".to_vec()),
            job: JobInput::Text("jd".into()),
        };
        assert!(matches!(
            HttpAnalysisEngine::build_form(&bad),
            Err(EngineError::Http(_))
        ));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_engine_returns_last_transport_error() {
        let engine =
            HttpAnalysisEngine::new("http://127.0.0.1:9".to_string(), Duration::from_millis(200))
                .unwrap();
        let err = engine
            .analyze(&submission(JobInput::Text("jd".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Http(_)));
    }

    #[tokio::test]
    async fn test_unreachable_engine_reports_unhealthy() {
        let engine =
            HttpAnalysisEngine::new("http://127.0.0.1:9".to_string(), Duration::from_millis(200))
                .unwrap();
        assert!(!engine.health().await);
    }
}
