//! Durable snapshot of a half-finished wizard.
//!
//! The wire shape is the `pendingAnalysis` blob the web client keeps in local storage:
//! `{"resumeFile": {"name", "size", "type", "data"}, "currentStep": "job-description"}`
//! where `data` is a base64 data URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::file_ref::FileRef;
use crate::workflow::machine::{Step, WorkflowState};
use crate::workflow::validation::validate_resume_file;

/// Local-storage key the web client uses for the snapshot.
pub const PENDING_ANALYSIS_KEY: &str = "pendingAnalysis";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Stored size {declared} does not match decoded size {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("Stored resume is no longer valid: {0}")]
    Rejected(#[from] crate::workflow::validation::FileRejection),

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedFile {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedWorkflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_file: Option<PersistedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<Step>,
}

impl PersistedFile {
    pub fn from_file(file: &FileRef) -> Self {
        Self {
            name: file.name.clone(),
            size: file.size(),
            mime_type: file.mime_type.clone(),
            data: format!(
                "data:{};base64,{}",
                file.mime_type,
                STANDARD.encode(&file.content)
            ),
        }
    }

    /// Decodes the data URL. A MIME type embedded in the URL overrides `type`.
    pub fn to_file(&self) -> Result<FileRef, PersistError> {
        let (header, payload) = self
            .data
            .split_once(',')
            .ok_or(PersistError::MalformedDataUrl)?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(PersistError::MalformedDataUrl);
        }
        let embedded = &header["data:".len()..header.len() - ";base64".len()];
        let mime_type = if embedded.is_empty() {
            self.mime_type.clone()
        } else {
            embedded.to_string()
        };

        let content = STANDARD.decode(payload.trim())?;
        let actual = content.len() as u64;
        if self.size != 0 && self.size != actual {
            return Err(PersistError::SizeMismatch {
                declared: self.size,
                actual,
            });
        }

        Ok(FileRef::new(self.name.clone(), mime_type, Bytes::from(content)))
    }
}

impl PersistedWorkflow {
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl WorkflowState {
    /// Captures the parts of the wizard that survive a reload: the resume and the step.
    pub fn snapshot(&self) -> PersistedWorkflow {
        PersistedWorkflow {
            resume_file: self.resume_file().map(PersistedFile::from_file),
            current_step: Some(self.step()),
        }
    }

    /// Rebuilds state from a snapshot on mount. A resume already held in memory is
    /// never overwritten, and the stored step is clamped to what the guards allow.
    pub fn restore(&mut self, persisted: &PersistedWorkflow) -> Result<Step, PersistError> {
        let resume = match &persisted.resume_file {
            Some(stored) => {
                let file = stored.to_file()?;
                validate_resume_file(&file)?;
                Some(file)
            }
            None => None,
        };
        self.restore_parts(resume, persisted.current_step);
        Ok(self.step())
    }

    pub fn from_snapshot(persisted: &PersistedWorkflow) -> Result<Self, PersistError> {
        let mut state = Self::new();
        state.restore(persisted)?;
        Ok(state)
    }
}
