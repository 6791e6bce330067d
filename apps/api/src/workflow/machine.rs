//! The upload → job-description → analyze wizard.
//!
//! Everything here is synchronous and owned by a single driver. A refused transition
//! leaves `step` untouched; file rejections only set the matching message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::workflow::file_ref::FileRef;
use crate::workflow::validation::{
    job_description_is_complete, validate_job_description_file, validate_resume_file,
    word_count, FileRejection,
};

/// Shown when the analysis call fails for any reason.
pub const SUBMISSION_FAILED_MESSAGE: &str = "Analysis failed. Please try again.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    #[default]
    Upload,
    JobDescription,
    Analyze,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::JobDescription => "job-description",
            Step::Analyze => "analyze",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobInputMethod {
    #[default]
    Text,
    File,
}

/// Why a forward transition or a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Please upload your resume first")]
    ResumeMissing,

    #[error("Job description must be at least 50 words")]
    JobDescriptionTooShort { words: usize },

    #[error("Please upload a job description file")]
    JobFileMissing,

    #[error("An analysis is already in progress")]
    SubmissionInFlight,

    #[error("Analysis is already the final step")]
    AlreadyAtEnd,
}

/// Where a pasted file ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteTarget {
    Resume,
    JobFile,
}

/// The job requirements handed to the analysis service.
#[derive(Debug, Clone, PartialEq)]
pub enum JobInput {
    Text(String),
    File(FileRef),
}

/// Everything the analysis call needs, captured at the moment of "Start Analysis".
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub resume: FileRef,
    pub job: JobInput,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    step: Step,
    resume_file: Option<FileRef>,
    job_description: String,
    job_file: Option<FileRef>,
    job_input_method: JobInputMethod,

    resume_error: Option<String>,
    job_file_error: Option<String>,
    job_description_error: Option<String>,

    in_flight: bool,
    submission_error: Option<String>,
    result: Option<Value>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn resume_file(&self) -> Option<&FileRef> {
        self.resume_file.as_ref()
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn job_file(&self) -> Option<&FileRef> {
        self.job_file.as_ref()
    }

    pub fn job_input_method(&self) -> JobInputMethod {
        self.job_input_method
    }

    pub fn resume_error(&self) -> Option<&str> {
        self.resume_error.as_deref()
    }

    pub fn job_file_error(&self) -> Option<&str> {
        self.job_file_error.as_deref()
    }

    pub fn job_description_error(&self) -> Option<&str> {
        self.job_description_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    pub fn submission_error(&self) -> Option<&str> {
        self.submission_error.as_deref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.job_description)
    }

    // ── Resume ─────────────────────────────────────────────────────────────

    /// Picker, drop and paste all land here. On rejection the current file is kept.
    pub fn select_resume(&mut self, file: FileRef) -> Result<(), FileRejection> {
        if let Err(rejection) = validate_resume_file(&file) {
            self.resume_error = Some(rejection.to_string());
            return Err(rejection);
        }
        self.resume_file = Some(file);
        self.resume_error = None;
        Ok(())
    }

    pub fn remove_resume(&mut self) {
        self.resume_file = None;
        self.resume_error = None;
        if self.step != Step::Upload {
            self.step = Step::Upload;
        }
    }

    // ── Job description ────────────────────────────────────────────────────

    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.job_description = text.into();
        if self.job_description_error.is_some() && self.text_requirement_met() {
            self.job_description_error = None;
        }
    }

    pub fn set_job_input_method(&mut self, method: JobInputMethod) {
        self.job_input_method = method;
    }

    /// Selecting a file switches to file mode and discards any typed text.
    pub fn select_job_file(&mut self, file: FileRef) -> Result<(), FileRejection> {
        if let Err(rejection) = validate_job_description_file(&file) {
            self.job_file_error = Some(rejection.to_string());
            return Err(rejection);
        }
        self.job_file = Some(file);
        self.job_file_error = None;
        self.job_description.clear();
        self.job_description_error = None;
        self.job_input_method = JobInputMethod::File;
        Ok(())
    }

    pub fn remove_job_file(&mut self) {
        self.job_file = None;
        self.job_file_error = None;
        if self.step == Step::Analyze && self.job_input_method == JobInputMethod::File {
            self.step = Step::JobDescription;
        }
    }

    /// Explicit "validate now" for the text box. Empty text is not flagged: the
    /// guard will still refuse it, but there is nothing to complain about yet.
    pub fn validate_job_description(&mut self) -> bool {
        let trimmed = self.job_description.trim();
        if !trimmed.is_empty() && !job_description_is_complete(trimmed) {
            self.job_description_error = Some(
                WorkflowError::JobDescriptionTooShort {
                    words: word_count(trimmed),
                }
                .to_string(),
            );
            return false;
        }
        self.job_description_error = None;
        true
    }

    /// Routes a clipboard file to the slot the user is looking at. An accepted resume
    /// paste always lands on the job-description step.
    pub fn paste_file(&mut self, file: FileRef) -> Result<PasteTarget, FileRejection> {
        let wants_job_file = self.step == Step::JobDescription
            && self.job_input_method == JobInputMethod::File
            && self.resume_file.is_some();

        if wants_job_file {
            self.select_job_file(file)?;
            return Ok(PasteTarget::JobFile);
        }

        self.select_resume(file)?;
        self.step = Step::JobDescription;
        Ok(PasteTarget::Resume)
    }

    // ── Guards and navigation ──────────────────────────────────────────────

    pub fn can_proceed_to_job_description(&self) -> bool {
        self.resume_file.is_some()
    }

    pub fn can_proceed_to_analysis(&self) -> bool {
        self.can_proceed_to_job_description() && self.job_requirement_met()
    }

    fn text_requirement_met(&self) -> bool {
        job_description_is_complete(&self.job_description)
    }

    fn job_requirement_met(&self) -> bool {
        match self.job_input_method {
            JobInputMethod::Text => self.text_requirement_met(),
            JobInputMethod::File => self.job_file.is_some(),
        }
    }

    fn analysis_guard(&self) -> Result<(), WorkflowError> {
        if self.resume_file.is_none() {
            return Err(WorkflowError::ResumeMissing);
        }
        match self.job_input_method {
            JobInputMethod::Text if !self.text_requirement_met() => {
                Err(WorkflowError::JobDescriptionTooShort {
                    words: self.word_count(),
                })
            }
            JobInputMethod::File if self.job_file.is_none() => Err(WorkflowError::JobFileMissing),
            _ => Ok(()),
        }
    }

    /// Advances one step if the guard for the next step holds.
    pub fn go_to_next_step(&mut self) -> Result<Step, WorkflowError> {
        match self.step {
            Step::Upload => {
                if !self.can_proceed_to_job_description() {
                    return Err(WorkflowError::ResumeMissing);
                }
                self.step = Step::JobDescription;
            }
            Step::JobDescription => {
                self.analysis_guard()?;
                self.step = Step::Analyze;
            }
            Step::Analyze => return Err(WorkflowError::AlreadyAtEnd),
        }
        Ok(self.step)
    }

    /// Backward navigation is never guarded.
    pub fn go_back(&mut self) -> Step {
        self.step = match self.step {
            Step::Upload | Step::JobDescription => Step::Upload,
            Step::Analyze => Step::JobDescription,
        };
        self.step
    }

    /// Jumps directly to `step`, clamped to the furthest step the guards allow.
    pub fn go_to(&mut self, step: Step) -> Step {
        self.step = match step {
            Step::Upload => Step::Upload,
            Step::JobDescription if self.can_proceed_to_job_description() => Step::JobDescription,
            Step::Analyze if self.can_proceed_to_analysis() => Step::Analyze,
            Step::Analyze if self.can_proceed_to_job_description() => Step::JobDescription,
            _ => Step::Upload,
        };
        self.step
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ── Submission ─────────────────────────────────────────────────────────

    /// "Start Analysis": moves to `analyze` and captures the payload. Refused while a
    /// previous submission is still pending.
    pub fn begin_submission(&mut self) -> Result<Submission, WorkflowError> {
        if self.in_flight {
            return Err(WorkflowError::SubmissionInFlight);
        }
        self.analysis_guard()?;

        let resume = self
            .resume_file
            .clone()
            .ok_or(WorkflowError::ResumeMissing)?;
        let job = match self.job_input_method {
            JobInputMethod::Text => JobInput::Text(self.job_description.trim().to_string()),
            JobInputMethod::File => {
                JobInput::File(self.job_file.clone().ok_or(WorkflowError::JobFileMissing)?)
            }
        };

        self.step = Step::Analyze;
        self.in_flight = true;
        self.submission_error = None;
        self.result = None;
        Ok(Submission { resume, job })
    }

    /// Records the outcome of the analysis call. Success consumes the files; failure
    /// keeps them so the user can retry.
    pub fn finish_submission<E>(&mut self, outcome: Result<Value, E>) {
        self.in_flight = false;
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.resume_file = None;
                self.job_file = None;
                self.submission_error = None;
            }
            Err(_) => {
                self.submission_error = Some(SUBMISSION_FAILED_MESSAGE.to_string());
            }
        }
    }

    /// "Analyze another": back to a clean wizard.
    pub fn start_over(&mut self) {
        self.reset();
    }

    pub(crate) fn restore_parts(&mut self, resume: Option<FileRef>, step: Option<Step>) {
        if self.resume_file.is_none() {
            if let Some(file) = resume {
                self.resume_file = Some(file);
            }
        }
        if let Some(step) = step {
            self.go_to(step);
        }
    }
}
