//! Validation predicates shared by the upload wizard and the submission endpoint.

use thiserror::Error;

use crate::workflow::file_ref::FileRef;

/// Hard ceiling for every uploaded file (resume or job description).
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Minimum number of whitespace-separated words in a pasted job description.
pub const MIN_JOB_DESCRIPTION_WORDS: usize = 50;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TXT: &str = "text/plain";

pub const RESUME_TYPES: &[&str] = &[MIME_PDF, MIME_DOCX];
pub const JOB_DESCRIPTION_TYPES: &[&str] = &[MIME_PDF, MIME_DOCX, MIME_TXT];

/// Why a selected file was refused. The `Display` text is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("File size must be less than 5MB")]
    TooLarge { size: u64 },

    #[error("Please upload a PDF or DOCX file for resume")]
    UnsupportedResumeType { mime_type: String },

    #[error("Please upload a PDF, DOCX, or TXT file for job description")]
    UnsupportedJobDescriptionType { mime_type: String },
}

/// Which slot a file is being selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePurpose {
    Resume,
    JobDescription,
}

impl FilePurpose {
    pub fn allowed_types(self) -> &'static [&'static str] {
        match self {
            FilePurpose::Resume => RESUME_TYPES,
            FilePurpose::JobDescription => JOB_DESCRIPTION_TYPES,
        }
    }

    fn type_rejection(self, mime_type: &str) -> FileRejection {
        let mime_type = mime_type.to_string();
        match self {
            FilePurpose::Resume => FileRejection::UnsupportedResumeType { mime_type },
            FilePurpose::JobDescription => FileRejection::UnsupportedJobDescriptionType { mime_type },
        }
    }
}

/// True iff the file fits under the size ceiling and its MIME type is in `allowed`.
pub fn is_valid_file(file: &FileRef, allowed: &[&str]) -> bool {
    file.size() <= MAX_FILE_SIZE && allowed.contains(&file.mime_type.as_str())
}

/// Checks size first, then type, so an oversize file always reports the size message.
pub fn validate_file(file: &FileRef, purpose: FilePurpose) -> Result<(), FileRejection> {
    if file.size() > MAX_FILE_SIZE {
        return Err(FileRejection::TooLarge { size: file.size() });
    }
    if !purpose.allowed_types().contains(&file.mime_type.as_str()) {
        return Err(purpose.type_rejection(&file.mime_type));
    }
    Ok(())
}

pub fn validate_resume_file(file: &FileRef) -> Result<(), FileRejection> {
    validate_file(file, FilePurpose::Resume)
}

pub fn validate_job_description_file(file: &FileRef) -> Result<(), FileRejection> {
    validate_file(file, FilePurpose::JobDescription)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Text-mode completeness: at least [`MIN_JOB_DESCRIPTION_WORDS`] words after trimming.
pub fn job_description_is_complete(text: &str) -> bool {
    word_count(text.trim()) >= MIN_JOB_DESCRIPTION_WORDS
}

/// Human-readable size, e.g. `0 B`, `1.5 KB`, `5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // f64 Display drops a trailing ".0", so 5.0 renders as "5"
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime: &str, size: usize) -> FileRef {
        FileRef::new("resume", mime, vec![0u8; size])
    }

    #[test]
    fn test_pdf_under_limit_is_valid() {
        assert!(is_valid_file(&file(MIME_PDF, 1024), RESUME_TYPES));
    }

    #[test]
    fn test_exactly_five_megabytes_is_valid() {
        assert!(is_valid_file(&file(MIME_PDF, MAX_FILE_SIZE as usize), RESUME_TYPES));
    }

    #[test]
    fn test_one_byte_over_limit_is_invalid() {
        let f = file(MIME_PDF, MAX_FILE_SIZE as usize + 1);
        assert!(!is_valid_file(&f, RESUME_TYPES));
        assert_eq!(
            validate_resume_file(&f),
            Err(FileRejection::TooLarge {
                size: MAX_FILE_SIZE + 1
            })
        );
    }

    #[test]
    fn test_txt_rejected_for_resume_but_allowed_for_job_description() {
        let f = file(MIME_TXT, 10);
        let err = validate_resume_file(&f).unwrap_err();
        assert_eq!(err.to_string(), "Please upload a PDF or DOCX file for resume");
        assert!(validate_job_description_file(&f).is_ok());
    }

    #[test]
    fn test_unknown_type_rejected_for_job_description() {
        let err = validate_job_description_file(&file("image/png", 10)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please upload a PDF, DOCX, or TXT file for job description"
        );
    }

    #[test]
    fn test_size_checked_before_type() {
        let err = validate_resume_file(&file("image/png", 6 * 1024 * 1024)).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 5MB");
    }

    #[test]
    fn test_word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  rust \n\t  engineer   wanted "), 3);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn test_job_description_needs_fifty_words() {
        let forty_nine = vec!["word"; 49].join(" ");
        let fifty = vec!["word"; 50].join(" ");
        assert!(!job_description_is_complete(&forty_nine));
        assert!(job_description_is_complete(&fifty));
        assert!(job_description_is_complete(&format!("\n\n  {fifty}  \n")));
    }

    #[test]
    fn test_long_text_with_few_words_is_incomplete() {
        let text = "a".repeat(400);
        assert!(!job_description_is_complete(&text));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }
}
