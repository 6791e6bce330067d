use tracing::warn;

use crate::workflow::validation::{MIME_PDF, MIME_TXT};
use crate::workflow::FileRef;

/// Upper bound on stored resume text, in characters.
pub const PREVIEW_CHARS: usize = 1000;

/// Short plain-text preview of an uploaded document for the analyses table.
/// PDF parsing is CPU-bound and runs on the blocking pool.
pub async fn text_preview(file: &FileRef) -> String {
    if file.mime_type != MIME_PDF {
        return preview_sync(file);
    }

    let name = file.name.clone();
    let content = file.content.clone();
    let extracted = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&content).map_err(|e| e.to_string())
    })
    .await;
    match extracted {
        Ok(Ok(text)) => truncate_chars(normalize_whitespace(&text), PREVIEW_CHARS),
        Ok(Err(e)) => {
            warn!("Could not extract text from {name}: {e}");
            placeholder(&name)
        }
        Err(e) => {
            warn!("PDF extraction task for {name} did not complete: {e}");
            placeholder(&name)
        }
    }
}

fn preview_sync(file: &FileRef) -> String {
    if file.mime_type == MIME_TXT {
        let text = String::from_utf8_lossy(&file.content);
        return truncate_chars(normalize_whitespace(&text), PREVIEW_CHARS);
    }
    placeholder(&file.name)
}

fn placeholder(name: &str) -> String {
    format!("[Text preview unavailable for {name}]")
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::validation::MIME_DOCX;

    #[tokio::test]
    async fn test_text_files_are_normalized() {
        let file = FileRef::new("jd.txt", MIME_TXT, b"Senior   Rust\n\nengineer".to_vec());
        assert_eq!(text_preview(&file).await, "Senior Rust engineer");
    }

    #[tokio::test]
    async fn test_docx_gets_placeholder() {
        let file = FileRef::new("cv.docx", MIME_DOCX, b"PK\x03\x04".to_vec());
        assert_eq!(
            text_preview(&file).await,
            "[Text preview unavailable for cv.docx]"
        );
    }

    #[tokio::test]
    async fn test_unparseable_pdf_gets_placeholder() {
        let file = FileRef::new("cv.pdf", MIME_PDF, b"not really a pdf".to_vec());
        assert_eq!(
            text_preview(&file).await,
            "[Text preview unavailable for cv.pdf]"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(1200);
        let cut = truncate_chars(text, PREVIEW_CHARS);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS);
        assert_eq!(truncate_chars("short".into(), 10), "short");
    }
}
