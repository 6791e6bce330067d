use bytes::Bytes;

use crate::workflow::validation::{MIME_DOCX, MIME_PDF, MIME_TXT};

/// A user-selected file held in memory: picked, dropped, pasted or uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl FileRef {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    /// Builds a file from a multipart part. Browsers and HTTP clients often send
    /// `application/octet-stream` or nothing at all, so the extension decides then.
    pub fn from_upload(file_name: Option<&str>, declared_type: Option<&str>, content: Bytes) -> Self {
        let name = file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("upload")
            .to_string();
        let mime_type = match declared_type.map(str::trim) {
            Some(t) if !t.is_empty() && t != "application/octet-stream" => {
                // "text/plain; charset=utf-8" -> "text/plain"
                t.split(';').next().unwrap_or(t).trim().to_ascii_lowercase()
            }
            _ => mime_from_extension(&name).unwrap_or("application/octet-stream").to_string(),
        };
        Self {
            name,
            mime_type,
            content,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl std::fmt::Debug for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRef")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.content.len())
            .finish()
    }
}

pub fn mime_from_extension(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some(MIME_PDF),
        "docx" => Some(MIME_DOCX),
        "txt" => Some(MIME_TXT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_wins() {
        let f = FileRef::from_upload(Some("cv.bin"), Some("application/pdf"), Bytes::new());
        assert_eq!(f.mime_type, MIME_PDF);
    }

    #[test]
    fn test_octet_stream_falls_back_to_extension() {
        let f = FileRef::from_upload(
            Some("Resume.DOCX"),
            Some("application/octet-stream"),
            Bytes::from_static(b"PK"),
        );
        assert_eq!(f.mime_type, MIME_DOCX);
        assert_eq!(f.extension(), Some("DOCX"));
    }

    #[test]
    fn test_charset_parameter_is_stripped() {
        let f = FileRef::from_upload(Some("jd.txt"), Some("Text/Plain; charset=utf-8"), Bytes::new());
        assert_eq!(f.mime_type, MIME_TXT);
    }

    #[test]
    fn test_missing_name_and_type() {
        let f = FileRef::from_upload(None, None, Bytes::from_static(b"abc"));
        assert_eq!(f.name, "upload");
        assert_eq!(f.mime_type, "application/octet-stream");
        assert_eq!(f.size(), 3);
    }

    #[test]
    fn test_debug_omits_content() {
        let f = FileRef::new("cv.pdf", MIME_PDF, vec![1u8; 4]);
        let rendered = format!("{f:?}");
        assert!(rendered.contains("size: 4"));
        assert!(!rendered.contains("content"));
    }
}
