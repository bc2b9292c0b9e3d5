//! Text extraction from uploaded files.
//!
//! Plain text is passed through and Word documents are unpacked. Anything
//! else, PDF included, is rejected as unsupported.

mod docx;

pub use docx::extract_docx_text;

use crate::error::{LecternError, Result};
use tracing::{debug, instrument};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// File formats that can be turned into a text chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    WordDocument,
}

impl FileKind {
    /// Resolve a MIME type to a supported kind.
    pub fn from_mime(mime_type: &str) -> Result<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match essence.as_str() {
            "text/plain" => Ok(FileKind::PlainText),
            DOCX_MIME => Ok(FileKind::WordDocument),
            "application/pdf" => Err(LecternError::UnsupportedFileType(
                "PDF processing is disabled; upload a Word (.docx) or text (.txt) file".to_string(),
            )),
            _ => Err(LecternError::UnsupportedFileType(format!(
                "{} (only Word .docx and text .txt files are accepted)",
                mime_type
            ))),
        }
    }

    /// Short tag stored with the room.
    pub fn tag(&self) -> &'static str {
        match self {
            FileKind::PlainText => "txt",
            FileKind::WordDocument => "docx",
        }
    }
}

/// Text pulled out of an uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFile {
    pub file_name: String,
    pub kind: FileKind,
    pub content: String,
}

/// Extract the text of an uploaded file.
#[instrument(skip(data), fields(bytes = data.len()))]
pub fn extract_text(data: &[u8], mime_type: &str, file_name: &str) -> Result<ExtractedFile> {
    let kind = FileKind::from_mime(mime_type)?;

    let content = match kind {
        FileKind::PlainText => String::from_utf8(data.to_vec())
            .map_err(|e| LecternError::Extraction(format!("File is not valid UTF-8: {}", e)))?,
        FileKind::WordDocument => extract_docx_text(data)?,
    };

    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(LecternError::InvalidInput(format!(
            "No text could be extracted from {}",
            file_name
        )));
    }

    debug!("Extracted {} characters from {}", content.len(), file_name);

    Ok(ExtractedFile {
        file_name: file_name.to_string(),
        kind,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_pass_through() {
        let extracted = extract_text(b"  Lecture notes\n", "text/plain; charset=utf-8", "notes.txt").unwrap();
        assert_eq!(extracted.content, "Lecture notes");
        assert_eq!(extracted.kind.tag(), "txt");
        assert_eq!(extracted.file_name, "notes.txt");
    }

    #[test]
    fn test_rejects_pdf_and_unknown() {
        assert!(matches!(
            extract_text(b"%PDF-1.7", "application/pdf", "slides.pdf"),
            Err(LecternError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            extract_text(b"\x89PNG", "image/png", "photo.png"),
            Err(LecternError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_rejects_blank_file() {
        assert!(matches!(
            extract_text(b"   \n", "text/plain", "empty.txt"),
            Err(LecternError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        assert!(matches!(
            extract_text(&[0xff, 0xfe, 0x00], "text/plain", "binary.txt"),
            Err(LecternError::Extraction(_))
        ));
    }
}
