//! Raw text extraction from Word (.docx) documents.

use crate::error::{LecternError, Result};
use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use std::sync::LazyLock;

static PARAGRAPH_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</w:p>|<w:br\s*/>|<w:cr\s*/>").expect("valid regex"));
static TAB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<w:tab\s*/>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|lt|gt|quot|apos|amp);").expect("valid regex")
});

/// Extract the body text of a .docx file, one line per paragraph.
pub fn extract_docx_text(data: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| LecternError::Extraction(format!("Not a Word document: {}", e)))?
        .read_to_string(&mut xml)?;

    let text = PARAGRAPH_END.replace_all(&xml, "\n");
    let text = TAB.replace_all(&text, "\t");
    let text = TAG.replace_all(&text, "");

    Ok(unescape_xml(&text))
}

/// Decode named and numeric character references in one pass.
///
/// References that do not name a valid character are left as is.
fn unescape_xml(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let decoded = match &caps[1] {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                reference => decode_char_ref(reference),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn decode_char_ref(reference: &str) -> Option<char> {
    let code = match reference.strip_prefix("#x").or_else(|| reference.strip_prefix("#X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => reference.strip_prefix('#')?.parse().ok()?,
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_paragraphs() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>Week 1:</w:t></w:r><w:r><w:tab/><w:t>Cells &amp; tissues</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Read chapter 2</w:t></w:r></w:p></w:body></w:document>"#;

        let text = extract_docx_text(&build_docx(xml)).unwrap();
        assert_eq!(text.trim(), "Week 1:\tCells & tissues\nRead chapter 2");
    }

    #[test]
    fn test_decodes_character_references() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>It&#8217;s 5 &#x2014; 6 &lt;b&gt;</w:t></w:r></w:p><w:p><w:r><w:t>Type &amp;#8217; literally &#xD800;</w:t></w:r></w:p></w:body></w:document>"#;

        let text = extract_docx_text(&build_docx(xml)).unwrap();
        assert_eq!(
            text.trim(),
            "It\u{2019}s 5 \u{2014} 6 <b>\nType &#8217; literally &#xD800;"
        );
    }

    #[test]
    fn test_rejects_archive_without_document() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("notes.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        let data = writer.finish().unwrap().into_inner();

        assert!(matches!(
            extract_docx_text(&data),
            Err(LecternError::Extraction(_))
        ));
    }

    #[test]
    fn test_rejects_non_zip() {
        assert!(matches!(
            extract_docx_text(b"plain bytes"),
            Err(LecternError::Archive(_))
        ));
    }
}
