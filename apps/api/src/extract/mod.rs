//! Resume text extraction: PDF, legacy Word binary, and Word XML formats.
//!
//! Extracted text is normalized before storage: whitespace runs collapse to
//! single spaces, non-ASCII characters are stripped, and the result is
//! trimmed. An empty result means the document genuinely contains no text
//! and is not an error.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Attachment filename extensions recognized as resumes.
pub const RESUME_EXTENSIONS: [&str; 3] = [".pdf", ".doc", ".docx"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Extracts plain text from an attachment, dispatching on its declared
/// media type.
pub fn extract_text(data: &[u8], content_type: &str) -> Result<String, ExtractError> {
    let raw = if content_type == "application/pdf" {
        pdf_extract::extract_text_from_mem(data).map_err(|e| ExtractError::Pdf(e.to_string()))?
    } else if content_type.contains("wordprocessingml") {
        extract_docx_text(data)?
    } else if content_type.contains("msword") {
        scan_doc_text(data)
    } else {
        return Err(ExtractError::UnsupportedFormat(content_type.to_string()));
    };

    Ok(normalize(&raw))
}

/// True if the filename carries a supported resume extension.
pub fn has_resume_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    RESUME_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// DOCX is a zip archive; the body text lives in `word/document.xml` as
/// `<w:t>` runs, one `<w:p>` per paragraph.
fn extract_docx_text(data: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| ExtractError::Docx(format!("not a zip archive: {e}")))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut document_xml)
        .map_err(|e| ExtractError::Docx(format!("unreadable document.xml: {e}")))?;

    parse_docx_xml(&document_xml)
}

fn parse_docx_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    if let Ok(decoded) = e.decode() {
                        text.push_str(&quick_xml::escape::unescape(&decoded).unwrap_or_default());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(format!("XML parsing error: {e}"))),
            _ => {}
        }
    }

    Ok(text)
}

/// Minimum run length before a byte sequence counts as recovered text.
/// Short runs are overwhelmingly format noise.
const MIN_RUN_CHARS: usize = 12;

/// Best-effort text recovery from legacy binary Word files. Word 97 stores
/// body text as CP1252 or UTF-16LE runs inside the WordDocument stream;
/// rather than parse the CFB container, recover the printable runs in
/// whichever encoding yields more text.
fn scan_doc_text(data: &[u8]) -> String {
    let ascii = scan_ascii_runs(data);
    let utf16 = scan_utf16le_runs(data);
    if utf16.len() > ascii.len() {
        utf16
    } else {
        ascii
    }
}

fn scan_ascii_runs(data: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for &byte in data {
        if is_textual(byte) {
            run.push(byte as char);
        } else {
            flush_run(&mut out, &mut run);
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn scan_utf16le_runs(data: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for pair in data.chunks_exact(2) {
        if pair[1] == 0 && is_textual(pair[0]) {
            run.push(pair[0] as char);
        } else {
            flush_run(&mut out, &mut run);
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn is_textual(byte: u8) -> bool {
    byte == b' ' || byte == b'\t' || byte == b'\n' || byte == b'\r' || (0x20..0x7f).contains(&byte)
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.trim().chars().count() >= MIN_RUN_CHARS {
        out.push_str(run);
        out.push('\n');
    }
    run.clear();
}

/// Collapse whitespace runs, drop non-ASCII, trim.
fn normalize(text: &str) -> String {
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  a\t\tb \n\n c  "), "a b c");
    }

    #[test]
    fn test_normalize_strips_non_ascii() {
        assert_eq!(normalize("r\u{00e9}sum\u{00e9} of Jos\u{00e9}"), "rsum of Jos");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n  "), "");
    }

    #[test]
    fn test_resume_extension_matching() {
        assert!(has_resume_extension("resume.pdf"));
        assert!(has_resume_extension("Resume.DOCX"));
        assert!(has_resume_extension("cv.doc"));
        assert!(!has_resume_extension("notes.txt"));
        assert!(!has_resume_extension("resume.pdf.png"));
        assert!(!has_resume_extension(""));
    }

    #[test]
    fn test_unsupported_media_type_rejected() {
        let err = extract_text(b"plain text", "text/plain").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_docx_dispatch_on_wordprocessingml() {
        // Garbage bytes must route to the DOCX path and fail there, not
        // fall through to UnsupportedFormat.
        let err = extract_text(
            b"not a zip",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn test_parse_docx_xml_extracts_runs_and_paragraphs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:body>
                <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
                <w:p><w:r><w:t>Data Analyst</w:t></w:r></w:p>
            </w:body>
        </w:document>"#;
        let text = parse_docx_xml(xml).unwrap();
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("Data Analyst"));
    }

    #[test]
    fn test_doc_scan_recovers_ascii_runs() {
        let mut data = vec![0u8, 1, 2, 0xff];
        data.extend_from_slice(b"Senior Backend Engineer with ten years of experience");
        data.extend_from_slice(&[0x00, 0x01]);
        data.extend_from_slice(b"ab"); // too short, noise
        let text = scan_doc_text(&data);
        assert!(text.contains("Senior Backend Engineer"));
        assert!(!text.contains("ab\n"));
    }

    #[test]
    fn test_doc_scan_recovers_utf16_runs() {
        let mut data = Vec::new();
        for b in "Experienced project manager and team lead".bytes() {
            data.push(b);
            data.push(0);
        }
        let text = scan_doc_text(&data);
        assert!(text.contains("Experienced project manager"));
    }

    #[test]
    fn test_doc_scan_empty_document_yields_empty_text() {
        let data = vec![0u8; 128];
        assert_eq!(scan_doc_text(&data), "");
    }
}
