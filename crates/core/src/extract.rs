use crate::error::ExtractError;
use crate::models::{DocumentPayload, ExtractedText};
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const OCTET_STREAM: &str = "application/octet-stream";

/// The extraction strategies, in dispatch-precedence order. Keeping the
/// decision as a sum type makes the precedence auditable in isolation from
/// the extractors themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Image,
    PlainText,
    Pdf,
    WordProcessor,
    Unsupported,
}

/// Selects exactly one strategy from the declared MIME type and, failing
/// that, the suggested filename. Returns the effective MIME type alongside
/// so failures can name it.
pub fn detect_format(
    declared_mime_type: Option<&str>,
    suggested_filename: Option<&str>,
) -> (DocumentFormat, String) {
    let mime = declared_mime_type
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| OCTET_STREAM.to_string());

    let pdf_by_name = suggested_filename
        .map(|name| name.to_lowercase().ends_with(".pdf"))
        .unwrap_or(false);

    let format = if mime.starts_with("image/") {
        DocumentFormat::Image
    } else if mime.starts_with("text/") || mime.contains("plain") {
        DocumentFormat::PlainText
    } else if mime.contains("pdf") || pdf_by_name {
        DocumentFormat::Pdf
    } else if mime.contains("word") || mime.contains("officedocument") {
        DocumentFormat::WordProcessor
    } else {
        DocumentFormat::Unsupported
    };

    (format, mime)
}

/// Runs the selected strategy over the payload bytes. Parser failures come
/// back as typed errors; they are recovered at the tool boundary so the
/// process keeps serving unrelated requests.
pub fn extract_text(
    payload: &DocumentPayload,
    identifier: &str,
) -> Result<ExtractedText, ExtractError> {
    let (format, mime) = detect_format(
        payload.declared_mime_type.as_deref(),
        payload.suggested_filename.as_deref(),
    );

    let text = match format {
        DocumentFormat::Image => {
            return Err(ExtractError::ImageNotReadable { mime_type: mime });
        }
        DocumentFormat::PlainText => String::from_utf8_lossy(&payload.bytes).into_owned(),
        DocumentFormat::Pdf => pdf_to_text(&payload.bytes)?,
        DocumentFormat::WordProcessor => docx_to_text(&payload.bytes)?,
        DocumentFormat::Unsupported => {
            return Err(ExtractError::Unsupported {
                mime_type: mime,
                identifier: identifier.to_string(),
            });
        }
    };

    ExtractedText::new(text, identifier.to_string())
}

fn pdf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let document =
        Document::load_mem(bytes).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    Ok(pages.join("\n\n"))
}

/// DOCX is a ZIP container; the body text lives in `word/document.xml` as
/// WordprocessingML `w:t` runs grouped into `w:p` paragraphs.
fn docx_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|error| ExtractError::WordParse(format!("not a zip container: {error}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|error| ExtractError::WordParse(format!("missing word/document.xml: {error}")))?
        .read_to_string(&mut xml)
        .map_err(|error| ExtractError::WordParse(error.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if local_name(e.name().as_ref()) == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text_run = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"br" {
                    text.push('\n');
                }
            }
            Ok(Event::Text(t)) => {
                if in_text_run {
                    let run = t
                        .unescape()
                        .map_err(|error| ExtractError::WordParse(error.to_string()))?;
                    text.push_str(&run);
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => return Err(ExtractError::WordParse(error.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim_end().to_string())
}

fn local_name(qualified: &[u8]) -> &[u8] {
    qualified
        .rsplit(|byte| *byte == b':')
        .next()
        .unwrap_or(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn payload(bytes: &[u8], mime: Option<&str>, filename: Option<&str>) -> DocumentPayload {
        DocumentPayload::new(
            bytes.to_vec(),
            mime.map(str::to_string),
            filename.map(str::to_string),
        )
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn images_are_refused_before_any_extraction() {
        let result = extract_text(&payload(b"\xff\xd8\xff", Some("image/jpeg"), None), "doc-1");
        match result {
            Err(ExtractError::ImageNotReadable { mime_type }) => {
                assert_eq!(mime_type, "image/jpeg");
            }
            other => panic!("expected image refusal, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_decodes_verbatim() {
        let result = extract_text(
            &payload("héllo case file".as_bytes(), Some("text/plain"), None),
            "doc-1",
        )
        .unwrap();
        assert_eq!(result.text, "héllo case file");
        assert_eq!(result.source_identifier, "doc-1");
    }

    #[test]
    fn dispatch_precedence_follows_the_table() {
        assert_eq!(
            detect_format(Some("image/png"), Some("scan.pdf")).0,
            DocumentFormat::Image
        );
        assert_eq!(
            detect_format(Some("text/csv"), None).0,
            DocumentFormat::PlainText
        );
        assert_eq!(
            detect_format(Some("application/pdf"), None).0,
            DocumentFormat::Pdf
        );
        assert_eq!(
            detect_format(Some("application/octet-stream"), Some("Brief.PDF")).0,
            DocumentFormat::Pdf
        );
        assert_eq!(
            detect_format(
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
                None
            )
            .0,
            DocumentFormat::WordProcessor
        );
        assert_eq!(
            detect_format(Some("application/msword"), None).0,
            DocumentFormat::WordProcessor
        );
        assert_eq!(
            detect_format(Some("application/x-tar"), None).0,
            DocumentFormat::Unsupported
        );
    }

    #[test]
    fn missing_mime_defaults_to_octet_stream() {
        let (format, mime) = detect_format(None, None);
        assert_eq!(format, DocumentFormat::Unsupported);
        assert_eq!(mime, "application/octet-stream");

        let (format, _) = detect_format(Some("  "), Some("notes.pdf"));
        assert_eq!(format, DocumentFormat::Pdf);
    }

    #[test]
    fn unsupported_failure_names_mime_and_identifier() {
        let result = extract_text(&payload(b"GIF", Some("application/x-tar"), None), "doc-9");
        match result {
            Err(ExtractError::Unsupported {
                mime_type,
                identifier,
            }) => {
                assert_eq!(mime_type, "application/x-tar");
                assert_eq!(identifier, "doc-9");
            }
            other => panic!("expected unsupported failure, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_plain_text_reports_no_text() {
        let result = extract_text(&payload(b"  \n \t ", Some("text/plain"), None), "doc-1");
        assert!(matches!(result, Err(ExtractError::NoText)));
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error_not_a_panic() {
        let result = extract_text(
            &payload(b"%PDF-1.4\nnot really a pdf", Some("application/pdf"), None),
            "doc-1",
        );
        assert!(matches!(result, Err(ExtractError::PdfParse(_))));
    }

    #[test]
    fn docx_paragraphs_become_double_newlines() {
        let xml = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>",
            "<w:p><w:r><w:t>Intake summary</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Client called about</w:t></w:r><w:r><w:t> eviction notice</w:t></w:r></w:p>",
            "</w:body></w:document>",
        );
        let bytes = docx_bytes(xml);
        let result = extract_text(
            &payload(
                &bytes,
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
                Some("note.docx"),
            ),
            "doc-1",
        )
        .unwrap();

        assert_eq!(
            result.text,
            "Intake summary\n\nClient called about eviction notice"
        );
    }

    #[test]
    fn truncated_docx_container_is_a_word_parse_error() {
        let result = extract_text(
            &payload(b"PK\x03\x04broken", Some("application/msword"), None),
            "doc-1",
        );
        assert!(matches!(result, Err(ExtractError::WordParse(_))));
    }
}
