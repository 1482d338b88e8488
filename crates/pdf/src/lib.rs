//! Layout decoding of PDF files into positioned, styled text runs.
//!
//! ```no_run
//! let bytes = std::fs::read("report.pdf")?;
//! let doc = pdf::ParsedDocument::from_bytes(&bytes)?;
//! for run in doc.runs() {
//!     println!("p{} y={:.1} {}pt {}", run.page, run.y, run.font_size, run.text);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

pub mod parser;

pub use parser::layout::LayoutRun;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded PDF: its page count and every styled run in reading order.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    page_count: usize,
    runs: Vec<LayoutRun>,
}

impl ParsedDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        Self::from_backend(&backend)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_backend(backend: &dyn PdfBackend) -> Result<Self, PdfError> {
        Ok(ParsedDocument {
            page_count: backend.pages().len(),
            runs: parser::layout::extract_all_pages(backend)?,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn runs(&self) -> &[LayoutRun] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<LayoutRun> {
        self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fn one_page_pdf(lines: &[(&str, i64, i64)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![Operation::new("BT", vec![])];
        for (text, size, y) in lines {
            operations.push(Operation::new("Tf", vec!["F1".into(), (*size).into()]));
            operations.push(Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), (*y).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };

        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_runs_from_generated_pdf() {
        let bytes = one_page_pdf(&[("Annual Report", 24, 760), ("Revenue grew", 11, 700)]);

        let doc = ParsedDocument::from_bytes(&bytes).unwrap();
        assert_eq!(doc.page_count(), 1);

        let runs = doc.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Annual Report");
        assert_eq!(runs[0].page, 0);
        assert!((runs[0].font_size - 24.0).abs() < 0.01);
        // Inherited MediaBox height 842.
        assert!((runs[0].y - 82.0).abs() < 0.01);
        assert!((runs[1].y - 142.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_bytes_fail_to_parse() {
        assert!(matches!(
            ParsedDocument::from_bytes(&[]),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ParsedDocument::from_path("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, PdfError::Io(_)));
    }
}
