//! Section assembly and per-document outlines.
//!
//! Labeled rows from every document are walked in one global order. A row
//! labeled `Title`, `H1` or `H2` opens a [`SectionBlock`]; every following
//! row, whatever its label, becomes body text until the next
//! section-opening row.
//!
//! The scan does not stop at document boundaries. The trailing section of a
//! document keeps collecting body text from the next document until a
//! heading shows up there.

use serde::Serialize;

use crate::classify::{Label, LabeledRow};

/// Heading text plus its trailing body, the unit ranked by MMR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionBlock {
    pub document: String,
    pub page: usize,
    pub heading: String,
    /// `heading + ". " + body`, the text that gets embedded.
    pub text: String,
}

/// Group labeled rows into section blocks.
///
/// `rows` must be every document's rows concatenated in request order, each
/// document's rows in page and line order.
pub fn assemble_sections(rows: &[LabeledRow]) -> Vec<SectionBlock> {
    let mut sections = Vec::new();

    for (i, heading) in rows.iter().enumerate() {
        if !heading.label.starts_section() {
            continue;
        }

        let body: Vec<&str> = rows[i + 1..]
            .iter()
            .take_while(|r| !r.label.starts_section())
            .map(|r| r.row.text.as_str())
            .collect();

        sections.push(SectionBlock {
            document: heading.row.document.clone(),
            page: heading.row.page,
            heading: heading.row.text.clone(),
            text: format!("{}. {}", heading.row.text, body.join(" ")),
        });
    }

    sections
}

/// One heading in a document outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineEntry {
    pub level: Label,
    pub text: String,
    pub page: usize,
}

/// Title and heading hierarchy of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

pub const UNTITLED: &str = "Untitled Document";

/// Build the outline of a single document from its labeled rows.
///
/// Every non-body row is an entry. The title is the first `Title` row, then
/// the first entry of any level, then [`UNTITLED`].
pub fn build_outline(rows: &[LabeledRow]) -> Outline {
    let outline: Vec<OutlineEntry> = rows
        .iter()
        .filter(|r| !r.label.is_body())
        .map(|r| OutlineEntry {
            level: r.label,
            text: r.row.text.clone(),
            page: r.row.page,
        })
        .collect();

    let title = rows
        .iter()
        .find(|r| r.label == Label::Title)
        .map(|r| r.row.text.clone())
        .or_else(|| outline.first().map(|e| e.text.clone()))
        .unwrap_or_else(|| UNTITLED.to_string());

    Outline { title, outline }
}
