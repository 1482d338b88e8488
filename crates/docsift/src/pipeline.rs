//! Orchestration of the per-document and global stages.
//!
//! ```text
//! per document (spawn_blocking):  read -> decode -> features -> normalize -> classify
//! global:                         assemble sections -> embed -> MMR
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsift_core::classify::{label_document, HeadingClassifier, LabeledRow};
use docsift_core::features::{extract_features, TextRun};
use docsift_core::mmr::{MmrSelector, Selection};
use docsift_core::normalize::normalize_document;
use docsift_core::request::{Query, Request};
use docsift_core::sections::{assemble_sections, SectionBlock};
use futures::future::join_all;
use pdf::LayoutRun;

use crate::embedder::{embed_checked, TextEmbedder};
use crate::prelude::*;

/// A document to process: its name in the request and where it lives.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub name: String,
    pub path: PathBuf,
}

impl DocumentInput {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
        }
    }
}

/// Resolve every request filename against `input_dir`, keeping request order.
pub fn request_inputs(request: &Request, input_dir: &Path) -> Vec<DocumentInput> {
    request
        .documents
        .iter()
        .map(|d| DocumentInput {
            name: d.filename.clone(),
            path: input_dir.join(&d.filename),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct LabeledDocument {
    pub name: String,
    pub rows: Vec<LabeledRow>,
}

pub fn to_text_runs(document: &str, runs: Vec<LayoutRun>) -> Vec<TextRun> {
    runs.into_iter()
        .map(|r| TextRun {
            text: r.text,
            font_size: r.font_size,
            is_bold: r.is_bold,
            is_italic: r.is_italic,
            y: r.y,
            document: document.to_string(),
            page: r.page,
        })
        .collect()
}

/// Read and decode one PDF into text runs tagged with `input.name`.
pub fn load_runs(input: &DocumentInput) -> Result<Vec<TextRun>> {
    let doc = pdf::ParsedDocument::from_path(&input.path)
        .wrap_err_with(|| format!("Failed to load {}", input.path.display()))?;
    log::debug!(
        "{}: {} pages, {} runs",
        input.name,
        doc.page_count(),
        doc.runs().len()
    );
    Ok(to_text_runs(&input.name, doc.into_runs()))
}

/// Features, normalization and classification of one document's runs.
pub fn label_runs(
    document: &str,
    runs: &[TextRun],
    classifier: &dyn HeadingClassifier,
) -> Result<Vec<LabeledRow>, docsift_core::Error> {
    let rows = extract_features(runs);
    let normalized = normalize_document(document, rows)?;
    label_document(normalized, classifier)
}

pub fn process_document(
    input: &DocumentInput,
    classifier: &dyn HeadingClassifier,
) -> Result<Vec<LabeledRow>> {
    let runs = load_runs(input)?;
    Ok(label_runs(&input.name, &runs, classifier)?)
}

/// Label every document on the blocking pool.
///
/// Failed documents are logged and left out. The result keeps input order.
pub async fn label_documents(
    inputs: Vec<DocumentInput>,
    classifier: Arc<dyn HeadingClassifier>,
) -> Vec<LabeledDocument> {
    let tasks = inputs.into_iter().map(|input| {
        let classifier = Arc::clone(&classifier);
        let name = input.name.clone();
        let handle =
            tokio::task::spawn_blocking(move || process_document(&input, classifier.as_ref()));
        async move { (name, handle.await) }
    });

    join_all(tasks)
        .await
        .into_iter()
        .filter_map(|(name, joined)| match joined {
            Ok(Ok(rows)) => Some(LabeledDocument { name, rows }),
            Ok(Err(err)) => {
                log::warn!("Skipping {}: {:#}", name, err);
                None
            }
            Err(err) => {
                log::warn!("Skipping {}: worker failed: {}", name, err);
                None
            }
        })
        .collect()
}

/// Assemble sections across all documents, embed them with the query and run
/// MMR.
///
/// Fails when no section exists or the embedder misbehaves.
pub async fn select_sections<E: TextEmbedder>(
    documents: &[LabeledDocument],
    query: &Query,
    embedder: &E,
    selector: &MmrSelector,
) -> Result<(Vec<SectionBlock>, Selection)> {
    let rows: Vec<LabeledRow> = documents
        .iter()
        .flat_map(|d| d.rows.iter().cloned())
        .collect();

    let sections = assemble_sections(&rows);
    if sections.is_empty() {
        return Err(Error::NoSections.into());
    }
    log::debug!("Assembled {} sections", sections.len());

    let mut texts = Vec::with_capacity(sections.len() + 1);
    texts.push(query.text());
    texts.extend(sections.iter().map(|s| s.text.clone()));

    let mut vectors = embed_checked(embedder, texts).await?;
    let pool = vectors.split_off(1);
    let query_vector = vectors
        .pop()
        .ok_or_else(|| eyre!("Embedder returned no query vector"))?;

    let selection = selector.select(&query_vector, &pool);
    Ok((sections, selection))
}
