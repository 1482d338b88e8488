//! Output report of a selection run.

use serde::{Deserialize, Serialize};

use crate::mmr::Selection;
use crate::request::Request;
use crate::sections::SectionBlock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    pub importance_rank: usize,
    pub page_number: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: usize,
}

/// `extracted_sections` and `subsection_analysis` are parallel, both in rank
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: Metadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

/// Package the selected sections of `sections` with the run metadata.
///
/// Selection indices must point into `sections`; stray indices are skipped.
pub fn build_report(
    request: &Request,
    sections: &[SectionBlock],
    selection: &Selection,
    timestamp: impl Into<String>,
) -> Report {
    let picked: Vec<(usize, &SectionBlock)> = selection
        .iter()
        .filter_map(|c| sections.get(c.index).map(|s| (c.rank, s)))
        .collect();

    Report {
        metadata: Metadata {
            input_documents: request.filenames(),
            persona: request.persona.role.clone(),
            job_to_be_done: request.job_to_be_done.task.clone(),
            processing_timestamp: timestamp.into(),
        },
        extracted_sections: picked
            .iter()
            .map(|(rank, s)| ExtractedSection {
                document: s.document.clone(),
                section_title: s.heading.clone(),
                importance_rank: *rank,
                page_number: s.page,
            })
            .collect(),
        subsection_analysis: picked
            .iter()
            .map(|(_, s)| SubsectionAnalysis {
                document: s.document.clone(),
                refined_text: s.text.clone(),
                page_number: s.page,
            })
            .collect(),
    }
}
