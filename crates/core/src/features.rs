//! Line grouping and raw feature extraction.
//!
//! Turns the positioned runs of one document into style-consistent
//! [`LineGroup`]s and derives one [`FeatureRow`] per surviving group.
//!
//! ```text
//! TextRun[]  ->  (ignore + clean)  ->  LineGroup[]  ->  FeatureRow[]
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text;

/// Runs whose font sizes differ by less than this share a style.
pub const FONT_SIZE_TOLERANCE: f32 = 0.5;

/// Merged groups with this many characters or fewer are dropped.
const MIN_GROUP_CHARS: usize = 2;

/// A contiguous span of text sharing one visual style, as produced by the
/// layout decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    /// Distance from the top of the page.
    pub y: f32,
    pub document: String,
    pub page: usize,
}

/// Consecutive runs on one page merged because they share a style.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    /// Vertical position of the first run.
    pub y: f32,
    /// Distance from the previous group's first run, `None` for the first
    /// group on a page.
    pub gap: Option<f32>,
    pub document: String,
    pub page: usize,
}

/// Raw features of one [`LineGroup`], before per-document normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub document: String,
    pub page: usize,
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub text_length: usize,
    pub capitalization_ratio: f64,
    pub starts_with_numbering: bool,
    pub numbering_depth: usize,
    pub y: f32,
    pub gap: Option<f32>,
}

/// Group being accumulated while walking the runs.
struct OpenGroup<'a> {
    first: &'a TextRun,
    texts: Vec<String>,
}

impl OpenGroup<'_> {
    fn accepts(&self, run: &TextRun) -> bool {
        self.first.page == run.page
            && self.first.document == run.document
            && (self.first.font_size - run.font_size).abs() < FONT_SIZE_TOLERANCE
            && self.first.is_bold == run.is_bold
            && self.first.is_italic == run.is_italic
    }
}

/// Merge runs into [`LineGroup`]s.
///
/// Runs that are empty, bullets or artifacts are dropped before grouping and
/// never break a group. Gaps are measured between the first runs of
/// consecutive surviving groups on the same page.
pub fn group_runs(runs: &[TextRun]) -> Vec<LineGroup> {
    let mut groups: Vec<LineGroup> = Vec::new();
    let mut open: Option<OpenGroup> = None;

    for run in runs {
        if text::should_ignore(&run.text) {
            continue;
        }
        let cleaned = text::clean(&run.text);
        if text::should_ignore(&cleaned) {
            continue;
        }

        match open.as_mut() {
            Some(group) if group.accepts(run) => group.texts.push(cleaned),
            _ => {
                if let Some(done) = open.take() {
                    close_group(done, &mut groups);
                }
                open = Some(OpenGroup {
                    first: run,
                    texts: vec![cleaned],
                });
            }
        }
    }

    if let Some(done) = open {
        close_group(done, &mut groups);
    }

    groups
}

fn close_group(group: OpenGroup, groups: &mut Vec<LineGroup>) {
    let text = group.texts.join(" ");
    if text::should_ignore(&text) || text.trim().chars().count() <= MIN_GROUP_CHARS {
        return;
    }

    let first = group.first;
    let gap = groups
        .last()
        .filter(|prev| prev.page == first.page && prev.document == first.document)
        .map(|prev| (first.y - prev.y).abs());

    groups.push(LineGroup {
        text,
        font_size: first.font_size,
        is_bold: first.is_bold,
        is_italic: first.is_italic,
        y: first.y,
        gap,
        document: first.document.clone(),
        page: first.page,
    });
}

fn numbering_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)*[.)]\s").unwrap())
}

fn dotted_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d+\.)+\d+").unwrap())
}

/// Uppercase letters over all letters, 0 when there are no letters.
pub fn capitalization_ratio(text: &str) -> f64 {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return 0.0;
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters as f64
}

/// Number of levels in a dotted numbering prefix such as `2.3.1`, 0 when
/// the text does not start with one.
pub fn numbering_depth(text: &str) -> usize {
    dotted_prefix()
        .find(text)
        .map(|m| m.as_str().split('.').count())
        .unwrap_or(0)
}

/// Derive the raw feature row for one group.
pub fn feature_row(group: &LineGroup) -> FeatureRow {
    FeatureRow {
        document: group.document.clone(),
        page: group.page,
        text: group.text.clone(),
        font_size: group.font_size,
        is_bold: group.is_bold,
        is_italic: group.is_italic,
        text_length: group.text.chars().count(),
        capitalization_ratio: capitalization_ratio(&group.text),
        starts_with_numbering: numbering_prefix().is_match(&group.text),
        numbering_depth: numbering_depth(&group.text),
        y: group.y,
        gap: group.gap,
    }
}

/// Group the runs of one document and derive a feature row per group.
pub fn extract_features(runs: &[TextRun]) -> Vec<FeatureRow> {
    group_runs(runs).iter().map(feature_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, font_size: f32, y: f32, page: usize) -> TextRun {
        TextRun {
            text: text.to_string(),
            font_size,
            is_bold: false,
            is_italic: false,
            y,
            document: "doc.pdf".to_string(),
            page,
        }
    }

    fn bold(text: &str, font_size: f32, y: f32, page: usize) -> TextRun {
        TextRun {
            is_bold: true,
            ..run(text, font_size, y, page)
        }
    }

    #[test]
    fn test_same_style_runs_merge() {
        let runs = vec![
            run("The quick brown fox", 10.0, 100.0, 1),
            run("jumps over the lazy dog", 10.2, 112.0, 1),
        ];

        let groups = group_runs(&runs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].text, "The quick brown fox jumps over the lazy dog");
        assert_eq!(groups[0].y, 100.0);
    }

    #[test]
    fn test_style_change_starts_new_group() {
        let runs = vec![
            bold("Introduction", 10.0, 90.0, 1),
            run("Body text follows here", 10.0, 100.0, 1),
            run("Much larger text", 14.0, 120.0, 1),
            TextRun {
                is_italic: true,
                ..run("Italic remark", 14.0, 140.0, 1)
            },
        ];

        let groups = group_runs(&runs);
        assert_eq!(groups.len(), 4);
        assert!(groups[0].is_bold);
        assert!(groups[3].is_italic);
    }

    #[test]
    fn test_font_tolerance_boundary() {
        let runs = vec![
            run("First line here", 10.0, 100.0, 1),
            run("Second line here", 10.5, 110.0, 1),
        ];

        assert_eq!(group_runs(&runs).len(), 2);
    }

    #[test]
    fn test_page_change_closes_group() {
        let runs = vec![
            run("End of page one", 10.0, 700.0, 1),
            run("Start of page two", 10.0, 50.0, 2),
        ];

        let groups = group_runs(&runs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].page, 2);
    }

    #[test]
    fn test_gap_missing_for_first_group_per_page() {
        let runs = vec![
            bold("Heading", 14.0, 50.0, 1),
            run("Paragraph one", 10.0, 80.0, 1),
            bold("Next page heading", 14.0, 40.0, 2),
            run("Paragraph two", 10.0, 65.0, 2),
        ];

        let groups = group_runs(&runs);
        let gaps: Vec<_> = groups.iter().map(|g| g.gap).collect();
        assert_eq!(gaps, vec![None, Some(30.0), None, Some(25.0)]);
    }

    #[test]
    fn test_ignored_runs_do_not_break_groups() {
        let runs = vec![
            run("Alpha beta", 10.0, 100.0, 1),
            bold("•", 10.0, 105.0, 1),
            bold("12", 10.0, 107.0, 1),
            run("gamma delta", 10.0, 110.0, 1),
        ];

        let groups = group_runs(&runs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].text, "Alpha beta gamma delta");
    }

    #[test]
    fn test_bullet_prefix_stripped_content_kept() {
        let runs = vec![run("• Some finding", 10.0, 100.0, 1)];

        let groups = group_runs(&runs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].text, "Some finding");
    }

    #[test]
    fn test_every_group_text_survives_ignore_rules() {
        let runs = vec![
            run("©", 8.0, 10.0, 1),
            run("...", 8.0, 20.0, 1),
            bold("a)", 9.0, 30.0, 1),
            run("ok", 12.0, 40.0, 1),
            bold("Real heading", 16.0, 50.0, 1),
            run("- ", 10.0, 60.0, 1),
            run("Body", 10.0, 70.0, 1),
        ];

        let groups = group_runs(&runs);
        assert!(!groups.is_empty());
        for g in &groups {
            assert!(!g.text.trim().is_empty());
            assert!(!text::should_ignore(&g.text));
            assert!(g.text.chars().count() > MIN_GROUP_CHARS);
        }
        // "ok" alone is too short to survive as a group.
        assert!(groups.iter().all(|g| g.text != "ok"));
    }

    #[test]
    fn test_feature_row_values() {
        let group = LineGroup {
            text: "2.3.1) SCOPE of Work".to_string(),
            font_size: 12.0,
            is_bold: true,
            is_italic: false,
            y: 140.0,
            gap: Some(18.0),
            document: "doc.pdf".to_string(),
            page: 3,
        };

        let row = feature_row(&group);
        assert_eq!(row.text_length, 20);
        assert!(row.starts_with_numbering);
        assert_eq!(row.numbering_depth, 3);
        // S C O P E W = 6 uppercase of 11 letters.
        assert!((row.capitalization_ratio - 6.0 / 11.0).abs() < 1e-9);
        assert_eq!(row.page, 3);
        assert_eq!(row.gap, Some(18.0));
    }

    #[test]
    fn test_numbering_detection() {
        let starts = |t: &str| numbering_prefix().is_match(t);
        assert!(starts("1. Intro"));
        assert!(starts("1.2.3) Details"));
        assert!(!starts("1.Intro"));
        assert!(!starts("Intro 1."));
        assert_eq!(numbering_depth("1. Intro"), 0);
        assert_eq!(numbering_depth("4.2 Results"), 2);
        assert_eq!(numbering_depth("1.2.3 Details"), 3);
        assert_eq!(numbering_depth("Table 4.2"), 0);
    }

    #[test]
    fn test_capitalization_without_letters() {
        assert_eq!(capitalization_ratio("12 34 %"), 0.0);
        assert_eq!(capitalization_ratio("ABC"), 1.0);
    }
}
