//! Content-stream decoding into styled, positioned text runs.
//!
//! Walks each page's content operators with a small text-state machine,
//! collects the shown strings as spans, then groups the spans into visual
//! lines and merges neighbouring spans that share a style.
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  lines  ->  LayoutRun[]
//!   (per page)      extract        group      merge same style
//! ```
//!
//! PDF places the origin at the bottom-left corner. Runs come out with `y`
//! measured from the top of the page, in reading order.

use serde::{Deserialize, Serialize};

use super::backend::{
    decode_text_simple, get_number_from_value, BackendFontInfo, PageId, PdfBackend, PdfValue,
};
use crate::PdfError;

/// A styled run of text on one visual line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRun {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub x: f32,
    /// Distance from the top edge of the page.
    pub y: f32,
    /// 0-based page index.
    pub page: usize,
}

/// Text shown by a single operator, in PDF user space.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
    pub is_bold: bool,
    pub is_italic: bool,
}

/// Spans whose baselines differ by less than this share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Glyph width as a fraction of font size when no metrics are available.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Horizontal gap above which two spans on a line are separate words.
const MIN_WORD_GAP: f32 = 1.5;

/// Same-style spans further apart than this many font sizes stay separate
/// runs (columns, tab stops).
const MAX_JOIN_GAP_FACTOR: f32 = 2.0;

/// Runs whose sizes differ by less than this share a style.
const FONT_SIZE_EPSILON: f32 = 0.5;

/// Scripts written without inter-word spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF     // CJK Unified Ideographs
        | 0x3400..=0x4DBF   // Extension A
        | 0xF900..=0xFAFF   // Compatibility Ideographs
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0xAC00..=0xD7AF   // Hangul Syllables
        | 0x3000..=0x303F   // CJK punctuation
        | 0xFF00..=0xFFEF   // Fullwidth forms
        | 0x0E00..=0x0EFF   // Thai, Lao
    )
}

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    /// [a, b, c, d, tx, ty]
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
    is_bold: bool,
    is_italic: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
            is_bold: false,
            is_italic: false,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5] + self.text_rise
    }

    /// `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn char_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// `Td`: translate the line matrix and reset the text matrix to it.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// `Tf`: style flags come from the base font name.
    fn set_font(&mut self, key: Vec<u8>, base_font: &str, size: f32) {
        let upper = base_font.to_uppercase();
        self.is_bold = ["BOLD", "BLACK", "HEAVY"].iter().any(|w| upper.contains(w));
        self.is_italic = upper.contains("ITALIC") || upper.contains("OBLIQUE");
        self.font_key = key;
        self.font_name = base_font.to_string();
        self.font_size = size;
    }

    /// Move past `text` and return the rendered width.
    fn advance_after_show(&mut self, text: &str) -> f32 {
        let width: f32 = text
            .chars()
            .map(|c| {
                let w = self.char_width() + self.char_spacing;
                if c == ' ' {
                    w + self.word_spacing
                } else {
                    w
                }
            })
            .sum();
        self.advance_x(width);
        width
    }

    fn span(&self, text: String, x: f32, y: f32, width: f32) -> TextSpan {
        TextSpan {
            text,
            x,
            y,
            width,
            font_size: self.effective_font_size(),
            font_name: self.font_name.clone(),
            is_bold: self.is_bold,
            is_italic: self.is_italic,
        }
    }
}

fn number(operands: &[PdfValue], i: usize) -> Option<f32> {
    operands.get(i).and_then(get_number_from_value)
}

fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page, font_key, bytes);
            if decoded.is_empty() {
                decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

/// Walk one page's content stream and collect the shown strings.
///
/// Handles `BT`, `Tf`, `Tm`, `Td`, `TD`, `T*`, `TL`, `Tc`, `Tw`, `Tz`,
/// `Ts`, `Tj`, `TJ`, `'` and `"`. Everything else is ignored.
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let raw_content = backend.page_content(page)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page).unwrap_or_default();

    let mut state = TextState::default();
    let mut spans: Vec<TextSpan> = Vec::new();

    for op in &ops {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => handle_tf(operands, &fonts, &mut state),
            "Tm" => {
                let vals: Vec<f32> = operands.iter().filter_map(get_number_from_value).collect();
                if let [a, b, c, d, e, f] = vals[..] {
                    state.text_matrix = [a, b, c, d, e, f];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => state.leading = number(operands, 0).unwrap_or(state.leading),
            "Tc" => state.char_spacing = number(operands, 0).unwrap_or(state.char_spacing),
            "Tw" => state.word_spacing = number(operands, 0).unwrap_or(state.word_spacing),
            "Tz" => {
                if let Some(v) = number(operands, 0) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => state.text_rise = number(operands, 0).unwrap_or(state.text_rise),
            "Tj" => {
                if let Some(s) = operands.first() {
                    show_string(s, backend, page, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    show_array(arr, backend, page, &mut state, &mut spans);
                }
            }
            "'" => {
                state.next_line();
                if let Some(s) = operands.first() {
                    show_string(s, backend, page, &mut state, &mut spans);
                }
            }
            "\"" => {
                if let [aw, ac, s, ..] = operands {
                    state.word_spacing = get_number_from_value(aw).unwrap_or(state.word_spacing);
                    state.char_spacing = get_number_from_value(ac).unwrap_or(state.char_spacing);
                    state.next_line();
                    show_string(s, backend, page, &mut state, &mut spans);
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn handle_tf(operands: &[PdfValue], fonts: &[BackendFontInfo], state: &mut TextState) {
    let key = match operands.first() {
        Some(PdfValue::Name(n)) | Some(PdfValue::Str(n)) => n.clone(),
        _ => return,
    };
    let size = number(operands, 1).unwrap_or(0.0);
    let base = fonts
        .iter()
        .find(|info| info.name == key)
        .and_then(|info| info.base_font.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
    state.set_font(key, &base, size);
}

fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let text = decode_string(operand, backend, page, &state.font_key);
    if text.is_empty() {
        return;
    }
    let (x, y) = (state.x(), state.y());
    let width = state.advance_after_show(&text);
    spans.push(state.span(text, x, y, width));
}

/// `TJ`: strings interleaved with kerning adjustments in thousandths of a
/// text-space unit. Large negative adjustments become spaces.
fn show_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let mut buf = String::new();
    let (start_x, start_y) = (state.x(), state.y());

    for elem in arr {
        if let PdfValue::Str(_) = elem {
            let fragment = decode_string(elem, backend, page, &state.font_key);
            buf.push_str(&fragment);
            state.advance_after_show(&fragment);
        } else if let Some(adj) = get_number_from_value(elem) {
            let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
            if dx > state.char_width() * 0.3 && !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            state.advance_x(dx);
        }
    }

    let text = buf.trim_end();
    if text.is_empty() {
        return;
    }
    let width = state.x() - start_x;
    spans.push(state.span(text.to_string(), start_x, start_y, width));
}

fn same_style(a: &TextSpan, b: &TextSpan) -> bool {
    (a.font_size - b.font_size).abs() < FONT_SIZE_EPSILON
        && a.is_bold == b.is_bold
        && a.is_italic == b.is_italic
}

fn boundary_is_spaceless(prev: &str, next: &str) -> bool {
    match (prev.chars().next_back(), next.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

/// Group spans into lines, top of page first, each line left to right.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<Vec<TextSpan>> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<TextSpan>> = Vec::new();
    for span in spans {
        match lines.last_mut() {
            Some(line) if (line[0].y - span.y).abs() <= Y_TOLERANCE => line.push(span),
            _ => lines.push(vec![span]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

/// Merge the spans of one line into same-style runs.
fn merge_line(line: Vec<TextSpan>) -> Vec<TextSpan> {
    let mut merged: Vec<TextSpan> = Vec::with_capacity(line.len());

    for span in line {
        if let Some(prev) = merged.last_mut() {
            let gap = span.x - (prev.x + prev.width);
            if same_style(prev, &span) && gap < prev.font_size * MAX_JOIN_GAP_FACTOR {
                let needs_space = gap >= MIN_WORD_GAP
                    && !prev.text.ends_with(' ')
                    && !span.text.starts_with(' ')
                    && !boundary_is_spaceless(&prev.text, &span.text);
                if needs_space {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.width = (span.x + span.width) - prev.x;
                continue;
            }
        }
        merged.push(span);
    }

    merged
}

/// Styled runs of one page in reading order, `y` flipped to top-down.
pub fn page_runs(
    backend: &dyn PdfBackend,
    page_index: usize,
    page: PageId,
) -> Result<Vec<LayoutRun>, PdfError> {
    let height = backend.page_height(page);
    let spans = extract_page_spans(backend, page)?;

    Ok(group_spans_into_lines(spans)
        .into_iter()
        .flat_map(merge_line)
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| LayoutRun {
            text: s.text.trim().to_string(),
            font_size: s.font_size,
            is_bold: s.is_bold,
            is_italic: s.is_italic,
            x: s.x,
            y: height - s.y,
            page: page_index,
        })
        .collect())
}

/// Styled runs of every page, in page order.
pub fn extract_all_pages(backend: &dyn PdfBackend) -> Result<Vec<LayoutRun>, PdfError> {
    let mut runs = Vec::new();
    // lopdf numbers pages from 1.
    for (index, &page) in backend.pages().values().enumerate() {
        runs.extend(page_runs(backend, index, page)?);
    }
    Ok(runs)
}
