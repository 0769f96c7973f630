//! Pure layout pass — wraps report text by measured width and paginates.
//!
//! Coordinates are millimetres from the top-left of an A4 page. Emission
//! flips the y axis for PDF space.

use super::GradeReport;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;

/// Points to millimetres.
const PT_TO_MM: f32 = 0.352_778;

/// A single positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Distance from the left page edge.
    pub x_mm: f32,
    /// Distance from the top page edge (baseline).
    pub y_mm: f32,
    pub size_pt: f32,
    pub bold: bool,
}

/// One laid-out page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<PlacedLine>,
}

/// Approximate advance width of one glyph in thousandths of an em,
/// following Helvetica metrics classes.
fn glyph_units(c: char) -> u32 {
    match c {
        'i' | 'j' | 'l' | '!' | ',' | '.' | ':' | ';' | '|' | '\'' => 278,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' | '\\' | ' ' => 333,
        'm' | 'w' => 833,
        'M' | 'W' => 944,
        'A'..='Z' | 'А'..='Я' | 'Ё' => 700,
        '0'..='9' => 556,
        _ => 556,
    }
}

/// Measured width of a string at the given font size, in millimetres.
pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(glyph_units).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Wrap one paragraph to the given width. Words that are wider than a
/// whole line are split at the last glyph that still fits.
pub fn wrap_paragraph(text: &str, size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width_mm(&candidate, size_pt) <= max_width_mm {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        // The word alone may still overflow the line.
        if text_width_mm(word, size_pt) <= max_width_mm {
            current = word.to_string();
        } else {
            let mut chunk = String::new();
            for c in word.chars() {
                chunk.push(c);
                if text_width_mm(&chunk, size_pt) > max_width_mm {
                    chunk.pop();
                    lines.push(std::mem::take(&mut chunk));
                    chunk.push(c);
                }
            }
            current = chunk;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Cursor that places lines top-to-bottom and opens a new page when the
/// bottom margin is reached.
struct Cursor {
    pages: Vec<Page>,
    y_mm: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y_mm: MARGIN_MM,
        }
    }

    fn line_height(size_pt: f32) -> f32 {
        size_pt * 1.35 * PT_TO_MM
    }

    fn advance(&mut self, size_pt: f32) {
        self.y_mm += Self::line_height(size_pt);
        if self.y_mm > PAGE_HEIGHT_MM - MARGIN_MM {
            self.pages.push(Page::default());
            self.y_mm = MARGIN_MM + Self::line_height(size_pt);
        }
    }

    fn place(&mut self, text: &str, size_pt: f32, bold: bool, indent_mm: f32) {
        self.advance(size_pt);
        let line = PlacedLine {
            text: text.to_string(),
            x_mm: MARGIN_MM + indent_mm,
            y_mm: self.y_mm,
            size_pt,
            bold,
        };
        self.pages.last_mut().expect("cursor always has a page").lines.push(line);
    }

    fn gap(&mut self, mm: f32) {
        self.y_mm += mm;
    }

    fn paragraph(&mut self, text: &str, size_pt: f32, indent_mm: f32) {
        let max_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - indent_mm;
        for raw_line in text.lines() {
            for line in wrap_paragraph(raw_line, size_pt, max_width) {
                self.place(&line, size_pt, false, indent_mm);
            }
        }
    }

    fn heading(&mut self, text: &str) {
        self.gap(3.0);
        self.place(text, HEADING_SIZE, true, 0.0);
        self.gap(1.0);
    }

    fn bullet_list(&mut self, items: &[String]) {
        for item in items {
            let max_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - 8.0;
            let wrapped = wrap_paragraph(item, BODY_SIZE, max_width);
            for (i, line) in wrapped.iter().enumerate() {
                if i == 0 {
                    self.place(&format!("- {line}"), BODY_SIZE, false, 4.0);
                } else {
                    self.place(line, BODY_SIZE, false, 8.0);
                }
            }
        }
    }
}

/// Lay out a report into pages. Section order is fixed: summary,
/// strengths, weaknesses, detailed narrative, recommendations,
/// materials. Empty sections are omitted entirely.
pub fn lay_out(report: &GradeReport, display_name: &str) -> Vec<Page> {
    let mut cursor = Cursor::new();

    cursor.place("Designer grade report", TITLE_SIZE, true, 0.0);
    cursor.gap(2.0);
    cursor.place(&format!("Candidate: {display_name}"), BODY_SIZE, false, 0.0);
    cursor.place(&format!("Grade: {}", report.grade), BODY_SIZE, true, 0.0);
    cursor.gap(2.0);

    if !report.summary.is_empty() {
        cursor.heading("Summary");
        cursor.paragraph(&report.summary, BODY_SIZE, 0.0);
    }
    if !report.strengths.is_empty() {
        cursor.heading("Strengths");
        cursor.bullet_list(&report.strengths);
    }
    if !report.weaknesses.is_empty() {
        cursor.heading("Weaknesses");
        cursor.bullet_list(&report.weaknesses);
    }
    if !report.detailed_report.is_empty() {
        cursor.heading("Detailed assessment");
        cursor.paragraph(&report.detailed_report, BODY_SIZE, 0.0);
    }
    if !report.recommendations.is_empty() {
        cursor.heading("Recommendations");
        cursor.bullet_list(&report.recommendations);
    }
    if !report.materials.is_empty() {
        cursor.heading("Materials");
        let items: Vec<String> = report
            .materials
            .iter()
            .map(|m| {
                if m.url.is_empty() {
                    m.title.clone()
                } else if m.title.is_empty() {
                    m.url.clone()
                } else {
                    format!("{} — {}", m.title, m.url)
                }
            })
            .collect();
        cursor.bullet_list(&items);
    }

    cursor.pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{GradeLabel, Material};

    fn sample_report() -> GradeReport {
        GradeReport {
            grade: GradeLabel::Senior,
            summary: "Solid systems thinking and strong craft.".to_string(),
            strengths: vec!["Design systems".to_string(), "Mentoring".to_string()],
            weaknesses: vec!["Strategy articulation".to_string()],
            recommendations: vec!["Lead a cross-team initiative".to_string()],
            materials: vec![Material {
                title: "Org Design for Design Orgs".to_string(),
                url: "https://example.com/book".to_string(),
            }],
            detailed_report: "Long narrative. ".repeat(40),
        }
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_paragraph("one two three four five six seven", BODY_SIZE, 30.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, BODY_SIZE) <= 30.0);
        }
    }

    #[test]
    fn wrap_splits_oversized_words() {
        let lines = wrap_paragraph(&"x".repeat(400), BODY_SIZE, 40.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, BODY_SIZE) <= 40.0);
        }
    }

    #[test]
    fn section_order_is_fixed() {
        let pages = lay_out(&sample_report(), "Ann");
        let all: Vec<&str> = pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.text.as_str()))
            .collect();
        let pos = |needle: &str| all.iter().position(|t| *t == needle).unwrap();
        assert!(pos("Summary") < pos("Strengths"));
        assert!(pos("Strengths") < pos("Weaknesses"));
        assert!(pos("Weaknesses") < pos("Detailed assessment"));
        assert!(pos("Detailed assessment") < pos("Recommendations"));
        assert!(pos("Recommendations") < pos("Materials"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let report = GradeReport {
            grade: GradeLabel::Junior,
            summary: "Just starting out.".to_string(),
            ..GradeReport::default()
        };
        let pages = lay_out(&report, "Ann");
        let all: Vec<&str> = pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.text.as_str()))
            .collect();
        assert!(all.contains(&"Summary"));
        assert!(!all.contains(&"Strengths"));
        assert!(!all.contains(&"Recommendations"));
        assert!(!all.contains(&"Materials"));
    }

    #[test]
    fn layout_is_deterministic() {
        let report = sample_report();
        assert_eq!(lay_out(&report, "Ann"), lay_out(&report, "Ann"));
    }

    #[test]
    fn long_narrative_paginates() {
        let report = GradeReport {
            detailed_report: "A sentence that fills space. ".repeat(600),
            ..GradeReport::default()
        };
        let pages = lay_out(&report, "Ann");
        assert!(pages.len() > 1);
        for page in &pages {
            for line in &page.lines {
                assert!(line.y_mm <= PAGE_HEIGHT_MM - MARGIN_MM);
            }
        }
    }
}
