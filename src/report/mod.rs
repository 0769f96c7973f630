//! Grade report model and PDF rendering.
//!
//! The renderer is split in two stages: a pure layout pass that wraps and
//! paginates text deterministically, and a `printpdf` emission pass that
//! draws the laid-out lines onto A4 pages.

pub mod layout;
pub mod pdf;

use serde::{Deserialize, Serialize};

/// Skill grade assigned by the grading generator.
///
/// Anything outside the known rank list parses as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GradeLabel {
    Junior,
    Middle,
    Senior,
    Lead,
    HeadArtDirector,
    DesignDirector,
    Unknown,
}

impl GradeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLabel::Junior => "Junior",
            GradeLabel::Middle => "Middle",
            GradeLabel::Senior => "Senior",
            GradeLabel::Lead => "Lead",
            GradeLabel::HeadArtDirector => "Head/Art Director",
            GradeLabel::DesignDirector => "Design Director",
            GradeLabel::Unknown => "Unknown",
        }
    }
}

impl From<String> for GradeLabel {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "junior" => GradeLabel::Junior,
            "middle" => GradeLabel::Middle,
            "senior" => GradeLabel::Senior,
            "lead" => GradeLabel::Lead,
            "head/art director" | "head" | "art director" => GradeLabel::HeadArtDirector,
            "design director" => GradeLabel::DesignDirector,
            _ => GradeLabel::Unknown,
        }
    }
}

impl From<GradeLabel> for String {
    fn from(g: GradeLabel) -> Self {
        g.as_str().to_string()
    }
}

impl std::fmt::Display for GradeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference material suggested in the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Structured assessment produced at interview completion.
///
/// Every field defaults to empty so downstream rendering only ever
/// branches on emptiness, never on key presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    #[serde(default = "default_grade")]
    pub grade: GradeLabel,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub detailed_report: String,
}

fn default_grade() -> GradeLabel {
    GradeLabel::Unknown
}

impl Default for GradeReport {
    fn default() -> Self {
        Self {
            grade: GradeLabel::Unknown,
            summary: String::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            materials: Vec::new(),
            detailed_report: String::new(),
        }
    }
}

impl GradeReport {
    /// A report salvaged from non-JSON generator output: the raw text
    /// becomes both summary and narrative, structured fields stay empty.
    pub fn from_raw_text(text: &str) -> Self {
        Self {
            grade: GradeLabel::Unknown,
            summary: text.trim().to_string(),
            detailed_report: text.trim().to_string(),
            ..Self::default()
        }
    }
}
