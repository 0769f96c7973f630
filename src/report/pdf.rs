//! PDF emission — draws laid-out pages with printpdf.

use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};

use super::layout::{self, Page, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::GradeReport;
use crate::error::ReportError;

fn mm(v: f32) -> Mm {
    Mm(v as _)
}

/// Render a report to PDF bytes.
///
/// Metadata dates are pinned so identical reports produce identical bytes.
pub fn render_to_bytes(report: &GradeReport, display_name: &str) -> Result<Vec<u8>, ReportError> {
    let pages = layout::lay_out(report, display_name);
    emit(&pages).map_err(|e| ReportError::Pdf(e.to_string()))
}

fn emit(pages: &[Page]) -> Result<Vec<u8>, printpdf::Error> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Designer grade report",
        mm(PAGE_WIDTH_MM),
        mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let doc = doc
        .with_creation_date(time::OffsetDateTime::UNIX_EPOCH)
        .with_mod_date(time::OffsetDateTime::UNIX_EPOCH);

    let regular: IndirectFontRef = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold: IndirectFontRef = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(mm(PAGE_WIDTH_MM), mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page_idx).get_layer(layer_idx)
        };

        for line in &page.lines {
            if line.text.is_empty() {
                continue;
            }
            let font = if line.bold { &bold } else { &regular };
            // Layout y grows downward; PDF y grows upward.
            layer.use_text(
                line.text.clone(),
                line.size_pt as _,
                mm(line.x_mm),
                mm(PAGE_HEIGHT_MM - line.y_mm),
                font,
            );
        }
    }

    doc.save_to_bytes()
}

/// Render a report into `dir`, returning the written file path.
///
/// The file name carries the sanitized display name plus a short random
/// suffix so repeated runs for the same user never collide.
pub fn write_report_pdf(
    report: &GradeReport,
    display_name: &str,
    dir: &Path,
) -> Result<PathBuf, ReportError> {
    let bytes = render_to_bytes(report, display_name)?;

    std::fs::create_dir_all(dir)?;
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let filename = format!("{}_report_{}.pdf", sanitize_name(display_name), &suffix[..6]);
    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Keep word characters, digits, `_` and `-`; everything else becomes `_`.
fn sanitize_name(name: &str) -> String {
    let re = regex::Regex::new(r"[^\w-]").expect("static pattern");
    let cleaned = re.replace_all(name, "_").to_string();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GradeLabel;

    fn report() -> GradeReport {
        GradeReport {
            grade: GradeLabel::Middle,
            summary: "Competent across the basics.".to_string(),
            recommendations: vec!["Practice design critique".to_string()],
            ..GradeReport::default()
        }
    }

    #[test]
    fn renders_pdf_magic_bytes() {
        let bytes = render_to_bytes(&report(), "Ann").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn writes_file_with_sanitized_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_report_pdf(&report(), "Ann O'Hara", tmp.path()).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Ann_O_Hara_report_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn sanitize_keeps_word_chars() {
        assert_eq!(sanitize_name("Ann-Marie_2"), "Ann-Marie_2");
        assert_eq!(sanitize_name("привет"), "привет");
        assert_eq!(sanitize_name("!!!"), "___");
        assert_eq!(sanitize_name(""), "user");
    }
}
