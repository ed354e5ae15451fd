//! Diagnostic rendering with ariadne.

use ariadne::{sources, Color, Label, Report, ReportKind};
use snuggle_common::{line_col, Diagnostic, FileLoader};

/// Render one diagnostic to stderr, with source context when the file is
/// known to the loader.
pub fn render(diag: &Diagnostic, loader: &dyn FileLoader) {
    let Some(text) = loader.load(&diag.file) else {
        // Internal or registry-time errors have no source to point at.
        eprintln!("error: {diag}");
        return;
    };
    let result = Report::build(ReportKind::Error, (diag.file.clone(), diag.span.range()))
        .with_message(format!("{} error", diag.phase))
        .with_label(
            Label::new((diag.file.clone(), diag.span.range()))
                .with_message(&diag.message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint(sources(vec![(diag.file.clone(), text.to_string())]));
    if result.is_err() {
        // Fancy rendering failed (e.g. a closed stderr pipe); fall back to
        // a grep-friendly one-liner with the position resolved by hand.
        let (line, col) = line_col(text, diag.span.start);
        eprintln!("error: {}:{line}:{col}: {}", diag.file, diag.message);
    }
}
