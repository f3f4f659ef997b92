//! Diagnostics raised while compiling a chart.
//!
//! Compilation never stops on a warning: anomalies are reported through a
//! [`DiagnosticSink`] as a side channel, and the offending event is repaired in place.
//! Only [`Severity::Fatal`] diagnostics abort a compilation.
//!
//! With the `diagnostics` feature, diagnostics can be rendered against the chart source
//! with `ariadne`. A diagnostic only knows its line number, so the whole line is labelled.
//!
//! # Usage Example
//!
//! ```rust
//! # #[cfg(feature = "diagnostics")]
//! # {
//! use tja_rs::diagnostics::{Diagnostic, emit_diagnostics};
//!
//! let source = "TITLE:Test\n#START\n1x,\n#END\n";
//! let diagnostics = vec![Diagnostic::warning(3, "unrecognized note type 'x'")];
//! emit_diagnostics("test.tja", source, &diagnostics);
//! # }
//! ```

#[cfg(feature = "diagnostics")]
use ariadne::{Color, Label, Report, ReportKind, Source};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// The course cannot be compiled.
    Fatal,
    /// Something is wrong but a fallback was used.
    Error,
    /// A suspicious construct was repaired.
    Warning,
    /// Extra context for the previous diagnostic.
    Note,
}

impl Severity {
    /// Label used when printing.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fatal => "fatal error",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "info",
        }
    }
}

/// A message about a source line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// One-based source line, zero when unknown.
    pub line: u32,
    /// Severity.
    pub severity: Severity,
    /// Human readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    pub fn new(line: u32, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            line,
            severity,
            message: message.into(),
        }
    }

    /// Creates a fatal diagnostic.
    pub fn fatal(line: u32, message: impl Into<String>) -> Self {
        Self::new(line, Severity::Fatal, message)
    }

    /// Creates an error diagnostic.
    pub fn error(line: u32, message: impl Into<String>) -> Self {
        Self::new(line, Severity::Error, message)
    }

    /// Creates a warning.
    pub fn warning(line: u32, message: impl Into<String>) -> Self {
        Self::new(line, Severity::Warning, message)
    }

    /// Creates a note.
    pub fn note(line: u32, message: impl Into<String>) -> Self {
        Self::new(line, Severity::Note, message)
    }

    /// Formats the diagnostic as `<file>:<line>: <severity>: <message>`.
    #[must_use]
    pub fn render(&self, filename: &str) -> String {
        format!("{filename}:{self}")
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.line,
            self.severity.label(),
            self.message
        )
    }
}

/// Receives diagnostics as they are raised.
pub trait DiagnosticSink {
    /// Handles one diagnostic.
    fn diagnose(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        (**self).diagnose(diagnostic);
    }
}

/// Forwards diagnostics to the [`log`] facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSink {
    filename: String,
}

impl LogSink {
    /// Creates a sink that prefixes messages with `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

impl DiagnosticSink for LogSink {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        let rendered = diagnostic.render(&self.filename);
        match diagnostic.severity {
            Severity::Fatal | Severity::Error => log::error!("{rendered}"),
            Severity::Warning => log::warn!("{rendered}"),
            Severity::Note => log::info!("{rendered}"),
        }
    }
}

/// Simple source container that holds the filename and source text.
/// Ariadne will automatically handle row/column calculations from byte offsets.
///
/// # Usage Example
///
/// ```rust
/// use tja_rs::diagnostics::SimpleSource;
///
/// let source_text = "TITLE:test\n#START\n";
/// let source = SimpleSource::new("test.tja", source_text);
///
/// assert_eq!(source.text(), source_text);
/// assert_eq!(source.line_range(2), 11..17);
/// ```
pub struct SimpleSource<'a> {
    /// Name of the source file.
    name: &'a str,
    /// Source text content.
    text: &'a str,
}

impl<'a> SimpleSource<'a> {
    /// Create a new source container instance.
    #[must_use]
    pub const fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }

    /// Get source text content.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// Get source file name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Byte range of a one-based line without its line break.
    ///
    /// Line zero and lines past the end map to an empty range at the start or the end.
    #[must_use]
    pub fn line_range(&self, line: u32) -> std::ops::Range<usize> {
        let Some(index) = (line as usize).checked_sub(1) else {
            return 0..0;
        };
        let mut start = 0;
        for (current, text) in self.text.split_inclusive('\n').enumerate() {
            if current == index {
                let content = text.trim_end_matches(['\n', '\r']);
                return start..start + content.len();
            }
            start += text.len();
        }
        self.text.len()..self.text.len()
    }
}

/// Trait for converting positioned diagnostics to `ariadne::Report`.
#[cfg(feature = "diagnostics")]
pub trait ToAriadne {
    /// Convert to an ariadne Report.
    ///
    /// # Parameters
    /// * `src` - Source file container (used for filename and line lookup)
    fn to_report<'a>(&self, src: &SimpleSource<'a>)
    -> Report<'a, (String, std::ops::Range<usize>)>;
}

/// Helper to build a styled ariadne `Report` consistently.
#[cfg(feature = "diagnostics")]
#[must_use]
pub fn build_report<'a>(
    src: &SimpleSource<'a>,
    kind: ReportKind<'a>,
    range: std::ops::Range<usize>,
    title: &str,
    label_message: impl ToString,
    color: Color,
) -> Report<'a, (String, std::ops::Range<usize>)> {
    let filename = src.name().to_string();
    Report::build(kind, (filename.clone(), range.clone()))
        .with_message(title)
        .with_label(
            Label::new((filename, range))
                .with_message(label_message.to_string())
                .with_color(color),
        )
        .finish()
}

#[cfg(feature = "diagnostics")]
impl ToAriadne for Diagnostic {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        let (kind, color) = match self.severity {
            Severity::Fatal | Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
            Severity::Note => (ReportKind::Advice, Color::Blue),
        };
        build_report(
            src,
            kind,
            src.line_range(self.line),
            &self.message,
            self.severity.label(),
            color,
        )
    }
}

/// Convenience method: batch render diagnostics to stderr.
///
/// # Parameters
/// * `name` - Name of the source file, used for display in diagnostic information
/// * `source` - Complete chart source text
/// * `diagnostics` - Diagnostics to display
#[cfg(feature = "diagnostics")]
pub fn emit_diagnostics<'a>(
    name: &'a str,
    source: &'a str,
    diagnostics: impl IntoIterator<Item = &'a Diagnostic>,
) {
    let simple = SimpleSource::new(name, source);
    let ariadne_source = Source::from(source);
    for diagnostic in diagnostics {
        let report = diagnostic.to_report(&simple);
        let _ = report.eprint((name.to_string(), ariadne_source.clone()));
    }
}

/// Collect `ariadne::Report` instances for diagnostics without printing.
#[cfg(feature = "diagnostics")]
#[must_use]
pub fn collect_reports<'a>(
    name: &'a str,
    source: &'a str,
    diagnostics: impl IntoIterator<Item = &'a Diagnostic>,
) -> Vec<Report<'a, (String, std::ops::Range<usize>)>> {
    let simple = SimpleSource::new(name, source);
    diagnostics
        .into_iter()
        .map(|diagnostic| diagnostic.to_report(&simple))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_render() {
        let diagnostic = Diagnostic::fatal(12, "division by zero");
        assert_eq!(
            diagnostic.render("song.tja"),
            "song.tja:12: fatal error: division by zero"
        );
        assert_eq!(
            Diagnostic::note(3, "here").render("a.tja"),
            "a.tja:3: info: here"
        );
    }

    #[test]
    fn test_line_range() {
        let source = SimpleSource::new("a.tja", "one\r\ntwo\nthree");
        assert_eq!(source.line_range(1), 0..3);
        assert_eq!(source.line_range(2), 5..8);
        assert_eq!(source.line_range(3), 9..14);
        assert_eq!(source.line_range(4), 14..14);
        assert_eq!(source.line_range(0), 0..0);
    }

    #[test]
    fn test_vec_sink_collects() {
        fn forward(mut sink: impl DiagnosticSink) {
            sink.diagnose(Diagnostic::warning(1, "a"));
        }

        let mut sink = Vec::new();
        forward(&mut sink);
        sink.diagnose(Diagnostic::error(2, "b"));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].severity, Severity::Error);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn test_collect_reports() {
        let source = "#START\n1x,\n#END\n";
        let diagnostics = [Diagnostic::warning(2, "unrecognized note type 'x'")];
        let reports = collect_reports("a.tja", source, &diagnostics);
        assert_eq!(reports.len(), 1);
    }
}
