//! Postprocessing of assembled courses.
//!
//! Every attached section of a course runs through the same fixed sequence of passes,
//! and the finished course is checked for timing that diverges between tiers. Passes
//! repair what they can and report it; the ones that cannot continue report a fatal
//! diagnostic and return the matching [`CompileError`].

mod annotate;
mod barlines;
mod check_branches;
mod checkpoint_rolls;
mod cleanup;
mod compile_branches;
mod convert_time;
mod prepend_bpm;

use std::collections::HashSet;

use crate::{
    course::Course,
    diagnostics::{Diagnostic, DiagnosticSink},
    section::Section,
};

use super::{CompileError, Result};

use self::{
    annotate::annotate, barlines::barlines, check_branches::check_branches,
    checkpoint_rolls::checkpoint_rolls, cleanup::cleanup, compile_branches::compile_branches,
    convert_time::convert_time, prepend_bpm::prepend_bpm,
};

/// Reports `error` as a fatal diagnostic and hands it back.
pub(crate) fn report(sink: &mut impl DiagnosticSink, error: CompileError) -> CompileError {
    sink.diagnose(Diagnostic::fatal(error.line(), error.to_string()));
    error
}

/// Forwards each distinct diagnostic once.
///
/// Tiers of a branched course share the events of their common parts, so the same
/// anomaly would otherwise be reported once per tier.
#[derive(Debug)]
pub(crate) struct Deduplicate<S> {
    inner: S,
    seen: HashSet<Diagnostic>,
}

impl<S: DiagnosticSink> Deduplicate<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
        }
    }
}

impl<S: DiagnosticSink> DiagnosticSink for Deduplicate<S> {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        if self.seen.insert(diagnostic.clone()) {
            self.inner.diagnose(diagnostic);
        }
    }
}

/// Runs every section pass in order on one section.
///
/// # Errors
///
/// Stops at the first pass that fails.
pub(crate) fn run_section(
    section: &mut Section,
    bpm: f64,
    sink: &mut impl DiagnosticSink,
) -> Result<()> {
    prepend_bpm(section, bpm)?;
    annotate(section);
    barlines(section);
    checkpoint_rolls(section, sink);
    convert_time(section, sink)?;
    compile_branches(section, sink)?;
    cleanup(section);
    section.trim();
    Ok(())
}

/// Runs the section passes on every attached section, then checks the tiers.
///
/// # Errors
///
/// Stops at the first section that fails, or returns the tier divergence.
pub(crate) fn run_course(course: &mut Course, sink: &mut impl DiagnosticSink) -> Result<()> {
    let mut sink = Deduplicate::new(sink);
    let bpm = course.bpm();
    for (side, branch, section) in course.sections_mut() {
        log::debug!("running passes on {side:?} {branch}");
        run_section(section, bpm, &mut sink)?;
    }
    check_branches(course, &mut sink)
}
