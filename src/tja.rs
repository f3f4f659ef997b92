//! Compiler of TJA charts.
//!
//! The text front end is not part of this crate: it hands over a [`ParsedChart`], the
//! command stream of every course with its headers. Compiling a chart runs in two
//! phases.
//!
//! - Assembly folds glyphs and commands into sections, measure by measure. Until time
//!   conversion every event time is a packed (measure, unit) pair.
//! - A fixed sequence of passes then annotates notes, applies barline visibility,
//!   checks rolls, converts times to ticks, compiles branch points, sorts the events,
//!   and finally checks that every tier of a branched course keeps the same timing.
//!
//! Anomalies are reported through a [`DiagnosticSink`] and repaired where possible. A
//! fatal diagnostic means no courseset is produced.
//!
//! # Usage Example
//!
//! ```rust
//! use tja_rs::{
//!     event::EventType,
//!     course::{Branch, CourseClass, Side},
//!     mixin::Located,
//!     tja::{Command, ParsedChart, ParsedCourse, compile},
//! };
//!
//! let mut commands = vec![Located::new(Command::Start { player: None }, 1)];
//! commands.extend(Command::notes(2, "1,"));
//! commands.push(Located::new(Command::End, 3));
//!
//! let chart = ParsedChart {
//!     courses: vec![ParsedCourse {
//!         commands,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//! let output = compile(&chart);
//! let courseset = output.courseset.unwrap();
//! let course = courseset.get_course(CourseClass::Oni).unwrap();
//! let section = course.get_branch(Side::Left, Branch::Normal).unwrap();
//! let types: Vec<_> = section.iter().map(|event| event.event_type()).collect();
//! assert_eq!(types, [EventType::Bpm, EventType::Measure, EventType::Don]);
//! ```

pub mod branched;
pub mod branchtype;
pub mod command;
mod compiler;
pub mod coursebody;
pub mod events;
pub mod metadata;
mod pass;
pub mod segment;
mod timestamp;

use itertools::Itertools;
use thiserror::Error;

use crate::{
    course::{Branch, Course, CourseClass},
    courseset::Courseset,
    diagnostics::{Diagnostic, DiagnosticSink, Severity},
    section::CapacityError,
};

pub use self::{
    branchtype::BranchType,
    command::{Command, ParsedChart, ParsedCourse},
    metadata::{Metadata, SongSide, interpret_class, interpret_side, interpret_style},
};

/// An error that stops the compilation of a course.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompileError {
    /// Event storage could not grow.
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    /// A `#MEASURE` with a zero divisor.
    #[error("division by zero in measure length")]
    MeasureDivisionByZero {
        /// Line of the command.
        line: u32,
    },
    /// The chart needs more measures or ticks than fit in an event time.
    #[error("chart timing is out of range")]
    TickOverflow {
        /// Line of the event that overflowed, zero when unknown.
        line: u32,
    },
    /// A tier has tempo changes, delays or barlines that master does not have.
    #[error("timing of branch {branch} diverges from master")]
    BranchDivergence {
        /// The diverging tier.
        branch: Branch,
        /// Line of the first diverging event.
        line: u32,
    },
    /// Master has timing events left after a tier ended.
    #[error("timing of branch master diverges from {branch}")]
    MasterDivergence {
        /// The tier that ended early.
        branch: Branch,
        /// Line of the first master event left over.
        line: u32,
    },
    /// The command stream has no `#END`.
    #[error("course is not terminated by #END")]
    UnterminatedCourse {
        /// Line of the last command.
        line: u32,
    },
}

impl CompileError {
    /// The source line the error refers to, zero when unknown.
    #[must_use]
    pub const fn line(&self) -> u32 {
        match self {
            Self::Capacity(_) => 0,
            Self::MeasureDivisionByZero { line }
            | Self::TickOverflow { line }
            | Self::BranchDivergence { line, .. }
            | Self::MasterDivergence { line, .. }
            | Self::UnterminatedCourse { line } => *line,
        }
    }
}

/// Result of compiling a course.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompileOutput {
    /// The compiled courses, `None` if a fatal diagnostic was reported.
    pub courseset: Option<Courseset>,
    /// Everything reported while compiling, in order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles a chart, collecting every diagnostic.
#[must_use]
pub fn compile(chart: &ParsedChart) -> CompileOutput {
    let mut diagnostics = Vec::new();
    let courseset = compile_with_sink(chart, &mut diagnostics);
    CompileOutput {
        courseset,
        diagnostics,
    }
}

/// Tracks whether a fatal diagnostic went through.
struct Watch<S> {
    inner: S,
    fatal: bool,
}

impl<S: DiagnosticSink> DiagnosticSink for Watch<S> {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.fatal |= diagnostic.severity == Severity::Fatal;
        self.inner.diagnose(diagnostic);
    }
}

/// Compiles a chart, streaming diagnostics into `sink`.
///
/// Returns `None` if any fatal diagnostic was reported. Other courses are still
/// compiled so that all of their diagnostics are seen.
pub fn compile_with_sink(
    chart: &ParsedChart,
    sink: &mut impl DiagnosticSink,
) -> Option<Courseset> {
    let mut sink = Watch {
        inner: sink,
        fatal: false,
    };
    let mut set = Courseset::new();
    if let Some(filename) = &chart.filename {
        set.set_filename(filename.as_str());
    }
    chart.metadata.apply_to_courseset(&mut set);

    for parsed in &chart.courses {
        let mut metadata = chart.metadata.clone();
        metadata.update(parsed.metadata.clone());
        metadata.apply_to_courseset(&mut set);

        let course = match compile_course(parsed, &metadata, &mut sink) {
            Ok(course) => course,
            Err(CompileError::Capacity(error)) => {
                sink.diagnose(Diagnostic::fatal(0, error.to_string()));
                continue;
            }
            Err(_) => continue,
        };
        let class = course.class();
        if let Err(error) = set.add_course(course) {
            let line = parsed.commands.first().map_or(0, |command| command.line());
            sink.diagnose(Diagnostic::error(
                line,
                format!("course {class:?} is dropped: {error}"),
            ));
        }
    }

    for class in CourseClass::ALL {
        if let Some(course) = set.get_course_mut(class) {
            course.settle_side();
        }
    }

    if sink.fatal {
        log::debug!("compilation stopped by a fatal diagnostic");
        None
    } else {
        Some(set)
    }
}

fn compile_course(
    parsed: &ParsedCourse,
    metadata: &Metadata,
    sink: &mut impl DiagnosticSink,
) -> Result<Course> {
    let mut course = compiler::assemble(&parsed.commands, sink)?;
    metadata.apply_to_course(&mut course);
    pass::run_course(&mut course, sink)?;
    apply_balloons(&mut course, metadata);
    Ok(course)
}

fn apply_balloons(course: &mut Course, metadata: &Metadata) {
    let slots = course
        .sections()
        .map(|(side, branch, _)| (side, branch))
        .collect_vec();
    for (side, branch) in slots {
        if let Some(counts) = metadata.balloons(branch) {
            course.set_balloons(counts, side, branch);
        }
    }
}
