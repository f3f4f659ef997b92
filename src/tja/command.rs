//! The parsed command stream a front end hands to the compiler.
//!
//! A front end tokenizes the chart text and produces, for every course, the ordered list
//! of commands and note glyphs with their line numbers. Metadata headers are collected
//! into [`Metadata`] records.

use crate::{
    course::{Branch, PendingSide},
    mixin::Located,
};

use super::metadata::Metadata;

/// One command of a course body, in source order.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// `#START`, optionally for one player of a two-player chart.
    Start {
        /// `P1` or `P2`.
        player: Option<PendingSide>,
    },
    /// `#END`.
    End,
    /// One note glyph.
    Note(char),
    /// `,`: the end of a measure.
    EndMeasure,
    /// `#BPMCHANGE`.
    BpmChange(f64),
    /// `#SCROLL`.
    Scroll(f64),
    /// `#DELAY`, in seconds.
    Delay(f64),
    /// `#MEASURE dividend/divisor`.
    Measure {
        /// Upper part of the signature.
        dividend: u32,
        /// Lower part of the signature.
        divisor: u32,
    },
    /// `#GOGOSTART`.
    GogoStart,
    /// `#GOGOEND`.
    GogoEnd,
    /// `#BARLINEON`.
    BarlineOn,
    /// `#BARLINEOFF`.
    BarlineOff,
    /// `#SECTION`: restart branch scoring from here.
    Section,
    /// `#LEVELHOLD`: stay on the current branch for the rest of the course.
    LevelHold,
    /// `#BRANCHSTART condition, advanced, master`.
    BranchStart {
        /// Condition code, `p`, `b` or `r`.
        condition: String,
        /// Threshold for the advanced branch.
        advanced: f64,
        /// Threshold for the master branch.
        master: f64,
    },
    /// `#N`, `#E` or `#M`: the following measures belong to one tier.
    Branch(Branch),
    /// `#BRANCHEND`.
    BranchEnd,
}

impl Command {
    /// Parses a run of note glyphs into note commands, with `,` ending measures.
    ///
    /// Whitespace is skipped. This is a convenience for front ends that keep note lines
    /// as text.
    pub fn notes(line: u32, text: &str) -> impl Iterator<Item = Located<Self>> + '_ {
        text.chars()
            .filter(|glyph| !glyph.is_whitespace())
            .map(move |glyph| {
                let command = match glyph {
                    ',' => Self::EndMeasure,
                    glyph => Self::Note(glyph),
                };
                Located::new(command, line)
            })
    }
}

/// Commands and metadata of one course.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedCourse {
    /// Course-level headers.
    pub metadata: Metadata,
    /// Body commands in source order.
    pub commands: Vec<Located<Command>>,
}

/// Everything the front end produced for one chart file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedChart {
    /// Name of the chart file, if known.
    pub filename: Option<String>,
    /// Song-level headers.
    pub metadata: Metadata,
    /// Courses in source order.
    pub courses: Vec<ParsedCourse>,
}
