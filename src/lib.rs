//! The TJA chart compiler.
//!
//! TJA is the text chart format of taiko-style rhythm games. This crate turns the command
//! stream of a chart into a time-indexed event model that players, scorers and renderers
//! can walk without knowing anything about the source text.
//!
//! - [`event`] defines the fixed-layout [`Event`](event::Event) record and its types.
//! - [`section`] holds the ordered events of one branch tier, with a cached tick to
//!   seconds table.
//! - [`course`] and [`courseset`] hold the tiers of every difficulty of a song.
//! - [`tja`] compiles a [`ParsedChart`](tja::ParsedChart) into a
//!   [`Courseset`](courseset::Courseset).
//! - [`diagnostics`] carries the warnings and errors raised on the way.
//!
//! In detail, our policies are:
//!
//! - Do not tokenize chart text. A front end hands over commands with line numbers.
//! - Do not stop on a recoverable anomaly. Repair it and report it.
//! - Never panic on allocation failure. Growing storage returns an error instead.

pub mod course;
pub mod courseset;
pub mod diagnostics;
pub mod dump;
pub mod event;
pub mod mixin;
pub mod section;
pub mod tja;

pub use self::{
    course::Course,
    courseset::Courseset,
    diagnostics::{Diagnostic, DiagnosticSink, Severity},
    event::{Event, EventType},
    section::Section,
    tja::{CompileError, CompileOutput, compile, compile_with_sink},
};
