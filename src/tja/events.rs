//! Per-measure event accumulation.
//!
//! Notes of a measure are collected before the measure is closed, because the number of
//! glyphs in the measure decides how long each of them is. Events are stamped with the
//! unit they were written at; the measure index is filled in when the batch is folded
//! into a [`Segment`](super::segment::Segment).

use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    event::{Event, EventType, annotation},
    section::Section,
};

use super::{
    Result,
    timestamp::{narrow, saturate_u16, stamp},
};

/// What a note glyph stands for.
enum Glyph {
    /// `0`, an empty subdivision.
    Empty,
    Note(Event),
    Unknown,
}

fn glyph(glyph: char) -> Glyph {
    let note = |ty| Glyph::Note(Event::new(ty, 0));
    match glyph {
        '0' => Glyph::Empty,
        '1' => note(EventType::Don),
        '2' => note(EventType::Kat),
        '3' => note(EventType::DonBig),
        '4' => note(EventType::KatBig),
        '5' => note(EventType::Roll),
        '6' => note(EventType::RollBig),
        '7' => note(EventType::Balloon),
        '8' => note(EventType::RollEnd),
        '9' => note(EventType::Kusudama),
        'A' => Glyph::Note(Event::new(EventType::DonBig, 0).with_detail_int(annotation::HAND)),
        'B' => Glyph::Note(Event::new(EventType::KatBig, 0).with_detail_int(annotation::HAND)),
        'C' => note(EventType::Landmine),
        _ => Glyph::Unknown,
    }
}

/// Events of the measure being read.
#[derive(Debug, Clone, Default)]
pub struct EventsAccumulator {
    events: Section,
    units: u32,
    levelhold: bool,
}

impl EventsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Section::new(),
            units: 0,
            levelhold: false,
        }
    }

    /// Number of glyphs read in this measure.
    #[must_use]
    pub const fn units(&self) -> u32 {
        self.units
    }

    /// Whether a level hold was requested in this measure.
    #[must_use]
    pub const fn levelhold(&self) -> bool {
        self.levelhold
    }

    /// The accumulated events.
    #[must_use]
    pub const fn events(&self) -> &Section {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut Section {
        &mut self.events
    }

    /// Reads one note glyph. Every glyph takes one unit, even an unknown one.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow, or when the note lies past the last
    /// unit a measure can hold.
    pub fn push_note(
        &mut self,
        note: char,
        line: u32,
        sink: &mut impl DiagnosticSink,
    ) -> Result<()> {
        let result = match glyph(note) {
            Glyph::Empty => Ok(()),
            Glyph::Note(event) => self.push_event(event.with_line(saturate_u16(line))),
            Glyph::Unknown => {
                sink.diagnose(Diagnostic::warning(
                    line,
                    format!("unrecognized note type '{note}'"),
                ));
                Ok(())
            }
        };
        self.units += 1;
        result
    }

    /// Adds an event at the current unit.
    ///
    /// Deleted events are dropped, a level hold only sets the flag, and a barline before
    /// the first glyph of the measure is dropped since the measure brings its own.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow, or when the current unit does not fit
    /// in a packed time.
    pub fn push_event(&mut self, mut event: Event) -> Result<()> {
        match event.event_type() {
            EventType::None => return Ok(()),
            EventType::LevelHold => {
                self.levelhold = true;
                return Ok(());
            }
            EventType::Measure if self.units == 0 => return Ok(()),
            _ => {}
        }
        let unit = narrow(self.units, u32::from(event.line()))?;
        stamp(&mut event, 0, unit);
        self.events.push(event)?;
        Ok(())
    }

    /// Empties the accumulator for the next measure.
    pub fn clear(&mut self) {
        self.events.clear();
        self.units = 0;
        self.levelhold = false;
    }
}
