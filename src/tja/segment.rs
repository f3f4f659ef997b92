//! A run of measures belonging to one stream: the common part of a course, or one tier
//! of a branched part.

use crate::{
    event::{Event, MeasureFlags},
    section::{CapacityError, Section},
};

use super::{
    CompileError, Result,
    events::EventsAccumulator,
    timestamp::{saturate_u16, set_measure, stamp},
};

/// Measures folded so far, with measure indices relative to the segment start.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    section: Section,
    measures: u16,
    levelhold: bool,
}

impl Segment {
    /// Creates an empty segment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            section: Section::new(),
            measures: 0,
            levelhold: false,
        }
    }

    /// Events of the segment.
    #[must_use]
    pub const fn section(&self) -> &Section {
        &self.section
    }

    /// Number of finished measures.
    #[must_use]
    pub const fn measures(&self) -> u16 {
        self.measures
    }

    /// Whether a level hold occurred in the segment.
    #[must_use]
    pub const fn levelhold(&self) -> bool {
        self.levelhold
    }

    /// Whether nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measures == 0 && self.section.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Section, u16, bool) {
        (self.section, self.measures, self.levelhold)
    }

    /// Adds the barline of the current measure, which has `units` subdivisions.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow.
    pub fn push_barline(&mut self, units: u32, line: u32) -> Result<(), CapacityError> {
        let mut barline = Event::measure(0)
            .with_line(saturate_u16(line))
            .with_measure_flags(MeasureFlags {
                units,
                ..MeasureFlags::REAL
            });
        stamp(&mut barline, self.measures, 0);
        self.section.push(barline)
    }

    /// Moves on to the next measure.
    ///
    /// # Errors
    ///
    /// Fails when the segment already holds the most measures a packed time can index.
    pub fn finish_measure(&mut self, line: u32) -> Result<()> {
        self.measures = self
            .measures
            .checked_add(1)
            .ok_or(CompileError::TickOverflow { line })?;
        Ok(())
    }

    /// Moves the events of a measure batch into the current measure.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow.
    pub fn push_events(&mut self, events: &mut EventsAccumulator) -> Result<(), CapacityError> {
        let measure = self.measures;
        for event in events.events_mut().events_mut() {
            set_measure(event, measure);
        }
        self.levelhold |= events.levelhold();
        self.section.concat(events.events())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        event::EventType,
        tja::timestamp::{measure_of, unit_of},
    };

    #[test]
    fn test_fold_measures() {
        let mut segment = Segment::new();
        let mut acc = EventsAccumulator::new();
        let mut sink = Vec::new();

        for measure in ["1", "02"] {
            for note in measure.chars() {
                acc.push_note(note, 1, &mut sink).unwrap();
            }
            segment.push_barline(acc.units(), 1).unwrap();
            segment.push_events(&mut acc).unwrap();
            segment.finish_measure(1).unwrap();
            acc.clear();
        }

        assert_eq!(segment.measures(), 2);
        let found: Vec<_> = segment
            .section()
            .iter()
            .map(|e| {
                (
                    e.event_type(),
                    measure_of(e.time()),
                    unit_of(e.time()),
                )
            })
            .collect();
        assert_eq!(
            found,
            vec![
                (EventType::Measure, 0, 0),
                (EventType::Don, 0, 0),
                (EventType::Measure, 1, 0),
                (EventType::Kat, 1, 1),
            ]
        );
        assert_eq!(
            segment.section().locate(2).and_then(Event::measure_flags),
            Some(MeasureFlags {
                units: 2,
                ..MeasureFlags::REAL
            })
        );
    }

    #[test]
    fn test_levelhold_sticks() {
        let mut segment = Segment::new();
        let mut acc = EventsAccumulator::new();
        acc.push_event(Event::new(EventType::LevelHold, 0)).unwrap();
        segment.push_events(&mut acc).unwrap();
        acc.clear();
        segment.push_events(&mut acc).unwrap();
        assert!(segment.levelhold());
    }

    #[test]
    fn test_measure_overflow() {
        let mut segment = Segment::new();
        for _ in 0..u16::MAX {
            segment.finish_measure(1).unwrap();
        }
        assert_eq!(segment.measures(), u16::MAX);
        assert!(matches!(
            segment.finish_measure(9),
            Err(CompileError::TickOverflow { line: 9 })
        ));
    }
}
