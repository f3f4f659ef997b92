//! Measure-relative timestamps.
//!
//! Until time conversion, the time of an event holds its measure index in the upper 16
//! bits and its subdivision within the measure in the lower 16 bits. Ordering the packed
//! values therefore orders events by measure first. A course holds at most 65535
//! measures of at most 65535 units each.

use num::rational::Ratio;

use crate::event::{Event, EventType, MeasureLength};

use super::{CompileError, Result};

/// Packs a measure index and a unit into an event time.
pub(crate) const fn pack(measure: u16, unit: u16) -> u32 {
    ((measure as u32) << 16) | unit as u32
}

/// Measure index of a packed time.
pub(crate) const fn measure_of(time: u32) -> u16 {
    (time >> 16) as u16
}

/// Unit of a packed time.
pub(crate) const fn unit_of(time: u32) -> u16 {
    (time & 0xffff) as u16
}

/// Clamps a source line to the width stored in events.
pub(crate) fn saturate_u16(value: impl TryInto<u16>) -> u16 {
    value.try_into().unwrap_or(u16::MAX)
}

/// Narrows a measure index or unit to its packed width.
pub(crate) fn narrow(value: u32, line: u32) -> Result<u16> {
    u16::try_from(value).map_err(|_| CompileError::TickOverflow { line })
}

/// Stamps an event with a measure and unit.
pub(crate) fn stamp(event: &mut Event, measure: u16, unit: u16) {
    event.set_time(pack(measure, unit));
}

/// Moves an event to another measure, keeping its unit.
pub(crate) fn set_measure(event: &mut Event, measure: u16) {
    let unit = unit_of(event.time());
    stamp(event, measure, unit);
}

/// Walks packed events in order and tells where each one lies, in 4/4 measures from
/// the start of the chart.
///
/// A barline sets the subdivision of its measure, a measure length event changes the
/// length of the current and all following measures. The assembler only places measure
/// lengths at the first unit of a measure. Lengths with a zero divisor are ignored here;
/// time conversion reports them.
#[derive(Debug, Clone)]
pub(crate) struct MeasureClock {
    measure: u16,
    start: Ratio<u64>,
    length: Ratio<u64>,
    units: u32,
}

impl MeasureClock {
    pub(crate) fn new() -> Self {
        Self {
            measure: 0,
            start: Ratio::from_integer(0),
            length: Ratio::from_integer(1),
            units: 1,
        }
    }

    /// Length of the current measure.
    pub(crate) const fn length(&self) -> Ratio<u64> {
        self.length
    }

    /// Length of one unit of the current measure.
    pub(crate) fn step(&self) -> Ratio<u64> {
        self.length / u64::from(self.units)
    }

    /// Feeds the next event and returns its position.
    pub(crate) fn advance(&mut self, event: &Event) -> Ratio<u64> {
        let measure = measure_of(event.time());
        if measure > self.measure {
            self.start += self.length * u64::from(measure - self.measure);
            self.units = 1;
        }
        self.measure = measure;

        match event.event_type() {
            EventType::Measure => {
                if let Some(flags) = event.measure_flags()
                    && flags.units != 0
                {
                    self.units = flags.units;
                }
            }
            EventType::MeasureLength => {
                if let Some(MeasureLength { dividend, divisor }) = event.measure_length()
                    && divisor != 0
                {
                    self.length = Ratio::new(u64::from(dividend), u64::from(divisor));
                }
            }
            _ => {}
        }

        self.start + self.step() * u64::from(unit_of(event.time()))
    }
}

/// A position in 4/4 measures as a float.
pub(crate) fn to_f64(position: Ratio<u64>) -> f64 {
    *position.numer() as f64 / *position.denom() as f64
}
