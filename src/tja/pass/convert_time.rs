//! Conversion from packed measure timestamps to ticks.
//!
//! The tickrate is chosen so that every subdivision of every measure falls on a whole
//! tick. Afterwards common factors are divided out again, keeping at least
//! [`DEFAULT_TICKRATE`] ticks per measure.

use num::{Integer, rational::Ratio};

use crate::{
    diagnostics::DiagnosticSink,
    event::{EventType, Payload},
    section::{DEFAULT_TICKRATE, Section},
    tja::{CompileError, Result, timestamp::MeasureClock},
};

use super::report;

/// Finds the smallest tickrate that represents every event exactly.
fn extract_tickrate(section: &Section, sink: &mut impl DiagnosticSink) -> Result<u32> {
    let mut clock = MeasureClock::new();
    let mut tickrate = u64::from(DEFAULT_TICKRATE);

    for event in section {
        let line = u32::from(event.line());
        if let Some(length) = event.measure_length()
            && length.divisor == 0
        {
            return Err(report(sink, CompileError::MeasureDivisionByZero { line }));
        }
        clock.advance(event);
        if matches!(
            event.event_type(),
            EventType::Measure | EventType::MeasureLength
        ) {
            tickrate = tickrate
                .lcm(clock.step().denom())
                .lcm(clock.length().denom());
            if tickrate > u64::from(u32::MAX) {
                return Err(report(sink, CompileError::TickOverflow { line }));
            }
        }
    }
    u32::try_from(tickrate).map_err(|_| report(sink, CompileError::TickOverflow { line: 0 }))
}

/// Rewrites every event time as an absolute tick.
fn convert(section: &mut Section, tickrate: u32, sink: &mut impl DiagnosticSink) -> Result<()> {
    let mut clock = MeasureClock::new();
    let scale = Ratio::from_integer(u64::from(tickrate));

    for event in section.events_mut() {
        let position = clock.advance(event);
        let tick = (position * scale).to_integer();
        let Ok(tick) = u32::try_from(tick) else {
            let line = u32::from(event.line());
            return Err(report(sink, CompileError::TickOverflow { line }));
        };
        event.set_time(tick);

        match event.payload_mut() {
            Payload::Measure(flags) => flags.units = 0,
            Payload::MeasureLength(_) => event.delete(),
            _ => {}
        }
    }
    section.set_tickrate(tickrate);
    Ok(())
}

/// Divides out factors shared by the tickrate and every event time.
fn remove_excess_factors(section: &mut Section) {
    let tickrate = section.tickrate();
    let common = section
        .iter()
        .fold(tickrate, |acc, event| acc.gcd(&event.time()));

    let mut factor = 1;
    let mut candidate: u32 = 1;
    while u64::from(candidate).pow(2) <= u64::from(common) {
        if common % candidate == 0 {
            for divisor in [candidate, common / candidate] {
                if tickrate / divisor >= DEFAULT_TICKRATE {
                    factor = factor.max(divisor);
                }
            }
        }
        candidate += 1;
    }

    if factor > 1 {
        for event in section.events_mut() {
            event.set_time(event.time() / factor);
        }
        section.set_tickrate(tickrate / factor);
    }
}

pub(crate) fn convert_time(section: &mut Section, sink: &mut impl DiagnosticSink) -> Result<()> {
    let tickrate = extract_tickrate(section, sink)?;
    convert(section, tickrate, sink)?;
    remove_excess_factors(section);
    log::debug!(
        "converted {} events at {} ticks per measure",
        section.len(),
        section.tickrate()
    );
    Ok(())
}
