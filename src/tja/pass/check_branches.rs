//! Timing agreement between the tiers of a branched course.
//!
//! Players switch tiers at branch points, so every tier must place its tempo changes,
//! delays and barlines exactly where master does.

use itertools::Itertools;

use crate::{
    course::{Branch, Course, Side},
    diagnostics::{Diagnostic, DiagnosticSink},
    event::{Event, EventType},
    tja::{CompileError, Result},
};

use super::report;

/// Tempo changes, delays and real barlines.
fn is_timing(event: &Event) -> bool {
    match event.event_type() {
        EventType::Bpm | EventType::Delay => true,
        EventType::Measure => event.measure_flags().is_some_and(|flags| flags.real),
        _ => false,
    }
}

fn same_timing(event: &Event, master: &Event) -> bool {
    if event.time() != master.time() || event.event_type() != master.event_type() {
        return false;
    }
    match event.event_type() {
        EventType::Measure => event.measure_flags().is_some_and(|flags| flags.real),
        _ => event.detail_float() == master.detail_float(),
    }
}

/// Checks that every tier of a branched course keeps the timing of the master tier.
///
/// # Errors
///
/// Fails on the first tier whose tempo changes, delays or barlines differ from the
/// master tier. Every divergence is reported to `sink`.
pub(crate) fn check_branches(course: &Course, sink: &mut impl DiagnosticSink) -> Result<()> {
    if !course.branched() {
        return Ok(());
    }
    let Some(master) = course.get_branch(Side::Left, Branch::Master) else {
        return Ok(());
    };
    let timing = master.iter().filter(|event| is_timing(event)).collect_vec();
    let mut first_error: Option<CompileError> = None;

    for branch in [Branch::Normal, Branch::Advanced] {
        let Some(section) = course.get_branch(Side::Left, branch) else {
            continue;
        };
        let mut expected = timing.iter().copied().peekable();

        for event in section {
            if !matches!(
                event.event_type(),
                EventType::Bpm | EventType::Delay | EventType::Measure
            ) {
                continue;
            }
            match expected.peek() {
                Some(master) if same_timing(event, master) => {
                    expected.next();
                }
                found => {
                    let line = u32::from(event.line());
                    let error = report(sink, CompileError::BranchDivergence { branch, line });
                    if let Some(master) = found {
                        sink.diagnose(Diagnostic::note(
                            u32::from(master.line()),
                            "last timing event in master here",
                        ));
                    }
                    first_error.get_or_insert(error);
                    break;
                }
            }
        }

        if let Some(master) = expected.next() {
            let line = u32::from(master.line());
            let error = report(sink, CompileError::MasterDivergence { branch, line });
            first_error.get_or_insert(error);
        }
    }

    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{diagnostics::Severity, event::MeasureFlags, section::Section};

    fn tier(events: &[Event]) -> Section {
        let mut section = Section::new();
        section.push_many(events).unwrap();
        section
    }

    fn course(normal: &[Event], advanced: &[Event], master: &[Event]) -> Course {
        let mut course = Course::new();
        course.attach_branch(tier(normal), Side::Left, Branch::Normal);
        course.setup_branching().unwrap();
        course.attach_branch(tier(advanced), Side::Left, Branch::Advanced);
        course.attach_branch(tier(master), Side::Left, Branch::Master);
        course
    }

    fn timing() -> Vec<Event> {
        vec![
            Event::bpm(0, 120.0).with_line(1),
            Event::measure(0).with_line(2),
            Event::new(EventType::Don, 0),
            Event::measure(96).with_line(3),
        ]
    }

    #[test]
    fn test_matching_tiers() {
        let mut advanced = timing();
        advanced.push(Event::new(EventType::Kat, 96));
        let course = course(&timing(), &advanced, &timing());
        let mut sink = Vec::new();
        assert!(check_branches(&course, &mut sink).is_ok());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unbranched_is_skipped() {
        let mut course = Course::new();
        course.attach_branch(tier(&timing()), Side::Left, Branch::Normal);
        let mut sink = Vec::new();
        assert!(check_branches(&course, &mut sink).is_ok());
    }

    #[test]
    fn test_tempo_divergence() {
        let mut normal = timing();
        normal[0] = Event::bpm(0, 150.0).with_line(11);
        let course = course(&normal, &timing(), &timing());
        let mut sink = Vec::new();
        let result = check_branches(&course, &mut sink);
        assert!(matches!(
            result,
            Err(CompileError::BranchDivergence {
                branch: Branch::Normal,
                line: 11
            })
        ));
        let found: Vec<_> = sink
            .iter()
            .map(|d| (d.line, d.severity, d.message.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (
                    11,
                    Severity::Fatal,
                    "timing of branch normal diverges from master"
                ),
                (1, Severity::Note, "last timing event in master here"),
                (
                    1,
                    Severity::Fatal,
                    "timing of branch master diverges from normal"
                ),
            ]
        );
    }

    #[test]
    fn test_padding_diverges() {
        let mut advanced = timing();
        advanced[3] = Event::measure(96)
            .with_measure_flags(MeasureFlags::FAKE)
            .with_line(5);
        let course = course(&timing(), &advanced, &timing());
        let mut sink = Vec::new();
        let result = check_branches(&course, &mut sink);
        assert!(matches!(
            result,
            Err(CompileError::BranchDivergence {
                branch: Branch::Advanced,
                ..
            })
        ));
    }

    #[test]
    fn test_short_tier() {
        let mut normal = timing();
        normal.pop();
        let course = course(&normal, &timing(), &timing());
        let mut sink = Vec::new();
        let result = check_branches(&course, &mut sink);
        assert!(matches!(
            result,
            Err(CompileError::MasterDivergence {
                branch: Branch::Normal,
                line: 3
            })
        ));
        assert_eq!(sink.len(), 1);
    }
}
