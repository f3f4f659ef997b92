//! Branch points.
//!
//! Every branch condition left by the assembler becomes three events: the start of the
//! scored section, the check of the condition one measure before the branch point, and
//! the jump itself. Thresholds written as percentages are turned into points using the
//! notes of the scored section.

use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    event::{Event, EventType},
    section::{CapacityError, Section},
    tja::branchtype::BranchType,
};

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    branch_type: BranchType,
    small_notes: u32,
    big_notes: u32,
}

pub(crate) fn compile_branches(
    section: &mut Section,
    sink: &mut impl DiagnosticSink,
) -> Result<(), CapacityError> {
    let mut tally = Tally::default();
    let mut section_start = 0;
    let mut check_time = 0;
    let mut compiled = Vec::new();

    for event in section.events_mut() {
        match event.event_type() {
            EventType::Don | EventType::Kat => tally.small_notes += 1,
            EventType::DonBig | EventType::KatBig => tally.big_notes += 1,
            EventType::BranchStart => {
                section_start = event.time();
                check_time = section_start;
                tally = Tally::default();
                event.delete();
            }
            EventType::Measure => check_time = event.time(),
            EventType::BranchType => {
                tally.branch_type = BranchType::from_int(event.detail_int());
                event.delete();
            }
            EventType::BranchThreshold => {
                let jump = event.time();
                let line = event.line();
                let raw = event.raw_thresholds().unwrap_or_default();

                let check = if check_time < section_start {
                    sink.diagnose(Diagnostic::warning(
                        u32::from(line),
                        "branch condition is checked before the section starts",
                    ));
                    section_start
                } else {
                    check_time
                };
                let thresholds =
                    tally
                        .branch_type
                        .thresholds(raw, tally.small_notes, tally.big_notes);
                log::debug!(
                    "branch point at tick {jump}: {:?} over {} small and {} big notes, {thresholds:?}",
                    tally.branch_type,
                    tally.small_notes,
                    tally.big_notes,
                );

                compiled.extend([
                    Event::new(EventType::BranchStart, section_start)
                        .with_scoring(tally.branch_type.scoring())
                        .with_line(line),
                    Event::new(EventType::BranchCheck, check)
                        .with_thresholds(thresholds)
                        .with_line(line),
                    Event::new(EventType::BranchJump, jump).with_line(line),
                ]);

                event.delete();
                tally = Tally::default();
                section_start = jump;
                check_time = jump;
            }
            _ => {}
        }
    }

    section.push_many(&compiled)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::BranchThresholds;

    fn condition(time: u32, branch_type: BranchType, advanced: f64, master: f64) -> [Event; 2] {
        [
            Event::new(EventType::BranchType, time).with_detail_int(branch_type.code()),
            Event::new(EventType::BranchThreshold, time).with_thresholds(BranchThresholds {
                advanced: branch_type.convert_threshold(advanced),
                master: branch_type.convert_threshold(master),
            }),
        ]
    }

    fn compiled(section: &Section) -> Vec<(EventType, u32)> {
        section
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type(),
                    EventType::BranchStart | EventType::BranchCheck | EventType::BranchJump
                )
            })
            .map(|e| (e.event_type(), e.time()))
            .collect()
    }

    #[test]
    fn test_accuracy_branch() {
        let [ty, threshold] = condition(192, BranchType::Accuracy, 50.0, 100.0);
        let mut section = Section::new();
        section
            .push_many(&[
                Event::measure(0),
                Event::new(EventType::Don, 0),
                Event::new(EventType::Kat, 24),
                Event::new(EventType::DonBig, 48),
                Event::measure(96),
                Event::new(EventType::Don, 96),
                ty,
                threshold,
                Event::measure(192),
                Event::new(EventType::Don, 192),
            ])
            .unwrap();
        let mut sink = Vec::new();
        compile_branches(&mut section, &mut sink).unwrap();

        assert!(sink.is_empty());
        assert_eq!(
            compiled(&section),
            vec![
                (EventType::BranchStart, 0),
                (EventType::BranchCheck, 96),
                (EventType::BranchJump, 192),
            ]
        );
        let check = section
            .iter()
            .find_map(Event::branch_thresholds)
            .unwrap();
        assert_eq!(
            check,
            BranchThresholds {
                advanced: 40,
                master: 80
            }
        );
        let scoring = section.iter().find_map(Event::branch_scoring).unwrap();
        assert_eq!(scoring, BranchType::Accuracy.scoring());
        assert_eq!(
            section
                .iter()
                .filter(|e| e.event_type() == EventType::None)
                .count(),
            2
        );
    }

    #[test]
    fn test_section_marker_resets() {
        let [ty, threshold] = condition(192, BranchType::Roll, 5.0, 10.0);
        let mut section = Section::new();
        section
            .push_many(&[
                Event::measure(0),
                Event::new(EventType::Don, 0),
                Event::measure(96),
                Event::new(EventType::BranchStart, 96),
                Event::new(EventType::Don, 96),
                ty,
                threshold,
                Event::measure(192),
            ])
            .unwrap();
        let mut sink = Vec::new();
        compile_branches(&mut section, &mut sink).unwrap();
        assert_eq!(
            compiled(&section),
            vec![
                (EventType::BranchStart, 96),
                (EventType::BranchCheck, 96),
                (EventType::BranchJump, 192),
            ]
        );
        assert_eq!(
            section.iter().find_map(Event::branch_thresholds),
            Some(BranchThresholds {
                advanced: 5,
                master: 10
            })
        );
    }

    #[test]
    fn test_branch_at_chart_start() {
        let [ty, threshold] = condition(0, BranchType::None, 0.0, 0.0);
        let mut section = Section::new();
        section
            .push_many(&[ty, threshold.with_line(3), Event::measure(0)])
            .unwrap();
        let mut sink = Vec::new();
        compile_branches(&mut section, &mut sink).unwrap();
        assert!(sink.is_empty());
        assert_eq!(
            compiled(&section),
            vec![
                (EventType::BranchStart, 0),
                (EventType::BranchCheck, 0),
                (EventType::BranchJump, 0),
            ]
        );
        assert_eq!(
            section.iter().find_map(Event::branch_thresholds),
            Some(BranchThresholds {
                advanced: 1,
                master: 1
            })
        );
    }

    #[test]
    fn test_check_is_clamped_to_section_start() {
        let [ty, threshold] = condition(288, BranchType::Roll, 5.0, 10.0);
        let mut section = Section::new();
        section
            .push_many(&[
                Event::new(EventType::BranchStart, 192),
                Event::measure(96),
                ty,
                threshold.with_line(4),
            ])
            .unwrap();
        let mut sink = Vec::new();
        compile_branches(&mut section, &mut sink).unwrap();
        assert_eq!(
            compiled(&section),
            vec![
                (EventType::BranchStart, 192),
                (EventType::BranchCheck, 192),
                (EventType::BranchJump, 288),
            ]
        );
        assert_eq!(
            sink,
            vec![Diagnostic::warning(
                4,
                "branch condition is checked before the section starts"
            )]
        );
    }
}
