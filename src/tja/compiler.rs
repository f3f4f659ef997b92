//! Assembly of a course from its command stream.
//!
//! Glyphs and commands are collected per measure in an [`EventsAccumulator`]. Closing a
//! measure folds the batch into the segment being written: the common segment, or the
//! segment of the current tier while inside a branch point. Segments are handed to the
//! [`CourseBody`] whenever the structure changes.

use crate::{
    course::{Branch, Course},
    diagnostics::{Diagnostic, DiagnosticSink},
    event::{BranchThresholds, Event, EventType, MeasureLength},
    mixin::Located,
};

use super::{
    CompileError, Result,
    branched::Branched,
    branchtype::BranchType,
    command::Command,
    coursebody::CourseBody,
    events::EventsAccumulator,
    pass::report,
    segment::Segment,
    timestamp::saturate_u16,
};

/// A branch point being read, with the tier currently written.
#[derive(Debug)]
struct OpenBranch {
    branched: Branched,
    tier: Option<(Branch, Segment)>,
}

#[derive(Debug)]
struct Assembler {
    body: CourseBody,
    events: EventsAccumulator,
    common: Segment,
    branch: Option<OpenBranch>,
    /// A `#MEASURE` written after the first glyph, held for the next measure.
    length: Option<Event>,
}

impl Assembler {
    fn new() -> Result<Self> {
        Ok(Self {
            body: CourseBody::new()?,
            events: EventsAccumulator::new(),
            common: Segment::new(),
            branch: None,
            length: None,
        })
    }

    /// The segment measures are folded into.
    fn segment(&mut self) -> &mut Segment {
        match &mut self.branch {
            Some(OpenBranch {
                tier: Some((_, segment)),
                ..
            }) => segment,
            _ => &mut self.common,
        }
    }

    fn push(&mut self, event: Event, line: u32) -> Result<()> {
        self.events.push_event(event.with_line(saturate_u16(line)))
    }

    /// Measure lengths only change whole measures, so one written after the first glyph
    /// waits for the next barline.
    fn push_length(
        &mut self,
        length: MeasureLength,
        line: u32,
        sink: &mut impl DiagnosticSink,
    ) -> Result<()> {
        let event = Event::new(EventType::MeasureLength, 0)
            .with_measure_length(length)
            .with_line(saturate_u16(line));
        if self.events.units() == 0 {
            return self.events.push_event(event);
        }
        sink.diagnose(Diagnostic::warning(
            line,
            "#MEASURE inside a measure applies from the next measure",
        ));
        self.length = Some(event);
        Ok(())
    }

    fn end_measure(&mut self, line: u32) -> Result<()> {
        let units = self.events.units();
        let mut events = std::mem::take(&mut self.events);
        let segment = self.segment();
        segment.push_barline(units, line)?;
        segment.push_events(&mut events)?;
        segment.finish_measure(line)?;
        events.clear();
        self.events = events;
        if let Some(length) = self.length.take() {
            self.events.push_event(length)?;
        }
        Ok(())
    }

    /// Settles the measure being read before the structure changes.
    ///
    /// Glyphs without a closing `,` still form a measure. Commands written before the
    /// first glyph of a measure stay at the start of the next one.
    fn flush(&mut self, line: u32, sink: &mut impl DiagnosticSink) -> Result<()> {
        if self.events.units() > 0 {
            sink.diagnose(Diagnostic::warning(line, "measure is not terminated by ','"));
            return self.end_measure(line);
        }
        let mut events = std::mem::take(&mut self.events);
        self.segment().push_events(&mut events)?;
        events.clear();
        self.events = events;
        Ok(())
    }

    fn close_tier(&mut self) -> Result<()> {
        if let Some(open) = &mut self.branch
            && let Some((branch, segment)) = open.tier.take()
        {
            open.branched.assign(branch, &segment)?;
        }
        Ok(())
    }

    fn close_branch(&mut self) -> Result<()> {
        self.close_tier()?;
        if let Some(open) = self.branch.take() {
            self.body.append_branched(open.branched)?;
        }
        Ok(())
    }

    fn close_common(&mut self) -> Result<()> {
        let common = std::mem::take(&mut self.common);
        if !common.is_empty() {
            self.body.append_common(common)?;
        }
        Ok(())
    }

    fn branch_start(
        &mut self,
        condition: &str,
        advanced: f64,
        master: f64,
        line: u32,
        sink: &mut impl DiagnosticSink,
    ) -> Result<()> {
        self.flush(line, sink)?;
        self.close_branch()?;
        self.close_common()?;

        let branch_type = BranchType::from_code(condition).unwrap_or_else(|| {
            sink.diagnose(Diagnostic::error(
                line,
                format!("unknown branch condition '{condition}'"),
            ));
            BranchType::None
        });
        let thresholds = BranchThresholds {
            advanced: branch_type.convert_threshold(advanced),
            master: branch_type.convert_threshold(master),
        };
        self.branch = Some(OpenBranch {
            branched: Branched::new(branch_type, thresholds, line),
            tier: None,
        });
        Ok(())
    }

    fn tier(&mut self, branch: Branch, line: u32, sink: &mut impl DiagnosticSink) -> Result<()> {
        if self.branch.is_none() {
            sink.diagnose(Diagnostic::warning(
                line,
                format!("branch {branch} is selected outside of a branch point"),
            ));
            return Ok(());
        }
        self.flush(line, sink)?;
        self.close_tier()?;
        if let Some(open) = &mut self.branch {
            open.tier = Some((branch, Segment::new()));
        }
        Ok(())
    }

    fn branch_end(&mut self, line: u32, sink: &mut impl DiagnosticSink) -> Result<()> {
        if self.branch.is_none() {
            sink.diagnose(Diagnostic::warning(
                line,
                "#BRANCHEND without a matching #BRANCHSTART",
            ));
            return Ok(());
        }
        self.flush(line, sink)?;
        self.close_branch()
    }

    fn finish(mut self, line: u32, sink: &mut impl DiagnosticSink) -> Result<Course> {
        self.flush(line, sink)?;
        self.close_branch()?;
        self.close_common()?;
        log::debug!(
            "assembled {} measures, level hold mask {:#04x}",
            self.body.measures(),
            self.body.levelhold()
        );
        Ok(self.body.into_course())
    }
}

/// Builds the unprocessed course of one command stream.
///
/// Commands after `#END` are ignored with a warning.
///
/// # Errors
///
/// Fails when the stream has no `#END`, when the chart has more measures or units than
/// a packed time holds, or when event storage cannot grow.
pub(crate) fn assemble(
    commands: &[Located<Command>],
    sink: &mut impl DiagnosticSink,
) -> Result<Course> {
    read(commands, &mut *sink).map_err(|error| match error {
        CompileError::TickOverflow { .. } => report(sink, error),
        error => error,
    })
}

fn read(commands: &[Located<Command>], sink: &mut impl DiagnosticSink) -> Result<Course> {
    let mut assembler = Assembler::new()?;
    let mut player = None;

    for (index, command) in commands.iter().enumerate() {
        let line = command.line();
        match command.content() {
            Command::Start { player: side } => player = *side,
            Command::End => {
                if let Some(rest) = commands.get(index + 1) {
                    sink.diagnose(Diagnostic::warning(
                        rest.line(),
                        "commands after #END are ignored",
                    ));
                }
                let mut course = assembler.finish(line, sink)?;
                course.set_pending_side(player);
                return Ok(course);
            }
            Command::Note(glyph) => assembler.events.push_note(*glyph, line, sink)?,
            Command::EndMeasure => assembler.end_measure(line)?,
            Command::BpmChange(bpm) => assembler.push(Event::bpm(0, *bpm), line)?,
            Command::Scroll(scroll) => assembler.push(
                Event::new(EventType::Scroll, 0).with_detail_float(*scroll),
                line,
            )?,
            Command::Delay(seconds) => assembler.push(
                Event::new(EventType::Delay, 0).with_detail_float(*seconds),
                line,
            )?,
            &Command::Measure { dividend, divisor } => {
                assembler.push_length(MeasureLength { dividend, divisor }, line, sink)?;
            }
            Command::GogoStart => assembler.push(Event::new(EventType::GogoStart, 0), line)?,
            Command::GogoEnd => assembler.push(Event::new(EventType::GogoEnd, 0), line)?,
            Command::BarlineOn => assembler.push(Event::new(EventType::BarlineOn, 0), line)?,
            Command::BarlineOff => assembler.push(Event::new(EventType::BarlineOff, 0), line)?,
            Command::Section => assembler.push(Event::new(EventType::BranchStart, 0), line)?,
            Command::LevelHold => assembler.push(Event::new(EventType::LevelHold, 0), line)?,
            Command::BranchStart {
                condition,
                advanced,
                master,
            } => assembler.branch_start(condition, *advanced, *master, line, sink)?,
            Command::Branch(branch) => assembler.tier(*branch, line, sink)?,
            Command::BranchEnd => assembler.branch_end(line, sink)?,
        }
    }

    let line = commands.last().map_or(0, Located::line);
    Err(report(sink, CompileError::UnterminatedCourse { line }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        course::{PendingSide, Side},
        section::Section,
        tja::timestamp::{measure_of, unit_of},
    };

    fn stream(lines: &[(u32, Command)]) -> Vec<Located<Command>> {
        lines
            .iter()
            .map(|(line, command)| Located::new(command.clone(), *line))
            .collect()
    }

    fn notes(line: u32, text: &str) -> Vec<(u32, Command)> {
        Command::notes(line, text)
            .map(|command| (command.line(), command.into_content()))
            .collect()
    }

    fn layout(section: &Section) -> Vec<(EventType, u16, u16)> {
        section
            .iter()
            .map(|e| (e.event_type(), measure_of(e.time()), unit_of(e.time())))
            .collect()
    }

    #[test]
    fn test_simple_course() {
        let mut lines = vec![(1, Command::Start { player: None })];
        lines.extend(notes(2, "1020,"));
        lines.push((3, Command::BpmChange(200.0)));
        lines.extend(notes(4, "3,"));
        lines.push((5, Command::End));

        let mut sink = Vec::new();
        let course = assemble(&stream(&lines), &mut sink).unwrap();
        assert!(sink.is_empty());
        assert!(!course.branched());
        let normal = course.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(
            layout(normal),
            vec![
                (EventType::Measure, 0, 0),
                (EventType::Don, 0, 0),
                (EventType::Kat, 0, 2),
                (EventType::Measure, 1, 0),
                (EventType::Bpm, 1, 0),
                (EventType::DonBig, 1, 0),
            ]
        );
        assert_eq!(normal.locate(4).map(Event::line), Some(3));
    }

    #[test]
    fn test_missing_end() {
        let mut lines = vec![(1, Command::Start { player: None })];
        lines.extend(notes(2, "1,"));
        let mut sink = Vec::new();
        let result = assemble(&stream(&lines), &mut sink);
        assert!(matches!(
            result,
            Err(CompileError::UnterminatedCourse { line: 2 })
        ));
        assert_eq!(
            sink,
            vec![Diagnostic::fatal(2, "course is not terminated by #END")]
        );
    }

    #[test]
    fn test_player_side() {
        let lines = vec![
            (
                1,
                Command::Start {
                    player: Some(PendingSide::Right),
                },
            ),
            (2, Command::End),
        ];
        let course = assemble(&stream(&lines), &mut Vec::new()).unwrap();
        assert_eq!(course.pending_side(), Some(PendingSide::Right));
    }

    #[test]
    fn test_branch_point() {
        let mut lines = vec![(1, Command::Start { player: None })];
        lines.extend(notes(2, "1,"));
        lines.push((
            3,
            Command::BranchStart {
                condition: "r".to_string(),
                advanced: 5.0,
                master: 10.0,
            },
        ));
        lines.push((4, Command::Branch(Branch::Normal)));
        lines.extend(notes(5, "1,"));
        lines.push((6, Command::Branch(Branch::Advanced)));
        lines.extend(notes(7, "2,"));
        lines.push((8, Command::Branch(Branch::Master)));
        lines.extend(notes(9, "3,4,"));
        lines.push((10, Command::BranchEnd));
        lines.extend(notes(11, "1,"));
        lines.push((12, Command::End));

        let mut sink = Vec::new();
        let course = assemble(&stream(&lines), &mut sink).unwrap();
        assert!(sink.is_empty());
        assert!(course.branched());

        let master = course.get_branch(Side::Left, Branch::Master).unwrap();
        assert_eq!(
            layout(master),
            vec![
                (EventType::Measure, 0, 0),
                (EventType::Don, 0, 0),
                (EventType::BranchType, 1, 0),
                (EventType::BranchThreshold, 1, 0),
                (EventType::Measure, 1, 0),
                (EventType::DonBig, 1, 0),
                (EventType::Measure, 2, 0),
                (EventType::KatBig, 2, 0),
                (EventType::Measure, 3, 0),
                (EventType::Don, 3, 0),
            ]
        );
        let normal = course.get_branch(Side::Left, Branch::Normal).unwrap();
        let fake = normal
            .iter()
            .filter_map(Event::measure_flags)
            .filter(|flags| !flags.real)
            .count();
        assert_eq!(fake, 1);
        let barlines = |section: &Section| {
            section
                .iter()
                .filter(|e| e.event_type() == EventType::Measure)
                .count()
        };
        assert_eq!(barlines(normal), barlines(master));
    }

    #[test]
    fn test_unknown_condition() {
        let lines = vec![
            (1, Command::Start { player: None }),
            (
                2,
                Command::BranchStart {
                    condition: "x".to_string(),
                    advanced: 1.0,
                    master: 2.0,
                },
            ),
            (3, Command::Branch(Branch::Master)),
            (4, Command::End),
        ];
        let mut sink = Vec::new();
        let course = assemble(&stream(&lines), &mut sink).unwrap();
        assert!(course.branched());
        assert_eq!(
            sink,
            vec![Diagnostic::error(2, "unknown branch condition 'x'")]
        );
    }

    #[test]
    fn test_unterminated_measure_and_trailing_commands() {
        let mut lines = vec![(1, Command::Start { player: None })];
        lines.extend(notes(2, "12"));
        lines.push((3, Command::End));
        lines.push((4, Command::GogoStart));
        let mut sink = Vec::new();
        let course = assemble(&stream(&lines), &mut sink).unwrap();
        assert_eq!(
            sink,
            vec![
                Diagnostic::warning(4, "commands after #END are ignored"),
                Diagnostic::warning(3, "measure is not terminated by ','"),
            ]
        );
        let normal = course.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(normal.len(), 3);
    }

    #[test]
    fn test_measure_length_inside_measure() {
        let mut lines = vec![(1, Command::Start { player: None })];
        lines.extend(notes(2, "1"));
        lines.push((
            3,
            Command::Measure {
                dividend: 3,
                divisor: 4,
            },
        ));
        lines.extend(notes(4, "1,"));
        lines.extend(notes(5, "1,"));
        lines.push((6, Command::End));

        let mut sink = Vec::new();
        let course = assemble(&stream(&lines), &mut sink).unwrap();
        assert_eq!(
            sink,
            vec![Diagnostic::warning(
                3,
                "#MEASURE inside a measure applies from the next measure"
            )]
        );
        let normal = course.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(
            layout(normal),
            vec![
                (EventType::Measure, 0, 0),
                (EventType::Don, 0, 0),
                (EventType::Don, 0, 1),
                (EventType::Measure, 1, 0),
                (EventType::MeasureLength, 1, 0),
                (EventType::Don, 1, 0),
            ]
        );
    }

    #[test]
    fn test_too_many_units() {
        let mut lines = vec![(1, Command::Start { player: None })];
        lines.extend((0..70_000).map(|_| (2, Command::Note('0'))));
        lines.extend(notes(2, "1,"));
        lines.push((3, Command::End));

        let mut sink = Vec::new();
        let result = assemble(&stream(&lines), &mut sink);
        assert!(matches!(
            result,
            Err(CompileError::TickOverflow { line: 2 })
        ));
        assert_eq!(
            sink,
            vec![Diagnostic::fatal(2, "chart timing is out of range")]
        );
    }
}
