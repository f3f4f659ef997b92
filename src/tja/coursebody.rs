//! Assembly of a course from its common and branched parts.

use crate::{
    course::{Branch, Course, Side},
    event::{Event, EventType},
    section::{CapacityError, Section},
};

use super::{
    CompileError, Result,
    branched::Branched,
    segment::Segment,
    timestamp::{measure_of, saturate_u16, set_measure, stamp},
};

/// A course under construction, with the number of measures read so far.
#[derive(Debug, Clone)]
pub struct CourseBody {
    course: Course,
    measures: u16,
    levelhold: u8,
}

fn add_measures(measures: u16, by: u16, line: u32) -> Result<u16> {
    measures
        .checked_add(by)
        .ok_or(CompileError::TickOverflow { line })
}

fn offset_measures(section: &mut Section, by: u16) -> Result<()> {
    for event in section.events_mut() {
        let measure = add_measures(measure_of(event.time()), by, u32::from(event.line()))?;
        set_measure(event, measure);
    }
    Ok(())
}

impl CourseBody {
    /// Creates a course with an empty left normal section.
    ///
    /// # Errors
    ///
    /// Fails when the section storage cannot be allocated.
    pub fn new() -> Result<Self, CapacityError> {
        let mut course = Course::new();
        course.attach_branch(Section::with_initial_capacity()?, Side::Left, Branch::Normal);
        Ok(Self {
            course,
            measures: 0,
            levelhold: 0,
        })
    }

    /// The course built so far.
    #[must_use]
    pub const fn course(&self) -> &Course {
        &self.course
    }

    /// Finishes assembly.
    #[must_use]
    pub fn into_course(self) -> Course {
        self.course
    }

    /// Measures read so far.
    #[must_use]
    pub const fn measures(&self) -> u16 {
        self.measures
    }

    /// Bit mask of tiers on which branch conditions are no longer inserted.
    #[must_use]
    pub const fn levelhold(&self) -> u8 {
        self.levelhold
    }

    /// Appends a part shared by every tier.
    ///
    /// A level hold in the shared part holds every tier from then on.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow, or when the course gets more measures
    /// than a packed time can index.
    pub fn append_common(&mut self, common: Segment) -> Result<()> {
        let (mut section, measures, levelhold) = common.into_parts();
        let line = section.iter().last().map_or(0, |event| u32::from(event.line()));
        offset_measures(&mut section, self.measures)?;
        self.measures = add_measures(self.measures, measures, line)?;
        if levelhold {
            self.levelhold = u8::MAX;
        }

        let tiers: &[Branch] = if self.course.branched() {
            &Branch::ALL
        } else {
            &[Branch::Normal]
        };
        for &branch in tiers {
            if let Some(target) = self.course.get_branch_mut(Side::Left, branch) {
                target.concat(&section)?;
            }
        }
        Ok(())
    }

    /// Appends a branch point.
    ///
    /// Every tier without a level hold gets the condition and thresholds of the branch
    /// point at its first measure, for the branch compiler to pick up.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow, or when the course gets more measures
    /// than a packed time can index.
    pub fn append_branched(&mut self, branched: Branched) -> Result<()> {
        self.course.setup_branching()?;

        let start_line = branched.line();
        let line = saturate_u16(start_line);
        let mut branch_type = Event::new(EventType::BranchType, 0)
            .with_detail_int(branched.branch_type().code())
            .with_line(line);
        let mut threshold = Event::new(EventType::BranchThreshold, 0)
            .with_thresholds(branched.thresholds())
            .with_line(line);
        stamp(&mut branch_type, self.measures, 0);
        stamp(&mut threshold, self.measures, 0);

        let measures = branched.measures();
        let levelhold = branched.levelhold();
        for (branch, mut section) in Branch::ALL.into_iter().zip(branched.into_sections()) {
            offset_measures(&mut section, self.measures)?;
            let held = self.levelhold & branch.bit() != 0;
            let Some(target) = self.course.get_branch_mut(Side::Left, branch) else {
                continue;
            };
            if !held {
                target.push_many(&[branch_type, threshold])?;
            }
            target.concat(&section)?;
        }

        self.measures = add_measures(self.measures, measures, start_line)?;
        self.levelhold |= levelhold;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        event::BranchThresholds,
        tja::{branchtype::BranchType, events::EventsAccumulator},
    };

    fn segment(notes: &[&str], levelhold: bool) -> Segment {
        let mut segment = Segment::new();
        let mut acc = EventsAccumulator::new();
        let mut sink = Vec::new();
        if levelhold {
            acc.push_event(Event::new(EventType::LevelHold, 0)).unwrap();
        }
        for measure in notes {
            for note in measure.chars() {
                acc.push_note(note, 1, &mut sink).unwrap();
            }
            segment.push_barline(acc.units(), 1).unwrap();
            segment.push_events(&mut acc).unwrap();
            segment.finish_measure(1).unwrap();
            acc.clear();
        }
        segment
    }

    fn branch_point(levelhold_master: bool) -> Branched {
        let thresholds = BranchThresholds {
            advanced: 5,
            master: 10,
        };
        let mut branched = Branched::new(BranchType::Roll, thresholds, 9);
        branched.assign(Branch::Normal, &segment(&["1"], false)).unwrap();
        branched.assign(Branch::Advanced, &segment(&["2"], false)).unwrap();
        branched
            .assign(Branch::Master, &segment(&["3"], levelhold_master))
            .unwrap();
        branched
    }

    fn layout(body: &CourseBody, branch: Branch) -> Vec<(EventType, u16)> {
        body.course()
            .get_branch(Side::Left, branch)
            .unwrap()
            .iter()
            .map(|e| (e.event_type(), measure_of(e.time())))
            .collect()
    }

    #[test]
    fn test_common_only() {
        let mut body = CourseBody::new().unwrap();
        body.append_common(segment(&["1", "2"], false)).unwrap();
        body.append_common(segment(&["3"], false)).unwrap();
        assert_eq!(body.measures(), 3);
        assert!(!body.course().branched());
        assert_eq!(
            layout(&body, Branch::Normal),
            vec![
                (EventType::Measure, 0),
                (EventType::Don, 0),
                (EventType::Measure, 1),
                (EventType::Kat, 1),
                (EventType::Measure, 2),
                (EventType::DonBig, 2),
            ]
        );
    }

    #[test]
    fn test_branched_after_common() {
        let mut body = CourseBody::new().unwrap();
        body.append_common(segment(&["1"], false)).unwrap();
        body.append_branched(branch_point(false)).unwrap();
        body.append_common(segment(&["4"], false)).unwrap();
        assert!(body.course().branched());
        assert_eq!(body.measures(), 3);
        assert_eq!(
            layout(&body, Branch::Advanced),
            vec![
                (EventType::Measure, 0),
                (EventType::Don, 0),
                (EventType::BranchType, 1),
                (EventType::BranchThreshold, 1),
                (EventType::Measure, 1),
                (EventType::Kat, 1),
                (EventType::Measure, 2),
                (EventType::KatBig, 2),
            ]
        );
        let marker = body
            .course()
            .get_branch(Side::Left, Branch::Master)
            .and_then(|section| section.locate(2))
            .copied()
            .unwrap();
        assert_eq!(marker.detail_int(), BranchType::Roll.code());
        assert_eq!(marker.line(), 9);
    }

    #[test]
    fn test_levelhold_skips_later_conditions() {
        let mut body = CourseBody::new().unwrap();
        body.append_branched(branch_point(true)).unwrap();
        body.append_branched(branch_point(false)).unwrap();
        let count = |body: &CourseBody, branch| {
            layout(body, branch)
                .iter()
                .filter(|(ty, _)| *ty == EventType::BranchType)
                .count()
        };
        assert_eq!(count(&body, Branch::Normal), 2);
        assert_eq!(count(&body, Branch::Master), 1);

        body.append_common(segment(&["1"], true)).unwrap();
        body.append_branched(branch_point(false)).unwrap();
        assert_eq!(count(&body, Branch::Normal), 2);
    }

    #[test]
    fn test_measure_overflow() {
        let mut long = Segment::new();
        for _ in 0..u16::MAX {
            long.finish_measure(1).unwrap();
        }
        let mut body = CourseBody::new().unwrap();
        body.append_common(long).unwrap();
        assert_eq!(body.measures(), u16::MAX);

        let result = body.append_common(segment(&["1"], false));
        assert!(matches!(
            result,
            Err(CompileError::TickOverflow { line: 1 })
        ));
    }
}
