//! The three tiers of one branch point.
//!
//! Each tier is read into its own [`Segment`] and assigned here. Tiers of unequal
//! length are padded with fake barlines so that all three end on the same measure.

use crate::{
    course::Branch,
    event::{BranchThresholds, Event, MeasureFlags},
    section::{CapacityError, Section},
};

use super::{branchtype::BranchType, segment::Segment, timestamp::stamp};

/// Tiers collected between a branch start and its end.
#[derive(Debug, Clone, Default)]
pub struct Branched {
    branches: [Section; 3],
    branch_type: BranchType,
    thresholds: BranchThresholds,
    measures: u16,
    levelhold: u8,
    line: u32,
}

impl Branched {
    /// Starts a branch point. `thresholds` are already converted for `branch_type`.
    #[must_use]
    pub fn new(branch_type: BranchType, thresholds: BranchThresholds, line: u32) -> Self {
        Self {
            branch_type,
            thresholds,
            line,
            ..Self::default()
        }
    }

    /// Condition of the branch point.
    #[must_use]
    pub const fn branch_type(&self) -> BranchType {
        self.branch_type
    }

    /// Stored thresholds of the branch point.
    #[must_use]
    pub const fn thresholds(&self) -> BranchThresholds {
        self.thresholds
    }

    /// Source line of the branch start.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Length of the longest tier in measures.
    #[must_use]
    pub const fn measures(&self) -> u16 {
        self.measures
    }

    /// Bit mask of tiers that requested a level hold, indexed by [`Branch`].
    #[must_use]
    pub const fn levelhold(&self) -> u8 {
        self.levelhold
    }

    /// Events of a tier.
    #[must_use]
    pub fn section(&self, branch: Branch) -> &Section {
        &self.branches[branch.index()]
    }

    pub(crate) fn into_sections(self) -> [Section; 3] {
        self.branches
    }

    /// Replaces the content of a tier with a segment and evens out the tier lengths.
    ///
    /// # Errors
    ///
    /// Fails when the event storage cannot grow.
    pub fn assign(&mut self, branch: Branch, segment: &Segment) -> Result<(), CapacityError> {
        let section = &mut self.branches[branch.index()];
        section.clear();
        section.concat(segment.section())?;
        if segment.levelhold() {
            self.levelhold |= branch.bit();
        }
        self.pad_measures(branch, segment.measures())
    }

    fn pad_measures(&mut self, branch: Branch, measures: u16) -> Result<(), CapacityError> {
        use std::cmp::Ordering;

        match self.measures.cmp(&measures) {
            Ordering::Equal => Ok(()),
            Ordering::Greater => {
                pad_section(&mut self.branches[branch.index()], measures, self.measures)
            }
            Ordering::Less => {
                for other in Branch::ALL.into_iter().filter(|&other| other != branch) {
                    pad_section(&mut self.branches[other.index()], self.measures, measures)?;
                }
                log::trace!(
                    "branch {branch} extends the branch point to {measures} measures"
                );
                self.measures = measures;
                Ok(())
            }
        }
    }
}

fn pad_section(section: &mut Section, from: u16, to: u16) -> Result<(), CapacityError> {
    for measure in from..to {
        let mut barline = Event::measure(0).with_measure_flags(MeasureFlags::FAKE);
        stamp(&mut barline, measure, 0);
        section.push(barline)?;
    }
    Ok(())
}
