//! Courses: everything playable at one difficulty.
//!
//! A [`Course`] holds a grid of two sides by three branch tiers of [`Section`]s. Which
//! cells are used depends on the style (one or two players) and on whether the course
//! is branched; lookups are normalized so that a single-player, unbranched course answers
//! every query with its one section.

use thiserror::Error;

use crate::section::{CapacityError, Section};

/// Player side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// Player one.
    Left = 0,
    /// Player two.
    Right = 1,
}

impl Side {
    /// Both sides.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Branch tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Branch {
    /// The default tier.
    Normal = 0,
    /// The middle tier.
    Advanced = 1,
    /// The hardest tier.
    Master = 2,
}

impl Branch {
    /// All tiers, easiest first.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Advanced, Self::Master];

    /// Lower-case name of the tier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Advanced => "advanced",
            Self::Master => "master",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    pub(crate) const fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How many players a course is for and how they are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Style {
    /// One player.
    #[default]
    Single,
    /// Only the second player has a chart.
    TwoPlayerOnly,
    /// Two players with their own charts and scores.
    Couple,
    /// One player playing both sides, each side scored separately.
    Double,
}

impl Style {
    /// Numeric code of the style.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Single => 0,
            Self::TwoPlayerOnly => 1,
            Self::Couple => 2,
            Self::Double => 3,
        }
    }

    /// Whether both sides carry a chart.
    #[must_use]
    pub const fn is_two_sided(self) -> bool {
        matches!(self, Self::Couple | Self::Double)
    }
}

/// The side a course was written for, until it is merged with its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PendingSide {
    /// Only the left side is known.
    Left,
    /// Only the right side is known.
    Right,
}

/// Difficulty class of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CourseClass {
    /// Easy.
    Easy = 0,
    /// Normal.
    Normal = 1,
    /// Hard.
    Hard = 2,
    /// Oni.
    #[default]
    Oni = 3,
    /// Easy, extra side.
    ExEasy = 4,
    /// Normal, extra side.
    ExNormal = 5,
    /// Hard, extra side.
    ExHard = 6,
    /// Oni, extra side.
    Ex = 7,
}

impl CourseClass {
    /// All classes in slot order.
    pub const ALL: [Self; 8] = [
        Self::Easy,
        Self::Normal,
        Self::Hard,
        Self::Oni,
        Self::ExEasy,
        Self::ExNormal,
        Self::ExHard,
        Self::Ex,
    ];

    /// Slot index of the class.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The class at a slot index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The same difficulty on the extra side.
    #[must_use]
    pub const fn to_ex(self) -> Self {
        match self {
            Self::Easy | Self::ExEasy => Self::ExEasy,
            Self::Normal | Self::ExNormal => Self::ExNormal,
            Self::Hard | Self::ExHard => Self::ExHard,
            Self::Oni | Self::Ex => Self::Ex,
        }
    }
}

/// Two courses could not be merged.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MergeError {
    /// The courses are not one left-only and one right-only course.
    #[error("courses are not one left side and one right side")]
    IncompatibleSides {
        /// The course that was offered, returned untouched.
        donor: Box<Course>,
    },
}

type Grid<T> = [[Option<T>; 3]; 2];

/// One difficulty of a song.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Course {
    class: CourseClass,
    level: f64,
    style: Style,
    pending_side: Option<PendingSide>,
    papamama: bool,
    branched: bool,
    bpm: f64,
    offset: f64,
    score_base: i32,
    score_bonus: i32,
    score_tournament: i32,
    branches: Grid<Section>,
    balloons: Grid<Vec<u32>>,
}

impl Default for Course {
    fn default() -> Self {
        Self::new()
    }
}

impl Course {
    /// Default base tempo.
    pub const DEFAULT_BPM: f64 = 130.0;

    /// Creates a course without any sections.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            class: CourseClass::Oni,
            level: 0.0,
            style: Style::Single,
            pending_side: None,
            papamama: false,
            branched: false,
            bpm: Self::DEFAULT_BPM,
            offset: 0.0,
            score_base: 0,
            score_bonus: 0,
            score_tournament: 0,
            branches: [[None, None, None], [None, None, None]],
            balloons: [[None, None, None], [None, None, None]],
        }
    }

    /// Difficulty class.
    #[must_use]
    pub const fn class(&self) -> CourseClass {
        self.class
    }

    /// Sets the difficulty class.
    pub const fn set_class(&mut self, class: CourseClass) {
        self.class = class;
    }

    /// Star rating.
    #[must_use]
    pub const fn level(&self) -> f64 {
        self.level
    }

    /// Sets the star rating.
    pub const fn set_level(&mut self, level: f64) {
        self.level = level;
    }

    /// Player style.
    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// Sets the player style.
    pub const fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    /// The side this course still waits to be merged with, if any.
    #[must_use]
    pub const fn pending_side(&self) -> Option<PendingSide> {
        self.pending_side
    }

    /// Marks the course as one side of a two-player chart.
    pub const fn set_pending_side(&mut self, side: Option<PendingSide>) {
        self.pending_side = side;
    }

    /// Whether the course is a papamama (assisted) chart.
    #[must_use]
    pub const fn papamama(&self) -> bool {
        self.papamama
    }

    /// Sets the papamama flag.
    pub const fn set_papamama(&mut self, papamama: bool) {
        self.papamama = papamama;
    }

    /// Whether the course has three branch tiers.
    #[must_use]
    pub const fn branched(&self) -> bool {
        self.branched
    }

    /// Base tempo.
    #[must_use]
    pub const fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Sets the base tempo.
    pub const fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    /// Audio offset in seconds.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Sets the audio offset.
    pub const fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    /// Points per note.
    #[must_use]
    pub const fn score_base(&self) -> i32 {
        self.score_base
    }

    /// Combo bonus points.
    #[must_use]
    pub const fn score_bonus(&self) -> i32 {
        self.score_bonus
    }

    /// Points per note in tournament scoring.
    #[must_use]
    pub const fn score_tournament(&self) -> i32 {
        self.score_tournament
    }

    /// Sets the score parameters.
    pub const fn set_scores(&mut self, base: i32, bonus: i32, tournament: i32) {
        self.score_base = base;
        self.score_bonus = bonus;
        self.score_tournament = tournament;
    }

    const fn slot(&self, side: Side, branch: Branch) -> (usize, usize) {
        let side = match self.style {
            Style::Single => Side::Left,
            _ => side,
        };
        let branch = if self.branched {
            branch
        } else {
            Branch::Normal
        };
        (side.index(), branch.index())
    }

    /// The section at a side and tier, after normalization.
    #[must_use]
    pub fn get_branch(&self, side: Side, branch: Branch) -> Option<&Section> {
        let (side, branch) = self.slot(side, branch);
        self.branches[side][branch].as_ref()
    }

    /// Mutable access to the section at a side and tier, after normalization.
    pub fn get_branch_mut(&mut self, side: Side, branch: Branch) -> Option<&mut Section> {
        let (side, branch) = self.slot(side, branch);
        self.branches[side][branch].as_mut()
    }

    /// Iterates every attached section with its raw slot.
    pub fn sections(&self) -> impl Iterator<Item = (Side, Branch, &Section)> {
        Side::ALL.into_iter().flat_map(move |side| {
            Branch::ALL.into_iter().filter_map(move |branch| {
                self.branches[side.index()][branch.index()]
                    .as_ref()
                    .map(|section| (side, branch, section))
            })
        })
    }

    /// Iterates every attached section mutably with its raw slot.
    pub fn sections_mut(&mut self) -> impl Iterator<Item = (Side, Branch, &mut Section)> {
        Side::ALL
            .into_iter()
            .zip(self.branches.iter_mut())
            .flat_map(|(side, row)| {
                Branch::ALL
                    .into_iter()
                    .zip(row.iter_mut())
                    .filter_map(move |(branch, slot)| {
                        slot.as_mut().map(|section| (side, branch, section))
                    })
            })
    }

    /// Copies the left normal section into the advanced and master tiers.
    ///
    /// Does nothing if the course is already branched.
    ///
    /// # Errors
    ///
    /// Fails when a copy cannot be allocated; the course is unchanged then.
    pub fn setup_branching(&mut self) -> Result<(), CapacityError> {
        if self.branched {
            return Ok(());
        }
        let left = &mut self.branches[Side::Left.index()];
        let normal = left[Branch::Normal.index()].get_or_insert_with(Section::new);
        let advanced = normal.try_clone()?;
        let master = normal.try_clone()?;
        left[Branch::Advanced.index()] = Some(advanced);
        left[Branch::Master.index()] = Some(master);
        self.branched = true;
        Ok(())
    }

    /// Puts `section` at a raw slot and returns what was there.
    ///
    /// Balloon counts buffered for the slot are applied to the new section.
    pub fn attach_branch(
        &mut self,
        mut section: Section,
        side: Side,
        branch: Branch,
    ) -> Option<Section> {
        if let Some(counts) = self.balloons[side.index()][branch.index()].take() {
            section.set_balloons(&counts);
        }
        self.branches[side.index()][branch.index()].replace(section)
    }

    /// Assigns balloon hit counts to a raw slot.
    ///
    /// If a section is attached the counts are applied now, otherwise they are kept
    /// until one is attached. Returns how many counts were applied right away.
    pub fn set_balloons(&mut self, counts: &[u32], side: Side, branch: Branch) -> usize {
        match self.branches[side.index()][branch.index()].as_mut() {
            Some(section) => section.set_balloons(counts),
            None => {
                self.balloons[side.index()][branch.index()] = Some(counts.to_vec());
                0
            }
        }
    }

    /// Balloon counts waiting for a section at a raw slot.
    #[must_use]
    pub fn pending_balloons(&self, side: Side, branch: Branch) -> Option<&[u32]> {
        self.balloons[side.index()][branch.index()].as_deref()
    }

    /// Combines a left-only and a right-only course into one two-sided course.
    ///
    /// `other` is consumed. The resulting style is the one either course had set, or
    /// [`Style::Couple`].
    ///
    /// # Errors
    ///
    /// Fails when the courses are not one left and one right side. `self` is unchanged
    /// and `other` is handed back in the error.
    pub fn merge(&mut self, mut other: Self) -> Result<(), MergeError> {
        let left = Side::Left.index();
        let right = Side::Right.index();
        let vacant = match (self.pending_side, other.pending_side) {
            (Some(PendingSide::Left), Some(PendingSide::Right)) => right,
            (Some(PendingSide::Right), Some(PendingSide::Left)) => {
                self.branches.swap(left, right);
                self.balloons.swap(left, right);
                left
            }
            _ => {
                return Err(MergeError::IncompatibleSides {
                    donor: Box::new(other),
                });
            }
        };
        self.branches[vacant] = std::mem::take(&mut other.branches[left]);
        self.balloons[vacant] = std::mem::take(&mut other.balloons[left]);
        self.branched |= other.branched;
        self.style = match (self.style, other.style) {
            (style, _) if style.is_two_sided() => style,
            (_, style) if style.is_two_sided() => style,
            _ => Style::Couple,
        };
        self.pending_side = None;
        Ok(())
    }

    /// Resolves the side marker of a course that found no counterpart.
    ///
    /// A right-only course becomes [`Style::TwoPlayerOnly`] with its sections moved to
    /// the right side. A left-only course stays a single player course.
    pub fn settle_side(&mut self) {
        if self.pending_side.take() == Some(PendingSide::Right) {
            self.branches.swap(Side::Left.index(), Side::Right.index());
            self.balloons.swap(Side::Left.index(), Side::Right.index());
            self.style = Style::TwoPlayerOnly;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::{Event, EventType};

    fn single(ty: EventType) -> Section {
        let mut section = Section::new();
        section.push(Event::new(ty, 0)).unwrap();
        section
    }

    #[test]
    fn test_lookup_normalization() {
        let mut course = Course::new();
        course.attach_branch(single(EventType::Don), Side::Left, Branch::Normal);
        let normal = course.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(course.get_branch(Side::Right, Branch::Master), Some(normal));
    }

    #[test]
    fn test_setup_branching() {
        let mut course = Course::new();
        course.attach_branch(single(EventType::Don), Side::Left, Branch::Normal);
        course.setup_branching().unwrap();
        assert!(course.branched());

        let normal = course.get_branch(Side::Left, Branch::Normal).unwrap().clone();
        for branch in Branch::ALL {
            assert_eq!(course.get_branch(Side::Left, branch), Some(&normal));
        }

        course
            .get_branch_mut(Side::Left, Branch::Master)
            .unwrap()
            .push(Event::new(EventType::Kat, 96))
            .unwrap();
        assert_eq!(course.get_branch(Side::Left, Branch::Master).unwrap().len(), 2);
        assert_eq!(course.get_branch(Side::Left, Branch::Advanced).unwrap().len(), 1);
        assert_eq!(course.get_branch(Side::Left, Branch::Normal).unwrap().len(), 1);
    }

    #[test]
    fn test_balloons_before_and_after_attach() {
        let mut course = Course::new();
        assert_eq!(course.set_balloons(&[7], Side::Left, Branch::Normal), 0);
        assert_eq!(
            course.pending_balloons(Side::Left, Branch::Normal),
            Some(&[7][..])
        );

        let old = course.attach_branch(single(EventType::Balloon), Side::Left, Branch::Normal);
        assert_eq!(old, None);
        assert_eq!(course.pending_balloons(Side::Left, Branch::Normal), None);
        let section = course.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(section.locate(0).unwrap().detail_int(), 7);

        assert_eq!(course.set_balloons(&[9], Side::Left, Branch::Normal), 1);
        let section = course.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(section.locate(0).unwrap().detail_int(), 9);
    }

    #[test]
    fn test_attach_returns_previous() {
        let mut course = Course::new();
        course.attach_branch(single(EventType::Don), Side::Left, Branch::Normal);
        let old = course
            .attach_branch(single(EventType::Kat), Side::Left, Branch::Normal)
            .unwrap();
        assert_eq!(old.locate(0).unwrap().event_type(), EventType::Don);
    }

    #[test]
    fn test_merge() {
        let mut a = Course::new();
        a.set_pending_side(Some(PendingSide::Left));
        a.attach_branch(single(EventType::Don), Side::Left, Branch::Normal);
        let mut b = Course::new();
        b.set_pending_side(Some(PendingSide::Right));
        b.attach_branch(single(EventType::Kat), Side::Left, Branch::Normal);

        a.merge(b).unwrap();
        assert_eq!(a.style(), Style::Couple);
        assert_eq!(a.pending_side(), None);
        let first = |side| {
            a.get_branch(side, Branch::Normal)
                .and_then(|section| section.locate(0))
                .map(Event::event_type)
        };
        assert_eq!(first(Side::Left), Some(EventType::Don));
        assert_eq!(first(Side::Right), Some(EventType::Kat));
    }

    #[test]
    fn test_merge_right_into_left_keeps_style() {
        let mut right = Course::new();
        right.set_pending_side(Some(PendingSide::Right));
        right.attach_branch(single(EventType::Kat), Side::Left, Branch::Normal);
        let mut left = Course::new();
        left.set_style(Style::Double);
        left.set_pending_side(Some(PendingSide::Left));
        left.attach_branch(single(EventType::Don), Side::Left, Branch::Normal);

        right.merge(left).unwrap();
        assert_eq!(right.style(), Style::Double);
        let left_first = right.get_branch(Side::Left, Branch::Normal).unwrap();
        assert_eq!(left_first.locate(0).unwrap().event_type(), EventType::Don);
        let right_first = right.get_branch(Side::Right, Branch::Normal).unwrap();
        assert_eq!(right_first.locate(0).unwrap().event_type(), EventType::Kat);
    }

    #[test]
    fn test_merge_rejects_same_side() {
        let mut a = Course::new();
        a.set_pending_side(Some(PendingSide::Left));
        let mut b = Course::new();
        b.set_pending_side(Some(PendingSide::Left));
        b.set_level(9.0);
        let Err(MergeError::IncompatibleSides { donor }) = a.merge(b) else {
            panic!("merge of two left sides must fail");
        };
        assert_eq!(donor.level(), 9.0);
        assert_eq!(a.pending_side(), Some(PendingSide::Left));
    }

    #[test]
    fn test_style_codes() {
        let codes: Vec<_> = [
            Style::Single,
            Style::TwoPlayerOnly,
            Style::Couple,
            Style::Double,
        ]
        .into_iter()
        .map(Style::code)
        .collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
        assert!(!Style::TwoPlayerOnly.is_two_sided());
    }

    #[test]
    fn test_two_player_only_lookup() {
        let mut course = Course::new();
        course.set_style(Style::TwoPlayerOnly);
        course.attach_branch(single(EventType::Kat), Side::Right, Branch::Normal);
        assert_eq!(course.get_branch(Side::Left, Branch::Normal), None);
        let right = course.get_branch(Side::Right, Branch::Master).unwrap();
        assert_eq!(right.locate(0).unwrap().event_type(), EventType::Kat);
    }

    #[test]
    fn test_settle_side() {
        let mut right = Course::new();
        right.set_pending_side(Some(PendingSide::Right));
        right.attach_branch(single(EventType::Kat), Side::Left, Branch::Normal);
        right.settle_side();
        assert_eq!(right.style(), Style::TwoPlayerOnly);
        assert_eq!(right.style().code(), 1);
        assert_eq!(right.pending_side(), None);
        assert_eq!(right.get_branch(Side::Left, Branch::Normal), None);
        assert!(right.get_branch(Side::Right, Branch::Normal).is_some());

        let mut left = Course::new();
        left.set_pending_side(Some(PendingSide::Left));
        left.attach_branch(single(EventType::Don), Side::Left, Branch::Normal);
        left.settle_side();
        assert_eq!(left.style(), Style::Single);
        assert!(left.get_branch(Side::Right, Branch::Normal).is_some());
    }
}
