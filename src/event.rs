//! Chart events.
//!
//! An [`Event`] is one time-stamped record of a branch [`Section`](crate::section::Section):
//! a note the player hits, or a control event such as a barline or a tempo change.
//!
//! The type of an event decides which [`Payload`] it carries. Accessors such as
//! [`Event::detail_int`] return a "no value" sentinel when asked for a payload the type
//! does not have, so callers never have to check the type first.

use std::cmp::Ordering;

/// Text annotations carried by small notes and landmines.
///
/// The annotation tells a renderer which syllable to show under the note.
pub mod annotation {
    /// Short don, the first of a pair.
    pub const DO: i32 = 0;
    /// Short don, the second of a pair.
    pub const KO: i32 = 1;
    /// Long-form don.
    pub const DON: i32 = 2;
    /// Short ka.
    pub const KA: i32 = 4;
    /// Long-form ka.
    pub const KAT: i32 = 6;

    /// Flag set on big notes that must be hit with both hands.
    pub const HAND: i32 = 16;

    /// Extracts the text part of an integer detail, dropping flags.
    #[must_use]
    pub const fn text(detail: i32) -> i32 {
        detail & (i32::MIN | 0xf)
    }
}

/// Type of an [`Event`].
///
/// Positive codes are interactive notes, negative codes are control events. The codes
/// from `-0x10001` downwards only exist while a chart is being compiled and never appear
/// in a finished section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum EventType {
    /// A deleted event.
    None = 0,
    /// Red note.
    Don = 1,
    /// Blue note.
    Kat = 2,
    /// Big red note.
    DonBig = 3,
    /// Big blue note.
    KatBig = 4,
    /// Start of a drum roll.
    Roll = 5,
    /// Start of a big drum roll.
    RollBig = 6,
    /// Start of a balloon.
    Balloon = 7,
    /// End of any roll.
    RollEnd = 8,
    /// Start of a kusudama.
    Kusudama = 9,
    /// Checkpoint inside an open roll.
    RollCheckpoint = 10,
    /// A note that must not be hit.
    Landmine = 11,
    /// Barline.
    Measure = -1,
    /// Start of go-go time.
    GogoStart = -17,
    /// End of go-go time.
    GogoEnd = -32,
    /// Scroll speed change.
    Scroll = -33,
    /// Tempo change.
    Bpm = -49,
    /// Pause of the chart clock.
    Delay = -50,
    /// Start of a scored branch section.
    BranchStart = -65,
    /// The point where the branch is switched.
    BranchJump = -66,
    /// The point where the branch condition is evaluated.
    BranchCheck = -67,
    /// Intermediate: time signature override of the current measure.
    MeasureLength = -0x10001,
    /// Intermediate: raw branch thresholds.
    BranchThreshold = -0x10002,
    /// Intermediate: raw branch condition type.
    BranchType = -0x10003,
    /// Intermediate: stay on the current branch from here on.
    LevelHold = -0x10004,
    /// Intermediate: hide barlines from here on.
    BarlineOff = -0x10005,
    /// Intermediate: show barlines from here on.
    BarlineOn = -0x10006,
}

impl EventType {
    /// Every type, in code order.
    pub const ALL: [Self; 27] = [
        Self::BarlineOn,
        Self::BarlineOff,
        Self::LevelHold,
        Self::BranchType,
        Self::BranchThreshold,
        Self::MeasureLength,
        Self::BranchCheck,
        Self::BranchJump,
        Self::BranchStart,
        Self::Delay,
        Self::Bpm,
        Self::Scroll,
        Self::GogoEnd,
        Self::GogoStart,
        Self::Measure,
        Self::None,
        Self::Don,
        Self::Kat,
        Self::DonBig,
        Self::KatBig,
        Self::Roll,
        Self::RollBig,
        Self::Balloon,
        Self::RollEnd,
        Self::Kusudama,
        Self::RollCheckpoint,
        Self::Landmine,
    ];

    /// Returns the numeric type code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks up a type by its numeric code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }

    /// Whether the type is an interactive note.
    #[must_use]
    pub const fn is_note(self) -> bool {
        self.code() > 0
    }

    /// Whether the type is a don or kat of either size.
    #[must_use]
    pub const fn is_normal_note(self) -> bool {
        matches!(self, Self::Don | Self::Kat | Self::DonBig | Self::KatBig)
    }

    /// Whether the type opens a roll.
    #[must_use]
    pub const fn is_roll(self) -> bool {
        matches!(
            self,
            Self::Roll | Self::RollBig | Self::Balloon | Self::Kusudama
        )
    }

    /// Whether the type only exists during compilation.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.code() <= Self::MeasureLength.code()
    }

    const fn has_int(self) -> bool {
        matches!(
            self,
            Self::Don
                | Self::Kat
                | Self::DonBig
                | Self::KatBig
                | Self::Balloon
                | Self::Kusudama
                | Self::Landmine
                | Self::BranchType
        )
    }

    const fn has_float(self) -> bool {
        matches!(self, Self::Bpm | Self::Scroll | Self::Delay)
    }

    const fn default_payload(self) -> Payload {
        match self {
            _ if self.has_int() => Payload::Int(0),
            _ if self.has_float() => Payload::Float(f64::NAN),
            Self::Measure => Payload::Measure(MeasureFlags::REAL),
            Self::BranchStart => Payload::Scoring(BranchScoring::ZERO),
            Self::BranchCheck | Self::BranchThreshold => {
                Payload::Thresholds(BranchThresholds::default_const())
            }
            Self::MeasureLength => Payload::MeasureLength(MeasureLength::COMMON),
            _ => Payload::None,
        }
    }
}

impl PartialOrd for EventType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(&other.code())
    }
}

/// Point values awarded during a branch section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchScoring {
    /// Points for a good hit on a small note.
    pub good: i32,
    /// Points for a good hit on a big note.
    pub good_big: i32,
    /// Points for an ok hit on a small note.
    pub ok: i32,
    /// Points for an ok hit on a big note.
    pub ok_big: i32,
    /// Points per roll hit.
    pub roll: i32,
    /// Points for a miss.
    pub bad: i32,
}

impl BranchScoring {
    /// Scoring where nothing is worth any points.
    pub const ZERO: Self = Self {
        good: 0,
        good_big: 0,
        ok: 0,
        ok_big: 0,
        roll: 0,
        bad: 0,
    };
}

/// Points needed to reach the advanced and master branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchThresholds {
    /// Points needed for the advanced branch.
    pub advanced: i32,
    /// Points needed for the master branch.
    pub master: i32,
}

impl BranchThresholds {
    const fn default_const() -> Self {
        Self {
            advanced: 0,
            master: 0,
        }
    }
}

/// Flags of a barline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasureFlags {
    /// False for barlines inserted only to pad a branch.
    pub real: bool,
    /// Whether the barline is drawn.
    pub hidden: bool,
    /// Subdivision count of the measure as written in the source. Reset to zero once the
    /// measure has been converted to ticks.
    pub units: u32,
}

impl MeasureFlags {
    /// A visible barline from the source.
    pub const REAL: Self = Self {
        real: true,
        hidden: false,
        units: 0,
    };

    /// A barline inserted for padding.
    pub const FAKE: Self = Self {
        real: false,
        hidden: true,
        units: 0,
    };
}

/// A time signature, as `dividend / divisor` of a 4/4 measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasureLength {
    /// Upper part of the signature.
    pub dividend: u32,
    /// Lower part of the signature.
    pub divisor: u32,
}

impl MeasureLength {
    /// 4/4.
    pub const COMMON: Self = Self {
        dividend: 4,
        divisor: 4,
    };
}

/// Type-specific data of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// No data.
    None,
    /// Annotation, hand flag, hit count or raw branch type.
    Int(i32),
    /// Tempo, scroll multiplier or delay in seconds.
    Float(f64),
    /// Scoring of a branch section.
    Scoring(BranchScoring),
    /// Branch thresholds.
    Thresholds(BranchThresholds),
    /// Barline flags.
    Measure(MeasureFlags),
    /// Time signature override.
    MeasureLength(MeasureLength),
}

/// A single chart event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    time: u32,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    ty: EventType,
    line: u16,
    payload: Payload,
}

impl Event {
    /// Creates an event of the given type with its default payload.
    #[must_use]
    pub const fn new(ty: EventType, time: u32) -> Self {
        Self {
            time,
            ty,
            line: 0,
            payload: ty.default_payload(),
        }
    }

    /// Creates a tempo change.
    #[must_use]
    pub const fn bpm(time: u32, bpm: f64) -> Self {
        Self::new(EventType::Bpm, time).with_detail_float(bpm)
    }

    /// Creates a barline.
    #[must_use]
    pub const fn measure(time: u32) -> Self {
        Self::new(EventType::Measure, time)
    }

    /// Sets the source line.
    #[must_use]
    pub const fn with_line(mut self, line: u16) -> Self {
        self.line = line;
        self
    }

    /// Sets the integer detail. Ignored for types without one.
    #[must_use]
    pub const fn with_detail_int(mut self, value: i32) -> Self {
        if self.ty.has_int() {
            self.payload = Payload::Int(value);
        }
        self
    }

    /// Sets the float detail. Ignored for types without one.
    #[must_use]
    pub const fn with_detail_float(mut self, value: f64) -> Self {
        if self.ty.has_float() {
            self.payload = Payload::Float(value);
        }
        self
    }

    /// Sets the scoring of a [`EventType::BranchStart`].
    #[must_use]
    pub const fn with_scoring(mut self, scoring: BranchScoring) -> Self {
        if matches!(self.ty, EventType::BranchStart) {
            self.payload = Payload::Scoring(scoring);
        }
        self
    }

    /// Sets the thresholds of a [`EventType::BranchCheck`].
    #[must_use]
    pub const fn with_thresholds(mut self, thresholds: BranchThresholds) -> Self {
        if matches!(
            self.ty,
            EventType::BranchCheck | EventType::BranchThreshold
        ) {
            self.payload = Payload::Thresholds(thresholds);
        }
        self
    }

    /// Sets the flags of a [`EventType::Measure`].
    #[must_use]
    pub const fn with_measure_flags(mut self, flags: MeasureFlags) -> Self {
        if matches!(self.ty, EventType::Measure) {
            self.payload = Payload::Measure(flags);
        }
        self
    }

    /// Sets the signature of a [`EventType::MeasureLength`].
    #[must_use]
    pub const fn with_measure_length(mut self, length: MeasureLength) -> Self {
        if matches!(self.ty, EventType::MeasureLength) {
            self.payload = Payload::MeasureLength(length);
        }
        self
    }

    /// Tick of the event.
    #[must_use]
    pub const fn time(&self) -> u32 {
        self.time
    }

    /// Type of the event.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.ty
    }

    /// Source line of the event, zero when unknown.
    #[must_use]
    pub const fn line(&self) -> u16 {
        self.line
    }

    /// The raw payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Integer detail, or `-1` when the type has none.
    ///
    /// This is the annotation of dons, kats and landmines, the hand flag of big notes,
    /// and the hit count of balloons and kusudamas.
    #[must_use]
    pub const fn detail_int(&self) -> i32 {
        match self.payload {
            Payload::Int(value) if self.ty.has_int() => value,
            _ => -1,
        }
    }

    /// Float detail, or NaN when the type has none.
    ///
    /// This is the tempo of a bpm change, the multiplier of a scroll change and the
    /// length in seconds of a delay.
    #[must_use]
    pub const fn detail_float(&self) -> f64 {
        match self.payload {
            Payload::Float(value) if self.ty.has_float() => value,
            _ => f64::NAN,
        }
    }

    /// Scoring of a branch start.
    #[must_use]
    pub const fn branch_scoring(&self) -> Option<BranchScoring> {
        match (self.ty, self.payload) {
            (EventType::BranchStart, Payload::Scoring(scoring)) => Some(scoring),
            _ => None,
        }
    }

    /// Thresholds of a branch check.
    #[must_use]
    pub const fn branch_thresholds(&self) -> Option<BranchThresholds> {
        match (self.ty, self.payload) {
            (EventType::BranchCheck, Payload::Thresholds(thresholds)) => Some(thresholds),
            _ => None,
        }
    }

    /// Flags of a barline.
    #[must_use]
    pub const fn measure_flags(&self) -> Option<MeasureFlags> {
        match (self.ty, self.payload) {
            (EventType::Measure, Payload::Measure(flags)) => Some(flags),
            _ => None,
        }
    }

    /// Whether the event is an interactive note.
    #[must_use]
    pub const fn is_note(&self) -> bool {
        self.ty.is_note()
    }

    /// Whether the event is a don or kat of either size.
    #[must_use]
    pub const fn is_normal_note(&self) -> bool {
        self.ty.is_normal_note()
    }

    /// Whether the event opens a roll.
    #[must_use]
    pub const fn is_roll(&self) -> bool {
        self.ty.is_roll()
    }

    /// Orders events by time, then by type code.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.ty.cmp(&other.ty))
    }

    pub(crate) const fn set_time(&mut self, time: u32) {
        self.time = time;
    }

    pub(crate) const fn set_type(&mut self, ty: EventType) {
        self.ty = ty;
    }

    /// Deletes the event. It is dropped by the cleanup pass.
    pub(crate) const fn delete(&mut self) {
        self.ty = EventType::None;
        self.payload = Payload::None;
    }

    pub(crate) const fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub(crate) const fn measure_length(&self) -> Option<MeasureLength> {
        match (self.ty, self.payload) {
            (EventType::MeasureLength, Payload::MeasureLength(length)) => Some(length),
            _ => None,
        }
    }

    pub(crate) const fn raw_thresholds(&self) -> Option<BranchThresholds> {
        match (self.ty, self.payload) {
            (EventType::BranchThreshold, Payload::Thresholds(thresholds)) => Some(thresholds),
            _ => None,
        }
    }
}

/// A position inside one section's events, able to step to its neighbours.
///
/// A cursor never leaves the slice it was created from.
#[derive(Debug, Clone, Copy)]
pub struct EventCursor<'a> {
    events: &'a [Event],
    index: usize,
}

impl<'a> EventCursor<'a> {
    pub(crate) fn new(events: &'a [Event], index: usize) -> Option<Self> {
        (index < events.len()).then_some(Self { events, index })
    }

    /// Index of the event in its section.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The event under the cursor.
    #[must_use]
    pub fn event(&self) -> &'a Event {
        &self.events[self.index]
    }

    /// Cursor to the next event, if any.
    #[must_use]
    pub fn following(&self) -> Option<Self> {
        Self::new(self.events, self.index + 1)
    }

    /// Cursor to the previous event, if any.
    #[must_use]
    pub fn preceding(&self) -> Option<Self> {
        let index = self.index.checked_sub(1)?;
        Self::new(self.events, index)
    }
}
