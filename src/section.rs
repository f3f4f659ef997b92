//! Event streams of a single branch.
//!
//! A [`Section`] is the playable content of one side and one branch tier of a course.
//! Besides its events it knows its tickrate, the number of ticks in a 4/4 measure, and
//! keeps a lazily built table of tempo breakpoints that converts ticks into seconds.
//!
//! Every mutation goes through one internal gateway which drops the breakpoint table,
//! so a tempo edit is always visible to the next [`Section::event_seconds`] call.

use std::{cell::OnceCell, collections::TryReserveError, time::Duration};

use gametime::TimeSpan;
use thiserror::Error;

use crate::event::{Event, EventCursor, EventType, Payload};

/// Ticks in a 4/4 measure unless rescaled.
pub const DEFAULT_TICKRATE: u32 = 96;

/// Number of events reserved by the first allocation.
pub const INITIAL_CAPACITY: usize = 256;

/// Tempo assumed before the first bpm change.
const INITIAL_BPM: f64 = 120.0;

/// Event storage could not grow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to grow event storage: {0}")]
pub struct CapacityError(#[from] pub TryReserveError);

/// Converts a tick distance into seconds at the given tempo.
#[must_use]
pub fn ticks_to_seconds(bpm: f64, ticks: i64, tickrate: u32) -> f64 {
    60.0 / bpm * 4.0 * (ticks as f64 / tickrate as f64)
}

/// A sample of the chart clock: at `tick` the clock reads `seconds` and runs at `bpm`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Breakpoint {
    /// Tick of the sample.
    pub tick: u32,
    /// Seconds elapsed at the sample.
    pub seconds: f64,
    /// Tempo from the sample onwards.
    pub bpm: f64,
}

/// An ordered stream of events for one branch.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    events: Vec<Event>,
    tickrate: u32,
    #[cfg_attr(feature = "serde", serde(skip))]
    breakpoints: OnceCell<Vec<Breakpoint>>,
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Section {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            tickrate: self.tickrate,
            breakpoints: OnceCell::new(),
        }
    }
}

impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        self.tickrate == other.tickrate && self.events == other.events
    }
}

impl Section {
    /// Creates an empty section. Storage is allocated on the first push.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Vec::new(),
            tickrate: DEFAULT_TICKRATE,
            breakpoints: OnceCell::new(),
        }
    }

    /// Creates an empty section with its initial storage already reserved.
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot be allocated.
    pub fn with_initial_capacity() -> Result<Self, CapacityError> {
        let mut events = Vec::new();
        events.try_reserve_exact(INITIAL_CAPACITY)?;
        Ok(Self {
            events,
            ..Self::new()
        })
    }

    /// Deep-copies the events. The breakpoint table is not copied.
    ///
    /// # Errors
    ///
    /// Fails when the copy cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, CapacityError> {
        let mut events = Vec::new();
        events.try_reserve_exact(self.events.len().max(INITIAL_CAPACITY))?;
        events.extend_from_slice(&self.events);
        Ok(Self {
            events,
            tickrate: self.tickrate,
            breakpoints: OnceCell::new(),
        })
    }

    /// The single mutation gateway: every `&mut` access to the events passes here.
    fn edit(&mut self) -> &mut Vec<Event> {
        self.breakpoints.take();
        &mut self.events
    }

    fn reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        let events = self.edit();
        if events.capacity() == 0 {
            events.try_reserve_exact(additional.max(INITIAL_CAPACITY))?;
        } else {
            events.try_reserve(additional)?;
        }
        Ok(())
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether there are no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events the storage holds without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    /// Ticks per 4/4 measure.
    #[must_use]
    pub const fn tickrate(&self) -> u32 {
        self.tickrate
    }

    /// Sets the ticks per 4/4 measure. Event times are left as is.
    pub fn set_tickrate(&mut self, tickrate: u32) {
        self.breakpoints.take();
        self.tickrate = tickrate;
    }

    /// All events in order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterates the events in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Mutable access to the events. Drops the breakpoint table.
    pub fn events_mut(&mut self) -> &mut [Event] {
        self.edit()
    }

    pub(crate) fn events_vec_mut(&mut self) -> &mut Vec<Event> {
        self.edit()
    }

    /// The event at `index`, if any.
    #[must_use]
    pub fn locate(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// Mutable access to the event at `index`. Drops the breakpoint table.
    pub fn locate_mut(&mut self, index: usize) -> Option<&mut Event> {
        self.edit().get_mut(index)
    }

    /// A cursor on the first event, `None` when empty.
    #[must_use]
    pub fn begin(&self) -> Option<EventCursor<'_>> {
        EventCursor::new(&self.events, 0)
    }

    /// A cursor on the event at `index`.
    #[must_use]
    pub fn cursor(&self, index: usize) -> Option<EventCursor<'_>> {
        EventCursor::new(&self.events, index)
    }

    /// Appends an event.
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot grow; the section is unchanged then.
    pub fn push(&mut self, event: Event) -> Result<(), CapacityError> {
        self.reserve(1)?;
        self.events.push(event);
        Ok(())
    }

    /// Appends events in order.
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot grow; the section is unchanged then.
    pub fn push_many(&mut self, events: &[Event]) -> Result<(), CapacityError> {
        self.reserve(events.len())?;
        self.events.extend_from_slice(events);
        Ok(())
    }

    /// Inserts an event in front of the one at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot grow.
    pub fn insert(&mut self, index: usize, event: Event) -> Result<(), CapacityError> {
        self.reserve(1)?;
        let index = index.min(self.events.len());
        self.events.insert(index, event);
        Ok(())
    }

    /// Removes the last `count` events, or all of them if there are fewer.
    pub fn pop(&mut self, count: usize) {
        let events = self.edit();
        events.truncate(events.len().saturating_sub(count));
    }

    /// Removes all events.
    pub fn clear(&mut self) {
        self.edit().clear();
    }

    /// Appends a copy of every event of `other`.
    ///
    /// # Errors
    ///
    /// Fails when the storage cannot grow.
    pub fn concat(&mut self, other: &Self) -> Result<(), CapacityError> {
        self.push_many(&other.events)
    }

    /// Shrinks the storage to the number of events, but not below the initial capacity.
    pub fn trim(&mut self) {
        let events = self.edit();
        let target = events.len().max(INITIAL_CAPACITY);
        if events.capacity() > target {
            events.shrink_to(target);
        }
    }

    /// Assigns hit counts to balloons and kusudamas in order.
    ///
    /// Balloons beyond the end of `counts` need a single hit. Returns how many counts
    /// were used.
    pub fn set_balloons(&mut self, counts: &[u32]) -> usize {
        let mut remaining = counts.iter();
        let mut consumed = 0;
        for event in self.edit() {
            if !matches!(
                event.event_type(),
                EventType::Balloon | EventType::Kusudama
            ) {
                continue;
            }
            let hits = match remaining.next() {
                Some(&hits) => {
                    consumed += 1;
                    i32::try_from(hits).unwrap_or(i32::MAX)
                }
                None => 1,
            };
            *event.payload_mut() = Payload::Int(hits);
        }
        consumed
    }

    /// The breakpoint table, built on first use.
    pub fn cache_seconds(&self) -> &[Breakpoint] {
        self.breakpoints.get_or_init(|| self.build_breakpoints())
    }

    fn build_breakpoints(&self) -> Vec<Breakpoint> {
        let mut breakpoints: Vec<Breakpoint> = Vec::new();
        let mut bpm = INITIAL_BPM;
        let mut tick = 0;
        let mut seconds = 0.0;

        for event in &self.events {
            let ty = event.event_type();
            if !matches!(ty, EventType::Bpm | EventType::Delay) {
                continue;
            }
            let delta = i64::from(event.time()) - i64::from(tick);
            seconds += ticks_to_seconds(bpm, delta, self.tickrate);
            tick = event.time();
            match ty {
                EventType::Bpm => bpm = event.detail_float(),
                _ => seconds += event.detail_float(),
            }

            let sample = Breakpoint { tick, seconds, bpm };
            match breakpoints.last_mut() {
                Some(last) if delta == 0 => *last = sample,
                _ => breakpoints.push(sample),
            }
        }
        breakpoints
    }

    /// Seconds at an arbitrary tick, NaN when the section has no tempo.
    #[must_use]
    pub fn tick_seconds(&self, tick: u32) -> f64 {
        let breakpoints = self.cache_seconds();
        if breakpoints.is_empty() {
            return f64::NAN;
        }
        let after = breakpoints.partition_point(|sample| sample.tick <= tick);
        let sample = &breakpoints[after.saturating_sub(1)];
        let delta = i64::from(tick) - i64::from(sample.tick);
        sample.seconds + ticks_to_seconds(sample.bpm, delta, self.tickrate)
    }

    /// Seconds at which `event` occurs.
    ///
    /// Returns NaN when `event` is not an element of this section, or when the section
    /// has no tempo.
    #[must_use]
    pub fn event_seconds(&self, event: &Event) -> f64 {
        let ptr: *const Event = event;
        if !self.events.as_ptr_range().contains(&ptr) {
            return f64::NAN;
        }
        self.tick_seconds(event.time())
    }

    /// [`Self::event_seconds`] as a [`TimeSpan`], `None` when it is not a finite,
    /// non-negative time.
    #[must_use]
    pub fn event_timespan(&self, event: &Event) -> Option<TimeSpan> {
        let seconds = self.event_seconds(event);
        (seconds.is_finite() && seconds >= 0.0)
            .then(|| TimeSpan::from_duration(Duration::from_secs_f64(seconds)))
    }
}

impl<'a> IntoIterator for &'a Section {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
