//! Syllables of small notes.
//!
//! Runs of small notes that are evenly and closely spaced form a group. Dons inside a
//! group alternate between "do" and "ko", kats read "ka". The last note of a group may
//! use the long form ("don", "kat") when it stands apart from its neighbours.
//!
//! Spacing is measured on screen, in 4/4 measures at the scroll speed of the later note,
//! so tempo and scroll changes between two notes are taken into account.

use num::rational::Ratio;

use crate::{
    event::{EventType, annotation},
    section::Section,
    tja::timestamp::{MeasureClock, to_f64},
};

/// Tempo assumed until the first tempo event.
const INITIAL_BPM: f64 = 120.0;

const EPSILON: f64 = 1.0 / 1024.0;

/// Notes further apart than this never group.
const NON_GROUPING: f64 = 1.0 / 6.0 - EPSILON;

/// Tolerated difference between spacings of one group.
const RELAXED_EPSILON: f64 = 1.0 / 64.0;

/// Space needed before a note for the long form.
const LONG_BEFORE: f64 = 1.0 / 32.0;

/// Space needed after a note for the long form.
const LONG_AFTER: f64 = 1.0 / 8.0;

#[derive(Debug, Clone, Copy)]
struct Note {
    index: usize,
    ty: EventType,
    /// Distance from the previous note, `None` for the first one.
    before: Option<f64>,
}

impl Note {
    const fn is_small(&self) -> bool {
        matches!(self.ty, EventType::Don | EventType::Kat)
    }
}

fn travel(last: &mut Option<Ratio<u64>>, position: Ratio<u64>, bpm: f64) -> f64 {
    match last.replace(position) {
        Some(last) if position > last => to_f64(position - last) / bpm,
        _ => 0.0,
    }
}

/// Collects every note with its on-screen distance from the previous note.
fn measure_notes(section: &Section) -> Vec<Note> {
    let mut clock = MeasureClock::new();
    let mut bpm = INITIAL_BPM;
    let mut scroll = 1.0;
    let mut last = None;
    // sum of measures over tempo since the last note
    let mut travelled = 0.0;
    let mut notes = Vec::new();

    for (index, event) in section.iter().enumerate() {
        let position = clock.advance(event);
        match event.event_type() {
            EventType::Bpm => {
                travelled += travel(&mut last, position, bpm);
                bpm = event.detail_float();
            }
            EventType::Scroll => scroll = event.detail_float(),
            EventType::Delay => travelled += event.detail_float() / 240.0,
            ty if ty.is_note() => {
                travelled += travel(&mut last, position, bpm);
                let before = (!notes.is_empty()).then(|| (scroll * bpm * travelled).abs());
                travelled = 0.0;
                notes.push(Note { index, ty, before });
            }
            _ => {}
        }
    }
    notes
}

fn close_group(section: &mut Section, notes: &[Note], group: &[usize]) {
    let Some((&last, _)) = group.split_last() else {
        return;
    };
    let mut previous_don = false;
    for (position, &k) in group.iter().enumerate() {
        let note = notes[k];
        let text = match note.ty {
            EventType::Don if position % 2 == 1 && previous_don => annotation::KO,
            EventType::Don => annotation::DO,
            _ => annotation::KA,
        };
        previous_don = note.ty == EventType::Don;
        set_text(section, note.index, text);
    }

    let note = notes[last];
    let roomy_before = note.before.is_none_or(|space| space >= LONG_BEFORE);
    let roomy_after = notes
        .get(last + 1)
        .and_then(|next| next.before)
        .is_none_or(|space| space > LONG_AFTER);
    if roomy_before && roomy_after {
        let text = match note.ty {
            EventType::Don => annotation::DON,
            _ => annotation::KAT,
        };
        set_text(section, note.index, text);
    }
}

fn set_text(section: &mut Section, index: usize, text: i32) {
    if let Some(event) = section.locate_mut(index) {
        *event = event.with_detail_int(text);
    }
}

/// Annotates every small don and kat of a section in packed time.
pub(crate) fn annotate(section: &mut Section) {
    let notes = measure_notes(section);
    let mut group: Vec<usize> = Vec::new();
    let mut spacing: Option<f64> = None;
    let mut groups = 0_usize;

    for (k, note) in notes.iter().enumerate() {
        if !note.is_small() {
            close_group(section, &notes, &group);
            groups += usize::from(!group.is_empty());
            group.clear();
            spacing = None;
            continue;
        }

        let Some(space) = note.before.filter(|_| !group.is_empty()) else {
            group.push(k);
            continue;
        };

        if space > NON_GROUPING {
            close_group(section, &notes, &group);
            groups += 1;
            group.clear();
            group.push(k);
            spacing = None;
            continue;
        }

        match spacing {
            None => {
                spacing = Some(space);
                group.push(k);
            }
            Some(established) if (space - established).abs() > RELAXED_EPSILON => {
                // a denser run takes the last note of the old group along
                let moved = (space < established && group.len() >= 2)
                    .then(|| group.pop())
                    .flatten();
                close_group(section, &notes, &group);
                groups += 1;
                group.clear();
                group.extend(moved);
                group.push(k);
                spacing = moved.map(|_| space);
            }
            Some(_) => group.push(k),
        }
    }
    close_group(section, &notes, &group);
    groups += usize::from(!group.is_empty());

    log::debug!("annotated {} notes in {groups} groups", notes.len());
}
