//! Final ordering of a section.

use crate::{event::EventType, section::Section};

/// Sorts the events by time and type and drops deleted ones.
///
/// Deleted events are sorted behind every live event and cut off, so the relative order
/// of live events with equal keys is kept. Leftover intermediate events count as deleted.
pub(crate) fn cleanup(section: &mut Section) {
    let dead = |ty: EventType| ty == EventType::None || ty.is_intermediate();

    let events = section.events_vec_mut();
    events.sort_by(|a, b| {
        dead(a.event_type())
            .cmp(&dead(b.event_type()))
            .then_with(|| a.compare(b))
    });
    let live = events
        .iter()
        .rposition(|event| !dead(event.event_type()))
        .map_or(0, |last| last + 1);
    let dropped = events.len() - live;
    events.truncate(live);

    if dropped > 0 {
        log::trace!("dropped {dropped} deleted events");
    }
}
