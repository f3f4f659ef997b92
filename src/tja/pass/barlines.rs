//! Barline visibility.

use crate::{
    event::{Event, EventType, Payload},
    section::Section,
};

fn set_hidden(event: &mut Event, hidden: bool) {
    if let Payload::Measure(flags) = event.payload_mut()
        && flags.real
    {
        flags.hidden = hidden;
    }
}

/// Applies `#BARLINEOFF` / `#BARLINEON` to the barlines that follow them.
///
/// A toggle at the start of a measure also covers the barline of that measure. Padding
/// barlines stay hidden either way.
pub(crate) fn barlines(section: &mut Section) {
    let mut visible = true;
    let mut barline: Option<&mut Event> = None;

    for event in section.events_mut() {
        match event.event_type() {
            toggle @ (EventType::BarlineOff | EventType::BarlineOn) => {
                visible = toggle == EventType::BarlineOn;
                if let Some(measure) = barline.as_deref_mut()
                    && measure.time() == event.time()
                {
                    set_hidden(measure, !visible);
                }
                event.delete();
            }
            EventType::Measure => {
                set_hidden(event, !visible);
                barline = Some(event);
            }
            _ => {}
        }
    }
}
