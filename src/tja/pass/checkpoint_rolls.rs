//! Nesting inside rolls.
//!
//! While a roll is open, a kusudama or checkpoint glyph marks a checkpoint of that roll,
//! and another roll opener is dropped. Any other note ends the roll without a proper end:
//! the roll is dropped with a warning.

use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    event::{EventType, Payload},
    section::Section,
};

fn unterminated(section: &mut Section, head: usize, sink: &mut impl DiagnosticSink) {
    if let Some(event) = section.locate_mut(head) {
        sink.diagnose(Diagnostic::warning(
            u32::from(event.line()),
            "drum roll does not terminate",
        ));
        event.delete();
    }
}

pub(crate) fn checkpoint_rolls(section: &mut Section, sink: &mut impl DiagnosticSink) {
    let mut head: Option<usize> = None;

    for index in 0..section.len() {
        let Some(ty) = section
            .locate(index)
            .map(|event| event.event_type())
            .filter(|ty| ty.is_note())
        else {
            continue;
        };

        match (head, ty) {
            (Some(_), EventType::Roll | EventType::RollBig | EventType::Balloon) => {
                if let Some(event) = section.locate_mut(index) {
                    log::trace!("dropping roll nested at line {}", event.line());
                    event.delete();
                }
            }
            (Some(_), EventType::RollCheckpoint | EventType::Kusudama) => {
                if let Some(event) = section.locate_mut(index) {
                    event.set_type(EventType::RollCheckpoint);
                    *event.payload_mut() = Payload::None;
                }
            }
            (Some(_), EventType::RollEnd) => head = None,
            (Some(open), _) => {
                unterminated(section, open, sink);
                head = None;
            }
            (None, ty) if ty.is_roll() => head = Some(index),
            (None, _) => {}
        }
    }

    if let Some(open) = head {
        unterminated(section, open, sink);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::Event;

    fn run(types: &[EventType]) -> (Vec<EventType>, Vec<Diagnostic>) {
        let mut section = Section::new();
        for (time, &ty) in types.iter().enumerate() {
            section
                .push(Event::new(ty, time as u32).with_line(time as u16 + 1))
                .unwrap();
        }
        let mut sink = Vec::new();
        checkpoint_rolls(&mut section, &mut sink);
        (section.iter().map(Event::event_type).collect(), sink)
    }

    #[test]
    fn test_kusudama_checkpoints() {
        use EventType as T;
        let (types, diagnostics) = run(&[
            T::Measure,
            T::Balloon,
            T::RollEnd,
            T::Measure,
            T::Kusudama,
            T::Kusudama,
            T::Kusudama,
            T::RollEnd,
        ]);
        assert_eq!(
            types,
            vec![
                T::Measure,
                T::Balloon,
                T::RollEnd,
                T::Measure,
                T::Kusudama,
                T::RollCheckpoint,
                T::RollCheckpoint,
                T::RollEnd
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_nested_roll_is_dropped() {
        use EventType as T;
        let (types, _) = run(&[T::Roll, T::Balloon, T::RollBig, T::RollEnd]);
        assert_eq!(types, vec![T::Roll, T::None, T::None, T::RollEnd]);
    }

    #[test]
    fn test_interrupted_roll_warns() {
        use EventType as T;
        let (types, diagnostics) = run(&[T::Roll, T::Don, T::Kat, T::RollEnd]);
        assert_eq!(types, vec![T::None, T::Don, T::Kat, T::RollEnd]);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::warning(1, "drum roll does not terminate")]
        );
    }

    #[test]
    fn test_open_roll_at_end_warns() {
        use EventType as T;
        let (types, diagnostics) = run(&[T::Don, T::RollBig, T::Measure]);
        assert_eq!(types, vec![T::Don, T::None, T::Measure]);
        assert_eq!(diagnostics.len(), 1);
    }
}
