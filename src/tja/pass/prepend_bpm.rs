//! The course tempo at the start of every section.

use crate::{
    event::Event,
    section::{CapacityError, Section},
};

/// Puts the base tempo of the course in front of everything else.
pub(crate) fn prepend_bpm(section: &mut Section, bpm: f64) -> Result<(), CapacityError> {
    section.insert(0, Event::bpm(0, bpm))
}
