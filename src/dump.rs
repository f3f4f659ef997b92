//! Human readable dump of a section.
//!
//! The format is one line per event and is not a stable interface. It exists for
//! debugging and for golden tests.

use crate::{
    event::{Event, EventType, annotation},
    section::Section,
};

const ANNOTATIONS: [&str; 16] = [
    "do", "ko", "don", "don", "ka", "ka", "kat", "kat", "do", "ko", "don", "don", "ka", "ka",
    "kat", "kat",
];

fn annotation_name(detail: i32) -> &'static str {
    ANNOTATIONS[(annotation::text(detail) & 0xf) as usize]
}

fn hand(detail: i32) -> &'static str {
    if detail & annotation::HAND != 0 {
        " hand"
    } else {
        ""
    }
}

/// Writes the dump line of one event, without the line break.
///
/// # Errors
///
/// Fails only when `out` fails.
pub fn write_event(out: &mut impl std::fmt::Write, event: &Event) -> std::fmt::Result {
    let time = event.time();
    match event.event_type() {
        EventType::None => write!(out, "{time} none"),
        EventType::Don => write!(
            out,
            "{time} don annotation={}",
            annotation_name(event.detail_int())
        ),
        EventType::Kat => write!(
            out,
            "{time} kat annotation={}",
            annotation_name(event.detail_int())
        ),
        EventType::DonBig => write!(out, "{time} don_big{}", hand(event.detail_int())),
        EventType::KatBig => write!(out, "{time} kat_big{}", hand(event.detail_int())),
        EventType::Roll => write!(out, "{time} roll"),
        EventType::RollBig => write!(out, "{time} roll_big"),
        EventType::Balloon => write!(out, "{time} balloon hits={}", event.detail_int()),
        EventType::RollEnd => write!(out, "{time} roll_end"),
        EventType::Kusudama => write!(out, "{time} kusudama hits={}", event.detail_int()),
        EventType::RollCheckpoint => write!(out, "{time} roll_checkpoint"),
        EventType::Landmine => write!(
            out,
            "{time} landmine annotation={}",
            annotation_name(event.detail_int())
        ),
        EventType::Measure => {
            write!(out, "{time} measure")?;
            if let Some(flags) = event.measure_flags() {
                if !flags.real {
                    out.write_str(" fake")?;
                }
                if flags.hidden {
                    out.write_str(" hidden")?;
                }
            }
            Ok(())
        }
        EventType::GogoStart => write!(out, "{time} gogostart"),
        EventType::GogoEnd => write!(out, "{time} gogoend"),
        EventType::Scroll => write!(out, "{time} scroll mult={:.6}", event.detail_float()),
        EventType::Bpm => write!(out, "{time} bpm tempo={:.6}", event.detail_float()),
        EventType::Delay => write!(out, "{time} delay seconds={:.6}", event.detail_float()),
        EventType::BranchStart => {
            let scoring = event.branch_scoring().unwrap_or_default();
            write!(
                out,
                "{time} branch_start good={} good_big={} ok={} ok_big={} roll={} bad={}",
                scoring.good,
                scoring.good_big,
                scoring.ok,
                scoring.ok_big,
                scoring.roll,
                scoring.bad
            )
        }
        EventType::BranchJump => write!(out, "{time} branch_jump"),
        EventType::BranchCheck => {
            let thresholds = event.branch_thresholds().unwrap_or_default();
            write!(
                out,
                "{time} branch_check advanced={} master={}",
                thresholds.advanced, thresholds.master
            )
        }
        other => write!(out, "{time} intermediate type={}", other.code()),
    }
}

/// Displays every event of a section, one per line.
#[derive(Debug, Clone, Copy)]
pub struct SectionDump<'a>(pub &'a Section);

impl std::fmt::Display for SectionDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in self.0 {
            write_event(f, event)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Dumps every event of a section, one per line.
#[must_use]
pub fn section_print(section: &Section) -> String {
    SectionDump(section).to_string()
}
