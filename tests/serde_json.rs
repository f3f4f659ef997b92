#![cfg(feature = "serde")]

use pretty_assertions::assert_eq;
use tja_rs::{
    course::{Branch, CourseClass, Side},
    event::EventType,
    tja::{ParsedChart, compile},
};

const CHART: &str = r#"{
    "filename": "song.tja",
    "metadata": { "title": "Song", "bpm": 150.0 },
    "courses": [
        {
            "metadata": { "class": "Hard", "balloon_normal": [12] },
            "commands": [
                { "content": { "Start": { "player": null } }, "line": 5 },
                { "content": { "Note": "7" }, "line": 6 },
                { "content": { "Note": "8" }, "line": 6 },
                { "content": "EndMeasure", "line": 6 },
                { "content": "End", "line": 7 }
            ]
        }
    ]
}"#;

#[test]
fn compile_json_command_stream() {
    let chart: ParsedChart = serde_json::from_str(CHART).expect("chart must deserialize");
    let output = compile(&chart);
    assert_eq!(output.diagnostics, vec![]);

    let set = output.courseset.unwrap();
    assert_eq!(set.title(), "Song");
    let course = set.get_course(CourseClass::Hard).unwrap();
    assert_eq!(course.bpm(), 150.0);
    let section = course.get_branch(Side::Left, Branch::Normal).unwrap();
    let balloon = section
        .iter()
        .find(|e| e.event_type() == EventType::Balloon)
        .unwrap();
    assert_eq!(balloon.detail_int(), 12);
    assert_eq!(balloon.line(), 6);
}

