//! Chart headers and how they are applied.
//!
//! Song-level headers come before the first course; course-level headers follow them
//! and override them for that course only. Every field is optional so that records can
//! be layered with [`Metadata::update`].

use crate::{
    course::{Branch, Course, CourseClass, Style},
    courseset::Courseset,
};

/// Which side of the song select a course appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SongSide {
    /// The regular side.
    Normal,
    /// The extra side.
    Ex,
    /// Both sides.
    Both,
}

/// Header values of a chart, song-level or course-level.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Metadata {
    /// `TITLE`.
    pub title: Option<String>,
    /// `SUBTITLE`.
    pub subtitle: Option<String>,
    /// `GENRE`.
    pub genre: Option<String>,
    /// `MAKER`.
    pub maker: Option<String>,
    /// `WAVE`.
    pub audio: Option<String>,
    /// `DEMOSTART`, in seconds.
    pub demo_start: Option<f64>,
    /// `BPM`.
    pub bpm: Option<f64>,
    /// `OFFSET`, in seconds.
    pub offset: Option<f64>,
    /// `LEVEL`.
    pub level: Option<f64>,
    /// `COURSE`.
    pub class: Option<CourseClass>,
    /// `SIDE`.
    pub side: Option<SongSide>,
    /// `STYLE`.
    pub style: Option<Style>,
    /// First value of `SCOREINIT`.
    pub score_init: Option<i32>,
    /// Second value of `SCOREINIT`, used in tournament scoring.
    pub score_init_tournament: Option<i32>,
    /// `SCOREDIFF`.
    pub score_diff: Option<i32>,
    /// `PAPAMAMA`.
    pub papamama: Option<bool>,
    /// `BALLOON` or `BALLOONNOR`.
    pub balloon_normal: Option<Vec<u32>>,
    /// `BALLOONEXP`.
    pub balloon_advanced: Option<Vec<u32>>,
    /// `BALLOONMAS`.
    pub balloon_master: Option<Vec<u32>>,
}

fn overlay<T>(dst: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dst = src;
    }
}

impl Metadata {
    /// Overrides every field set in `updates`.
    pub fn update(&mut self, updates: Self) {
        overlay(&mut self.title, updates.title);
        overlay(&mut self.subtitle, updates.subtitle);
        overlay(&mut self.genre, updates.genre);
        overlay(&mut self.maker, updates.maker);
        overlay(&mut self.audio, updates.audio);
        overlay(&mut self.demo_start, updates.demo_start);
        overlay(&mut self.bpm, updates.bpm);
        overlay(&mut self.offset, updates.offset);
        overlay(&mut self.level, updates.level);
        overlay(&mut self.class, updates.class);
        overlay(&mut self.side, updates.side);
        overlay(&mut self.style, updates.style);
        overlay(&mut self.score_init, updates.score_init);
        overlay(&mut self.score_init_tournament, updates.score_init_tournament);
        overlay(&mut self.score_diff, updates.score_diff);
        overlay(&mut self.papamama, updates.papamama);
        overlay(&mut self.balloon_normal, updates.balloon_normal);
        overlay(&mut self.balloon_advanced, updates.balloon_advanced);
        overlay(&mut self.balloon_master, updates.balloon_master);
    }

    /// Class of the course, moved to the extra side when `SIDE` says so.
    #[must_use]
    pub fn course_class(&self) -> CourseClass {
        let class = self.class.unwrap_or_default();
        match self.side {
            Some(SongSide::Ex) => class.to_ex(),
            _ => class,
        }
    }

    /// Balloon counts for a tier. Tiers without their own list use the normal one.
    #[must_use]
    pub fn balloons(&self, branch: Branch) -> Option<&[u32]> {
        let own = match branch {
            Branch::Normal => &self.balloon_normal,
            Branch::Advanced => &self.balloon_advanced,
            Branch::Master => &self.balloon_master,
        };
        own.as_ref().or(self.balloon_normal.as_ref()).map(Vec::as_slice)
    }

    /// Copies the song-level fields into a courseset.
    ///
    /// The preview start is only set once.
    pub fn apply_to_courseset(&self, set: &mut Courseset) {
        if let Some(title) = &self.title {
            set.set_title(title.as_str());
        }
        if let Some(subtitle) = &self.subtitle {
            set.set_subtitle(subtitle.as_str());
        }
        if let Some(genre) = &self.genre {
            set.set_genre(genre.as_str());
        }
        if let Some(maker) = &self.maker {
            set.set_maker(maker.as_str());
        }
        if let Some(audio) = &self.audio {
            set.set_audio(audio.as_str());
        }
        if let Some(demo_start) = self.demo_start
            && set.demo_time().is_nan()
        {
            set.set_demo_time(demo_start);
        }
    }

    /// Copies the course-level fields into a course. Balloons are not touched.
    pub fn apply_to_course(&self, course: &mut Course) {
        course.set_class(self.course_class());
        if let Some(level) = self.level {
            course.set_level(level);
        }
        if let Some(bpm) = self.bpm {
            course.set_bpm(bpm);
        }
        if let Some(offset) = self.offset {
            course.set_offset(offset);
        }
        if let Some(style) = self.style {
            course.set_style(style);
        }
        course.set_papamama(self.papamama.unwrap_or(false));

        let mut base = course.score_base();
        let mut bonus = course.score_bonus();
        let mut tournament = course.score_tournament();
        if let Some(init) = self.score_init.filter(|&init| init != 0) {
            base = init;
            if let Some(diff) = self.score_diff.filter(|&diff| diff != 0) {
                bonus = diff;
            }
        }
        if let Some(init) = self.score_init_tournament.filter(|&init| init != 0) {
            tournament = init;
        }
        course.set_scores(base, bonus, tournament);
    }
}

/// Reads a `COURSE` value. Unknown values mean oni.
#[must_use]
pub fn interpret_class(text: &str) -> CourseClass {
    const NUMERIC: [CourseClass; 5] = [
        CourseClass::Easy,
        CourseClass::Normal,
        CourseClass::Hard,
        CourseClass::Oni,
        CourseClass::Ex,
    ];
    let text = text.trim();
    if let Ok(code) = text.parse::<usize>() {
        return NUMERIC.get(code).copied().unwrap_or_default();
    }
    [
        ("easy", CourseClass::Easy),
        ("normal", CourseClass::Normal),
        ("hard", CourseClass::Hard),
        ("oni", CourseClass::Oni),
        ("edit", CourseClass::Ex),
    ]
    .into_iter()
    .find_map(|(name, class)| name.eq_ignore_ascii_case(text).then_some(class))
    .unwrap_or_default()
}

/// Reads a `SIDE` value. Unknown values mean the regular side.
#[must_use]
pub fn interpret_side(text: &str) -> SongSide {
    let text = text.trim();
    if text == "2" || text.eq_ignore_ascii_case("ex") {
        SongSide::Ex
    } else if text == "3" || text.eq_ignore_ascii_case("both") {
        SongSide::Both
    } else {
        SongSide::Normal
    }
}

/// Reads a `STYLE` value. Unknown values mean a single player.
#[must_use]
pub fn interpret_style(text: &str) -> Style {
    let text = text.trim();
    if text == "2" || text.eq_ignore_ascii_case("double") {
        Style::Double
    } else if text.eq_ignore_ascii_case("couple") {
        Style::Couple
    } else {
        Style::Single
    }
}
