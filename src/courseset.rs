//! All courses of one song.

use crate::course::{Course, CourseClass, MergeError};

/// Title used when the chart names none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// File name used when the caller names none.
pub const DEFAULT_FILENAME: &str = "<unknown>";

/// Courses of a song, one slot per [`CourseClass`], with the song metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Courseset {
    title: Option<String>,
    subtitle: Option<String>,
    genre: Option<String>,
    maker: Option<String>,
    filename: Option<String>,
    audio: Option<String>,
    demo_time: f64,
    courses: [Option<Course>; 8],
}

impl Default for Courseset {
    fn default() -> Self {
        Self::new()
    }
}

impl Courseset {
    /// Creates a courseset without courses.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            title: None,
            subtitle: None,
            genre: None,
            maker: None,
            filename: None,
            audio: None,
            demo_time: f64::NAN,
            courses: [None, None, None, None, None, None, None, None],
        }
    }

    /// Song title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    /// Subtitle, empty when unset.
    #[must_use]
    pub fn subtitle(&self) -> &str {
        self.subtitle.as_deref().unwrap_or_default()
    }

    /// Genre, empty when unset.
    #[must_use]
    pub fn genre(&self) -> &str {
        self.genre.as_deref().unwrap_or_default()
    }

    /// Chart author, empty when unset.
    #[must_use]
    pub fn maker(&self) -> &str {
        self.maker.as_deref().unwrap_or_default()
    }

    /// Name of the chart file.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or(DEFAULT_FILENAME)
    }

    /// Path of the song audio, empty when unset.
    #[must_use]
    pub fn audio(&self) -> &str {
        self.audio.as_deref().unwrap_or_default()
    }

    /// Start of the song preview in seconds, NaN when unset.
    #[must_use]
    pub const fn demo_time(&self) -> f64 {
        self.demo_time
    }

    /// Sets the song title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Sets the subtitle.
    pub fn set_subtitle(&mut self, subtitle: impl Into<String>) {
        self.subtitle = Some(subtitle.into());
    }

    /// Sets the genre.
    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.genre = Some(genre.into());
    }

    /// Sets the chart author.
    pub fn set_maker(&mut self, maker: impl Into<String>) {
        self.maker = Some(maker.into());
    }

    /// Sets the chart file name.
    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = Some(filename.into());
    }

    /// Sets the audio path.
    pub fn set_audio(&mut self, audio: impl Into<String>) {
        self.audio = Some(audio.into());
    }

    /// Sets the preview start.
    pub const fn set_demo_time(&mut self, seconds: f64) {
        self.demo_time = seconds;
    }

    /// The course of a class.
    #[must_use]
    pub fn get_course(&self, class: CourseClass) -> Option<&Course> {
        self.courses[class.index()].as_ref()
    }

    /// Mutable access to the course of a class.
    pub fn get_course_mut(&mut self, class: CourseClass) -> Option<&mut Course> {
        self.courses[class.index()].as_mut()
    }

    /// Iterates the present courses, easiest class first.
    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.iter().flatten()
    }

    /// Puts a course into the slot of its class.
    ///
    /// If the slot is taken the two courses are merged into one two-player course.
    ///
    /// # Errors
    ///
    /// Fails when the occupied slot cannot be merged with `course`.
    pub fn add_course(&mut self, course: Course) -> Result<(), MergeError> {
        match &mut self.courses[course.class().index()] {
            Some(existing) => existing.merge(course),
            slot @ None => {
                *slot = Some(course);
                Ok(())
            }
        }
    }

    /// Removes and returns the course of a class.
    pub fn delete_course(&mut self, class: CourseClass) -> Option<Course> {
        self.courses[class.index()].take()
    }
}
