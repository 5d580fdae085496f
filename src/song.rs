//! # Song Model
//!
//! A song is an ordered list of raw lyric lines. A blank line is a deliberate
//! pause, not a verse.
//!
//! Songs come from a flat text file or from lines typed at a prompt. When a
//! prompted line is left empty, the matching line of the default verse is used
//! instead.

use crate::error::SingError;
use crate::parser::parse_line;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// The verse used for prompted lines left blank
pub const DEFAULT_VERSE: [&str; 6] = [
    "[c]twinkle [g]twinkle [a]little [g]star",
    "[f]how [f]I [e]wonder [d]what [d]you [c]are",
    "[g]up [f]above [f]the [e]cloud [e]so [d]high",
    "[g]like [g]a [f]diamond [e]in [e]the [d]sky",
    "[c]twinkle [g]twinkle [a]little [g]star",
    "[f]how [f]I [e]wonder [d]what [d]you [c]are",
];

/// How a raw line is played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Pause,
    Verse,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Song {
    lines: Vec<String>,
}

impl Song {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split song text into lines.
    ///
    /// Uses `str::lines`, so `\r\n` endings are accepted and a trailing
    /// newline does not add a pause at the end.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SingError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SingError::SongFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_text(&text))
    }

    /// Ask for `count` lines, one prompt per line.
    ///
    /// An empty answer (or end of input) takes the default verse line at the
    /// same position and echoes it back. Past the sixth line the default verse
    /// wraps around.
    pub fn prompt<R: BufRead, W: Write>(
        mut input: R,
        mut output: W,
        count: usize,
    ) -> io::Result<Self> {
        writeln!(output, "Please enter music to \"sing\" - lines 1-{}", count)?;
        writeln!(output, "Tip: leave a line empty to use the default verse")?;

        let mut lines = Vec::with_capacity(count);
        for i in 0..count {
            writeln!(output, "Line {}: ", i + 1)?;
            output.flush()?;

            let mut answer = String::new();
            input.read_line(&mut answer)?;
            let answer = answer.trim_end_matches(&['\r', '\n'][..]);

            if answer.is_empty() {
                let default = DEFAULT_VERSE[i % DEFAULT_VERSE.len()];
                writeln!(output, "{}", default)?;
                lines.push(default.to_string());
            } else {
                lines.push(answer.to_string());
            }
        }

        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines that will be sung rather than paused on
    pub fn verse_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line_kind(line) == LineKind::Verse)
            .count()
    }
}

/// Classify a raw line the way the scheduler plays it: a line with no words
/// pauses, even if it carries annotations.
pub fn line_kind(line: &str) -> LineKind {
    if parse_line(line).is_pause() {
        LineKind::Pause
    } else {
        LineKind::Verse
    }
}
