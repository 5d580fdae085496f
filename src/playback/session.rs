//! Playback session state
//!
//! A session is created by the caller, threaded through the scheduler and
//! handed back at the end of a song. It replaces any process-wide counters.

use crate::error::{NotationError, WordError};
use tracing::trace;

/// Where the scheduler is within the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    #[default]
    Idle,
    Parsing,
    Playing { word_index: usize },
    LinePause,
}

/// What happened to one line
#[derive(Debug)]
pub enum LineOutcome {
    /// Blank line: one beat of silence
    Paused,
    /// Verse sung; `words` is the number of words in the line
    Sung { words: usize },
    /// Verse skipped because not every word had a note
    Rejected(NotationError),
    /// The stop signal was observed
    Stopped,
}

/// A failure confined to one word of one line
#[derive(Debug)]
pub struct WordFailure {
    pub line: usize,
    pub word_index: usize,
    pub word: String,
    pub error: WordError,
}

#[derive(Debug, Default)]
pub struct PlaybackSession {
    pub verses_sung: usize,
    pub words_spoken: usize,
    pub notes_triggered: usize,
    pub pauses: usize,
    pub lines_rejected: usize,
    pub failures: Vec<WordFailure>,
    /// Set when the song ended early on the stop signal
    pub stopped: bool,
    state: LineState,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub(crate) fn enter(&mut self, state: LineState) {
        trace!(from = ?self.state, to = ?state, "line state");
        self.state = state;
    }

    pub(crate) fn record_failure(
        &mut self,
        line: usize,
        word_index: usize,
        word: &str,
        error: impl Into<WordError>,
    ) {
        self.failures.push(WordFailure {
            line,
            word_index,
            word: word.to_string(),
            error: error.into(),
        });
    }

    /// True if the song finished without any recorded problem
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.lines_rejected == 0 && !self.stopped
    }
}
