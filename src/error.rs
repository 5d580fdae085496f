//! # Error Types
//!
//! This module defines all error types for the singsong sequencer.
//!
//! Only a failure to set up the process (song file unreadable, config invalid,
//! note device unavailable) aborts a run. Everything raised while a song plays
//! is reported per word or per line and playback moves on.
//!
//! ## Error Types
//! - `NoteError` - Scale table lookups and transpositions
//! - `NotationError` - Annotation problems inside a lyric line
//! - `SpeechError` - Failures surfaced by the speech service
//! - `DeviceError` - Failures surfaced by the note-output device
//! - `ConfigError` - Unreadable or invalid player configuration
//! - `SingError` - Umbrella for the setup path
//!
//! ## Usage
//! ```rust
//! use singsong::{NoteError, NoteTable};
//!
//! let table = NoteTable::c_major();
//! match table.lookup('z') {
//!     Ok(note) => println!("midi {}", note.midi),
//!     Err(NoteError::NotFound(letter)) => eprintln!("no note '{}' in this scale", letter),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    /// The letter is not part of the configured scale.
    ///
    /// # Example
    /// ```
    /// # use singsong::NoteError;
    /// let err = NoteError::NotFound('z');
    /// assert_eq!(err.to_string(), "Note 'z' not found");
    /// ```
    #[error("Note '{0}' not found")]
    NotFound(char),

    /// A transposition or table entry left the MIDI range 0..=127.
    #[error("MIDI number {midi} is outside 0..=127")]
    OutOfRange { midi: i64 },

    /// A scale table was built with the same letter twice.
    #[error("Note '{0}' is defined more than once")]
    DuplicateLetter(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    /// A `[` that does not open a well-formed `[x]` annotation.
    ///
    /// The parser keeps the bracket as literal text; this variant only
    /// describes what it saw.
    #[error("Malformed annotation at column {column}")]
    MalformedAnnotation { column: usize },

    /// Some words in the line carry no annotation.
    ///
    /// # Example
    /// ```
    /// # use singsong::NotationError;
    /// let err = NotationError::Mismatch { words: 4, notes: 3 };
    /// assert_eq!(err.to_string(), "Line has 4 words but 3 notes");
    /// ```
    #[error("Line has {words} words but {notes} notes")]
    Mismatch { words: usize, notes: usize },
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("speech io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("synthesizer exited with {0}")]
    Synthesizer(String),
    #[error("speech cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("device worker has shut down")]
    Closed,
    #[error("{field} {value} is out of range")]
    InvalidValue { field: &'static str, value: u8 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors that stop a run before the first verse is sung.
#[derive(Error, Debug)]
pub enum SingError {
    #[error("Could not read song '{path}': {source}")]
    SongFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Note(#[from] NoteError),
}

/// A failure that affected a single word of a verse.
#[derive(Error, Debug)]
pub enum WordError {
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
