//! # Player Configuration
//!
//! Everything the core needs from the outside world arrives here as plain
//! values: pacing, MIDI velocity and channel, how words are pitch-shifted,
//! how to reach a speech synthesizer, and optionally a custom scale.
//!
//! ## File Format
//! ```yaml
//! beat-ms: 1000
//! line-pause-ms: 500
//! note-hold-ms: 100
//! velocity: 100
//! channel: 0
//! pitch-shift: 20
//! pitch-follows-note: false
//! speech:
//!   command: ["espeak-ng", "-m", "-v", "{voice}", "-s", "{rate}", "--stdin"]
//!   voice: en-us
//!   rate: 175
//!   word-ms: 300
//! scale:
//!   - { letter: c, midi: 60, pitch-offset: 0 }
//! ```
//! Every key is optional; missing keys take the defaults shown above (an
//! empty speech command and the C-major reference scale).

use crate::error::{ConfigError, NoteError};
use crate::notes::{Note, NoteTable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlayerConfig {
    /// Pause for a blank line
    pub beat_ms: u64,
    /// Pause after each sung line
    pub line_pause_ms: u64,
    /// How long a note sounds before its note-off
    pub note_hold_ms: u64,
    pub velocity: u8,
    /// MIDI channel, 0-15
    pub channel: u8,
    /// Fixed speech pitch shift in percent
    pub pitch_shift: i32,
    /// Shift each word by its note's pitch offset instead of `pitch_shift`
    pub pitch_follows_note: bool,
    pub speech: SpeechConfig,
    pub scale: Option<Vec<ScaleEntry>>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            beat_ms: 1000,
            line_pause_ms: 500,
            note_hold_ms: 100,
            velocity: 100,
            channel: 0,
            pitch_shift: 20,
            pitch_follows_note: false,
            speech: SpeechConfig::default(),
            scale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SpeechConfig {
    /// Synthesizer program and arguments; `{voice}` and `{rate}` are filled in.
    /// Empty means words are only logged.
    pub command: Vec<String>,
    pub voice: String,
    pub rate: i32,
    /// Time a logged word takes when no synthesizer is configured
    pub word_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            voice: "en-us".to_string(),
            rate: 175,
            word_ms: 300,
        }
    }
}

impl SpeechConfig {
    /// Command line with placeholders substituted, or `None` if unset
    pub fn command_line(&self) -> Option<(String, Vec<String>)> {
        let (program, args) = self.command.split_first()?;
        let args = args
            .iter()
            .map(|arg| {
                arg.replace("{voice}", &self.voice)
                    .replace("{rate}", &self.rate.to_string())
            })
            .collect();
        Some((program.clone(), args))
    }
}

/// One configured scale degree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScaleEntry {
    pub letter: char,
    pub midi: u8,
    #[serde(default)]
    pub pitch_offset: i32,
    pub octave: Option<i32>,
}

impl PlayerConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let config: PlayerConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel > 15 {
            return Err(ConfigError::Invalid(format!(
                "channel must be 0-15, got {}",
                self.channel
            )));
        }
        if self.velocity > 127 {
            return Err(ConfigError::Invalid(format!(
                "velocity must be 0-127, got {}",
                self.velocity
            )));
        }
        self.note_table()
            .map_err(|e| ConfigError::Invalid(format!("scale: {}", e)))?;
        Ok(())
    }

    /// The configured scale, or the C-major reference table
    pub fn note_table(&self) -> Result<NoteTable, NoteError> {
        match &self.scale {
            None => Ok(NoteTable::c_major()),
            Some(entries) => NoteTable::from_notes(
                entries
                    .iter()
                    .map(|entry| {
                        let octave = entry.octave.unwrap_or(entry.midi as i32 / 12 - 1);
                        Note::new(entry.letter, octave, entry.midi, entry.pitch_offset)
                    })
                    .collect(),
            ),
        }
    }

    pub fn beat(&self) -> Duration {
        Duration::from_millis(self.beat_ms)
    }

    pub fn line_pause(&self) -> Duration {
        Duration::from_millis(self.line_pause_ms)
    }

    pub fn note_hold(&self) -> Duration {
        Duration::from_millis(self.note_hold_ms)
    }
}
