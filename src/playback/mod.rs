//! # Playback Module
//!
//! Sing a song: each annotated word becomes a note stab on the MIDI device
//! plus a spoken, pitch-shifted utterance of the word.
//!
//! ## Sub-modules
//! - `device` - `NoteOutput` trait, raw MIDI output, and the single-writer device worker
//! - `speech` - `SpeechService` trait plus command-line and logging implementations
//! - `session` - `PlaybackSession` counters and per-word failures
//! - `scheduler` - The line/word loop
//!
//! ## Concurrency Model
//! One driving task walks lines and words strictly in order. A word's note is
//! dispatched without waiting (the note-off runs in its own task after the hold
//! time); the word's speech is awaited before the next word starts. Notes may
//! therefore overlap, but all device writes are queued to one worker task that
//! owns the device, so the raw byte stream is never interleaved.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use singsong::playback::{
//!     spawn_device_worker, LogOutput, LogSpeech, PlaybackSession, Scheduler,
//! };
//! use singsong::{NoteTable, PlayerConfig, Song};
//!
//! # async fn run() {
//! let config = PlayerConfig::default();
//! let (device, worker) = spawn_device_worker(LogOutput);
//! let speech = Arc::new(LogSpeech::new(Duration::from_millis(300)));
//! let scheduler = Scheduler::new(NoteTable::c_major(), device, speech, &config);
//!
//! let song = Song::from_text("[c]twinkle [g]twinkle [a]little [g]star");
//! let session = scheduler.play_song(&song, PlaybackSession::new()).await;
//! assert_eq!(session.words_spoken, 4);
//!
//! // Dropping the scheduler releases the device; the worker drains and exits
//! drop(scheduler);
//! worker.await.unwrap();
//! # }
//! ```

pub mod device;
pub mod scheduler;
pub mod session;
pub mod speech;

#[cfg(test)]
mod tests;

pub use device::{
    spawn_device_worker, DeviceHandle, LogOutput, NoteCommand, NoteOutput, RawMidiOutput,
};
pub use scheduler::{PitchShift, Scheduler};
pub use session::{LineOutcome, LineState, PlaybackSession, WordFailure};
pub use speech::{CommandSpeech, LogSpeech, SpeechService};
