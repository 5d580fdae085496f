//! Playback scheduler
//!
//! Walks a song line by line. For every word it fires the word's note at the
//! device without waiting for it, then speaks the word and waits for the
//! utterance to finish before moving on.
//!
//! ## Per-line states
//! ```text
//! Idle -> Parsing -> Playing(0..N-1) -> LinePause -> Idle
//! ```
//! A line with no words goes straight to a one-beat pause. A line where some
//! word has no note is rejected: none of its words play, but it still takes
//! the inter-line pause.
//!
//! ## Failure policy
//! Nothing that happens while a song plays stops the song. A missing note, a
//! closed device or a failed utterance is recorded against that word in the
//! [`PlaybackSession`] and the word loop continues. Write errors on an open
//! device are logged by the device worker. Only the stop signal ends a song
//! early.

use crate::config::PlayerConfig;
use crate::error::{DeviceError, NotationError, SpeechError};
use crate::notes::{Note, NoteTable};
use crate::parser::parse_line;
use crate::playback::device::DeviceHandle;
use crate::playback::session::{LineOutcome, LineState, PlaybackSession};
use crate::playback::speech::SpeechService;
use crate::song::Song;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How each word's speech pitch is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchShift {
    /// Every word gets the same shift
    Fixed(i32),
    /// Each word gets its note's pitch offset; `fallback` if the note is unknown
    FollowNote { fallback: i32 },
}

impl PitchShift {
    pub fn from_config(config: &PlayerConfig) -> Self {
        if config.pitch_follows_note {
            PitchShift::FollowNote {
                fallback: config.pitch_shift,
            }
        } else {
            PitchShift::Fixed(config.pitch_shift)
        }
    }

    fn for_note(self, note: Option<&Note>) -> i32 {
        match (self, note) {
            (PitchShift::Fixed(shift), _) => shift,
            (PitchShift::FollowNote { .. }, Some(note)) => note.pitch_offset,
            (PitchShift::FollowNote { fallback }, None) => fallback,
        }
    }
}

pub struct Scheduler {
    table: NoteTable,
    device: DeviceHandle,
    speech: Arc<dyn SpeechService>,
    beat: Duration,
    line_pause: Duration,
    note_hold: Duration,
    velocity: u8,
    channel: u8,
    pitch: PitchShift,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        table: NoteTable,
        device: DeviceHandle,
        speech: Arc<dyn SpeechService>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            table,
            device,
            speech,
            beat: config.beat(),
            line_pause: config.line_pause(),
            note_hold: config.note_hold(),
            velocity: config.velocity,
            channel: config.channel,
            pitch: PitchShift::from_config(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned stop signal.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop signal observed between words, between lines and during waits
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Play every line of `song` in order, accumulating into `session`.
    pub async fn play_song(&self, song: &Song, mut session: PlaybackSession) -> PlaybackSession {
        for (index, line) in song.lines().iter().enumerate() {
            if self.cancel.is_cancelled() {
                session.stopped = true;
                break;
            }

            match self.play_line(index, line, &mut session).await {
                LineOutcome::Stopped => {
                    session.stopped = true;
                    break;
                }
                LineOutcome::Rejected(e) => {
                    warn!(verse = index, error = %e, "verse skipped");
                }
                LineOutcome::Paused | LineOutcome::Sung { .. } => {}
            }
        }

        session.enter(LineState::Idle);
        if session.stopped {
            info!(verses = session.verses_sung, "playback stopped");
        } else {
            info!(
                verses = session.verses_sung,
                words = session.words_spoken,
                failures = session.failures.len(),
                "song finished"
            );
        }
        session
    }

    /// Play one raw line; `index` identifies it in logs and failures.
    pub async fn play_line(
        &self,
        index: usize,
        line: &str,
        session: &mut PlaybackSession,
    ) -> LineOutcome {
        session.enter(LineState::Parsing);
        let parsed = parse_line(line);
        for issue in &parsed.issues {
            let e = NotationError::from(issue);
            warn!(verse = index, ?issue, "{}", e);
        }

        if parsed.is_pause() {
            session.pauses += 1;
            session.enter(LineState::LinePause);
            let completed = self.wait(self.beat).await;
            session.enter(LineState::Idle);
            return if completed {
                LineOutcome::Paused
            } else {
                LineOutcome::Stopped
            };
        }

        if let Err(e) = parsed.require_aligned() {
            session.lines_rejected += 1;
            session.enter(LineState::LinePause);
            if !self.wait(self.line_pause).await {
                return LineOutcome::Stopped;
            }
            session.enter(LineState::Idle);
            return LineOutcome::Rejected(e);
        }

        let music: String = parsed.music_track().into_iter().collect();
        info!(verse = index, line, music = %music, lyric = %parsed.pure_lyric, "verse {}", index);

        for (word_index, token) in parsed.tokens.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return LineOutcome::Stopped;
            }
            session.enter(LineState::Playing { word_index });

            let note = match token.note.map(|letter| self.table.lookup(letter)) {
                Some(Ok(note)) => Some(note),
                Some(Err(e)) => {
                    warn!(verse = index, word = %token.word, error = %e, "no note for word");
                    session.record_failure(index, word_index, &token.word, e);
                    None
                }
                None => None,
            };

            if let Some(note) = note {
                match self.trigger_note(note) {
                    // Fire and forget: the note-off runs on its own
                    Ok(_stab) => session.notes_triggered += 1,
                    Err(e) => {
                        warn!(verse = index, word = %token.word, error = %e, "note trigger failed");
                        session.record_failure(index, word_index, &token.word, e);
                    }
                }
            }

            let pitch = self.pitch.for_note(note);
            match self.speak(&token.word, pitch).await {
                Ok(()) => session.words_spoken += 1,
                Err(SpeechError::Cancelled) => return LineOutcome::Stopped,
                Err(e) => {
                    warn!(verse = index, word = %token.word, error = %e, "speech failed");
                    session.record_failure(index, word_index, &token.word, e);
                }
            }
        }

        session.verses_sung += 1;
        session.enter(LineState::LinePause);
        if !self.wait(self.line_pause).await {
            return LineOutcome::Stopped;
        }
        session.enter(LineState::Idle);

        LineOutcome::Sung {
            words: parsed.tokens.len(),
        }
    }

    /// Sound `note` now and release it after the hold time.
    ///
    /// Returns the handle of the release task. Nothing needs to await it.
    pub fn trigger_note(&self, note: &Note) -> Result<JoinHandle<()>, DeviceError> {
        self.device.note_on(note.midi, self.velocity, self.channel)?;

        let device = self.device.clone();
        let (key, channel, hold) = (note.midi, self.channel, self.note_hold);
        Ok(tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            if let Err(e) = device.note_off(key, 0, channel) {
                debug!(key, error = %e, "note off dropped");
            }
        }))
    }

    async fn speak(&self, word: &str, pitch: i32) -> Result<(), SpeechError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SpeechError::Cancelled),
            result = self.speech.speak(word, pitch) => result,
        }
    }

    /// Sleep unless stopped first; false if the stop signal won.
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
