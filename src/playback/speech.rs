//! Speech service seam
//!
//! The scheduler only needs one capability: speak a word with a pitch shift
//! and return once the word has been uttered.

use crate::error::SpeechError;
use crate::ssml;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Interface for a word-at-a-time speech synthesizer.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Speaks `word` shifted by `pitch_shift` percent, returning when done.
    async fn speak(&self, word: &str, pitch_shift: i32) -> Result<(), SpeechError>;
}

/// Runs an external synthesizer once per word, feeding it an SSML document
/// on stdin (e.g. `espeak-ng -m --stdin`).
///
/// The child is killed if the call is dropped before it finishes.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl SpeechService for CommandSpeech {
    async fn speak(&self, word: &str, pitch_shift: i32) -> Result<(), SpeechError> {
        let document = ssml::prosody(word, pitch_shift);
        debug!(program = %self.program, word, pitch_shift, "speaking");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(document.as_bytes()).await?;
            // Dropping stdin closes the pipe so the synthesizer sees EOF
            drop(stdin);
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(SpeechError::Synthesizer(status.to_string()));
        }
        Ok(())
    }
}

/// Logs each word and takes a fixed time to "say" it.
#[derive(Debug, Clone)]
pub struct LogSpeech {
    word_time: Duration,
}

impl LogSpeech {
    pub fn new(word_time: Duration) -> Self {
        Self { word_time }
    }
}

#[async_trait]
impl SpeechService for LogSpeech {
    async fn speak(&self, word: &str, pitch_shift: i32) -> Result<(), SpeechError> {
        info!(
            word,
            pitch = %ssml::signed_percent(pitch_shift),
            "sing"
        );
        tokio::time::sleep(self.word_time).await;
        Ok(())
    }
}
