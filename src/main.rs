//! singsong CLI - sing bracket-annotated lyrics with MIDI notes and speech.

use anyhow::Context;
use clap::Parser;
use singsong::playback::{
    CommandSpeech, LogOutput, LogSpeech, NoteOutput, RawMidiOutput, SpeechService,
};
use singsong::{PlayerConfig, Song};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Sing a song file (or lines typed at the prompt).
///
/// Each word annotated like `[c]twinkle` is sung as a MIDI note together with
/// the spoken word. Blank lines are pauses.
#[derive(Parser)]
#[command(name = "singsong")]
#[command(about = "Bracket-notation lyric sequencer")]
#[command(version)]
struct Cli {
    /// Song file; prompts for lines when omitted
    song: Option<String>,

    /// Player config file (YAML)
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Raw MIDI device node to write to (e.g. /dev/snd/midiC1D0)
    #[arg(short = 'd', long)]
    device: Option<String>,

    /// Synthesizer command, overriding the config (SSML is written to its stdin)
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    speech_cmd: Option<Vec<String>>,

    /// Voice name passed to the synthesizer
    #[arg(long)]
    voice: Option<String>,

    /// Speech rate passed to the synthesizer
    #[arg(long, allow_hyphen_values = true)]
    rate: Option<i32>,

    /// Number of lines to prompt for
    #[arg(long, default_value_t = 6)]
    lines: usize,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn player_config(&self) -> anyhow::Result<PlayerConfig> {
        let mut config = match &self.config {
            Some(path) => PlayerConfig::load(path)?,
            None => PlayerConfig::default(),
        };
        if let Some(command) = &self.speech_cmd {
            config.speech.command = command.clone();
        }
        if let Some(voice) = &self.voice {
            config.speech.voice = voice.clone();
        }
        if let Some(rate) = self.rate {
            config.speech.rate = rate;
        }
        Ok(config)
    }

    fn song(&self) -> anyhow::Result<Song> {
        match &self.song {
            Some(path) => Ok(Song::from_file(path)?),
            None => {
                let stdin = io::stdin();
                Song::prompt(stdin.lock(), io::stdout(), self.lines)
                    .context("reading lines from the prompt")
            }
        }
    }
}

fn speech_service(config: &PlayerConfig) -> Arc<dyn SpeechService> {
    match config.speech.command_line() {
        Some((program, args)) => {
            info!(%program, "using synthesizer command");
            Arc::new(CommandSpeech::new(program, args))
        }
        None => Arc::new(LogSpeech::new(Duration::from_millis(config.speech.word_ms))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = cli.player_config()?;
    let song = cli.song()?;

    // The device must be usable before the first verse
    let device: Box<dyn NoteOutput> = match &cli.device {
        Some(path) => Box::new(
            RawMidiOutput::open(path).with_context(|| format!("opening MIDI device '{}'", path))?,
        ),
        None => {
            warn!("no MIDI device given, notes are only logged");
            Box::new(LogOutput)
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    info!(lines = song.len(), verses = song.verse_count(), "starting song");
    let (session, _device) =
        singsong::sing(&song, &config, device, speech_service(&config), cancel).await?;

    for failure in &session.failures {
        warn!(
            verse = failure.line,
            word = %failure.word,
            error = %failure.error,
            "word failed"
        );
    }
    info!(
        verses = session.verses_sung,
        words = session.words_spoken,
        notes = session.notes_triggered,
        pauses = session.pauses,
        rejected = session.lines_rejected,
        "done"
    );
    Ok(())
}
