use super::*;
use crate::error::{DeviceError, NotationError, NoteError, SpeechError, WordError};
use crate::{NoteTable, PlayerConfig, Song};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const REFERENCE_LINE: &str = "[c]twinkle [g]twinkle [a]little [g]star";

#[derive(Clone, Default)]
struct RecordingOutput {
    commands: Arc<Mutex<Vec<NoteCommand>>>,
}

impl NoteOutput for RecordingOutput {
    fn note_on(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        self.commands.lock().unwrap().push(NoteCommand::On {
            key,
            velocity,
            channel,
        });
        Ok(())
    }

    fn note_off(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        self.commands.lock().unwrap().push(NoteCommand::Off {
            key,
            velocity,
            channel,
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Spoken {
    word: String,
    pitch: i32,
    at: Instant,
}

struct RecordingSpeech {
    spoken: Arc<Mutex<Vec<Spoken>>>,
    word_time: Duration,
    fail_on: Option<&'static str>,
    hang_on: Option<&'static str>,
}

impl RecordingSpeech {
    fn new(word_time: Duration) -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            word_time,
            fail_on: None,
            hang_on: None,
        }
    }
}

#[async_trait]
impl SpeechService for RecordingSpeech {
    async fn speak(&self, word: &str, pitch_shift: i32) -> Result<(), SpeechError> {
        if self.hang_on == Some(word) {
            std::future::pending::<()>().await;
        }
        if self.fail_on == Some(word) {
            return Err(SpeechError::Synthesizer("exit status: 1".to_string()));
        }
        self.spoken.lock().unwrap().push(Spoken {
            word: word.to_string(),
            pitch: pitch_shift,
            at: Instant::now(),
        });
        tokio::time::sleep(self.word_time).await;
        Ok(())
    }
}

struct Rig {
    scheduler: Scheduler,
    spoken: Arc<Mutex<Vec<Spoken>>>,
    commands: Arc<Mutex<Vec<NoteCommand>>>,
    worker: JoinHandle<RecordingOutput>,
}

impl Rig {
    fn new(config: PlayerConfig, speech: RecordingSpeech) -> Self {
        let output = RecordingOutput::default();
        let commands = output.commands.clone();
        let spoken = speech.spoken.clone();
        let (device, worker) = spawn_device_worker(output);
        let scheduler = Scheduler::new(NoteTable::c_major(), device, Arc::new(speech), &config);
        Self {
            scheduler,
            spoken,
            commands,
            worker,
        }
    }

    fn words(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.word.clone())
            .collect()
    }

    /// Release the device and wait until every queued write has happened.
    async fn finish(self) -> Vec<NoteCommand> {
        drop(self.scheduler);
        self.worker.await.unwrap();
        let commands = self.commands.lock().unwrap().clone();
        commands
    }
}

fn note_ons(commands: &[NoteCommand]) -> Vec<u8> {
    commands
        .iter()
        .filter(|c| matches!(c, NoteCommand::On { .. }))
        .map(NoteCommand::key)
        .collect()
}

fn note_offs(commands: &[NoteCommand]) -> Vec<u8> {
    commands
        .iter()
        .filter(|c| matches!(c, NoteCommand::Off { .. }))
        .map(NoteCommand::key)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_reference_line_pairs_notes_with_words() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(200)),
    );
    let song = Song::from_text(REFERENCE_LINE);

    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert!(session.is_clean());
    assert_eq!(session.verses_sung, 1);
    assert_eq!(session.words_spoken, 4);
    assert_eq!(session.notes_triggered, 4);
    assert_eq!(session.state(), LineState::Idle);

    assert_eq!(rig.words(), vec!["twinkle", "twinkle", "little", "star"]);
    assert!(rig.spoken.lock().unwrap().iter().all(|s| s.pitch == 20));

    let commands = rig.finish().await;
    assert_eq!(note_ons(&commands), vec![60, 67, 69, 67]);
    assert_eq!(note_offs(&commands), vec![60, 67, 69, 67]);
    assert_eq!(
        commands[0],
        NoteCommand::On {
            key: 60,
            velocity: 100,
            channel: 0,
        }
    );
    assert!(commands
        .iter()
        .filter(|c| matches!(c, NoteCommand::Off { .. }))
        .all(|c| matches!(c, NoteCommand::Off { velocity: 0, channel: 0, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_note_trigger_does_not_wait_for_release() {
    // Words shorter than the hold time: the next note starts while the
    // previous one is still sounding.
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(50)),
    );
    let song = Song::from_text("[c]up [d]above");

    rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    let commands = rig.finish().await;

    assert_eq!(
        &commands[..2],
        &[
            NoteCommand::On {
                key: 60,
                velocity: 100,
                channel: 0,
            },
            NoteCommand::On {
                key: 62,
                velocity: 100,
                channel: 0,
            },
        ]
    );
    assert_eq!(note_offs(&commands), vec![60, 62]);
}

#[tokio::test(start_paused = true)]
async fn test_play_line_outcome() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(10)),
    );
    let mut session = PlaybackSession::new();

    let outcome = rig.scheduler.play_line(0, REFERENCE_LINE, &mut session).await;
    assert!(matches!(outcome, LineOutcome::Sung { words: 4 }));
    assert_eq!(session.state(), LineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_blank_line_pauses_one_beat() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(200)),
    );
    let song = Song::new(vec![String::new()]);

    let start = Instant::now();
    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1500));
    assert_eq!(session.pauses, 1);
    assert_eq!(session.words_spoken, 0);
    assert_eq!(session.notes_triggered, 0);
    assert_eq!(session.verses_sung, 0);

    assert!(rig.words().is_empty());
    assert!(rig.finish().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_line_pause_between_verses() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(200)),
    );
    let song = Song::from_text("[c]twinkle\n[g]star");

    rig.scheduler.play_song(&song, PlaybackSession::new()).await;

    let spoken = rig.spoken.lock().unwrap().clone();
    let gap = spoken[1].at - spoken[0].at;
    // One word of speech, then the inter-line pause
    assert!(gap >= Duration::from_millis(700));
    assert!(gap < Duration::from_millis(800));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_line_still_takes_line_pause() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(200)),
    );
    let song = Song::from_text("[c]one\n[g]like a\n[c]two");

    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert_eq!(session.lines_rejected, 1);
    assert_eq!(rig.words(), vec!["one", "two"]);

    let spoken = rig.spoken.lock().unwrap().clone();
    let gap = spoken[1].at - spoken[0].at;
    // One word of speech, then a line pause after each of the two lines
    assert!(gap >= Duration::from_millis(1200));
    assert!(gap < Duration::from_millis(1300));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_play_line_ends_idle() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(10)),
    );
    let mut session = PlaybackSession::new();

    let start = Instant::now();
    let outcome = rig.scheduler.play_line(0, "[g]like a", &mut session).await;
    assert!(matches!(
        outcome,
        LineOutcome::Rejected(NotationError::Mismatch { words: 2, notes: 1 })
    ));
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert_eq!(session.state(), LineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_note_is_reported_for_that_word_only() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(100)),
    );
    let song = Song::from_text("[c]one [z]two [d]three");

    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert_eq!(session.words_spoken, 3);
    assert_eq!(session.notes_triggered, 2);
    assert_eq!(session.verses_sung, 1);
    assert_eq!(session.failures.len(), 1);

    let failure = &session.failures[0];
    assert_eq!(failure.line, 0);
    assert_eq!(failure.word_index, 1);
    assert_eq!(failure.word, "two");
    assert!(matches!(
        failure.error,
        WordError::Note(NoteError::NotFound('z'))
    ));

    assert_eq!(rig.words(), vec!["one", "two", "three"]);
    assert_eq!(note_ons(&rig.finish().await), vec![60, 62]);
}

#[tokio::test(start_paused = true)]
async fn test_unannotated_line_is_rejected_and_song_continues() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(100)),
    );
    let song = Song::from_text("[g]like a [f]diamond\n[g]star");

    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert_eq!(session.lines_rejected, 1);
    assert_eq!(session.verses_sung, 1);
    assert!(!session.stopped);
    assert_eq!(rig.words(), vec!["star"]);
    assert_eq!(note_ons(&rig.finish().await), vec![67]);
}

#[tokio::test(start_paused = true)]
async fn test_speech_failure_is_local() {
    let mut speech = RecordingSpeech::new(Duration::from_millis(100));
    speech.fail_on = Some("above");
    let rig = Rig::new(PlayerConfig::default(), speech);
    let song = Song::from_text("[c]up [d]above [e]so");

    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert_eq!(session.words_spoken, 2);
    assert_eq!(session.notes_triggered, 3);
    assert_eq!(session.failures.len(), 1);
    assert!(matches!(
        session.failures[0].error,
        WordError::Speech(SpeechError::Synthesizer(_))
    ));
    assert_eq!(rig.words(), vec!["up", "so"]);
}

#[tokio::test(start_paused = true)]
async fn test_follow_note_pitch() {
    let config = PlayerConfig {
        pitch_follows_note: true,
        ..PlayerConfig::default()
    };
    let rig = Rig::new(config, RecordingSpeech::new(Duration::from_millis(100)));
    let song = Song::from_text("[c]a [e]b [b]c [q]d");

    rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    let pitches: Vec<i32> = rig.spoken.lock().unwrap().iter().map(|s| s.pitch).collect();
    // Unknown note falls back to the fixed shift
    assert_eq!(pitches, vec![0, 25, 75, 20]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(100)),
    );
    let cancel = rig.scheduler.cancel_token();
    cancel.cancel();

    let song = Song::from_text(REFERENCE_LINE);
    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert!(session.stopped);
    assert_eq!(session.words_spoken, 0);
    assert!(rig.finish().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_hanging_speech() {
    let mut speech = RecordingSpeech::new(Duration::from_millis(100));
    speech.hang_on = Some("forever");
    let cancel = CancellationToken::new();
    let mut rig = Rig::new(PlayerConfig::default(), speech);
    rig.scheduler = rig.scheduler.with_cancel(cancel.clone());

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
    });

    let song = Song::from_text("[c]sing [d]forever [e]never\n[c]again");
    let start = Instant::now();
    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    stopper.await.unwrap();

    assert!(session.stopped);
    assert!(start.elapsed() < Duration::from_secs(6));
    assert_eq!(session.verses_sung, 0);
    assert_eq!(session.notes_triggered, 2);
    assert_eq!(rig.words(), vec!["sing"]);

    // Notes already sounding are still released
    let commands = rig.finish().await;
    assert_eq!(note_ons(&commands), vec![60, 62]);
    assert_eq!(note_offs(&commands), vec![60, 62]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_pause() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(100)),
    );
    let cancel = rig.scheduler.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let song = Song::from_text("\n[c]star");
    let session = rig.scheduler.play_song(&song, PlaybackSession::new()).await;
    assert!(session.stopped);
    assert_eq!(session.pauses, 1);
    assert!(rig.words().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_session_carries_across_songs() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(10)),
    );
    let first = Song::from_text(REFERENCE_LINE);
    let second = Song::from_text("[f]how [f]I [e]wonder\n\n[d]what");

    let session = rig.scheduler.play_song(&first, PlaybackSession::new()).await;
    let session = rig.scheduler.play_song(&second, session).await;

    assert_eq!(session.verses_sung, 3);
    assert_eq!(session.words_spoken, 8);
    assert_eq!(session.pauses, 1);
    assert!(session.is_clean());
}

#[tokio::test(start_paused = true)]
async fn test_device_failure_is_reported_per_word() {
    let rig = Rig::new(
        PlayerConfig::default(),
        RecordingSpeech::new(Duration::from_millis(10)),
    );
    rig.worker.abort();
    // Let the abort land so the queue closes
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    let session = rig
        .scheduler
        .play_song(&Song::from_text("[c]up [d]high"), PlaybackSession::new())
        .await;
    assert_eq!(session.words_spoken, 2);
    assert_eq!(session.notes_triggered, 0);
    assert_eq!(session.failures.len(), 2);
    assert!(session
        .failures
        .iter()
        .all(|f| matches!(f.error, WordError::Device(DeviceError::Closed))));
}
