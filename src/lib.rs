pub mod config;
pub mod error;
pub mod notes;
pub mod parser;
pub mod playback;
pub mod song;
pub mod ssml;

pub use config::{PlayerConfig, SpeechConfig};
pub use error::*;
pub use notes::{transpose, Note, NoteTable};
pub use parser::{parse_line, AnnotationIssue, ParsedLine, Token};
pub use song::{Song, DEFAULT_VERSE};

use playback::{spawn_device_worker, NoteOutput, PlaybackSession, Scheduler, SpeechService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sing a whole song on `device` and `speech`.
/// This is the main entry point for the library.
///
/// Setup problems (an invalid configured scale) fail before anything plays.
/// Once playback starts, per-word problems end up in the returned session.
/// The device is handed back after every pending note-off has been written.
pub async fn sing<D>(
    song: &Song,
    config: &PlayerConfig,
    device: D,
    speech: Arc<dyn SpeechService>,
    cancel: CancellationToken,
) -> Result<(PlaybackSession, D), SingError>
where
    D: NoteOutput + 'static,
{
    let table = config.note_table()?;
    let (handle, worker) = spawn_device_worker(device);
    let scheduler = Scheduler::new(table, handle, speech, config).with_cancel(cancel);

    let session = scheduler.play_song(song, PlaybackSession::new()).await;
    drop(scheduler);

    let device = worker.await.map_err(|_| DeviceError::Closed)?;
    Ok((session, device))
}
