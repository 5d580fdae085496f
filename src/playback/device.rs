//! Note-output device and its single-writer worker
//!
//! Note triggers are fire-and-forget and may overlap, but the device itself is
//! one shared channel. Every write goes through a [`DeviceHandle`], which only
//! queues a [`NoteCommand`]; one worker task owns the device and performs the
//! writes in queue order, so raw messages can never interleave.

use crate::error::DeviceError;
use midly::live::LiveEvent;
use midly::num::{u4, u7};
use midly::MidiMessage;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Capability the core needs from a note-output device
pub trait NoteOutput: Send {
    fn note_on(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError>;
    fn note_off(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError>;
}

/// A queued device write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCommand {
    On { key: u8, velocity: u8, channel: u8 },
    Off { key: u8, velocity: u8, channel: u8 },
}

impl NoteCommand {
    pub fn key(&self) -> u8 {
        match self {
            NoteCommand::On { key, .. } | NoteCommand::Off { key, .. } => *key,
        }
    }

    fn apply<D: NoteOutput + ?Sized>(self, device: &mut D) -> Result<(), DeviceError> {
        match self {
            NoteCommand::On { key, velocity, channel } => device.note_on(key, velocity, channel),
            NoteCommand::Off { key, velocity, channel } => device.note_off(key, velocity, channel),
        }
    }
}

fn check(field: &'static str, value: u8, max: u8) -> Result<(), DeviceError> {
    if value > max {
        return Err(DeviceError::InvalidValue { field, value });
    }
    Ok(())
}

/// Encode a note command as a raw MIDI channel message (3 bytes)
pub fn encode(command: NoteCommand, out: &mut Vec<u8>) -> Result<(), DeviceError> {
    let (key, velocity, channel, on) = match command {
        NoteCommand::On { key, velocity, channel } => (key, velocity, channel, true),
        NoteCommand::Off { key, velocity, channel } => (key, velocity, channel, false),
    };
    check("key", key, 127)?;
    check("velocity", velocity, 127)?;
    check("channel", channel, 15)?;

    let (key, vel) = (u7::new(key), u7::new(velocity));
    let message = if on {
        MidiMessage::NoteOn { key, vel }
    } else {
        MidiMessage::NoteOff { key, vel }
    };
    LiveEvent::Midi {
        channel: u4::new(channel),
        message,
    }
    .write_std(&mut *out)?;
    Ok(())
}

/// Writes raw MIDI bytes to any byte sink, e.g. a `/dev/snd/midiC*D*` node.
pub struct RawMidiOutput<W: Write + Send> {
    writer: W,
    buf: Vec<u8>,
}

impl<W: Write + Send> RawMidiOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: Vec::with_capacity(3),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self, command: NoteCommand) -> Result<(), DeviceError> {
        self.buf.clear();
        encode(command, &mut self.buf)?;
        self.writer.write_all(&self.buf)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl RawMidiOutput<std::fs::File> {
    /// Open a raw MIDI device node for writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let file = OpenOptions::new().write(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> NoteOutput for RawMidiOutput<W> {
    fn note_on(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        self.send(NoteCommand::On {
            key,
            velocity,
            channel,
        })
    }

    fn note_off(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        self.send(NoteCommand::Off {
            key,
            velocity,
            channel,
        })
    }
}

/// Device that only logs, for running without MIDI hardware
#[derive(Debug, Default)]
pub struct LogOutput;

impl NoteOutput for LogOutput {
    fn note_on(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        debug!(key, velocity, channel, "note on");
        Ok(())
    }

    fn note_off(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        debug!(key, velocity, channel, "note off");
        Ok(())
    }
}

impl<D: NoteOutput + ?Sized> NoteOutput for Box<D> {
    fn note_on(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        (**self).note_on(key, velocity, channel)
    }

    fn note_off(&mut self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        (**self).note_off(key, velocity, channel)
    }
}

/// Cloneable, non-blocking handle onto the device worker
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    tx: mpsc::UnboundedSender<NoteCommand>,
}

impl DeviceHandle {
    pub fn note_on(&self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        self.send(NoteCommand::On {
            key,
            velocity,
            channel,
        })
    }

    pub fn note_off(&self, key: u8, velocity: u8, channel: u8) -> Result<(), DeviceError> {
        self.send(NoteCommand::Off {
            key,
            velocity,
            channel,
        })
    }

    pub fn send(&self, command: NoteCommand) -> Result<(), DeviceError> {
        self.tx.send(command).map_err(|_| DeviceError::Closed)
    }
}

/// Start the worker that owns `device`.
///
/// The worker runs until every [`DeviceHandle`] clone is dropped, draining the
/// queue first, and then hands the device back. A failed write is logged and
/// the worker moves on to the next command.
pub fn spawn_device_worker<D>(mut device: D) -> (DeviceHandle, JoinHandle<D>)
where
    D: NoteOutput + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<NoteCommand>();

    let worker = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            if let Err(e) = command.apply(&mut device) {
                warn!(?command, error = %e, "device write failed");
            }
        }
        debug!("device worker drained");
        device
    });

    (DeviceHandle { tx }, worker)
}
