//! # Note Table
//!
//! Static mapping from note letters to playable pitches.
//!
//! ## Reference Scale
//! One C-major octave starting at middle C:
//!
//! | Letter | MIDI | Pitch offset |
//! |--------|------|--------------|
//! | c      | 60   | 0            |
//! | d      | 62   | 12           |
//! | e      | 64   | 25           |
//! | f      | 65   | 30           |
//! | g      | 67   | 48           |
//! | a      | 69   | 60           |
//! | b      | 71   | 75           |
//!
//! The pitch offsets are tuning data for pitch-shifted speech, not semitone
//! counts. They are stored as given and never derived from the MIDI number.

use crate::error::NoteError;
use std::collections::HashMap;

/// A playable pitch in the scale table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub letter: char,
    pub octave: i32,
    pub midi: u8,
    pub pitch_offset: i32,
}

impl Note {
    pub fn new(letter: char, octave: i32, midi: u8, pitch_offset: i32) -> Self {
        Self {
            letter: letter.to_ascii_lowercase(),
            octave,
            midi,
            pitch_offset,
        }
    }

    /// Same letter one octave up (+12 semitones)
    pub fn octave_up(&self) -> Result<Note, NoteError> {
        transpose(self, 12)
    }

    /// Same letter one octave down (-12 semitones)
    pub fn octave_down(&self) -> Result<Note, NoteError> {
        transpose(self, -12)
    }
}

/// Shift a note by the given number of semitones.
///
/// The letter and pitch offset are kept; the octave is recomputed from the
/// new MIDI number (MIDI 60 = octave 4).
///
/// # Example
/// ```
/// use singsong::{transpose, NoteTable};
///
/// let table = NoteTable::c_major();
/// let c = table.lookup('c').unwrap();
/// assert_eq!(transpose(c, 12).unwrap().midi, 72);
/// assert!(transpose(c, 100).is_err());
/// ```
pub fn transpose(note: &Note, semitones: i32) -> Result<Note, NoteError> {
    // Widened so any i32 shift stays representable
    let midi = i64::from(note.midi) + i64::from(semitones);
    if !(0..=127).contains(&midi) {
        return Err(NoteError::OutOfRange { midi });
    }

    Ok(Note {
        letter: note.letter,
        octave: (midi / 12 - 1) as i32,
        midi: midi as u8,
        pitch_offset: note.pitch_offset,
    })
}

/// Immutable scale table, built once at startup and shared read-only.
///
/// Lookups are case-insensitive and go through a hash index, so they are
/// O(1). The ordered list is kept for display and iteration.
#[derive(Debug, Clone)]
pub struct NoteTable {
    notes: Vec<Note>,
    index: HashMap<char, usize>,
}

impl Default for NoteTable {
    fn default() -> Self {
        Self::c_major()
    }
}

impl NoteTable {
    /// The reference table: one C-major octave from middle C.
    pub fn c_major() -> Self {
        let notes = vec![
            Note::new('c', 4, 60, 0),
            Note::new('d', 4, 62, 12),
            Note::new('e', 4, 64, 25),
            Note::new('f', 4, 65, 30),
            Note::new('g', 4, 67, 48),
            Note::new('a', 4, 69, 60),
            Note::new('b', 4, 71, 75),
        ];
        let index = notes
            .iter()
            .enumerate()
            .map(|(i, note)| (note.letter, i))
            .collect();
        Self { notes, index }
    }

    /// Build a table from configured notes.
    ///
    /// Fails on a repeated letter (case-insensitive) or a MIDI number above 127.
    pub fn from_notes(notes: Vec<Note>) -> Result<Self, NoteError> {
        let mut index = HashMap::with_capacity(notes.len());
        let mut normalized = Vec::with_capacity(notes.len());

        for note in notes {
            if note.midi > 127 {
                return Err(NoteError::OutOfRange {
                    midi: i64::from(note.midi),
                });
            }
            let letter = note.letter.to_ascii_lowercase();
            if index.insert(letter, normalized.len()).is_some() {
                return Err(NoteError::DuplicateLetter(letter));
            }
            normalized.push(Note { letter, ..note });
        }

        Ok(Self {
            notes: normalized,
            index,
        })
    }

    /// Look up the note for an annotation letter.
    ///
    /// # Example
    /// ```
    /// use singsong::NoteTable;
    ///
    /// let table = NoteTable::c_major();
    /// assert_eq!(table.lookup('c').unwrap().midi, 60);
    /// assert_eq!(table.lookup('B').unwrap().midi, 71);
    /// assert!(table.lookup('z').is_err());
    /// ```
    pub fn lookup(&self, letter: char) -> Result<&Note, NoteError> {
        self.index
            .get(&letter.to_ascii_lowercase())
            .map(|&i| &self.notes[i])
            .ok_or(NoteError::NotFound(letter))
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
