//! # Notation Parser
//!
//! Splits a raw lyric line into words and the notes annotated on them.
//!
//! ## Syntax
//! ```text
//! [c]twinkle [g]twinkle [a]little [g]star
//! ```
//! An annotation is exactly `[`, one note letter, `]`. It applies to the word
//! that follows it. The letter is kept as written; the note table resolves it
//! case-insensitively.
//!
//! ## Degradation Rules
//! Parsing never fails. Problems are collected in [`ParsedLine::issues`]:
//! - A `[` that does not open a well-formed annotation (`[`, `[ab]`, `[ ]`,
//!   a `[` at the end of the line) stays in the lyric as a literal character.
//! - A second annotation on a word that already has one is dropped.
//! - An annotation with no word after it is dropped.
//!
//! The lyric keeps every character outside a well-formed annotation, so a
//! line without annotations parses to itself.

use crate::error::NotationError;

/// One word of a lyric line and the note sung with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub note: Option<char>,
}

/// A non-fatal annotation problem found while scanning (columns are 1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationIssue {
    /// `[` that does not open an `[x]` annotation, kept as text
    Malformed { column: usize },
    /// Annotation on a word that already carries a note
    Duplicate { column: usize, letter: char },
    /// Annotation with no word after it
    Orphan { column: usize, letter: char },
}

impl AnnotationIssue {
    pub fn column(&self) -> usize {
        match self {
            AnnotationIssue::Malformed { column }
            | AnnotationIssue::Duplicate { column, .. }
            | AnnotationIssue::Orphan { column, .. } => *column,
        }
    }
}

impl From<&AnnotationIssue> for NotationError {
    fn from(issue: &AnnotationIssue) -> Self {
        NotationError::MalformedAnnotation {
            column: issue.column(),
        }
    }
}

/// Result of parsing one lyric line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    /// Words in order, each with its annotation (if any)
    pub tokens: Vec<Token>,
    /// The line with well-formed annotations removed
    pub pure_lyric: String,
    pub issues: Vec<AnnotationIssue>,
}

impl ParsedLine {
    /// Note letters of the annotated words, in order
    pub fn music_track(&self) -> Vec<char> {
        self.tokens.iter().filter_map(|t| t.note).collect()
    }

    pub fn words(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.word.as_str()).collect()
    }

    /// A line with no words is a pause, even if it held stray annotations.
    pub fn is_pause(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every word must carry exactly one note.
    ///
    /// # Example
    /// ```
    /// use singsong::{parse_line, NotationError};
    ///
    /// assert!(parse_line("[c]twinkle [g]twinkle").require_aligned().is_ok());
    /// assert_eq!(
    ///     parse_line("[c]twinkle twinkle").require_aligned(),
    ///     Err(NotationError::Mismatch { words: 2, notes: 1 })
    /// );
    /// ```
    pub fn require_aligned(&self) -> Result<(), NotationError> {
        let notes = self.tokens.iter().filter(|t| t.note.is_some()).count();
        if notes == self.tokens.len() {
            Ok(())
        } else {
            Err(NotationError::Mismatch {
                words: self.tokens.len(),
                notes,
            })
        }
    }
}

/// Single left-to-right scanner over one line
struct Scanner {
    chars: Vec<char>,
    position: usize,
    tokens: Vec<Token>,
    pure_lyric: String,
    issues: Vec<AnnotationIssue>,
    current: Option<Token>,
    pending: Option<(char, usize)>,
}

impl Scanner {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            position: 0,
            tokens: Vec::new(),
            pure_lyric: String::with_capacity(line.len()),
            issues: Vec::new(),
            current: None,
            pending: None,
        }
    }

    /// Letter of a well-formed `[x]` starting at the current position
    fn annotation(&self) -> Option<char> {
        let letter = *self.chars.get(self.position + 1)?;
        if letter.is_whitespace() || letter == '[' || letter == ']' {
            return None;
        }
        match self.chars.get(self.position + 2) {
            Some(']') => Some(letter),
            _ => None,
        }
    }

    fn annotate(&mut self, letter: char, column: usize) {
        match (&mut self.current, self.pending) {
            (Some(token), _) if token.note.is_none() => token.note = Some(letter),
            (None, None) => self.pending = Some((letter, column)),
            _ => self
                .issues
                .push(AnnotationIssue::Duplicate { column, letter }),
        }
    }

    fn push_text(&mut self, c: char) {
        self.pure_lyric.push(c);
        if c.is_whitespace() {
            self.finish_word();
            return;
        }

        let pending = &mut self.pending;
        self.current
            .get_or_insert_with(|| Token {
                word: String::new(),
                note: pending.take().map(|(letter, _)| letter),
            })
            .word
            .push(c);
    }

    fn finish_word(&mut self) {
        if let Some(token) = self.current.take() {
            self.tokens.push(token);
        }
    }

    fn run(mut self) -> ParsedLine {
        while let Some(&c) = self.chars.get(self.position) {
            let column = self.position + 1;

            if c == '[' {
                if let Some(letter) = self.annotation() {
                    self.annotate(letter, column);
                    // Skip the letter and the closing bracket
                    self.position += 3;
                    continue;
                }
                self.issues.push(AnnotationIssue::Malformed { column });
            }

            self.push_text(c);
            self.position += 1;
        }

        self.finish_word();
        if let Some((letter, column)) = self.pending.take() {
            self.issues.push(AnnotationIssue::Orphan { column, letter });
        }

        ParsedLine {
            tokens: self.tokens,
            pure_lyric: self.pure_lyric,
            issues: self.issues,
        }
    }
}

/// Parse one raw lyric line.
///
/// # Example
/// ```
/// use singsong::parse_line;
///
/// let parsed = parse_line("[c]twinkle [g]twinkle [a]little [g]star");
/// assert_eq!(parsed.music_track(), vec!['c', 'g', 'a', 'g']);
/// assert_eq!(parsed.pure_lyric, "twinkle twinkle little star");
/// ```
pub fn parse_line(line: &str) -> ParsedLine {
    Scanner::new(line).run()
}
