//! Bounded list of parse warnings.
//!
//! A badly damaged file can produce one warning per line, so the list stops
//! growing after a fixed number of entries. The first warning past the limit is
//! replaced by a single [`Warning::TooMany`] sentinel and everything after it
//! is dropped.
//!
//! ```
//! # use pch2csv::warnings::{Warnings, Warning};
//! let mut w = Warnings::with_limit(2);
//! w.push(1, "first");
//! w.push(2, "second");
//! w.push(3, "third");
//! w.push(4, "fourth");
//! assert_eq!(w.len(), 3);
//! assert!(w.overflowed());
//! assert_eq!(w.iter().last(), Some(&Warning::TooMany));
//! ```
use std::fmt::Display;

/// Default number of warnings kept by a [`Warnings`] list.
pub const DEFAULT_WARNING_LIMIT: usize = 100;

/// One recoverable problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A problem on input line `line` (1-based).
    Line { line: usize, message: String },
    /// Marks that further warnings were dropped.
    TooMany,
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Line { line, message } => write!(f, "[Warning] line {line}: {message}"),
            Warning::TooMany => write!(f, "[Warning] Too many errors..."),
        }
    }
}

/// Fixed-capacity warning list with an explicit overflow flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warnings {
    entries: Vec<Warning>,
    limit: usize,
    overflowed: bool,
}

impl Default for Warnings {
    fn default() -> Self {
        Self::with_limit(DEFAULT_WARNING_LIMIT)
    }
}

impl Warnings {
    /// Create an empty list that keeps at most `limit` line warnings.
    pub fn with_limit(limit: usize) -> Self {
        Self { entries: Vec::with_capacity(limit.min(DEFAULT_WARNING_LIMIT) + 1), limit, overflowed: false }
    }

    /// Record a warning for input line `line`.
    pub fn push<S: Into<String>>(&mut self, line: usize, message: S) {
        if self.overflowed {
            return;
        }

        if self.entries.len() >= self.limit {
            self.overflowed = true;
            self.entries.push(Warning::TooMany);
            return;
        }

        let message = message.into();
        log::trace!("line {line}: {message}");
        self.entries.push(Warning::Line { line, message });
    }

    /// `true` once warnings have started being dropped.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Number of entries, the sentinel included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.entries.iter()
    }
}

impl IntoIterator for Warnings {
    type Item = Warning;
    type IntoIter = std::vec::IntoIter<Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'w> IntoIterator for &'w Warnings {
    type Item = &'w Warning;
    type IntoIter = std::slice::Iter<'w, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
