//! Parse punch-formatted data into a [`Document`].
//!
//! # Basic usage
//!
//! A punch file is made of 80-column lines. Lines starting with `$` carry
//! `key = value` annotations for the rows that follow; every other line holds four
//! 18-character data fields and an 8-character sequence number. A data row that does
//! not fit on one line is continued on lines whose first field is `-CONT-`:
//!
//! ```
//! use pch2csv::reader::from_str;
//!
//! let input = concat!(
//!     "$SUBCASE ID =         666                                                      1\n",
//!     "     80004230          -3.404367E+03                                           2\n",
//!     "-CONT-                 -7.163730E+04                                           3\n",
//! );
//! let (doc, warnings) = from_str(input);
//! assert!(warnings.is_empty());
//!
//! let block = doc.blocks().next().unwrap();
//! assert_eq!(block.prefix()["SUBCASE ID"], "666");
//! assert_eq!(block.rows()[0].fields(), &["80004230", "-3.404367E+03", "", "", "-7.163730E+04"]);
//! ```
//!
//! # Recoverable problems
//!
//! Parsing never stops on a bad line. Lines of the wrong width are skipped, data
//! before any `$` header gets an implicit block, and a `-CONT-` line with nothing to
//! continue opens a new row. Each of these is recorded as a [`Warning`](crate::warnings::Warning)
//! and returned alongside the document. Only a failure to read the input stream is an error.
//!
//! # Adjusting parser settings
//!
//! The column layout and the number of warnings kept can be changed with [`ReadSettings`]:
//!
//! ```
//! use pch2csv::reader::{PunchReader, ReadSettings};
//!
//! let settings = ReadSettings::default()
//!     .layout_str("(a6,a4,2x)").unwrap()
//!     .warning_limit(10);
//! let mut reader = PunchReader::with_settings(settings);
//! let doc = reader.parse_lines(["aaaaaabbbb01", "-CONT-cc  02"]);
//! assert_eq!(doc.blocks().next().unwrap().rows()[0].fields(), &["aaaaaa", "bbbb", "cc"]);
//! assert_eq!(reader.warnings().len(), 1);  // no '$' header before the data
//! ```
use std::io::BufRead;

use crate::layout::{Columns, LineLayout};
use crate::punch_error::{PResult, PunchError};
use crate::record::{Block, Document, Row};
use crate::warnings::{Warnings, DEFAULT_WARNING_LIMIT};

/// First character of a metadata (`$`) line.
pub const META_MARKER: char = '$';

/// Token that marks a data line as the continuation of the previous row.
pub const CONTINUATION: &str = "-CONT-";

const META_TRIM: [char; 2] = [' ', '\t'];

/// Settings for parsing punch data
///
/// To use, instantiate the default version with `ReadSettings::default()` and
/// modify the desired settings with the public methods:
///
/// ```
/// # use pch2csv::reader::ReadSettings;
/// let settings = ReadSettings::default().warning_limit(20);
/// ```
#[derive(Debug, Clone)]
pub struct ReadSettings {
    layout: LineLayout,
    warning_limit: usize,
}

impl ReadSettings {
    /// Set the column layout of a punch line. Default is `(4a18,8x)`.
    pub fn layout(mut self, layout: LineLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Parse `layout_str` as a [`LineLayout`] and use it.
    pub fn layout_str(self, layout_str: &str) -> PResult<Self> {
        let layout = LineLayout::parse(layout_str)?;
        Ok(self.layout(layout))
    }

    /// Set how many warnings are kept before the rest are dropped. Default is 100.
    pub fn warning_limit(mut self, limit: usize) -> Self {
        self.warning_limit = limit;
        self
    }

    pub fn line_layout(&self) -> &LineLayout {
        &self.layout
    }
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self { layout: LineLayout::default(), warning_limit: DEFAULT_WARNING_LIMIT }
    }
}

/// Parse a whole punch file held in memory with the default settings.
///
/// Returns the parsed document and the warnings collected along the way.
pub fn from_str(s: &str) -> (Document, Warnings) {
    let mut reader = PunchReader::new();
    let doc = reader.parse_lines(s.lines());
    (doc, reader.take_warnings())
}

/// Parser for punch streams.
///
/// Warnings accumulate across calls to [`parse`](Self::parse) and
/// [`parse_lines`](Self::parse_lines) until [`take_warnings`](Self::take_warnings) is called.
#[derive(Debug, Clone, Default)]
pub struct PunchReader {
    settings: ReadSettings,
    warnings: Warnings,
}

impl PunchReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ReadSettings) -> Self {
        let warnings = Warnings::with_limit(settings.warning_limit);
        Self { settings, warnings }
    }

    /// Read `input` to the end and parse it.
    ///
    /// Lines are split on `\n`; a `\r` right before it is dropped and invalid UTF-8 is
    /// replaced rather than rejected. Returns an error only if reading from `input` fails.
    pub fn parse<R: BufRead>(&mut self, mut input: R) -> PResult<Document> {
        let mut state = ParseState::new(&self.settings.layout, &mut self.warnings);
        let mut buf = vec![];
        let mut line_num = 0;

        loop {
            buf.clear();
            let n = input.read_until(b'\n', &mut buf)
                .map_err(|source| PunchError::Read { line: line_num + 1, source })?;
            if n == 0 {
                break;
            }
            line_num += 1;

            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }

            let line = String::from_utf8_lossy(&buf);
            state.feed(line_num, &line);
        }

        Ok(state.finish())
    }

    /// Parse lines already split (without their line terminators).
    pub fn parse_lines<I, S>(&mut self, lines: I) -> Document
    where I: IntoIterator<Item = S>,
          S: AsRef<str>
    {
        let mut state = ParseState::new(&self.settings.layout, &mut self.warnings);
        for (i, line) in lines.into_iter().enumerate() {
            state.feed(i + 1, line.as_ref());
        }
        state.finish()
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    /// Return the warnings collected so far and start a new, empty list.
    pub fn take_warnings(&mut self) -> Warnings {
        let fresh = Warnings::with_limit(self.settings.warning_limit);
        std::mem::replace(&mut self.warnings, fresh)
    }

    pub fn settings(&self) -> &ReadSettings {
        &self.settings
    }
}

/// Cursor state for one pass over a stream.
///
/// Blocks are kept in creation order and the current one is addressed by index;
/// the row being assembled is owned here and only handed to its block when flushed.
struct ParseState<'p> {
    layout: &'p LineLayout,
    warnings: &'p mut Warnings,
    blocks: Vec<Block>,
    current: Option<usize>,
    row: Row,
    in_metadata: bool,
}

impl<'p> ParseState<'p> {
    fn new(layout: &'p LineLayout, warnings: &'p mut Warnings) -> Self {
        Self { layout, warnings, blocks: vec![], current: None, row: Row::new(), in_metadata: false }
    }

    fn feed(&mut self, line_num: usize, line: &str) {
        let columns = Columns::new(line);
        let width = self.layout.record_width();
        if columns.len() != width {
            log::trace!("skipping line {line_num}: {} characters instead of {width}", columns.len());
            self.warnings.push(line_num, format!("A line should have at least {width} characters."));
            return;
        }

        if line.starts_with(META_MARKER) {
            self.feed_metadata(line_num, &columns);
        } else {
            self.in_metadata = false;
            self.feed_data(line_num, line);
        }
    }

    fn feed_metadata(&mut self, line_num: usize, columns: &Columns) {
        self.flush_row();

        let idx = match self.current {
            Some(idx) if self.in_metadata => idx,
            _ => {
                self.in_metadata = true;
                self.start_block(line_num)
            }
        };

        let Some(eq) = columns.find('=') else {
            return;
        };

        // The value normally stops before the sequence number; an '=' past that
        // point takes the rest of the line instead.
        let value_end = self.layout.meta_value_end();
        let value_end = if eq < value_end { value_end } else { columns.len() };

        let key = columns.slice(1, eq).trim_matches(META_TRIM);
        let value = columns.slice(eq + 1, value_end).trim_matches(META_TRIM);
        self.blocks[idx].insert_prefix(key, value);
    }

    fn feed_data(&mut self, line_num: usize, line: &str) {
        if self.current.is_none() {
            self.warnings.push(line_num, "A header ('$' section) should prepend the data.");
            self.start_block(line_num);
        }

        let fields: Vec<&str> = self.layout.split(line)
            .into_iter()
            .map(trim_field)
            .collect();

        let is_continuation = fields.first().is_some_and(|f| f.starts_with(CONTINUATION));
        if is_continuation {
            if self.row.is_empty() {
                self.warnings.push(line_num, "A continued -CONT- field shouldn't start a new block.");
            }
            self.row.extend(fields.into_iter().skip(1));
        } else {
            self.flush_row();
            self.row.extend(fields);
        }
    }

    fn start_block(&mut self, line_num: usize) -> usize {
        let idx = self.blocks.len();
        log::debug!("line {line_num}: starting block {idx}");
        self.blocks.push(Block::new());
        self.current = Some(idx);
        idx
    }

    fn flush_row(&mut self) {
        let mut row = std::mem::take(&mut self.row);
        row.trim_trailing_empty();
        if let Some(idx) = self.current {
            self.blocks[idx].append(row);
        }
    }

    fn finish(mut self) -> Document {
        self.flush_row();
        self.blocks.into_iter().collect()
    }
}

fn trim_field(field: &str) -> &str {
    field.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}
