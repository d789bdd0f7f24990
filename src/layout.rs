//! Describe the column layout of a punch line.
//!
//! Punch files are written by Fortran programs, so every physical line follows a
//! fixed set of edit descriptors. The standard Nastran punch line is four 18-character
//! fields followed by an 8-character sequence number, i.e. `(4a18,8x)`:
//!
//! ```
//! # use pch2csv::layout::LineLayout;
//! let layout = LineLayout::parse("(4a18,8x)").unwrap();
//! assert_eq!(layout.record_width(), 80);
//! assert_eq!(layout.field_count(), 4);
//! assert_eq!(layout.trailer_width(), 8);
//! assert_eq!(layout, LineLayout::default());
//! ```
//!
//! Only character fields (`a<w>`) and skips (`x`) are understood. Repeat counts and
//! nested groups are expanded, so `(2(a10,1x))` is the same as `(a10,x,a10,x)`.
use std::fmt::Display;

use itertools::Itertools;
use pest::{iterators::Pair, Parser, RuleType};

/// A type alias for `Result` with [`LayoutError`] as the error type.
pub type LResult<T> = std::result::Result<T, LayoutError>;

/// Represents an error in parsing a layout string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout string does not follow the edit descriptor grammar.
    Syntax(String),
    /// A repeat count or width did not fit in a `usize`.
    Overflow(String),
    /// The layout has no `a` field, so no data could ever be read.
    NoDataFields,
}

impl<R: RuleType> From<pest::error::Error<R>> for LayoutError {
    fn from(value: pest::error::Error<R>) -> Self {
        Self::Syntax(value.to_string())
    }
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Syntax(msg) => write!(f, "Layout parsing error: {msg}"),
            LayoutError::Overflow(s) => write!(f, "Layout value '{s}' is too large"),
            LayoutError::NoDataFields => write!(f, "Layout has no character (a) fields"),
        }
    }
}

impl std::error::Error for LayoutError {}

#[derive(Parser)]
#[grammar = "layout.pest"]
pub(crate) struct LayoutParser;

/// One entry of a line layout, i.e. one `a<w>` or one `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutField {
    /// A data column `width` characters wide.
    Text { width: usize },
    /// One ignored column.
    Skip,
}

impl LayoutField {
    /// Number of columns this entry occupies.
    pub fn width(&self) -> usize {
        match self {
            LayoutField::Text { width } => *width,
            LayoutField::Skip => 1,
        }
    }

    /// `true` for a skip, `false` for a data column.
    pub fn is_positional(&self) -> bool {
        matches!(self, LayoutField::Skip)
    }
}

impl Display for LayoutField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutField::Text { width } => write!(f, "a{width}"),
            LayoutField::Skip => write!(f, "x"),
        }
    }
}

/// The full column layout of one punch line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout {
    fields: Vec<LayoutField>,
}

impl Default for LineLayout {
    fn default() -> Self {
        let mut fields = vec![LayoutField::Text { width: 18 }; 4];
        fields.extend(std::iter::repeat(LayoutField::Skip).take(8));
        Self { fields }
    }
}

impl Display for LineLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.fields.iter().join(",");
        write!(f, "({inner})")
    }
}

impl LineLayout {
    /// Parse a layout string such as `"(4a18,8x)"`.
    ///
    /// The outer parentheses are optional, commas between entries are optional,
    /// and whitespace is ignored. Returns an error if the string has invalid syntax
    /// or contains no data (`a`) fields.
    pub fn parse(layout_str: &str) -> LResult<Self> {
        let mut fields = vec![];
        let tree = LayoutParser::parse(Rule::layout, layout_str)?
            .next()
            .ok_or_else(|| LayoutError::Syntax(format!("empty layout '{layout_str}'")))?;

        let mut stack: Vec<_> = tree.into_inner().rev().collect();
        let mut next_repeat: usize = 1;

        while let Some(pair) = stack.pop() {
            let kind = match pair.as_rule() {
                // End of string, exit the loop
                Rule::EOI => break,

                Rule::repeat => {
                    next_repeat = parse_count(pair.as_str())?;
                    continue;
                },

                Rule::item => {
                    for inner in pair.into_inner().rev() {
                        stack.push(inner);
                    }
                    continue;
                },

                Rule::group => {
                    for _ in 0..next_repeat {
                        for inner in pair.clone().into_inner().rev() {
                            stack.push(inner);
                        }
                    }
                    next_repeat = 1;
                    continue;
                },

                Rule::skip => LayoutField::Skip,
                Rule::text => LayoutField::Text { width: consume_width_from_pair(pair)? },

                // Widths only appear inside a text rule and the layout rule is the root
                _ => return Err(LayoutError::Syntax(format!("unexpected '{}'", pair.as_str()))),
            };

            for _ in 0..next_repeat {
                fields.push(kind);
            }
            next_repeat = 1;
        }

        if fields.iter().all(|f| f.is_positional()) {
            return Err(LayoutError::NoDataFields);
        }

        Ok(Self { fields })
    }

    /// Iterate over every entry of the layout, skips included.
    pub fn iter_fields(&self) -> std::slice::Iter<'_, LayoutField> {
        self.fields.iter()
    }

    /// Total number of columns a line must have.
    pub fn record_width(&self) -> usize {
        self.fields.iter().map(|f| f.width()).sum()
    }

    /// Number of data (`a`) fields on a line.
    pub fn field_count(&self) -> usize {
        self.fields.iter().filter(|f| !f.is_positional()).count()
    }

    /// Number of skipped columns at the end of the line (the sequence number).
    pub fn trailer_width(&self) -> usize {
        self.fields.iter().rev().take_while(|f| f.is_positional()).count()
    }

    /// Column (exclusive) where the value of a `$key = value` line stops.
    ///
    /// This is the record width minus the trailing sequence number and the
    /// one separating column before it, i.e. 71 for the standard layout.
    pub fn meta_value_end(&self) -> usize {
        self.record_width()
            .saturating_sub(self.trailer_width())
            .saturating_sub(1)
    }

    /// Cut `line` into the raw text of each data field, in order.
    ///
    /// Columns are counted in characters. A line shorter than the layout yields
    /// truncated (possibly empty) fields rather than an error; checking the width
    /// is up to the caller.
    pub fn split<'l>(&self, line: &'l str) -> Vec<&'l str> {
        let columns = Columns::new(line);
        let mut out = Vec::with_capacity(self.field_count());
        let mut col = 0;
        for field in self.fields.iter() {
            let next = col + field.width();
            if let LayoutField::Text { .. } = field {
                out.push(columns.slice(col, next));
            }
            col = next;
        }
        out
    }
}

/// Character-column view of a line, so that slicing never splits a UTF-8 sequence.
pub(crate) struct Columns<'l> {
    line: &'l str,
    bounds: Vec<usize>,
}

impl<'l> Columns<'l> {
    pub(crate) fn new(line: &'l str) -> Self {
        let bounds = line.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(line.len()))
            .collect();
        Self { line, bounds }
    }

    /// Number of characters in the line.
    pub(crate) fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    /// Characters `start..end`, clamped to the end of the line.
    pub(crate) fn slice(&self, start: usize, end: usize) -> &'l str {
        let n = self.len();
        let start = self.bounds[start.min(n)];
        let end = self.bounds[end.min(n)];
        if start >= end {
            ""
        } else {
            &self.line[start..end]
        }
    }

    /// Column of the first occurrence of `c`.
    pub(crate) fn find(&self, c: char) -> Option<usize> {
        self.line.chars().position(|x| x == c)
    }
}

fn parse_count(s: &str) -> LResult<usize> {
    s.parse().map_err(|_| LayoutError::Overflow(s.to_owned()))
}

fn consume_width_from_pair(pair: Pair<Rule>) -> LResult<usize> {
    let text = pair.as_str().to_owned();
    let width = pair.into_inner()
        .find(|p| p.as_rule() == Rule::width)
        .ok_or_else(|| LayoutError::Syntax(format!("missing width in '{text}'")))?;
    parse_count(width.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() -> LResult<()> {
        let layout = LineLayout::parse("(4a18,8x)")?;
        assert_eq!(layout, LineLayout::default(), "Parsing '(4a18,8x)' did not match the default layout");
        assert_eq!(layout.record_width(), 80);
        assert_eq!(layout.field_count(), 4);
        assert_eq!(layout.trailer_width(), 8);
        assert_eq!(layout.meta_value_end(), 71);
        Ok(())
    }

    #[test]
    fn test_surrounding_whitespace() -> LResult<()> {
        LineLayout::parse(" (a4) \n")?;
        LineLayout::parse(" (a4) \r")?;
        LineLayout::parse(" (a4, 2x) \r\n")?;
        Ok(())
    }

    #[test]
    fn test_optional_parens_and_commas() -> LResult<()> {
        let a = LineLayout::parse("4a18 8x")?;
        let b = LineLayout::parse("(a18,a18,a18,a18,x,x,x,x,x,x,x,x)")?;
        assert_eq!(a, b);
        assert_eq!(a, LineLayout::default());
        Ok(())
    }

    #[test]
    fn test_nested_groups() -> LResult<()> {
        let v: Vec<_> = LineLayout::parse("(2(a3 2(1x a1)))")?.iter_fields().copied().collect();
        let one = vec![
            LayoutField::Text { width: 3 },
            LayoutField::Skip,
            LayoutField::Text { width: 1 },
            LayoutField::Skip,
            LayoutField::Text { width: 1 },
        ];
        assert_eq!(v, one.repeat(2), "Nested groups were not expanded correctly");
        Ok(())
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(LineLayout::parse("").is_err(), "An empty layout did not return an error");
        assert!(LineLayout::parse("(a)").is_err(), "A character field without width did not return an error");
        assert!(LineLayout::parse("(a0)").is_err(), "A zero width did not return an error");
        assert!(LineLayout::parse("(i8)").is_err(), "An integer field did not return an error");
        assert!(LineLayout::parse("(a4").is_err(), "An unclosed group did not return an error");
        assert_eq!(LineLayout::parse("(8x)"), Err(LayoutError::NoDataFields));
        assert!(matches!(LineLayout::parse("(99999999999999999999999a1)"), Err(LayoutError::Overflow(_))));
    }

    #[test]
    fn test_display_round_trip() -> LResult<()> {
        let layout = LineLayout::parse("(2a3,2x)")?;
        assert_eq!(layout.to_string(), "(a3,a3,x,x)");
        assert_eq!(LineLayout::parse(&layout.to_string())?, layout);
        Ok(())
    }

    #[test]
    fn test_split() {
        let layout = LineLayout::default();
        let line = "AAAAAAAAAAAAAAAAAABBBBBBBBBBBBBBBBBBCCCCCCCCCCCCCCCCCCDDDDDDDDDDDDDDDDDD99999999";
        let fields = layout.split(line);
        assert_eq!(fields, vec![
            "AAAAAAAAAAAAAAAAAA",
            "BBBBBBBBBBBBBBBBBB",
            "CCCCCCCCCCCCCCCCCC",
            "DDDDDDDDDDDDDDDDDD",
        ]);

        let fields = layout.split("short");
        assert_eq!(fields, vec!["short", "", "", ""], "A short line should give truncated fields");
    }

    #[test]
    fn test_columns_are_characters() {
        let layout = LineLayout::parse("(a2,a2)").unwrap();
        assert_eq!(layout.split("éàü!"), vec!["éà", "ü!"]);

        let cols = Columns::new("$é=x");
        assert_eq!(cols.len(), 4);
        assert_eq!(cols.find('='), Some(2));
        assert_eq!(cols.slice(1, 2), "é");
        assert_eq!(cols.slice(3, 100), "x");
        assert_eq!(cols.slice(5, 2), "");
    }
}
