//! Write [`Block`]s as semicolon-separated CSV.
//!
//! Every cell is wrapped in double quotes and followed by a `;`, including the last
//! one on a line. Nothing is escaped: punch values never contain either character.
//! Each row is preceded by the values of its block's prefix, so a block
//!
//! ```text
//! $SUBCASE ID = 1
//! 80004230   -3.404367E+03
//! ```
//!
//! becomes
//!
//! ```text
//! "SUBCASE ID";"unknown";"unknown";
//! "1";"80004230";"-3.404367E+03";
//! ```
//!
//! A [`Writer`] remembers the last header it computed and does not repeat it, so
//! consecutive blocks of the same shape read as a single table:
//!
//! ```
//! use pch2csv::record::{Block, Row};
//! use pch2csv::writer::Writer;
//!
//! let mut page1 = Block::new();
//! page1.insert_prefix("SUBCASE ID", "1");
//! page1.append(Row::from_fields(["80004230", "-3.404367E+03"]));
//! let mut page2 = Block::new();
//! page2.insert_prefix("SUBCASE ID", "2");
//! page2.append(Row::from_fields(["80004231", "7.232352E+04"]));
//!
//! let mut out = vec![];
//! let mut writer = Writer::default();
//! writer.write_blocks([&page1, &page2], &mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), concat!(
//!     "\"SUBCASE ID\";\"unknown\";\"unknown\";\n",
//!     "\"1\";\"80004230\";\"-3.404367E+03\";\n",
//!     "\"2\";\"80004231\";\"7.232352E+04\";\n",
//! ));
//! ```
use std::io::Write;

use itertools::Itertools;

use crate::record::{Block, Document};

const QUOTE: char = '"';
const SEPARATOR: char = ';';
const LINE_END: &str = "\n";

/// Label used for every data column in the default header.
pub const UNKNOWN_COLUMN: &str = "unknown";

/// What to print when a block needs a header line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Quoted prefix keys followed by one `"unknown"` per data column.
    #[default]
    Default,
    /// Quoted prefix keys followed by this text, printed as is.
    Literal(String),
    /// Never print a header.
    Skip,
}

impl HeaderPolicy {
    /// Build a policy from the command line options. `skip` wins over a literal
    /// header, and an empty literal means the default header.
    pub fn from_options(column_header: Option<&str>, skip: bool) -> Self {
        match (column_header, skip) {
            (_, true) => Self::Skip,
            (Some(text), false) if !text.is_empty() => Self::Literal(text.to_owned()),
            _ => Self::Default,
        }
    }
}

/// Stateful CSV writer.
///
/// The header de-duplication state belongs to the instance; two writers never
/// affect each other's output.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    policy: HeaderPolicy,
    previous_header: String,
}

impl Writer {
    pub fn new(policy: HeaderPolicy) -> Self {
        Self { policy, previous_header: String::new() }
    }

    pub fn policy(&self) -> &HeaderPolicy {
        &self.policy
    }

    /// The default header of the last block written, empty before the first one.
    ///
    /// This is always the computed header, whatever the policy actually printed.
    pub fn previous_header(&self) -> &str {
        &self.previous_header
    }

    /// Write the header (unless it repeats the previous block's) and all rows of `block`.
    pub fn write_block<W: Write>(&mut self, block: &Block, out: &mut W) -> std::io::Result<()> {
        let text = self.render_block(block);
        out.write_all(text.as_bytes())
    }

    /// Write several blocks in order, sharing the header state between them.
    pub fn write_blocks<'b, I, W>(&mut self, blocks: I, out: &mut W) -> std::io::Result<()>
    where I: IntoIterator<Item = &'b Block>,
          W: Write
    {
        for block in blocks {
            self.write_block(block, out)?;
        }
        Ok(())
    }

    /// Write every block of `doc`, group after group in fingerprint order.
    pub fn write_document<W: Write>(&mut self, doc: &Document, out: &mut W) -> std::io::Result<()> {
        self.write_blocks(doc.blocks(), out)
    }

    fn render_block(&mut self, block: &Block) -> String {
        let prefix_header = quoted(block.prefix().keys().map(String::as_str));
        let prefix_row = quoted(block.prefix().values().map(String::as_str));
        let column_header = quoted(std::iter::repeat(UNKNOWN_COLUMN).take(block.column_count()));
        let default_header = format!("{prefix_header}{column_header}");

        let mut text = String::new();
        if default_header != self.previous_header {
            match &self.policy {
                HeaderPolicy::Skip => (),
                HeaderPolicy::Literal(literal) => {
                    text.push_str(&prefix_header);
                    text.push_str(literal);
                    text.push_str(LINE_END);
                },
                HeaderPolicy::Default => {
                    text.push_str(&default_header);
                    text.push_str(LINE_END);
                },
            }
            self.previous_header = default_header;
        }

        for row in block.rows() {
            text.push_str(&prefix_row);
            text.push_str(&quoted(row.iter().map(String::as_str)));
            text.push_str(LINE_END);
        }
        text
    }
}

/// Render a whole document with a fresh [`Writer`].
pub fn to_string(doc: &Document, policy: HeaderPolicy) -> String {
    let mut writer = Writer::new(policy);
    doc.blocks().map(|block| writer.render_block(block)).collect()
}

/// Like [`to_string`], but returns the bytes of the CSV text.
pub fn to_bytes(doc: &Document, policy: HeaderPolicy) -> Vec<u8> {
    to_string(doc, policy).into_bytes()
}

/// `"a";"b";"c";` for the cells `a`, `b`, `c`, and the empty string for no cells.
fn quoted<'s, I: Iterator<Item = &'s str>>(cells: I) -> String {
    let mut cells = cells.peekable();
    if cells.peek().is_none() {
        return String::new();
    }
    let inner = cells.join(&format!("{QUOTE}{SEPARATOR}{QUOTE}"));
    format!("{QUOTE}{inner}{QUOTE}{SEPARATOR}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader;
    use crate::record::Row;

    fn block(prefix: &[(&str, &str)], rows: &[&[&str]]) -> Block {
        let mut block = Block::new();
        for (k, v) in prefix {
            block.insert_prefix(*k, *v);
        }
        for row in rows {
            block.append(Row::from_fields(row.iter().copied()));
        }
        block
    }

    fn write_all(writer: &mut Writer, blocks: &[&Block]) -> std::io::Result<String> {
        let mut out = vec![];
        writer.write_blocks(blocks.iter().copied(), &mut out)?;
        Ok(String::from_utf8(out).expect("CSV output was not UTF-8"))
    }

    #[test]
    fn test_quoted() {
        assert_eq!(quoted(["a", "b", "c"].into_iter()), "\"a\";\"b\";\"c\";");
        assert_eq!(quoted(["a"].into_iter()), "\"a\";");
        assert_eq!(quoted(["", ""].into_iter()), "\"\";\"\";");
        assert_eq!(quoted(std::iter::empty()), "");
    }

    #[test]
    fn test_header_policy_from_options() {
        assert_eq!(HeaderPolicy::from_options(None, false), HeaderPolicy::Default);
        assert_eq!(HeaderPolicy::from_options(Some(""), false), HeaderPolicy::Default);
        assert_eq!(HeaderPolicy::from_options(Some("a;b;"), false), HeaderPolicy::Literal("a;b;".to_owned()));
        assert_eq!(HeaderPolicy::from_options(Some("a;b;"), true), HeaderPolicy::Skip);
        assert_eq!(HeaderPolicy::from_options(None, true), HeaderPolicy::Skip);
    }

    #[test]
    fn test_single_line_example() -> std::io::Result<()> {
        let line = "AAAAAAAAAAAAAAAAAABBBBBBBBBBBBBBBBBBCCCCCCCCCCCCCCCCCCDDDDDDDDDDDDDDDDDD99999999\n";
        let (doc, _) = reader::from_str(line);
        let mut out = vec![];
        Writer::default().write_document(&doc, &mut out)?;

        let expected = concat!(
            "\"unknown\";\"unknown\";\"unknown\";\"unknown\";\n",
            "\"AAAAAAAAAAAAAAAAAA\";\"BBBBBBBBBBBBBBBBBB\";\"CCCCCCCCCCCCCCCCCC\";\"DDDDDDDDDDDDDDDDDD\";\n",
        );
        assert_eq!(String::from_utf8_lossy(&out), expected);
        Ok(())
    }

    #[test]
    fn test_prefix_columns() -> std::io::Result<()> {
        let b = block(&[("TITLE", "Nastran"), ("ELEMENT TYPE", "33 QUAD4")], &[&["1", "2"], &["3", "4"]]);
        let text = write_all(&mut Writer::default(), &[&b])?;

        // prefix keys come out sorted
        let expected = concat!(
            "\"ELEMENT TYPE\";\"TITLE\";\"unknown\";\"unknown\";\n",
            "\"33 QUAD4\";\"Nastran\";\"1\";\"2\";\n",
            "\"33 QUAD4\";\"Nastran\";\"3\";\"4\";\n",
        );
        assert_eq!(text, expected);
        Ok(())
    }

    #[test]
    fn test_header_written_once_for_same_shape() -> std::io::Result<()> {
        let first = block(&[("SUBCASE ID", "1")], &[&["a", "b"]]);
        let second = block(&[("SUBCASE ID", "2")], &[&["c", "d"]]);
        let other = block(&[("SUBCASE ID", "3")], &[&["e", "f", "g"]]);

        let mut writer = Writer::default();
        let text = write_all(&mut writer, &[&first, &second, &other, &first])?;
        let expected = concat!(
            "\"SUBCASE ID\";\"unknown\";\"unknown\";\n",
            "\"1\";\"a\";\"b\";\n",
            "\"2\";\"c\";\"d\";\n",
            "\"SUBCASE ID\";\"unknown\";\"unknown\";\"unknown\";\n",
            "\"3\";\"e\";\"f\";\"g\";\n",
            "\"SUBCASE ID\";\"unknown\";\"unknown\";\n",
            "\"1\";\"a\";\"b\";\n",
        );
        assert_eq!(text, expected);
        assert_eq!(writer.previous_header(), "\"SUBCASE ID\";\"unknown\";\"unknown\";");
        Ok(())
    }

    #[test]
    fn test_literal_header() -> std::io::Result<()> {
        let first = block(&[("SUBCASE ID", "1")], &[&["a", "b"]]);
        let second = block(&[("SUBCASE ID", "2")], &[&["c", "d"]]);
        let mut writer = Writer::new(HeaderPolicy::Literal("ID;VALUE;".to_owned()));
        let text = write_all(&mut writer, &[&first, &second])?;

        let expected = concat!(
            "\"SUBCASE ID\";ID;VALUE;\n",
            "\"1\";\"a\";\"b\";\n",
            "\"2\";\"c\";\"d\";\n",
        );
        assert_eq!(text, expected);
        assert_eq!(writer.previous_header(), "\"SUBCASE ID\";\"unknown\";\"unknown\";",
                   "The remembered header should be the computed one, not the literal");
        Ok(())
    }

    #[test]
    fn test_skip_header() -> std::io::Result<()> {
        let first = block(&[("SUBCASE ID", "1")], &[&["a", "b"]]);
        let other = block(&[], &[&["c"]]);
        let text = write_all(&mut Writer::new(HeaderPolicy::Skip), &[&first, &other])?;
        assert_eq!(text, "\"1\";\"a\";\"b\";\n\"c\";\n");
        Ok(())
    }

    #[test]
    fn test_block_without_rows() -> std::io::Result<()> {
        let header_only = block(&[("TITLE", "x")], &[]);
        let text = write_all(&mut Writer::default(), &[&header_only])?;
        assert_eq!(text, "\"TITLE\";\n");

        let empty = Block::new();
        let text = write_all(&mut Writer::default(), &[&empty])?;
        assert_eq!(text, "", "An empty block should not print an empty header line");
        Ok(())
    }

    #[test]
    fn test_fresh_writers_are_independent() -> std::io::Result<()> {
        let b = block(&[("SUBCASE ID", "1")], &[&["a", "b"]]);
        let first = write_all(&mut Writer::default(), &[&b])?;
        let second = write_all(&mut Writer::default(), &[&b])?;
        assert_eq!(first, second);
        assert!(first.starts_with("\"SUBCASE ID\""), "A fresh writer should print the header");
        Ok(())
    }

    #[test]
    fn test_document_to_string() {
        let doc: Document = [
            block(&[("TITLE", "t1")], &[&["a"]]),
            block(&[("ELEMENT TYPE", "e1")], &[&["b"]]),
            block(&[("TITLE", "t2")], &[&["c"]]),
        ].into_iter().collect();

        // groups come out in fingerprint order: "ELEMENT TYPE,1" before "TITLE,1"
        let expected = concat!(
            "\"ELEMENT TYPE\";\"unknown\";\n",
            "\"e1\";\"b\";\n",
            "\"TITLE\";\"unknown\";\n",
            "\"t1\";\"a\";\n",
            "\"t2\";\"c\";\n",
        );
        assert_eq!(to_string(&doc, HeaderPolicy::Default), expected);
        assert_eq!(to_bytes(&doc, HeaderPolicy::Skip), b"\"e1\";\"b\";\n\"t1\";\"a\";\n\"t2\";\"c\";\n");
    }
}
