//! In-memory model of a parsed punch file.
//!
//! A punch file is a sequence of [`Block`]s. Each block starts with a run of
//! `$` comment lines (its *prefix*, a set of `key = value` annotations) followed
//! by data rows of the same shape. Conceptually a block is a table made of four parts:
//!
//! ```text
//!    (n columns)      (m columns)
//! :----------------:---------------:
//! : prefix keys    : column header : (1 line)
//! :----------------:---------------:
//! :                : row 1         :
//! : prefix values  : row 2         :
//! : (repeated)     : ...           : (r lines)
//! :                : row r         :
//! :----------------:---------------:
//! ```
//!
//! Blocks with the same prefix keys and the same number of columns share a
//! [`Fingerprint`] and can be written out as one continuous table. A [`Document`]
//! stores its blocks grouped by that fingerprint:
//!
//! ```
//! use pch2csv::record::{Block, Document, Row};
//!
//! let mut first = Block::new();
//! first.insert_prefix("SUBCASE ID", "1");
//! first.append(Row::from_fields(["80004230", "-3.404367E+03"]));
//!
//! let mut second = Block::new();
//! second.insert_prefix("SUBCASE ID", "2");
//! second.append(Row::from_fields(["80004231", "7.232352E+04"]));
//!
//! let doc: Document = [first, second].into_iter().collect();
//! assert_eq!(doc.group_count(), 1);
//! let fp = doc.fingerprints().next().unwrap();
//! assert_eq!(fp.as_str(), "SUBCASE ID,2");
//! assert_eq!(doc.blocks_for(fp).count(), 2);
//! ```
use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::AddAssign;

/// One logical data row: the trimmed fields of a punch line and its `-CONT-` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from any sequence of string-like fields.
    pub fn from_fields<I, S>(fields: I) -> Self
    where I: IntoIterator<Item = S>,
          S: Into<String>
    {
        Self { fields: fields.into_iter().map(Into::into).collect() }
    }

    pub fn push<S: Into<String>>(&mut self, field: S) {
        self.fields.push(field.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.fields.iter()
    }

    /// Remove every empty field from the end of the row.
    ///
    /// A row holding only empty fields ends up with no fields at all.
    pub fn trim_trailing_empty(&mut self) {
        while self.fields.last().is_some_and(|f| f.is_empty()) {
            self.fields.pop();
        }
    }
}

impl<S: Into<String>> Extend<S> for Row {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.fields.extend(iter.into_iter().map(Into::into));
    }
}

impl<'r> IntoIterator for &'r Row {
    type Item = &'r String;
    type IntoIter = std::slice::Iter<'r, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Key summarizing the shape of a [`Block`]: its prefix keys plus its column count.
///
/// For example, a block with the prefix keys `LABEL` and `TITLE` whose first row has
/// 7 fields has the fingerprint `"LABEL,TITLE,7"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A run of rows sharing the same `$` prefix annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    prefix: BTreeMap<String, String>,
    rows: Vec<Row>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a prefix annotation.
    pub fn insert_prefix<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.prefix.insert(key.into(), value.into());
    }

    /// Add a row to the block. Empty rows are ignored.
    ///
    /// Rows are not checked against the block's column count; a row of a different
    /// width is kept and written as-is.
    pub fn append(&mut self, row: Row) {
        if row.is_empty() {
            return;
        }
        self.rows.push(row);
    }

    /// Prefix annotations, iterated in key order.
    pub fn prefix(&self) -> &BTreeMap<String, String> {
        &self.prefix
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn prefix_count(&self) -> usize {
        self.prefix.len()
    }

    /// Number of fields in the first row, or 0 for a block with no rows.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Compute the block's current fingerprint.
    ///
    /// This is recomputed on every call, so it always reflects the current
    /// prefix keys and first-row width.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut key = String::new();
        for name in self.prefix.keys() {
            key.push_str(name);
            key.push(',');
        }
        key.push_str(&self.column_count().to_string());
        Fingerprint(key)
    }
}

/// All the blocks of one or more punch files, grouped by [`Fingerprint`].
///
/// Blocks live in an arena in insertion order; each fingerprint maps to the
/// indices of its blocks. The fingerprint is computed once, when the block
/// is appended.
#[derive(Debug, Clone, Default)]
pub struct Document {
    blocks: Vec<Block>,
    groups: BTreeMap<Fingerprint, Vec<usize>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block under its current fingerprint.
    pub fn append(&mut self, block: Block) {
        let fp = block.fingerprint();
        let idx = self.blocks.len();
        self.blocks.push(block);
        self.groups.entry(fp).or_default().push(idx);
    }

    /// Move every block of `other` into this document.
    ///
    /// Nothing is deduplicated: identical blocks from both documents are all kept,
    /// and within each fingerprint group `other`'s blocks come after this document's.
    pub fn merge(&mut self, other: Document) {
        self.extend(other.blocks);
    }

    /// Distinct fingerprints, in lexicographic order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.groups.keys()
    }

    /// Blocks sharing `fp`, in the order they were appended.
    pub fn blocks_for<'d>(&'d self, fp: &Fingerprint) -> impl Iterator<Item = &'d Block> + 'd {
        let indices = self.groups.get(fp).map(|v| v.as_slice()).unwrap_or(&[]);
        indices.iter().map(move |&i| &self.blocks[i])
    }

    /// Iterate over each fingerprint together with its blocks.
    pub fn groups(&self) -> impl Iterator<Item = (&Fingerprint, Vec<&Block>)> {
        self.groups.iter()
            .map(move |(fp, indices)| (fp, indices.iter().map(move |&i| &self.blocks[i]).collect()))
    }

    /// Every block, group by group in fingerprint order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.groups.values().flatten().map(move |&i| &self.blocks[i])
    }

    /// Total number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of distinct fingerprints.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl Extend<Block> for Document {
    fn extend<T: IntoIterator<Item = Block>>(&mut self, iter: T) {
        for block in iter {
            self.append(block);
        }
    }
}

impl FromIterator<Block> for Document {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        let mut doc = Document::new();
        doc.extend(iter);
        doc
    }
}

impl AddAssign for Document {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(keys: &[(&str, &str)], rows: &[&[&str]]) -> Block {
        let mut b = Block::new();
        for (k, v) in keys {
            b.insert_prefix(*k, *v);
        }
        for r in rows {
            b.append(Row::from_fields(r.iter().copied()));
        }
        b
    }

    #[test]
    fn test_trim_trailing_empty() {
        let mut row = Row::from_fields(["a", "", "b", "", ""]);
        row.trim_trailing_empty();
        assert_eq!(row.fields(), &["a", "", "b"], "Only trailing empty fields should be removed");

        let mut row = Row::from_fields(["", ""]);
        row.trim_trailing_empty();
        assert!(row.is_empty(), "A row of empty fields should become empty");
    }

    #[test]
    fn test_append_ignores_empty_rows() {
        let mut b = Block::new();
        b.append(Row::new());
        assert_eq!(b.row_count(), 0);
        b.append(Row::from_fields(["x"]));
        b.append(Row::from_fields(["x", "y", "z"]));
        assert_eq!(b.row_count(), 2, "Rows of a different width should still be kept");
        assert_eq!(b.column_count(), 1, "Column count comes from the first row");
    }

    #[test]
    fn test_insert_prefix_overwrites() {
        let mut b = Block::new();
        b.insert_prefix("TITLE", "first");
        b.insert_prefix("TITLE", "second");
        assert_eq!(b.prefix_count(), 1);
        assert_eq!(b.prefix().get("TITLE").map(String::as_str), Some("second"));
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(Block::new().fingerprint().as_str(), "0");

        let b = block(&[("TITLE", "t"), ("LABEL", "l")], &[&["1", "2", "3"]]);
        assert_eq!(b.fingerprint().as_str(), "LABEL,TITLE,3", "Keys should be in sorted order");

        // Values do not take part in the fingerprint
        let c = block(&[("TITLE", "other"), ("LABEL", "other")], &[&["4", "5", "6"]]);
        assert_eq!(b.fingerprint(), c.fingerprint());

        let d = block(&[("TITLE", "t"), ("LABEL", "l")], &[&["1", "2"]]);
        assert_ne!(b.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_not_cached() {
        let mut b = Block::new();
        let before = b.fingerprint();
        b.insert_prefix("SUBCASE ID", "1");
        b.append(Row::from_fields(["a", "b"]));
        assert_ne!(before, b.fingerprint());
        assert_eq!(b.fingerprint().as_str(), "SUBCASE ID,2");
    }

    #[test]
    fn test_document_grouping() {
        let mut doc = Document::new();
        doc.append(block(&[("A", "1")], &[&["x", "y"]]));
        doc.append(block(&[], &[&["x"]]));
        doc.append(block(&[("A", "2")], &[&["z", "w"]]));

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.group_count(), 2);

        let fps: Vec<_> = doc.fingerprints().map(|f| f.as_str().to_owned()).collect();
        assert_eq!(fps, vec!["1".to_owned(), "A,2".to_owned()], "Fingerprints should be sorted");

        let fp = doc.fingerprints().nth(1).unwrap().clone();
        let values: Vec<_> = doc.blocks_for(&fp)
            .map(|b| b.prefix()["A"].clone())
            .collect();
        assert_eq!(values, vec!["1", "2"], "Blocks should keep their insertion order");

        let all: Vec<_> = doc.blocks().map(|b| b.column_count()).collect();
        assert_eq!(all, vec![1, 2, 2]);
    }

    #[test]
    fn test_blocks_for_unknown_fingerprint() {
        let doc = Document::new();
        let fp = Block::new().fingerprint();
        assert_eq!(doc.blocks_for(&fp).count(), 0);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_merge_keeps_duplicates() {
        let mut a = Document::new();
        a.append(block(&[("K", "a1")], &[&["1"]]));

        let mut b = Document::new();
        b.append(block(&[("K", "b1")], &[&["1"]]));
        b.append(block(&[("K", "b2")], &[&["1"]]));
        b.append(block(&[], &[&["1", "2"]]));

        a += b;
        assert_eq!(a.len(), 4);
        assert_eq!(a.group_count(), 2);

        let groups: Vec<_> = a.groups()
            .map(|(fp, blocks)| (fp.to_string(), blocks.len()))
            .collect();
        assert_eq!(groups, vec![("2".to_owned(), 1), ("K,1".to_owned(), 3)]);

        let fp = Fingerprint("K,1".to_owned());
        let values: Vec<_> = a.blocks_for(&fp).map(|b| b.prefix()["K"].as_str()).collect();
        assert_eq!(values, vec!["a1", "b1", "b2"]);
    }
}
