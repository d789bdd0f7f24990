//! Convert Nastran punch (`.pch`) output to semicolon-separated CSV.
//!
//! The [`reader`] turns punch text into a [`record::Document`] of blocks grouped by
//! shape, and the [`writer`] renders those blocks as CSV. [`convert`] ties both to
//! files on disk for the `pch2csv` command line tool.
//!
//! ```
//! let input = concat!(
//!     "$TITLE = demo                                                                  1\n",
//!     "AAAAAAAAAAAAAAAAAABBBBBBBBBBBBBBBBBBCCCCCCCCCCCCCCCCCCDDDDDDDDDDDDDDDDDD       2\n",
//! );
//! let (doc, warnings) = pch2csv::reader::from_str(input);
//! assert!(warnings.is_empty());
//!
//! let csv = pch2csv::writer::to_string(&doc, Default::default());
//! assert_eq!(csv, concat!(
//!     "\"TITLE\";\"unknown\";\"unknown\";\"unknown\";\"unknown\";\n",
//!     "\"demo\";\"AAAAAAAAAAAAAAAAAA\";\"BBBBBBBBBBBBBBBBBB\";\"CCCCCCCCCCCCCCCCCC\";\"DDDDDDDDDDDDDDDDDD\";\n",
//! ));
//! ```
extern crate pest;
#[macro_use]
extern crate pest_derive;
pub mod convert;
pub mod files;
pub mod layout;
pub mod punch_error;
pub mod reader;
pub mod record;
pub mod warnings;
pub mod writer;
