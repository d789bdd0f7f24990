//! Convert punch files on disk to CSV files.
//!
//! [`read_inputs`] parses every input file and merges the results into one
//! [`Document`]; [`write_outputs`] writes that document either as a single CSV or as
//! one CSV per fingerprint. Problems with the inputs are reported and skipped, while
//! failing to produce an output is an error.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use error_stack::ResultExt;

use crate::files::{backup_existing, format_increment};
use crate::reader::{PunchReader, ReadSettings};
use crate::record::{Block, Document};
use crate::warnings::Warnings;
use crate::writer::{HeaderPolicy, Writer};

/// Type alias for an `error_stack` result carrying a [`ConvertError`].
pub type ConvertResult<T> = error_stack::Result<T, ConvertError>;

/// Why an output file could not be produced. The path involved is attached to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertError {
    /// An existing file could not be moved out of the way.
    Backup,
    /// The output file could not be created.
    Create,
    /// Writing or flushing the output failed.
    Write,
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::Backup => write!(f, "Could not back up the existing output file"),
            ConvertError::Create => write!(f, "Could not create the output file"),
            ConvertError::Write => write!(f, "Could not write the output file"),
        }
    }
}

impl std::error::Error for ConvertError {}

/// How the converted blocks are spread over output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One CSV holding every group, in fingerprint order.
    Unique,
    /// One CSV per fingerprint.
    #[default]
    PerFingerprint,
}

/// Options for a conversion run, in the same builder style as [`ReadSettings`].
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    header: HeaderPolicy,
    mode: OutputMode,
    read: ReadSettings,
}

impl ConvertOptions {
    pub fn header(mut self, header: HeaderPolicy) -> Self {
        self.header = header;
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn read_settings(mut self, read: ReadSettings) -> Self {
        self.read = read;
        self
    }

    pub fn get_header(&self) -> &HeaderPolicy {
        &self.header
    }

    pub fn get_mode(&self) -> OutputMode {
        self.mode
    }

    pub fn get_read_settings(&self) -> &ReadSettings {
        &self.read
    }
}

/// Everything read from the input files.
#[derive(Debug, Default)]
pub struct Inputs {
    /// All parsed blocks, merged in input order.
    pub document: Document,
    /// The warnings of each input that could be parsed.
    pub warnings: Vec<(PathBuf, Warnings)>,
    /// Inputs that could not be read, with the reason.
    pub unreadable: Vec<(PathBuf, String)>,
}

impl Inputs {
    /// Total number of warnings over all inputs.
    pub fn warning_count(&self) -> usize {
        self.warnings.iter().map(|(_, w)| w.len()).sum()
    }
}

/// Parse each of `paths` in order and merge them into one document.
///
/// An input that cannot be opened or read is logged, listed in
/// [`Inputs::unreadable`] and contributes nothing.
pub fn read_inputs<P: AsRef<Path>>(paths: &[P], settings: &ReadSettings) -> Inputs {
    let mut inputs = Inputs::default();

    for path in paths {
        let path = path.as_ref();
        let mut reader = PunchReader::with_settings(settings.clone());
        let parsed = File::open(path)
            .map_err(|e| e.to_string())
            .and_then(|f| reader.parse(BufReader::new(f)).map_err(|e| e.to_string()));

        match parsed {
            Ok(doc) => {
                log::debug!("{}: {} block(s) in {} group(s)", path.display(), doc.len(), doc.group_count());
                inputs.document += doc;
                inputs.warnings.push((path.to_owned(), reader.take_warnings()));
            },
            Err(e) => {
                log::error!("Cannot read the file '{}': {e}", path.display());
                inputs.unreadable.push((path.to_owned(), e));
            }
        }
    }

    inputs
}

/// Write `doc` as CSV and return the files written.
///
/// With [`OutputMode::Unique`] everything goes to `output`. With
/// [`OutputMode::PerFingerprint`] each fingerprint gets its own file and its own
/// [`Writer`]: `output` itself if there is a single group, otherwise
/// `<base>_<i><ext>` for the `i`-th group. An existing file is backed up before being
/// replaced.
pub fn write_outputs(doc: &Document, output: &Path, options: &ConvertOptions) -> ConvertResult<Vec<PathBuf>> {
    match options.mode {
        OutputMode::Unique => {
            write_file(output, doc.blocks(), &options.header)?;
            Ok(vec![output.to_owned()])
        },
        OutputMode::PerFingerprint => {
            let single = doc.group_count() == 1;
            let mut written = vec![];
            for (i, (fp, blocks)) in doc.groups().enumerate() {
                let path = if single { output.to_owned() } else { format_increment(output, i) };
                log::debug!("{} <- group {fp}", path.display());
                write_file(&path, blocks, &options.header)?;
                written.push(path);
            }
            Ok(written)
        }
    }
}

fn write_file<'b, I>(path: &Path, blocks: I, header: &HeaderPolicy) -> ConvertResult<()>
where I: IntoIterator<Item = &'b Block>
{
    backup_existing(path)
        .change_context(ConvertError::Backup)
        .attach_printable_lazy(|| format!("output: {}", path.display()))?;

    let file = File::create(path)
        .change_context(ConvertError::Create)
        .attach_printable_lazy(|| format!("output: {}", path.display()))?;

    let mut out = BufWriter::new(file);
    let mut writer = Writer::new(header.clone());
    writer.write_blocks(blocks, &mut out)
        .and_then(|_| out.flush())
        .change_context(ConvertError::Write)
        .attach_printable_lazy(|| format!("output: {}", path.display()))?;

    log::info!("file output: '{}'", path.display());
    Ok(())
}
