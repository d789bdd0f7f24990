//! File name helpers for the converter.
//!
//! Names are handled as text: the extension is whatever follows the last `.` of the
//! final path component, so `".bashrc"` is all extension and `"path.to.dir/file"` has none.
use std::io;
use std::path::{Path, PathBuf};

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Case-insensitive (ASCII) test of whether `name` ends with `suffix`.
/// Always `false` if either is empty.
pub fn has_suffix(name: &str, suffix: &str) -> bool {
    if name.is_empty() || suffix.is_empty() || suffix.len() > name.len() {
        return false;
    }
    name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

fn extension_start(name: &str) -> Option<usize> {
    let component_start = name.rfind(&SEPARATORS[..]).map(|i| i + 1).unwrap_or(0);
    name[component_start..].rfind('.').map(|i| component_start + i)
}

/// `name` without its extension.
pub fn file_base_name(name: &str) -> &str {
    match extension_start(name) {
        Some(i) => &name[..i],
        None => name,
    }
}

/// The extension of `name` including its leading `.`, or `""`.
pub fn file_extension(name: &str) -> &str {
    match extension_start(name) {
        Some(i) => &name[i..],
        None => "",
    }
}

/// The CSV file written for `input` when no output is given: same name, `.csv` extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    PathBuf::from(format!("{}.csv", file_base_name(&name)))
}

/// `<base>_<i><ext>`, the name of the `i`-th of several outputs derived from `path`.
pub fn format_increment(path: &Path, i: usize) -> PathBuf {
    let name = path.to_string_lossy();
    PathBuf::from(format!("{}_{i}{}", file_base_name(&name), file_extension(&name)))
}

/// The first name of the form `<base>.bak_<i><ext>` that does not exist yet.
pub fn backup_path(path: &Path) -> PathBuf {
    let name = path.to_string_lossy();
    let (base, ext) = (file_base_name(&name), file_extension(&name));
    let mut i = 0usize;
    loop {
        let candidate = PathBuf::from(format!("{base}.bak_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

/// Move an existing file at `path` out of the way.
///
/// Returns the name it was moved to, or `None` if there was nothing at `path`.
pub fn backup_existing(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = backup_path(path);
    std::fs::rename(path, &backup)?;
    log::info!("Moved existing {} to {}", path.display(), backup.display());
    Ok(Some(backup))
}
