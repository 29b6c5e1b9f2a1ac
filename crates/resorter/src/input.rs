//! Input files: a directory, a listing of paths, or stdin.

use crate::error::{ResortError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Where the files to resort come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Files of a directory.
    Directory(PathBuf),
    /// A file listing paths, one per line.
    Listing(PathBuf),
    Stdin,
}

impl Source {
    /// `-` reads stdin; a directory is walked; anything else is a listing.
    pub fn from_arg(arg: &Path) -> Self {
        if arg == Path::new("-") {
            Source::Stdin
        } else if arg.is_dir() {
            Source::Directory(arg.to_path_buf())
        } else {
            Source::Listing(arg.to_path_buf())
        }
    }

    /// Collects the files in a stable order.
    pub fn files(&self, recursive: bool) -> Result<Vec<PathBuf>> {
        match self {
            Source::Directory(dir) => walk(dir, recursive),
            Source::Listing(path) => {
                let file = File::open(path).map_err(|e| ResortError::io(path, e))?;
                read_listing(BufReader::new(file), recursive)
            }
            Source::Stdin => read_listing(io::stdin().lock(), recursive),
        }
    }
}

/// Regular files under `dir`, sorted by name. Only the top level unless
/// `recursive`.
pub fn walk(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            ResortError::io(path, io::Error::from(e))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), count = files.len(), "walked");
    Ok(files)
}

/// Paths listed one per line. Blank lines are skipped and listed
/// directories are expanded.
pub fn read_listing(reader: impl BufRead, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| ResortError::io("<listing>", e))?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        let path = PathBuf::from(line);
        if path.is_dir() {
            files.extend(walk(&path, recursive)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}
