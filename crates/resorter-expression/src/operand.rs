//! Function arguments and evaluation subjects.

use crate::deferred::DeferredCall;
use crate::value::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// A file handed to the evaluator. Metadata functions read from `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    path: PathBuf,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileEntry { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path as text, the way it is exposed to string functions.
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// What one evaluation runs against.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Entry(FileEntry),
    Scalar(Value),
}

impl Subject {
    pub fn entry(path: impl Into<PathBuf>) -> Self {
        Subject::Entry(FileEntry::new(path))
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Subject::Scalar(value.into())
    }

    pub(crate) fn to_operand(&self) -> Operand {
        match self {
            Subject::Entry(entry) => Operand::Entry(entry.clone()),
            Subject::Scalar(value) => Operand::Value(value.clone()),
        }
    }

    /// The subject as text: the path of an entry, the string form of a scalar.
    pub fn text(&self) -> String {
        match self {
            Subject::Entry(entry) => entry.path_str(),
            Subject::Scalar(value) => value.to_string(),
        }
    }
}

/// A function argument slot.
///
/// Slot 0 of every call holds the subject: the file entry by default, or the
/// left-hand value of a `.` chain. Eager functions only ever see `Entry` and
/// `Value`; lazy functions may also receive unforced `Deferred` calls.
pub enum Operand {
    Entry(FileEntry),
    Value(Value),
    Deferred(Box<DeferredCall>),
}

impl Operand {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Operand::Deferred(_))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<DeferredCall> for Operand {
    fn from(call: DeferredCall) -> Self {
        Operand::Deferred(Box::new(call))
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Entry(entry) => write!(f, "Entry({})", entry.path().display()),
            Operand::Value(value) => write!(f, "{value:?}"),
            Operand::Deferred(call) => write!(f, "{call:?}"),
        }
    }
}
