use resorter_expression::{EvalError, ParseError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResortError {
    #[error("cannot compile \"{text}\": {source}")]
    Parse {
        text: String,
        #[source]
        source: ParseError,
    },

    #[error("{}: {source}", path.display())]
    Eval {
        path: PathBuf,
        #[source]
        source: EvalError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {message}", path.display())]
    Action { path: PathBuf, message: String },

    #[error("invalid script {}: {message}", path.display())]
    Script { path: PathBuf, message: String },

    #[error("stopped by user")]
    Aborted,
}

impl ResortError {
    pub fn parse(text: &str, source: ParseError) -> Self {
        ResortError::Parse {
            text: text.to_string(),
            source,
        }
    }

    pub fn eval(path: impl Into<PathBuf>, source: EvalError) -> Self {
        ResortError::Eval {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ResortError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn action(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ResortError::Action {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResortError>;
