//! Error kinds shared by every codec layer.
//!
//! One enum, not one type per module: callers (the CLI collaborator, the
//! test suite) need to switch on *kind* the way the spec's error table does,
//! and a single `thiserror` enum keeps that switch exhaustive.

use std::io;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad header: {0}")]
    BadHeader(String),

    #[error("bad pickle at byte {offset}: {message}")]
    BadPickle { message: String, offset: usize },

    #[error("bad index: {0}")]
    BadIndex(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("member not found: {0}")]
    NotFound(String),

    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("empty input: no files to pack")]
    EmptyInput,

    #[error("decompile error for {path}: {message}")]
    DecompileError { path: String, message: String },
}

impl RpaError {
    pub fn bad_header(message: impl Into<String>) -> Self {
        RpaError::BadHeader(message.into())
    }

    pub fn bad_pickle(message: impl Into<String>, offset: usize) -> Self {
        RpaError::BadPickle { message: message.into(), offset }
    }

    pub fn bad_index(message: impl Into<String>) -> Self {
        RpaError::BadIndex(message.into())
    }

    pub fn bad_index_for(message: impl Into<String>, key: impl std::fmt::Display) -> Self {
        RpaError::BadIndex(format!("{message} (entry {key})", message = message.into()))
    }

    /// Logical exit-code mapping for a CLI collaborator. The core never
    /// calls `std::process::exit` itself; this is exposed for callers that
    /// do.
    pub fn exit_code(&self) -> i32 {
        match self {
            RpaError::Io(_) => 74,
            RpaError::BadHeader(_) => 65,
            RpaError::BadPickle { .. } => 66,
            RpaError::BadIndex(_) => 67,
            RpaError::Unsupported(_) => 69,
            RpaError::NotFound(_) => 68,
            RpaError::LayoutMismatch(_) => 70,
            RpaError::EmptyInput => 71,
            RpaError::DecompileError { .. } => 72,
        }
    }
}

/// Convenience for path-bearing I/O failures that want the path in the
/// message without giving up the underlying `io::Error`.
pub fn io_context(path: &Path, err: io::Error) -> RpaError {
    RpaError::Io(io::Error::new(err.kind(), format!("{}: {err}", path.display())))
}

pub type Result<T> = std::result::Result<T, RpaError>;
