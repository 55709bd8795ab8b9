//! Error types for typed record decoding

use std::path::PathBuf;
use thiserror::Error;

/// Errors while decoding one typed record line
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid line format at line {line_number}: expected {expected} tab-separated fields, found {found}")]
    InvalidLineFormat {
        line_number: u64,
        expected: usize,
        found: usize,
    },

    #[error("invalid timestamp at line {line_number}: {segment}")]
    InvalidTimestamp { line_number: u64, segment: String },

    #[error("unknown record kind at line {line_number}: {kind}")]
    InvalidKind { line_number: u64, kind: String },

    #[error("invalid value format at line {line_number}: {detail}")]
    InvalidValue { line_number: u64, detail: String },
}

/// Errors during record file reading operations
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open record file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory map file {path}")]
    MemoryMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
