use std::io;

use thiserror::Error;

/// Decoder error types
#[derive(Debug, Error)]
pub enum DecodeError {
    /// IO error while loading source bytes
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Requested path is not in the archive table of contents
    #[error("archive entry not found: {path}")]
    EntryNotFound { path: String },

    /// Archive header or table of contents does not fit the byte buffer
    #[error("corrupt archive: {reason}")]
    CorruptArchive { reason: String },

    /// Palette shorter than its fixed layout
    #[error("corrupt palette: {len} bytes, need at least {required}")]
    CorruptPalette { len: usize, required: usize },

    /// Image header or pixel data does not fit the byte buffer
    #[error("corrupt image: {reason}")]
    CorruptImage { reason: String },

    /// A declared section count runs past the end of the file
    #[error("section '{section}' declares {declared} records but only {available} are present")]
    TruncatedSection {
        section: String,
        declared: usize,
        available: usize,
    },

    /// A record has fewer tokens than its fixed prefix needs, or a token fails to parse
    #[error("malformed record {record} in section '{section}': {reason}")]
    MalformedRecord {
        section: String,
        record: usize,
        reason: String,
    },

    /// Hierarchy node points at a parent outside the node list
    #[error("hierarchy node {node} references parent {parent}, but only {count} nodes exist")]
    InvalidParentReference { node: usize, parent: i32, count: usize },

    /// Parent chain does not reach a root
    #[error("hierarchy node {node} is part of a parent cycle")]
    CyclicHierarchy { node: usize },
}

impl DecodeError {
    pub(crate) fn corrupt_archive(reason: impl Into<String>) -> Self {
        DecodeError::CorruptArchive {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_image(reason: impl Into<String>) -> Self {
        DecodeError::CorruptImage {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(section: &str, record: usize, reason: impl Into<String>) -> Self {
        DecodeError::MalformedRecord {
            section: section.to_string(),
            record,
            reason: reason.into(),
        }
    }
}

/// Result type for decoder operations
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
