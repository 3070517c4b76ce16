use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PgfError>;

#[derive(Error, Debug)]
pub enum PgfError {
    #[error("not a PGF image: {0}")]
    InvalidFormat(String),
    #[error("unsupported PGF version 0x{0:02x}")]
    Unsupported(u8),
    #[error("stream truncated, needed {needed} bytes but only {available} available")]
    Truncated { needed: u64, available: u64 },
    #[error("failed to read image data")]
    ReadFailed(#[from] io::Error),
    #[error("failed to write image, original left untouched")]
    WriteFailed(#[source] Box<PgfError>),
    #[error("corrupt metadata: {0}")]
    Metadata(String),
}

impl PgfError {
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        PgfError::InvalidFormat(msg.into())
    }

    pub(crate) fn metadata<S: Into<String>>(msg: S) -> Self {
        PgfError::Metadata(msg.into())
    }

    // Already wrapped errors are passed through as is
    pub(crate) fn write_failed(err: PgfError) -> Self {
        match err {
            PgfError::WriteFailed(_) => err,
            other => PgfError::WriteFailed(Box::new(other)),
        }
    }

    /// Fixed numeric code reported to the host, a failed write is always 4.
    pub fn code(&self) -> i32 {
        match self {
            PgfError::InvalidFormat(_) => 1,
            PgfError::Unsupported(_) => 2,
            PgfError::Truncated { .. } => 3,
            PgfError::WriteFailed(_) => 4,
            PgfError::ReadFailed(_) => 5,
            PgfError::Metadata(_) => 6,
        }
    }
}
