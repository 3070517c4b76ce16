//! Metadata adapter for PGF (Progressive Graphics File) images.
//!
//! Reads the structural header of a container, locates the embedded metadata
//! region and rewrites the whole container with new metadata while copying
//! the compressed image payload verbatim. See [`PgfImage`] for the entry
//! point a host library holds on to.
use std::io::Read;

use pcore::buf::fill_buf;

mod config;
pub mod container;
pub mod endian;
mod error;
pub mod header;
mod image;
pub mod magic;
pub mod metadata;
pub mod rewrite;
mod sniff;

#[cfg(test)]
mod test_util;

pub use crate::config::{Config, MAX_METADATA_SIZE};
pub use crate::endian::Endian;
pub use crate::error::{PgfError, Result};
pub use crate::header::{HeaderProperties, PgfHeader};
pub use crate::image::{new_instance, Mode, PgfImage};
pub use crate::metadata::{ChunkCodec, Metadata, MetadataCodec, MetadataRegion, RawChunk};
pub use crate::sniff::is_pgf_type;

/// Identifies the format in a host's format registry.
pub const MIME_TYPE: &str = "image/pgf";

// Exactly `buf.len()` bytes or a Truncated error saying how many were there
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let (_, len) = fill_buf(reader, buf)?;
    if len < buf.len() {
        return Err(PgfError::Truncated {
            needed: buf.len() as u64,
            available: len as u64,
        });
    }
    Ok(())
}

// Up to `len` bytes into a buffer that grows with what actually arrives, so a
// bogus length in a short stream never allocates up front
pub(crate) fn read_len<R: Read + ?Sized>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let got = reader.take(len).read_to_end(&mut buf)?;
    if (got as u64) < len {
        return Err(PgfError::Truncated {
            needed: len,
            available: got as u64,
        });
    }
    Ok(buf)
}
