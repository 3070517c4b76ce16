//! Embedded metadata region.
//!
//! The region sits between the header structure and the image payload and is
//! optional. When present it starts with a marker:
//!
//! | Type    | Name    | Description |
//! | ------: | ------- | ----------- |
//! | [u8; 4] | marker  | `PGFM` |
//! | u32     | length  | Payload length, container byte order |
//! | [u8; N] | payload | Serialized [`Metadata`], see [`codec`] |
//!
//! Anything else after the header is the start of the image payload.
pub mod codec;

use std::io::{self, Read, Write};

use log::debug;
use pcore::buf::fill_buf;

use crate::endian::Endian;
use crate::error::{PgfError, Result};
use crate::{read_full, read_len};

pub use codec::{ChunkCodec, MetadataCodec, RawChunk};

pub const MARKER: &[u8; 4] = b"PGFM";

/// Marker and length field.
pub const REGION_PREFIX_LEN: u64 = 8;

/// Descriptive metadata carried by a container. The adapter never looks
/// inside the fields, it only moves them in and out of the region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub exif: Option<Vec<u8>>,
    pub iptc: Option<Vec<u8>>,
    pub xmp: Option<String>,
    pub comment: Option<String>,
    /// Chunks this codec doesn't know, kept so they survive a rewrite.
    pub unknown: Vec<RawChunk>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.exif.is_none()
            && self.iptc.is_none()
            && self.xmp.is_none()
            && self.comment.is_none()
            && self.unknown.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Metadata::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataRegion {
    pub present: bool,
    /// Absolute offset of the marker, or of the header end when absent.
    pub offset: u64,
    /// On disk size including marker and length field, 0 when absent.
    pub length: u64,
}

impl MetadataRegion {
    pub fn absent(offset: u64) -> Self {
        MetadataRegion {
            present: false,
            offset,
            length: 0,
        }
    }

    pub fn present(offset: u64, payload_len: u32) -> Self {
        MetadataRegion {
            present: true,
            offset,
            length: REGION_PREFIX_LEN + payload_len as u64,
        }
    }

    pub fn payload_len(&self) -> u64 {
        self.length.saturating_sub(REGION_PREFIX_LEN)
    }

    /// Start of the trailing image payload.
    pub fn payload_end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Look for the region at `offset`, where `reader` is positioned. Returns the
/// region and its payload bytes when present.
pub fn locate<R: Read + ?Sized>(
    reader: &mut R,
    offset: u64,
    endian: Endian,
    max_size: u32,
) -> Result<(MetadataRegion, Option<Vec<u8>>)> {
    let mut marker = [0u8; 4];
    let (_, len) = fill_buf(reader, &mut marker)?;
    if len < marker.len() || &marker != MARKER {
        debug!("No metadata region at {}", offset);
        return Ok((MetadataRegion::absent(offset), None));
    }

    let mut field = [0u8; 4];
    read_full(reader, &mut field)?;
    let length = endian.read_u32(&field);
    if length > max_size {
        return Err(PgfError::invalid(format!(
            "metadata region of {} bytes exceeds limit of {}",
            length, max_size
        )));
    }

    let payload = read_len(reader, length as u64)?;
    debug!("Metadata region at {} with {} bytes payload", offset, length);

    Ok((MetadataRegion::present(offset, length), Some(payload)))
}

pub fn write_region<W: Write + ?Sized>(out: &mut W, endian: Endian, payload: &[u8]) -> io::Result<u64> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "metadata payload over 4GiB"))?;

    out.write_all(MARKER)?;
    endian.write_u32(out, len)?;
    out.write_all(payload)?;
    Ok(REGION_PREFIX_LEN + len as u64)
}
