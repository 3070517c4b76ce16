//! The read pipeline: magic, header size, header structure, metadata region.
use std::io::{Read, Seek};

use crate::endian::Endian;
use crate::error::Result;
use crate::header::{self, PgfHeader};
use crate::metadata::{self, MetadataRegion};

/// Everything the read pipeline learns about a container, short of decoding
/// the metadata payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub header: PgfHeader,
    pub region: MetadataRegion,
    pub payload: Option<Vec<u8>>,
}

impl Container {
    pub fn endian(&self) -> Endian {
        self.header.endian()
    }

    /// Start of the trailing image payload.
    pub fn payload_end(&self) -> u64 {
        self.region.payload_end()
    }
}

/// Run the whole read pipeline, `reader` must be at the container start.
pub fn read_container<R: Read + Seek + ?Sized>(
    reader: &mut R,
    max_metadata_size: u32,
) -> Result<Container> {
    let header = header::read_header(reader)?;
    let (region, payload) = metadata::locate(
        reader,
        header.end_offset(),
        header.endian(),
        max_metadata_size,
    )?;

    Ok(Container {
        header,
        region,
        payload,
    })
}
