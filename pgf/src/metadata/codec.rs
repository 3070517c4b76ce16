//! Serialization of [`Metadata`] into the region payload.
//!
//! The bundled [`ChunkCodec`] stores each present field as one chunk, always
//! little endian whatever the container byte order:
//!
//! | Type    | Name            | Description |
//! | ------: | --------------- | ----------- |
//! | u32     | length          | Length of the value, may be 0 |
//! | [u8; 4] | tag             | `EXIF`, `IPTC`, `XMP_`, `CMNT` or anything else |
//! | u16     | header checksum | Checksum of <code>length \|\| tag</code> |
//! | [u8; N] | value           | Field content |
//! | u32     | checksum        | Checksum of `value` |
//!
//! Known fields are written in the order above, unknown chunks after them in
//! the order they were read.
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt};
use pcore::buf::fill_buf;
use pcore::hash::Checksum;

use crate::error::{PgfError, Result};
use crate::metadata::Metadata;

const TAG_EXIF: &[u8; 4] = b"EXIF";
const TAG_IPTC: &[u8; 4] = b"IPTC";
const TAG_XMP: &[u8; 4] = b"XMP_";
const TAG_COMMENT: &[u8; 4] = b"CMNT";

pub trait MetadataCodec {
    fn decode(&self, payload: &[u8]) -> Result<Metadata>;
    fn encode(&self, metadata: &Metadata) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkCodec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub tag: [u8; 4],
    pub data: Vec<u8>,
}

struct ChunkReader<R: Read> {
    inner: R,
    // No chunk can be larger than what is left of the payload
    limit: usize,
}

impl<R: Read> ChunkReader<R> {
    fn new(reader: R, limit: usize) -> Self {
        ChunkReader { inner: reader, limit }
    }

    // None on a clean end of payload, partial headers are an error
    fn read_chunk(&mut self) -> Result<Option<RawChunk>> {
        let mut len_buf = [0u8; 4];
        match fill_buf(&mut self.inner, &mut len_buf)? {
            (true, 0) => return Ok(None),
            (_, 4) => (),
            (_, _) => return Err(PgfError::metadata("truncated chunk length")),
        }
        let len = u32::from_le_bytes(len_buf);

        let mut tag = [0u8; 4];
        self.inner
            .read_exact(&mut tag)
            .map_err(|_| PgfError::metadata("truncated chunk tag"))?;
        let header_hash = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(|_| PgfError::metadata("truncated chunk header"))?;

        let mut hash = Checksum::new();
        hash.update(&len_buf);
        hash.update(&tag);
        if (hash.finalize() as u16) != header_hash {
            return Err(PgfError::metadata(format!(
                "header checksum failed for chunk {:?}",
                String::from_utf8_lossy(&tag)
            )));
        }

        let len = len as usize;
        if len > self.limit {
            return Err(PgfError::metadata(format!(
                "chunk of {} bytes overruns the payload",
                len
            )));
        }

        let mut data = vec![0; len];
        self.inner
            .read_exact(&mut data[..])
            .map_err(|_| PgfError::metadata("truncated chunk value"))?;
        let entry_hash = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|_| PgfError::metadata("truncated chunk checksum"))?;

        let mut hash = Checksum::new();
        hash.update(&data[..]);
        if hash.finalize() != entry_hash {
            return Err(PgfError::metadata(format!(
                "checksum failed for chunk {:?}",
                String::from_utf8_lossy(&tag)
            )));
        }

        self.limit -= len;
        Ok(Some(RawChunk { tag, data }))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<RawChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_chunk().transpose()
    }
}

struct ChunkWriter<W: Write> {
    inner: W,
}

impl<W: Write> ChunkWriter<W> {
    fn new(writer: W) -> Self {
        ChunkWriter { inner: writer }
    }

    fn into_inner(self) -> W {
        self.inner
    }

    fn write(&mut self, tag: &[u8; 4], data: &[u8]) -> Result<usize> {
        let data_len = u32::try_from(data.len())
            .map_err(|_| PgfError::metadata("chunk over 4GiB"))?
            .to_le_bytes();
        let header_hash = {
            let mut hash = Checksum::new();
            hash.update(&data_len);
            hash.update(tag);
            hash.finalize() as u16
        };
        let trailing_hash = {
            let mut hash = Checksum::new();
            hash.update(data);
            hash.finalize()
        };

        self.inner.write_all(&data_len)?;
        self.inner.write_all(tag)?;
        self.inner.write_all(&header_hash.to_le_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_all(&trailing_hash.to_le_bytes())?;

        Ok(4 + 4 + 2 + data.len() + 4)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, tag: &[u8; 4]) -> Result<()> {
    if slot.is_some() {
        return Err(PgfError::metadata(format!(
            "duplicate chunk {:?}",
            String::from_utf8_lossy(tag)
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn utf8(data: Vec<u8>, tag: &[u8; 4]) -> Result<String> {
    String::from_utf8(data).map_err(|_| {
        PgfError::metadata(format!(
            "chunk {:?} is not valid UTF-8",
            String::from_utf8_lossy(tag)
        ))
    })
}

impl MetadataCodec for ChunkCodec {
    fn decode(&self, payload: &[u8]) -> Result<Metadata> {
        let mut metadata = Metadata::default();

        for chunk in ChunkReader::new(payload, payload.len()) {
            let RawChunk { tag, data } = chunk?;
            match &tag {
                TAG_EXIF => set_once(&mut metadata.exif, data, &tag)?,
                TAG_IPTC => set_once(&mut metadata.iptc, data, &tag)?,
                TAG_XMP => set_once(&mut metadata.xmp, utf8(data, &tag)?, &tag)?,
                TAG_COMMENT => set_once(&mut metadata.comment, utf8(data, &tag)?, &tag)?,
                _ => metadata.unknown.push(RawChunk { tag, data }),
            }
        }
        Ok(metadata)
    }

    fn encode(&self, metadata: &Metadata) -> Result<Vec<u8>> {
        let mut writer = ChunkWriter::new(Vec::new());

        if let Some(exif) = &metadata.exif {
            writer.write(TAG_EXIF, exif)?;
        }
        if let Some(iptc) = &metadata.iptc {
            writer.write(TAG_IPTC, iptc)?;
        }
        if let Some(xmp) = &metadata.xmp {
            writer.write(TAG_XMP, xmp.as_bytes())?;
        }
        if let Some(comment) = &metadata.comment {
            writer.write(TAG_COMMENT, comment.as_bytes())?;
        }
        for chunk in metadata.unknown.iter() {
            writer.write(&chunk.tag, &chunk.data)?;
        }

        Ok(writer.into_inner())
    }
}
