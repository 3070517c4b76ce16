//! PGF header: the size field and the header structure it declares.
//!
//! | Type    | Name        | Description |
//! | ------: | ----------- | ----------- |
//! | [u8; 3] | signature   | `PGF` |
//! | u8      | version     | Codec version flags, at least `0x36` |
//! | u32     | header_size | Length of the header structure that follows |
//! | i32     | width       | Image width in pixels |
//! | i32     | height      | Image height in pixels |
//! | [u8; N] | extra       | `header_size - 8` bytes, passed through as is |
//!
//! PGF itself writes little endian, a header size that only fits the stream
//! when read big endian marks a foreign-order container. See
//! [`resolve_endian`].
use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::endian::Endian;
use crate::error::{PgfError, Result};
use crate::magic::{self, DEFAULT_VERSION, SIGNATURE};
use crate::{read_full, read_len};

/// Signature, version and header size.
pub const PREAMBLE_LEN: u64 = 8;

/// Width and height.
pub const MIN_HEADER_SIZE: u32 = 8;

/// Size of the header structure synthesized for a new container, the PGF
/// header layout with all properties zeroed.
pub const DEFAULT_HEADER_SIZE: u32 = MIN_HEADER_SIZE + PROPERTIES_LEN as u32;

const PROPERTIES_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgfHeader {
    version: u8,
    width: i32,
    height: i32,
    extra: Vec<u8>,
    endian: Endian,
}

/// Properties stored in the first extra bytes by PGF writers. Informational
/// only, the bytes themselves stay opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderProperties {
    pub levels: u8,
    pub quality: u8,
    pub bpp: u8,
    pub channels: u8,
    pub mode: u8,
    pub used_bits_per_channel: u8,
}

impl PgfHeader {
    pub fn new(version: u8, width: i32, height: i32, extra: Vec<u8>, endian: Endian) -> Result<Self> {
        magic::check_version(version)?;

        if extra.len() > (u32::MAX - MIN_HEADER_SIZE) as usize {
            return Err(PgfError::invalid(format!(
                "header structure of {} bytes does not fit the size field",
                MIN_HEADER_SIZE as usize + extra.len()
            )));
        }

        Ok(PgfHeader {
            version,
            width,
            height,
            extra,
            endian,
        })
    }

    /// Minimal header for a container created from scratch.
    pub fn synthesize(width: i32, height: i32) -> Result<Self> {
        check_dimensions(width, height)?;
        PgfHeader::new(
            DEFAULT_VERSION,
            width,
            height,
            vec![0; PROPERTIES_LEN],
            Endian::Little,
        )
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn header_size(&self) -> u32 {
        MIN_HEADER_SIZE + self.extra.len() as u32
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Absolute offset of the first byte after the header structure.
    pub fn end_offset(&self) -> u64 {
        PREAMBLE_LEN + self.header_size() as u64
    }

    pub fn set_dimensions(&mut self, width: i32, height: i32) -> Result<()> {
        check_dimensions(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn properties(&self) -> Option<HeaderProperties> {
        if self.extra.len() < PROPERTIES_LEN {
            return None;
        }

        Some(HeaderProperties {
            levels: self.extra[0],
            quality: self.extra[1],
            bpp: self.extra[2],
            channels: self.extra[3],
            mode: self.extra[4],
            used_bits_per_channel: self.extra[5],
        })
    }

    /// Preamble plus header structure, integers in the container byte order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.end_offset() as usize);
        out.extend_from_slice(SIGNATURE);
        out.push(self.version);

        let mut field = [0u8; 4];
        self.endian.put_u32(&mut field, self.header_size());
        out.extend_from_slice(&field);
        self.endian.put_i32(&mut field, self.width);
        out.extend_from_slice(&field);
        self.endian.put_i32(&mut field, self.height);
        out.extend_from_slice(&field);

        out.extend_from_slice(&self.extra);
        out
    }
}

// Only for dimensions we author, whatever a container declares is passed through
pub(crate) fn check_dimensions(width: i32, height: i32) -> Result<()> {
    if width < 0 || height < 0 {
        return Err(PgfError::invalid(format!(
            "negative image dimensions {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Decide the container byte order from the raw header size bytes, given the
/// number of stream bytes left after the size field.
///
/// A reading fits when it lies in `MIN_HEADER_SIZE..=remaining`. Little endian
/// wins whenever it fits, big endian is only taken when little endian does
/// not. When neither fits the container is cut short, the smaller reading of
/// at least `MIN_HEADER_SIZE` is kept so the structure read can report how
/// much is missing. Otherwise the size field is corrupt.
pub fn resolve_endian(raw: [u8; 4], remaining: u64) -> Result<(u32, Endian)> {
    let le = Endian::Little.read_u32(&raw);
    let be = Endian::Big.read_u32(&raw);
    let fits = |size: u32| size >= MIN_HEADER_SIZE && size as u64 <= remaining;

    if fits(le) {
        return Ok((le, Endian::Little));
    }
    if fits(be) {
        return Ok((be, Endian::Big));
    }

    match (le >= MIN_HEADER_SIZE, be >= MIN_HEADER_SIZE) {
        (true, true) if be < le => Ok((be, Endian::Big)),
        (true, _) => Ok((le, Endian::Little)),
        (false, true) => Ok((be, Endian::Big)),
        (false, false) => Err(PgfError::invalid(format!(
            "implausible header size field {:02x?}",
            raw
        ))),
    }
}

/// Read the size field and resolve the byte order against the rest of the
/// stream. The reader is left after the size field.
pub fn read_header_size<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<(u32, Endian)> {
    let mut raw = [0u8; 4];
    read_full(reader, &mut raw)?;

    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;

    resolve_endian(raw, end.saturating_sub(pos))
}

/// Read the `header_size` bytes of the header structure.
pub fn read_header_structure<R: Read + ?Sized>(
    reader: &mut R,
    version: u8,
    header_size: u32,
    endian: Endian,
) -> Result<PgfHeader> {
    if header_size < MIN_HEADER_SIZE {
        return Err(PgfError::invalid(format!(
            "header size {} too small for width and height",
            header_size
        )));
    }

    let mut buf = read_len(reader, header_size as u64)?;

    let width = endian.read_i32(&buf[0..4]);
    let height = endian.read_i32(&buf[4..8]);
    let extra = buf.split_off(MIN_HEADER_SIZE as usize);

    PgfHeader::new(version, width, height, extra, endian)
}

/// Magic, header size and header structure, the reader is left at the end
/// of the header structure.
pub fn read_header<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<PgfHeader> {
    let version = magic::read_magic(reader)?;
    let (header_size, endian) = read_header_size(reader)?;
    debug!(
        "PGF version 0x{:02x} header size {} ({:?})",
        version, header_size, endian
    );

    read_header_structure(reader, version, header_size, endian)
}
