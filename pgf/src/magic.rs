//! Signature and version check of the 4 leading bytes.
use std::io::{Read, Seek};

use pcore::buf::fill_buf;
use pcore::stream::CursorGuard;

use crate::error::{PgfError, Result};
use crate::read_full;

pub const SIGNATURE: &[u8; 3] = b"PGF";
pub const MAGIC_LEN: usize = 4;

// The version byte is a set of codec version flags, 0x36 is the first one
// carrying the version 6 flag
pub const MIN_VERSION: u8 = 0x36;
pub const DEFAULT_VERSION: u8 = MIN_VERSION;

pub fn check_version(version: u8) -> Result<u8> {
    if version < MIN_VERSION {
        Err(PgfError::Unsupported(version))
    } else {
        Ok(version)
    }
}

/// Read the signature and version byte, leaving the reader past them.
pub fn read_magic<R: Read + ?Sized>(reader: &mut R) -> Result<u8> {
    let mut sig = [0u8; 3];
    let (_, len) = fill_buf(reader, &mut sig)?;
    if len < sig.len() || &sig != SIGNATURE {
        return Err(PgfError::invalid("missing PGF signature"));
    }

    let mut version = [0u8; 1];
    read_full(reader, &mut version)?;
    check_version(version[0])
}

/// Same check as [`read_magic`] but the position is restored whatever the
/// outcome.
pub fn probe_magic<S: Read + Seek + ?Sized>(stream: &mut S) -> Result<u8> {
    let mut guard = CursorGuard::new(stream)?;
    read_magic(&mut *guard)
}
