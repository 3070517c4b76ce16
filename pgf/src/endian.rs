use std::io::{self, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

/// Byte order of the multi-byte integers of one container.
///
/// PGF writes little endian; [`Endian::Big`] marks a container produced by a
/// foreign-order writer, which is read and written back in that same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    #[inline]
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    #[inline]
    pub fn read_i32(self, buf: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(buf),
            Endian::Big => BigEndian::read_i32(buf),
        }
    }

    #[inline]
    pub fn put_u32(self, buf: &mut [u8], value: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, value),
            Endian::Big => BigEndian::write_u32(buf, value),
        }
    }

    #[inline]
    pub fn put_i32(self, buf: &mut [u8], value: i32) {
        match self {
            Endian::Little => LittleEndian::write_i32(buf, value),
            Endian::Big => BigEndian::write_i32(buf, value),
        }
    }

    pub fn write_u32<W: Write + ?Sized>(self, out: &mut W, value: u32) -> io::Result<()> {
        match self {
            Endian::Little => out.write_u32::<LittleEndian>(value),
            Endian::Big => out.write_u32::<BigEndian>(value),
        }
    }
}

#[cfg(test)]
mod test_endian {
    use super::*;

    #[test]
    fn same_bytes_both_orders() {
        let bytes = [0x20, 0x03, 0x00, 0x00];
        assert_eq!(Endian::Little.read_u32(&bytes), 800);
        assert_eq!(Endian::Big.read_u32(&bytes), 0x2003_0000);
    }

    #[test]
    fn write_then_read() {
        for endian in [Endian::Little, Endian::Big] {
            let mut out = Vec::new();
            endian.write_u32(&mut out, 600).unwrap();
            assert_eq!(endian.read_u32(&out), 600);
        }
    }

    #[test]
    fn put_i32_negative() {
        let mut buf = [0u8; 4];
        Endian::Big.put_i32(&mut buf, -2);
        assert_eq!(buf, [0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(Endian::Big.read_i32(&buf), -2);
    }
}
