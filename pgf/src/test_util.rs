// Hand built containers and misbehaving streams shared by the tests
use std::cmp;
use std::io::{self, Read, Seek, SeekFrom};

use pcore::stream::{MemStream, Stream};

use crate::endian::Endian;

pub struct ContainerLayout {
    pub version: u8,
    pub endian: Endian,
    pub width: i32,
    pub height: i32,
    pub extra: Vec<u8>,
    pub region: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        ContainerLayout {
            version: 0x36,
            endian: Endian::Little,
            width: 800,
            height: 600,
            extra: vec![1, 2, 3, 4, 5, 6, 7, 8],
            region: None,
            payload: test_payload(1000),
        }
    }
}

pub fn test_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn build_container(layout: &ContainerLayout) -> Vec<u8> {
    let mut out = b"PGF".to_vec();
    out.push(layout.version);

    let mut field = [0u8; 4];
    layout.endian.put_u32(&mut field, 8 + layout.extra.len() as u32);
    out.extend_from_slice(&field);
    layout.endian.put_i32(&mut field, layout.width);
    out.extend_from_slice(&field);
    layout.endian.put_i32(&mut field, layout.height);
    out.extend_from_slice(&field);
    out.extend_from_slice(&layout.extra);

    if let Some(region) = &layout.region {
        out.extend_from_slice(b"PGFM");
        layout.endian.put_u32(&mut field, region.len() as u32);
        out.extend_from_slice(&field);
        out.extend_from_slice(region);
    }

    out.extend_from_slice(&layout.payload);
    out
}

/// Stream whose reads fail past `fail_from`, and whose commit can be made to
/// fail.
pub struct FailingStream<S: Stream = MemStream> {
    pub inner: S,
    pub fail_from: u64,
    pub fail_commit: bool,
}

impl FailingStream<MemStream> {
    pub fn new(data: Vec<u8>, fail_from: u64) -> Self {
        FailingStream::wrap(MemStream::new(data), fail_from)
    }
}

impl<S: Stream> FailingStream<S> {
    pub fn wrap(inner: S, fail_from: u64) -> Self {
        FailingStream {
            inner,
            fail_from,
            fail_commit: false,
        }
    }
}

impl<S: Stream> Read for FailingStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.stream_position()?;
        if pos >= self.fail_from {
            return Err(io::Error::other("stream went away"));
        }

        let max = cmp::min(buf.len() as u64, self.fail_from - pos) as usize;
        self.inner.read(&mut buf[..max])
    }
}

impl<S: Stream> Seek for FailingStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<S: Stream> Stream for FailingStream<S> {
    type Temp = S::Temp;

    fn temp(&self) -> io::Result<S::Temp> {
        self.inner.temp()
    }

    fn commit(&mut self, temp: S::Temp) -> io::Result<()> {
        if self.fail_commit {
            return Err(io::Error::other("commit refused"));
        }
        self.inner.commit(temp)
    }
}
