use std::io::{Read, Write};

// 4Kb copy frame buffer
pub const COPY_CHUNK_SIZE: usize = 4 * 1024;

pub fn fill_buf<R: Read + ?Sized>(data: &mut R, buf: &mut [u8]) -> std::io::Result<(bool, usize)> {
    let mut buf_read = 0;

    while buf_read < buf.len() {
        match data.read(&mut buf[buf_read..]) {
            Ok(0) => return Ok((true, buf_read)),
            Ok(x) => buf_read += x,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
    }
    Ok((false, buf_read))
}

// Stream everything left in `data` into `out`, never holding more than one
// frame of `chunk_size` bytes in memory
pub fn copy_chunked<R, W>(data: &mut R, out: &mut W, chunk_size: usize) -> std::io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut in_buf = vec![0u8; chunk_size.max(1)];
    let mut copied: u64 = 0;

    loop {
        match fill_buf(data, &mut in_buf)? {
            (true, 0) => break,
            (eof, len) => {
                out.write_all(&in_buf[..len])?;
                copied += len as u64;

                if eof {
                    break;
                }
            }
        }
    }
    Ok(copied)
}


#[cfg(test)]
mod test_copy_chunked {
    use super::*;
    use std::io::Cursor;

    fn test_data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn empty_source() {
        let mut in_buf: Cursor<Vec<u8>> = Cursor::new(vec![]);
        let mut out: Vec<u8> = Vec::new();

        assert_eq!(copy_chunked(&mut in_buf, &mut out, 4).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn partial_last_frame() {
        let data = test_data(10);
        let mut in_buf = Cursor::new(data.clone());
        let mut out: Vec<u8> = Vec::new();

        assert_eq!(copy_chunked(&mut in_buf, &mut out, 4).unwrap(), 10);
        assert_eq!(out, data);
    }

    #[test]
    fn exact_frames() {
        let data = test_data(COPY_CHUNK_SIZE * 2);
        let mut in_buf = Cursor::new(data.clone());
        let mut out: Vec<u8> = Vec::new();

        assert_eq!(
            copy_chunked(&mut in_buf, &mut out, COPY_CHUNK_SIZE).unwrap(),
            (COPY_CHUNK_SIZE * 2) as u64
        );
        assert_eq!(out, data);
    }

    #[test]
    fn copy_from_middle() {
        let data = test_data(100);
        let mut in_buf = Cursor::new(data.clone());
        in_buf.set_position(40);
        let mut out: Vec<u8> = Vec::new();

        assert_eq!(copy_chunked(&mut in_buf, &mut out, 16).unwrap(), 60);
        assert_eq!(&out[..], &data[40..]);
    }
}
