//! Byte streams that a container adapter can read from and atomically replace.
//!
//! A [`Stream`] is read and seeked like any other reader. Rewriting is never
//! done in place: the writer asks for a temporary output with
//! [`Stream::temp`], fills it, and hands it back to [`Stream::commit`] which
//! swaps it in as the new content. Dropping the temporary instead of
//! committing it leaves the stream exactly as it was.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

pub trait Stream: Read + Seek {
    type Temp: Write;

    /// Total length of the content, the cursor is left where it was.
    fn size(&mut self) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    /// Fresh, empty output that can later replace this stream's content.
    fn temp(&self) -> io::Result<Self::Temp>;

    /// Replace the content with `temp`. On return the cursor is at offset 0.
    fn commit(&mut self, temp: Self::Temp) -> io::Result<()>;
}

/// Remembers a cursor position and seeks back to it when dropped, unless
/// [`CursorGuard::keep`] was called.
pub struct CursorGuard<'a, S: Seek + ?Sized> {
    inner: &'a mut S,
    pos: u64,
    restore: bool,
}

impl<'a, S: Seek + ?Sized> CursorGuard<'a, S> {
    pub fn new(inner: &'a mut S) -> io::Result<Self> {
        let pos = inner.stream_position()?;
        Ok(CursorGuard {
            inner,
            pos,
            restore: true,
        })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn keep(mut self) {
        self.restore = false;
    }
}

impl<S: Seek + ?Sized> Deref for CursorGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.inner
    }
}

impl<S: Seek + ?Sized> DerefMut for CursorGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.inner
    }
}

impl<S: Seek + ?Sized> Drop for CursorGuard<'_, S> {
    fn drop(&mut self) {
        if self.restore {
            // Nothing to report to from a drop, a broken stream will fail
            // the caller's next operation anyway
            let _ = self.inner.seek(SeekFrom::Start(self.pos));
        }
    }
}

/// Memory backed stream.
#[derive(Debug, Default)]
pub struct MemStream {
    inner: Cursor<Vec<u8>>,
}

impl MemStream {
    pub fn new(data: Vec<u8>) -> Self {
        MemStream {
            inner: Cursor::new(data),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for MemStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Stream for MemStream {
    type Temp = Vec<u8>;

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.inner.get_ref().len() as u64)
    }

    fn temp(&self) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn commit(&mut self, temp: Vec<u8>) -> io::Result<()> {
        self.inner = Cursor::new(temp);
        Ok(())
    }
}

/// File backed stream. The temporary output lives next to the target so the
/// commit is a rename within one filesystem.
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    file: File,
}

impl FileStream {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(FileStream { path, file })
    }

    /// Open `path`, creating an empty file when it does not exist yet.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(FileStream { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Stream for FileStream {
    type Temp = NamedTempFile;

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn temp(&self) -> io::Result<NamedTempFile> {
        NamedTempFile::new_in(self.dir())
    }

    /// Rename the temp file over the target. The rename is the last step that
    /// can fail, so an error always means the target was left alone. The
    /// handle keeps reading through the temp file's descriptor, which is the
    /// new target, instead of reopening the path.
    fn commit(&mut self, mut temp: NamedTempFile) -> io::Result<()> {
        temp.as_file().sync_all()?;

        // The temp file is created 0600, carry over the original mode
        let perms = fs::metadata(&self.path)?.permissions();
        temp.as_file().set_permissions(perms)?;
        temp.as_file_mut().rewind()?;

        self.file = temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}



#[cfg(test)]
mod test_file_stream {
    use super::*;

    #[test]
    fn commit_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.pgf");
        fs::write(&path, b"Test Data").unwrap();

        let mut stream = FileStream::open(&path).unwrap();
        let mut temp = stream.temp().unwrap();
        temp.write_all(b"Data Test").unwrap();
        stream.commit(temp).unwrap();

        let mut val = String::new();
        stream.read_to_string(&mut val).unwrap();
        assert_eq!(val, "Data Test");
        assert_eq!(fs::read(&path).unwrap(), b"Data Test");

        // Only the target is left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn commit_keeps_unreadable_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.pgf");
        fs::write(&path, b"Test Data").unwrap();

        let mut stream = FileStream::open(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o200)).unwrap();

        // Nothing reopens the path, so a write only target commits fine
        let mut temp = stream.temp().unwrap();
        temp.write_all(b"Data Test").unwrap();
        stream.commit(temp).unwrap();

        let mut val = String::new();
        stream.read_to_string(&mut val).unwrap();
        assert_eq!(val, "Data Test");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o200);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn dropped_temp_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.pgf");
        fs::write(&path, b"Test Data").unwrap();

        let stream = FileStream::open(&path).unwrap();
        let mut temp = stream.temp().unwrap();
        temp.write_all(b"Data Test").unwrap();
        drop(temp);

        assert_eq!(fs::read(&path).unwrap(), b"Test Data");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn create_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.pgf");

        let mut stream = FileStream::create(&path).unwrap();
        assert_eq!(stream.size().unwrap(), 0);
        assert_eq!(stream.path(), path.as_path());
    }
}
