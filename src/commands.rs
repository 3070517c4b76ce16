use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use pcore::stream::FileStream;
use pgf::{Config, Metadata, PgfError, PgfImage};
use thiserror::Error;

use crate::cli::Field;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("unable to process {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: PgfError,
    },

    #[error("unable to access {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path:?}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Image failures exit with the adapter's own code, everything else
    /// lands above that range.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Image { source, .. } => source.code(),
            CliError::Io { .. } => 10,
            CliError::Config { .. } => 11,
            CliError::Usage(_) => 12,
        }
    }
}

fn image_err(path: &Path) -> impl FnOnce(PgfError) -> CliError + '_ {
    move |source| CliError::Image {
        path: path.to_path_buf(),
        source,
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CliError + '_ {
    move |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn open(path: &Path, config: &Config) -> Result<PgfImage<FileStream>, CliError> {
    let stream = FileStream::open(path).map_err(io_err(path))?;
    let mut image = PgfImage::new(stream, false)
        .map_err(image_err(path))?
        .with_config(config.clone());
    image.read_metadata().map_err(image_err(path))?;
    Ok(image)
}

// Broken pipes and the like on stdout
fn out_err(source: io::Error) -> CliError {
    CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}

fn field_len(field: Option<usize>) -> String {
    match field {
        Some(len) => format!("{} bytes", len),
        None => "-".to_string(),
    }
}

fn write_info<W: Write>(out: &mut W, path: &Path, image: &PgfImage<FileStream>) -> io::Result<()> {
    writeln!(out, "File:        {}", path.display())?;
    writeln!(out, "MIME type:   {}", image.mime_type())?;

    if let Some(header) = image.header() {
        writeln!(out, "Version:     0x{:02x}", header.version())?;
        writeln!(out, "Byte order:  {:?}", header.endian())?;
        writeln!(out, "Header size: {}", header.header_size())?;
        writeln!(out, "Dimensions:  {}x{}", header.width(), header.height())?;

        if let Some(props) = header.properties() {
            writeln!(out, "Levels:      {}", props.levels)?;
            writeln!(out, "Quality:     {}", props.quality)?;
            writeln!(out, "Bpp:         {}", props.bpp)?;
            writeln!(out, "Channels:    {}", props.channels)?;
            writeln!(out, "Mode:        {}", props.mode)?;
        }
    }

    match image.region() {
        Some(region) if region.present => writeln!(
            out,
            "Metadata:    {} bytes at offset {}",
            region.length, region.offset
        )?,
        _ => writeln!(out, "Metadata:    none")?,
    }

    let meta = image.metadata();
    writeln!(out, "  EXIF:      {}", field_len(meta.exif.as_ref().map(|v| v.len())))?;
    writeln!(out, "  IPTC:      {}", field_len(meta.iptc.as_ref().map(|v| v.len())))?;
    writeln!(out, "  XMP:       {}", field_len(meta.xmp.as_ref().map(|v| v.len())))?;
    writeln!(out, "  Comment:   {}", field_len(meta.comment.as_ref().map(|v| v.len())))?;
    if !meta.unknown.is_empty() {
        writeln!(out, "  Unknown:   {} chunks", meta.unknown.len())?;
    }
    Ok(())
}

pub fn info<W: Write>(out: &mut W, path: &Path, config: &Config) -> Result<(), CliError> {
    let image = open(path, config)?;
    write_info(out, path, &image).map_err(out_err)
}

// Number of fields written
fn write_fields<W: Write>(out: &mut W, meta: &Metadata, field: Option<Field>) -> io::Result<usize> {
    let wanted = |f: Field| field.is_none() || field == Some(f);
    let mut printed = 0;

    if let (true, Some(exif)) = (wanted(Field::Exif), &meta.exif) {
        writeln!(out, "exif: {}", hex::encode(exif))?;
        printed += 1;
    }
    if let (true, Some(iptc)) = (wanted(Field::Iptc), &meta.iptc) {
        writeln!(out, "iptc: {}", hex::encode(iptc))?;
        printed += 1;
    }
    if let (true, Some(xmp)) = (wanted(Field::Xmp), &meta.xmp) {
        writeln!(out, "xmp: {}", xmp)?;
        printed += 1;
    }
    if let (true, Some(comment)) = (wanted(Field::Comment), &meta.comment) {
        writeln!(out, "comment: {}", comment)?;
        printed += 1;
    }

    if field.is_none() {
        for chunk in meta.unknown.iter() {
            writeln!(
                out,
                "{}: {}",
                String::from_utf8_lossy(&chunk.tag),
                hex::encode(&chunk.data)
            )?;
            printed += 1;
        }
    }
    Ok(printed)
}

pub fn dump<W: Write>(out: &mut W, path: &Path, field: Option<Field>, config: &Config) -> Result<(), CliError> {
    let image = open(path, config)?;

    if write_fields(out, image.metadata(), field).map_err(out_err)? == 0 {
        warn!("{:?} carries no matching metadata", path);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct SetArgs<'a> {
    pub xmp: Option<&'a Path>,
    pub exif: Option<&'a Path>,
    pub iptc: Option<&'a Path>,
    pub comment: Option<&'a str>,
}

pub fn set(path: &Path, args: &SetArgs, config: &Config) -> Result<(), CliError> {
    if args.xmp.is_none() && args.exif.is_none() && args.iptc.is_none() && args.comment.is_none() {
        return Err(CliError::Usage("nothing to set".to_string()));
    }

    // Read every input before touching the image
    let xmp = args
        .xmp
        .map(|p| fs::read_to_string(p).map_err(io_err(p)))
        .transpose()?;
    let exif = args.exif.map(|p| fs::read(p).map_err(io_err(p))).transpose()?;
    let iptc = args.iptc.map(|p| fs::read(p).map_err(io_err(p))).transpose()?;

    let mut image = open(path, config)?;
    let meta = image.metadata_mut();
    if xmp.is_some() {
        meta.xmp = xmp;
    }
    if exif.is_some() {
        meta.exif = exif;
    }
    if iptc.is_some() {
        meta.iptc = iptc;
    }
    if let Some(comment) = args.comment {
        meta.comment = Some(comment.to_string());
    }

    image.write_metadata().map_err(image_err(path))?;
    info!("Updated metadata of {:?}", path);
    Ok(())
}

pub fn strip(path: &Path, config: &Config) -> Result<(), CliError> {
    let mut image = open(path, config)?;
    image.clear_metadata();
    image.write_metadata().map_err(image_err(path))?;

    info!("Stripped metadata from {:?}", path);
    Ok(())
}

fn build_empty(stream: FileStream, width: i32, height: i32, config: &Config) -> pgf::Result<()> {
    let mut image = PgfImage::new(stream, true)?.with_config(config.clone());
    image.set_dimensions(width, height)?;
    image.write_metadata()
}

pub fn create(path: &Path, width: i32, height: i32, config: &Config) -> Result<(), CliError> {
    if path.exists() {
        return Err(CliError::Usage(format!("{:?} already exists", path)));
    }

    let stream = FileStream::create(path).map_err(io_err(path))?;
    if let Err(err) = build_empty(stream, width, height, config) {
        // Leave no empty file behind
        let _ = fs::remove_file(path);
        return Err(image_err(path)(err));
    }

    info!("Created {}x{} container {:?}", width, height, path);
    Ok(())
}

#[cfg(test)]
mod test_commands {
    use super::*;
    use pgf::{ChunkCodec, MetadataCodec};

    // 800x600 little endian container with a 100 byte payload
    fn sample(meta: Option<&Metadata>) -> Vec<u8> {
        let mut data = b"PGF\x36".to_vec();
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&800i32.to_le_bytes());
        data.extend_from_slice(&600i32.to_le_bytes());
        data.extend_from_slice(&[6, 0, 24, 3, 3, 8, 0, 0]);

        if let Some(meta) = meta {
            let payload = ChunkCodec.encode(meta).unwrap();
            data.extend_from_slice(b"PGFM");
            data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            data.extend_from_slice(&payload);
        }

        data.extend((0..100u8).map(|i| i.wrapping_mul(7)));
        data
    }

    fn commented(text: &str) -> Metadata {
        Metadata {
            comment: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn info_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        fs::write(&path, sample(Some(&commented("hello")))).unwrap();

        let mut out = Vec::new();
        info(&mut out, &path, &Config::default()).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Dimensions:  800x600"));
        assert!(out.contains("Byte order:  Little"));
        assert!(out.contains("Channels:    3"));
        assert!(out.contains("  Comment:   5 bytes"));
        assert!(out.contains("  EXIF:      -"));
    }

    #[test]
    fn dump_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        let meta = Metadata {
            exif: Some(vec![0xde, 0xad]),
            comment: Some("hello".to_string()),
            ..Default::default()
        };
        fs::write(&path, sample(Some(&meta))).unwrap();

        let mut out = Vec::new();
        dump(&mut out, &path, None, &Config::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "exif: dead\ncomment: hello\n");

        let mut out = Vec::new();
        dump(&mut out, &path, Some(Field::Comment), &Config::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "comment: hello\n");
    }

    #[test]
    fn set_then_strip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        let xmp_path = dir.path().join("a.xmp");
        let original = sample(None);
        fs::write(&path, &original).unwrap();
        fs::write(&xmp_path, "<x:xmpmeta/>").unwrap();

        let args = SetArgs {
            xmp: Some(&xmp_path),
            comment: Some("hi"),
            ..Default::default()
        };
        set(&path, &args, &Config::default()).unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[24..28], b"PGFM");
        assert_eq!(&data[data.len() - 100..], &original[original.len() - 100..]);

        let mut out = Vec::new();
        dump(&mut out, &path, None, &Config::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "xmp: <x:xmpmeta/>\ncomment: hi\n");

        strip(&path, &Config::default()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn set_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        let meta = Metadata {
            iptc: Some(vec![0x1c, 0x02]),
            ..Default::default()
        };
        fs::write(&path, sample(Some(&meta))).unwrap();

        let args = SetArgs {
            comment: Some("added"),
            ..Default::default()
        };
        set(&path, &args, &Config::default()).unwrap();

        let mut out = Vec::new();
        dump(&mut out, &path, None, &Config::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "iptc: 1c02\ncomment: added\n");
    }

    #[test]
    fn set_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        fs::write(&path, sample(None)).unwrap();

        let err = set(&path, &SetArgs::default(), &Config::default()).unwrap_err();
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn set_missing_input_leaves_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        let original = sample(None);
        fs::write(&path, &original).unwrap();

        let missing = dir.path().join("missing.bin");
        let args = SetArgs {
            exif: Some(&missing),
            ..Default::default()
        };
        let err = set(&path, &args, &Config::default()).unwrap_err();

        assert!(matches!(err, CliError::Io { .. }));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn oversize_set_fails_with_write_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pgf");
        let original = sample(None);
        fs::write(&path, &original).unwrap();

        let config = Config {
            max_metadata_size: 8,
            ..Default::default()
        };
        let args = SetArgs {
            comment: Some("far too long for the limit"),
            ..Default::default()
        };
        let err = set(&path, &args, &config).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn not_a_pgf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

        let err = info(&mut Vec::new(), &path, &Config::default()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn create_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.pgf");

        create(&path, 64, 32, &Config::default()).unwrap();

        let mut out = Vec::new();
        info(&mut out, &path, &Config::default()).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Dimensions:  64x32"));
        assert!(out.contains("Metadata:    none"));

        let err = create(&path, 1, 1, &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn create_negative() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.pgf");

        let err = create(&path, -4, 4, &Config::default()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
