//! The handle a host library holds on one PGF container.

use log::debug;
use pcore::stream::Stream;

use crate::config::Config;
use crate::container::read_container;
use crate::error::Result;
use crate::header::{check_dimensions, PgfHeader};
use crate::magic::probe_magic;
use crate::metadata::{ChunkCodec, Metadata, MetadataCodec, MetadataRegion};
use crate::rewrite::{Edit, Rewriter};
use crate::sniff::is_pgf_type;
use crate::MIME_TYPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The stream holds a container to read and edit.
    Existing,
    /// The stream content is ignored and replaced on the first write.
    Create,
}

/// Owns the stream for its whole lifetime. Header and region are only set
/// after a successful read or write, never half populated.
pub struct PgfImage<S: Stream, C: MetadataCodec = ChunkCodec> {
    io: S,
    mode: Mode,
    codec: C,
    config: Config,
    header: Option<PgfHeader>,
    region: Option<MetadataRegion>,
    metadata: Metadata,
    // Metadata was handed out mutably since the last read or write
    dirty: bool,
    dimensions: Option<(i32, i32)>,
}

impl<S: Stream> PgfImage<S> {
    /// Take ownership of `io`. Outside of create mode the stream has to
    /// start with a supported PGF signature, its position is left alone.
    pub fn new(mut io: S, create: bool) -> Result<Self> {
        let mode = if create { Mode::Create } else { Mode::Existing };
        if mode == Mode::Existing {
            probe_magic(&mut io)?;
        }

        Ok(PgfImage {
            io,
            mode,
            codec: ChunkCodec,
            config: Config::default(),
            header: None,
            region: None,
            metadata: Metadata::default(),
            dirty: false,
            dimensions: None,
        })
    }
}

impl<S: Stream, C: MetadataCodec> PgfImage<S, C> {
    pub fn with_codec<D: MetadataCodec>(self, codec: D) -> PgfImage<S, D> {
        PgfImage {
            io: self.io,
            mode: self.mode,
            codec,
            config: self.config,
            header: self.header,
            region: self.region,
            metadata: self.metadata,
            dirty: self.dirty,
            dimensions: self.dimensions,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    /// Whether the stream currently holds something this handle can work
    /// with. A handle in create mode always qualifies.
    pub fn good(&mut self) -> bool {
        self.mode == Mode::Create || is_pgf_type(&mut self.io, false)
    }

    /// Parse header and metadata region from the start of the stream.
    ///
    /// On failure the previously read state is gone and nothing of the failed
    /// read is visible.
    pub fn read_metadata(&mut self) -> Result<()> {
        self.header = None;
        self.region = None;
        self.metadata.clear();
        self.dirty = false;

        self.io.rewind()?;
        let container = read_container(&mut self.io, self.config.max_metadata_size)?;
        let metadata = match &container.payload {
            Some(payload) => self.codec.decode(payload)?,
            None => Metadata::default(),
        };
        debug!(
            "Read {}x{} image, metadata region present: {}",
            container.header.width(),
            container.header.height(),
            container.region.present
        );

        self.header = Some(container.header);
        self.region = Some(container.region);
        self.metadata = metadata;
        Ok(())
    }

    /// Rewrite the container with the current metadata and dimensions.
    ///
    /// Untouched metadata is carried over byte for byte. On failure the
    /// stream and the cached state are left as they were.
    pub fn write_metadata(&mut self) -> Result<()> {
        let metadata = if self.dirty || self.mode == Mode::Create {
            Some(&self.metadata)
        } else {
            None
        };
        let edit = Edit {
            metadata,
            dimensions: self.dimensions,
        };

        let done = Rewriter::new(&self.codec, &self.config).rewrite(&mut self.io, self.mode, &edit)?;

        self.header = Some(done.header);
        self.region = Some(done.region);
        self.mode = Mode::Existing;
        self.dirty = false;
        self.dimensions = None;
        Ok(())
    }

    pub fn header(&self) -> Option<&PgfHeader> {
        self.header.as_ref()
    }

    pub fn region(&self) -> Option<&MetadataRegion> {
        self.region.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.dirty = true;
        &mut self.metadata
    }

    pub fn clear_metadata(&mut self) {
        self.dirty = true;
        self.metadata.clear();
    }

    /// Dimensions to store on the next write.
    pub fn set_dimensions(&mut self, width: i32, height: i32) -> Result<()> {
        check_dimensions(width, height)?;
        self.dimensions = Some((width, height));
        Ok(())
    }

    pub fn pixel_width(&self) -> i32 {
        match (self.dimensions, &self.header) {
            (Some((width, _)), _) => width,
            (None, Some(header)) => header.width(),
            (None, None) => 0,
        }
    }

    pub fn pixel_height(&self) -> i32 {
        match (self.dimensions, &self.header) {
            (Some((_, height)), _) => height,
            (None, Some(header)) => header.height(),
            (None, None) => 0,
        }
    }

    pub fn io(&self) -> &S {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut S {
        &mut self.io
    }

    pub fn into_inner(self) -> S {
        self.io
    }
}

/// Factory for the host registry: `None` when the stream is not a PGF
/// container and no new one is to be created.
pub fn new_instance<S: Stream>(io: S, create: bool) -> Option<PgfImage<S>> {
    PgfImage::new(io, create).ok()
}
