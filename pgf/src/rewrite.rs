//! Rebuilds a whole container into a temporary output and commits it.
//!
//! The original content is only ever read. Every byte of the replacement is
//! written to [`Stream::temp`] first, so a failure at any stage drops the
//! temporary and leaves the stream as it was.
use std::io::{SeekFrom, Write};

use log::{debug, info, warn};
use pcore::buf::copy_chunked;
use pcore::stream::Stream;

use crate::config::Config;
use crate::container::{read_container, Container};
use crate::error::{PgfError, Result};
use crate::header::PgfHeader;
use crate::image::Mode;
use crate::metadata::{write_region, Metadata, MetadataCodec, MetadataRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    HeaderWritten,
    MetadataWritten,
    PayloadCopied,
    Committed,
    Aborted,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Edit<'a> {
    /// Replacement metadata. `None` keeps the current region as is, an empty
    /// [`Metadata`] removes it.
    pub metadata: Option<&'a Metadata>,
    pub dimensions: Option<(i32, i32)>,
}

/// What the committed container looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub header: PgfHeader,
    pub region: MetadataRegion,
    pub payload_len: u64,
}

pub struct Rewriter<'a, C: MetadataCodec + ?Sized> {
    codec: &'a C,
    config: &'a Config,
    stage: Stage,
}

impl<'a, C: MetadataCodec + ?Sized> Rewriter<'a, C> {
    pub fn new(codec: &'a C, config: &'a Config) -> Self {
        Rewriter {
            codec,
            config,
            stage: Stage::NotStarted,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        debug!("Rewrite {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Rewrite `stream` and commit the result. Any failure comes back as
    /// [`PgfError::WriteFailed`] with the stream content untouched.
    pub fn rewrite<S: Stream + ?Sized>(&mut self, stream: &mut S, mode: Mode, edit: &Edit) -> Result<Rewritten> {
        match self.run(stream, mode, edit) {
            Ok(done) => {
                info!(
                    "Committed {}x{} container, metadata region {} bytes, payload {} bytes",
                    done.header.width(),
                    done.header.height(),
                    done.region.length,
                    done.payload_len
                );
                Ok(done)
            }
            Err(err) => {
                warn!("Rewrite aborted after {:?}: {}", self.stage, err);
                self.advance(Stage::Aborted);
                Err(PgfError::write_failed(err))
            }
        }
    }

    fn run<S: Stream + ?Sized>(&mut self, stream: &mut S, mode: Mode, edit: &Edit) -> Result<Rewritten> {
        // Cached values on the handle may be stale, always start from the stream
        let (mut header, existing) = match mode {
            Mode::Create => (PgfHeader::synthesize(0, 0)?, None),
            Mode::Existing => {
                stream.seek(SeekFrom::Start(0))?;
                let Container {
                    header,
                    region,
                    payload,
                } = read_container(stream, self.config.max_metadata_size)?;
                (header, Some((region, payload)))
            }
        };

        if let Some((width, height)) = edit.dimensions {
            header.set_dimensions(width, height)?;
        }

        let (old_region, old_payload) = match existing {
            Some((region, payload)) => (Some(region), payload),
            None => (None, None),
        };
        let payload = match edit.metadata {
            Some(metadata) if metadata.is_empty() => None,
            Some(metadata) => Some(self.codec.encode(metadata)?),
            None => old_payload,
        };

        if let Some(payload) = &payload {
            if payload.len() > self.config.max_metadata_size as usize {
                return Err(PgfError::metadata(format!(
                    "metadata payload of {} bytes exceeds limit of {}",
                    payload.len(),
                    self.config.max_metadata_size
                )));
            }
        }

        let mut temp = stream.temp()?;

        temp.write_all(&header.encode())?;
        self.advance(Stage::HeaderWritten);

        let region = match &payload {
            Some(payload) => {
                let written = write_region(&mut temp, header.endian(), payload)?;
                MetadataRegion {
                    present: true,
                    offset: header.end_offset(),
                    length: written,
                }
            }
            None => MetadataRegion::absent(header.end_offset()),
        };
        self.advance(Stage::MetadataWritten);

        let payload_len = match old_region {
            Some(old_region) => {
                stream.seek(SeekFrom::Start(old_region.payload_end()))?;
                copy_chunked(stream, &mut temp, self.config.copy_chunk_size)?
            }
            None => 0,
        };
        self.advance(Stage::PayloadCopied);

        stream.commit(temp)?;
        self.advance(Stage::Committed);

        Ok(Rewritten {
            header,
            region,
            payload_len,
        })
    }
}
