//! Per-request task primitives.
//!
//! Each task kind is a stateless function from a typed payload to a typed
//! output, executed inside one worker thread. Primitives share nothing
//! with the caller or with other workers; payload buffers are owned by
//! the task from submission on.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use vxq_decode::GeometryPayload;

use crate::error::{Error, Result};
use crate::raster::{self, Bitmap, EncodedBitmap, ExrImage};
use crate::transport::Transport;

/// Input for tasks that accept either a URL or an in-memory buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Fetch the bytes through the pool's transport first.
    Url(String),
    /// Use the bytes as-is. Moved into the task; clone before submitting
    /// to keep a caller-side copy.
    Bytes(Vec<u8>),
}

/// One unit of work, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    Fetch { url: String, inflate: bool },
    FetchJson { url: String },
    Compress { bytes: Vec<u8> },
    Decompress { bytes: Vec<u8> },
    ParseExr { source: DataSource },
    BitmapToBytes { bitmap: Bitmap },
    Geometry { source: DataSource },
}

/// Result data, tagged to match the submitting call.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Exr(ExrImage),
    EncodedBitmap(EncodedBitmap),
    Geometry(GeometryPayload),
}

/// Cache key for the fetch kinds that de-duplicate.
///
/// Kind is part of the key: a JSON fetch and a byte fetch of the same
/// URL produce different output types and must not share an entry, nor
/// may an inflated fetch alias a raw one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum FetchKey {
    Bytes { url: String, inflate: bool },
    Json { url: String },
}

impl TaskPayload {
    /// Short kind label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::FetchJson { .. } => "fetch_json",
            Self::Compress { .. } => "compress",
            Self::Decompress { .. } => "decompress",
            Self::ParseExr { .. } => "parse_exr",
            Self::BitmapToBytes { .. } => "bitmap_to_bytes",
            Self::Geometry { .. } => "geometry",
        }
    }

    /// De-duplication key, for the fetch kinds only.
    pub(crate) fn fetch_key(&self) -> Option<FetchKey> {
        match self {
            Self::Fetch { url, inflate } => Some(FetchKey::Bytes {
                url: url.clone(),
                inflate: *inflate,
            }),
            Self::FetchJson { url } => Some(FetchKey::Json { url: url.clone() }),
            _ => None,
        }
    }
}

/// Run one task to completion on the current thread.
pub fn run(payload: TaskPayload, transport: &dyn Transport) -> Result<TaskOutput> {
    match payload {
        TaskPayload::Fetch { url, inflate } => {
            fetch_bytes(transport, &url, inflate).map(TaskOutput::Bytes)
        }
        TaskPayload::FetchJson { url } => fetch_json(transport, &url).map(TaskOutput::Json),
        TaskPayload::Compress { bytes } => compress(&bytes).map(TaskOutput::Bytes),
        TaskPayload::Decompress { bytes } => decompress(&bytes).map(TaskOutput::Bytes),
        TaskPayload::ParseExr { source } => {
            let bytes = resolve_source(transport, source)?;
            raster::parse_exr(&bytes).map(TaskOutput::Exr)
        }
        TaskPayload::BitmapToBytes { bitmap } => {
            raster::encode_bitmap(bitmap).map(TaskOutput::EncodedBitmap)
        }
        TaskPayload::Geometry { source } => {
            let bytes = resolve_source(transport, source)?;
            vxq_decode::decode(&bytes)
                .map(TaskOutput::Geometry)
                .map_err(Error::from)
        }
    }
}

/// Fetch raw bytes, optionally passing them through zlib decompression.
fn fetch_bytes(transport: &dyn Transport, url: &str, inflate: bool) -> Result<Vec<u8>> {
    let bytes = transport.fetch(url)?;
    if inflate { decompress(&bytes) } else { Ok(bytes) }
}

/// Fetch and parse a JSON document.
fn fetch_json(transport: &dyn Transport, url: &str) -> Result<serde_json::Value> {
    let bytes = transport.fetch(url)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Json {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Compress bytes into a zlib stream.
fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).map_err(|e| Error::Compression {
        context: "compress",
        message: e.to_string(),
    })?;
    encoder.finish().map_err(|e| Error::Compression {
        context: "compress",
        message: e.to_string(),
    })
}

/// Decompress a zlib stream.
fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Compression {
            context: "decompress",
            message: e.to_string(),
        })?;
    Ok(out)
}

fn resolve_source(transport: &dyn Transport, source: DataSource) -> Result<Vec<u8>> {
    match source {
        DataSource::Url(url) => transport.fetch(&url),
        DataSource::Bytes(bytes) => Ok(bytes),
    }
}
