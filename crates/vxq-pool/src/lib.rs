//! Worker pool for offloading mesh decoding, compression, and image
//! parsing off the caller's thread.
//!
//! This crate pairs a fixed set of worker threads with a dispatcher that
//! exposes one async call per task kind: byte/JSON fetches, zlib
//! (de)compression, EXR parsing, bitmap-to-PNG encoding, and VXQ
//! geometry decoding (via `vxq-decode`). Fetches are de-duplicated per
//! request key for the lifetime of the pool, so a URL is never fetched
//! twice - concurrent callers share the in-flight transfer.
//!
//! # Design principles
//!
//! - **Explicit ownership**: construct a [`Pool`] at startup and pass
//!   clones around; there is no global instance
//! - **Share-nothing workers**: payloads move to a worker, results move
//!   back; no memory is touched from two threads at once
//! - **Runtime-agnostic futures**: submission never blocks and the
//!   returned futures work with any executor
//!
//! # Example
//!
//! ```ignore
//! use vxq_pool::{DataSource, Pool};
//!
//! let pool = Pool::new();
//!
//! // Decode a mesh fetched from the CDN.
//! let geometry = pool
//!     .geometry(DataSource::Url("https://cdn.example/room.vxq".into()))
//!     .await?;
//!
//! // Concurrent fetches of one URL share a single transfer.
//! let (a, b) = tokio::join!(
//!     pool.fetch("https://cdn.example/lightmap.bin", true),
//!     pool.fetch("https://cdn.example/lightmap.bin", true),
//! );
//! ```

mod error;
mod pool;
mod raster;
mod task;
mod transport;

pub use error::{Error, Result};
pub use pool::Pool;
pub use raster::{Bitmap, BitmapEncoding, ComponentType, EncodedBitmap, ExrImage, PixelFormat};
pub use task::{DataSource, TaskOutput, TaskPayload};
pub use transport::{HttpTransport, Transport};

// Re-export decode types for convenience.
pub use vxq_decode::{DecodeError, GeometryPayload};
