//! Gzip helpers for publication batches
//!
//! The ingestion API accepts `Content-Encoding: application/x-gzip` bodies
//! holding a single JSON document.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::Result;

/// Serialize `value` as JSON straight into a gzip stream.
pub fn gzip_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    encoder.write_all(b"\n")?;
    Ok(encoder.finish()?)
}

/// Decompress a whole gzip payload.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
