//! Archive helpers
//!
//! Vendors wrap each export in its own ZIP file; only the first entry
//! matters. Forwarded mail attachments are gzip streams and are only sniffed
//! here, never unpacked.

use std::io::{Cursor, Read};
use tracing::debug;

use super::CodecError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// First entry of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Return the content of the first entry in a ZIP archive.
///
/// Later entries are ignored. An archive with no entries fails with
/// [`CodecError::EmptyArchive`].
pub fn extract_first(data: &[u8]) -> Result<ExtractedEntry, CodecError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let entries = archive.len();
    if entries == 0 {
        return Err(CodecError::EmptyArchive);
    }

    let mut file = archive.by_index(0)?;
    let name = file.name().to_string();

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    debug!(
        entry = %name,
        entries,
        "Extracted {} -> {} bytes",
        data.len(),
        contents.len()
    );

    Ok(ExtractedEntry {
        name,
        data: contents,
    })
}

pub fn is_zip(data: &[u8]) -> bool {
    data.starts_with(&ZIP_MAGIC)
}

pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}
