//! Decoders for the container and text formats vendors ship
//!
//! - [`text`]: legacy Cyrillic code pages to UTF-8
//! - [`archive`]: first entry of a ZIP archive
//! - [`delimited`]: CSV-like rows
//! - [`dbf`]: dBase III tables

pub mod archive;
pub mod dbf;
pub mod delimited;
pub mod text;

use thiserror::Error;

pub use dbf::DbfError;
pub use text::CodePage;

/// Errors raised while decoding a whole file or container.
///
/// Problems confined to a single row are reported as
/// [`crate::pipe::RowError`] instead.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("archive contains no entries")]
    EmptyArchive,

    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DBF error: {0}")]
    Dbf(#[from] DbfError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
}
