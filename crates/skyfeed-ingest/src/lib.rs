//! Skyfeed Ingest Library
//!
//! Pulls price-list exports from remote sources, decodes them and publishes
//! one gzip-compressed JSON document per outlet to the ingestion API.
//!
//! # Pipeline
//!
//! ```text
//! connector (FTP / POP3 / HTTP)
//!     -> pipe (background worker, capacity-1 channel)
//!     -> codec (ZIP, DBF, CSV, code pages)
//!     -> normalize (reference tables, join)
//!     -> publish (gzip JSON to /data/add)
//! ```
//!
//! # Supported Sources
//!
//! - **ave**, **stl**: three CSV files on FTP joined into price lists
//! - **bel**: ZIP-wrapped DBF files on one or more FTP servers
//! - **a55**: DBF attachments from a POP3 mailbox
//! - **a24**: outlet list and XML offers over HTTP
//! - **foz**: gzipped JSON attachments forwarded as-is
//!
//! # Example
//!
//! ```no_run
//! use skyfeed_ingest::codec::delimited::{self, DelimitedOptions};
//!
//! let options = DelimitedOptions::new(b';').skip(1);
//! for row in delimited::rows(b"code;name\n101;Central\n", &options) {
//!     println!("{:?}", row);
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod codec;
pub mod commands;
pub mod config;
pub mod connector;
pub mod normalize;
pub mod notify;
pub mod pipe;
pub mod publish;

pub use config::IngestConfig;
pub use normalize::{RunContext, RunStats};
pub use pipe::{PipeItem, RecordPipe, RowError};
pub use publish::{AuthScheme, Publisher};
