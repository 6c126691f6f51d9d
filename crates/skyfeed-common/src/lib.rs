//! Skyfeed Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Skyfeed workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`SkyfeedError`] and the [`Result`] alias
//! - **Types**: outlet / catalog item / price line / price list wire model
//! - **Compression**: gzip helpers for publication batches
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use skyfeed_common::compression::gzip_json;
//! use skyfeed_common::types::{Outlet, PriceList};
//!
//! fn encode() -> skyfeed_common::Result<Vec<u8>> {
//!     let list = PriceList::new(Outlet::new("101", "Central Pharmacy", "STL"));
//!     gzip_json(&list)
//! }
//! ```

pub mod compression;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SkyfeedError};
