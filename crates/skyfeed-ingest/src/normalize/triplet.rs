//! Three-file sources
//!
//! A [`TripletFeed`] names its three files and knows how to read one row of
//! each. [`ingest_triplet`] processes the outlet file, then the catalog file,
//! then the stock file, so both reference tables are complete before the
//! first stock line is joined.

use anyhow::{Context, Result};
use bytes::Bytes;
use skyfeed_common::types::{CatalogItem, Outlet};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{NormalizeError, ParsePolicy, RunContext, StockLine};
use crate::codec::archive;
use crate::codec::delimited::{self, DelimitedOptions};
use crate::connector::EntryFilter;
use crate::pipe::PipeItem;

/// Processing order of a triplet's files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Outlets,
    Items,
    Stock,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Outlets, Stage::Items, Stage::Stock];
}

/// File names and text format of a triplet source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLayout {
    pub outlets: String,
    pub items: String,
    pub stock: String,
    /// Each file is a ZIP holding the CSV as its first entry
    pub zipped: bool,
    pub options: DelimitedOptions,
}

impl FeedLayout {
    pub fn file(&self, stage: Stage) -> &str {
        match stage {
            Stage::Outlets => &self.outlets,
            Stage::Items => &self.items,
            Stage::Stock => &self.stock,
        }
    }

    pub fn files(&self) -> Vec<String> {
        Stage::ORDER.iter().map(|s| self.file(*s).to_string()).collect()
    }
}

/// Per-source row parsers of a three-file source
///
/// Parsers return `None` for rows they cannot use; the driver counts those
/// as skipped.
pub trait TripletFeed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Tag written into every outlet's `head`
    fn head(&self) -> &'static str;

    fn layout(&self) -> &FeedLayout;

    /// Which remote files to download
    fn filter(&self) -> EntryFilter {
        EntryFilter::any()
    }

    fn policy(&self) -> ParsePolicy;

    fn parse_outlet(&self, row: &[String]) -> Option<Outlet>;

    fn parse_item(&self, row: &[String]) -> Option<CatalogItem>;

    fn parse_stock(&self, row: &[String]) -> Option<StockLine>;
}

/// Load all three files of `feed` into `ctx`, joining the stock lines.
///
/// `files` maps delivered file names to content; names are matched without
/// regard to ASCII case. A missing file fails the run.
pub async fn ingest_triplet(
    feed: &dyn TripletFeed,
    files: &HashMap<String, Bytes>,
    ctx: &mut RunContext,
) -> Result<()> {
    let layout = feed.layout();

    for stage in Stage::ORDER {
        let expected = layout.file(stage);
        let data = files
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(expected))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| NormalizeError::MissingFile(expected.to_string()))?;

        let text = if layout.zipped {
            archive::extract_first(&data)
                .with_context(|| format!("Failed to unpack {}", expected))?
                .data
        } else {
            data.to_vec()
        };

        let before = ctx.stats;
        let mut rows = delimited::stream(text, layout.options);
        while let Some(item) = rows.next().await {
            match item {
                PipeItem::Item(row) => {
                    ctx.stats.rows_read += 1;
                    apply(feed, stage, &row, ctx);
                },
                PipeItem::RowError(e) => {
                    ctx.stats.row_errors += 1;
                    debug!(file = expected, error = %e, "Skipping malformed row");
                },
                PipeItem::Fatal(e) => {
                    return Err(e).with_context(|| format!("Failed to read {}", expected));
                },
            }
        }

        info!(
            source = feed.name(),
            file = expected,
            rows = ctx.stats.rows_read - before.rows_read,
            errors = ctx.stats.row_errors - before.row_errors,
            "Processed file"
        );
    }

    info!(
        source = feed.name(),
        outlets = ctx.tables.outlets.len(),
        items = ctx.tables.items.len(),
        joined = ctx.stats.lines_joined,
        misses = ctx.stats.lookup_misses,
        "Join complete"
    );
    Ok(())
}

fn apply(feed: &dyn TripletFeed, stage: Stage, row: &[String], ctx: &mut RunContext) {
    let used = match stage {
        Stage::Outlets => feed.parse_outlet(row).map(|outlet| ctx.tables.insert_outlet(outlet)).is_some(),
        Stage::Items => feed.parse_item(row).map(|item| ctx.tables.insert_item(item)).is_some(),
        Stage::Stock => match feed.parse_stock(row) {
            Some(line) => {
                let outcome = ctx.tables.join(&line);
                ctx.stats.record_join(outcome);
                true
            },
            None => false,
        },
    };

    if !used {
        ctx.stats.rows_skipped += 1;
        debug!(source = feed.name(), ?stage, ?row, "Row skipped by parser");
    }
}
