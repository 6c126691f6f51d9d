//! Normalization and join
//!
//! Triplet sources deliver three files: outlets, catalog items and stock
//! lines referencing both by code. The first two fill keyed reference tables,
//! then every stock line is joined against them. A stock line whose outlet or
//! item is unknown produces nothing; it is only counted.
//!
//! Pre-joined sources build [`PriceList`]s directly and hand them to the
//! [`RunContext`] alongside the joined ones.
//!
//! All state of a run lives in one [`RunContext`]; nothing is global.

pub mod feeds;
pub mod triplet;

use skyfeed_common::types::{CatalogItem, Outlet, PriceLine, PriceList};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::info;

pub use triplet::{ingest_triplet, FeedLayout, Stage, TripletFeed};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("expected file '{0}' was not delivered")]
    MissingFile(String),
}

/// What to do with a quantity or price that is not a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Drop the row
    Skip,
    /// Use 0.0
    Zero,
}

impl ParsePolicy {
    pub fn number(self, raw: &str) -> Option<f64> {
        match (parse_decimal(raw), self) {
            (Some(value), _) => Some(value),
            (None, ParsePolicy::Zero) => Some(0.0),
            (None, ParsePolicy::Skip) => None,
        }
    }
}

/// Parse a decimal that may use `,` as separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Field `index` of a row, if present
pub fn field(row: &[String], index: usize) -> Option<&str> {
    row.get(index).map(String::as_str)
}

/// A stock row before the join
#[derive(Debug, Clone, PartialEq)]
pub struct StockLine {
    pub outlet: String,
    pub item: String,
    pub quant: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    UnknownOutlet,
    UnknownItem,
}

/// Reference tables and joined lines of one run
#[derive(Debug, Default)]
pub struct Tables {
    pub outlets: HashMap<String, Outlet>,
    pub items: HashMap<String, CatalogItem>,
    /// Joined lines by outlet code, ordered for deterministic publishing
    pub prices: BTreeMap<String, Vec<PriceLine>>,
}

impl Tables {
    /// Insert or replace an outlet.
    pub fn insert_outlet(&mut self, outlet: Outlet) {
        self.outlets.insert(outlet.code.clone(), outlet);
    }

    /// Insert or replace a catalog item.
    pub fn insert_item(&mut self, item: CatalogItem) {
        self.items.insert(item.code.clone(), item);
    }

    /// Append `line` to its outlet's list when both codes resolve.
    pub fn join(&mut self, line: &StockLine) -> JoinOutcome {
        if !self.outlets.contains_key(&line.outlet) {
            return JoinOutcome::UnknownOutlet;
        }
        let Some(item) = self.items.get(&line.item) else {
            return JoinOutcome::UnknownItem;
        };

        self.prices
            .entry(line.outlet.clone())
            .or_default()
            .push(PriceLine::new(item, line.quant, line.price));
        JoinOutcome::Joined
    }

    /// List of one outlet, empty when nothing joined to it.
    pub fn price_list(&self, outlet: &str) -> Option<PriceList> {
        let meta = self.outlets.get(outlet)?.clone();
        Some(PriceList {
            meta,
            data: self.prices.get(outlet).cloned().unwrap_or_default(),
        })
    }

    /// Lists of every outlet with at least one joined line.
    pub fn price_lists(&self) -> Vec<PriceList> {
        self.prices
            .iter()
            .filter(|(_, lines)| !lines.is_empty())
            .filter_map(|(code, lines)| {
                let meta = self.outlets.get(code)?.clone();
                Some(PriceList {
                    meta,
                    data: lines.clone(),
                })
            })
            .collect()
    }
}

/// Counters reported at the end of every run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub rows_read: u64,
    pub row_errors: u64,
    /// Rows dropped by a parser (short rows, numbers under the skip policy)
    pub rows_skipped: u64,
    pub lines_joined: u64,
    pub lookup_misses: u64,
    pub lists_published: u64,
    pub lists_empty: u64,
}

impl RunStats {
    pub fn record_join(&mut self, outcome: JoinOutcome) {
        match outcome {
            JoinOutcome::Joined => self.lines_joined += 1,
            JoinOutcome::UnknownOutlet | JoinOutcome::UnknownItem => self.lookup_misses += 1,
        }
    }

    pub fn log(&self, source: &str) {
        info!(
            source,
            rows_read = self.rows_read,
            row_errors = self.row_errors,
            rows_skipped = self.rows_skipped,
            lines_joined = self.lines_joined,
            lookup_misses = self.lookup_misses,
            lists_published = self.lists_published,
            lists_empty = self.lists_empty,
            "Run statistics"
        );
    }
}

/// Everything one run accumulates
#[derive(Debug)]
pub struct RunContext {
    pub source: &'static str,
    pub tables: Tables,
    /// Lists from sources that need no join
    pub prejoined: Vec<PriceList>,
    pub stats: RunStats,
}

impl RunContext {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            tables: Tables::default(),
            prejoined: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Joined lists followed by pre-joined ones.
    pub fn price_lists(&self) -> Vec<PriceList> {
        let mut lists = self.tables.price_lists();
        lists.extend(self.prejoined.iter().cloned());
        lists
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn tables() -> Tables {
        let mut tables = Tables::default();
        tables.insert_outlet(Outlet::new("101", "Central Pharmacy", "AVE").with_addr("ADDR1"));
        tables.insert_item(CatalogItem::new("C1", "Aspirin", "AcmeCo"));
        tables
    }

    fn stock(outlet: &str, item: &str) -> StockLine {
        StockLine {
            outlet: outlet.into(),
            item: item.into(),
            quant: 12.5,
            price: 3.4,
        }
    }

    #[test]
    fn test_join_resolves_both_keys() {
        let mut tables = tables();
        assert_eq!(tables.join(&stock("101", "C1")), JoinOutcome::Joined);

        let list = tables.price_list("101").unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].code, "C1");
        assert_eq!(list.data[0].name, "Aspirin AcmeCo");
        assert_eq!(list.data[0].quant, 12.5);
        assert_eq!(list.data[0].price, 3.4);
    }

    #[test]
    fn test_join_misses_produce_nothing() {
        let mut tables = tables();
        assert_eq!(tables.join(&stock("999", "C1")), JoinOutcome::UnknownOutlet);
        assert_eq!(tables.join(&stock("101", "C9")), JoinOutcome::UnknownItem);

        assert!(tables.price_list("101").unwrap().is_empty());
        assert!(tables.price_list("999").is_none());
        assert!(tables.price_lists().is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let mut tables = tables();
        tables.insert_outlet(Outlet::new("101", "Renamed", "AVE"));
        assert_eq!(tables.outlets["101"].name, "Renamed");
        assert_eq!(tables.outlets.len(), 1);
    }

    #[test]
    fn test_price_lists_are_ordered_by_code() {
        let mut tables = tables();
        tables.insert_outlet(Outlet::new("050", "West", "AVE"));
        tables.join(&stock("101", "C1"));
        tables.join(&stock("050", "C1"));

        let codes: Vec<_> = tables.price_lists().iter().map(|l| l.meta.code.clone()).collect();
        assert_eq!(codes, vec!["050", "101"]);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(ParsePolicy::Skip.number("3.40"), Some(3.4));
        assert_eq!(ParsePolicy::Skip.number("3,40"), Some(3.4));
        assert_eq!(ParsePolicy::Skip.number("n/a"), None);
        assert_eq!(ParsePolicy::Zero.number("n/a"), Some(0.0));
        assert_eq!(ParsePolicy::Zero.number(""), Some(0.0));
        assert_eq!(ParsePolicy::Skip.number("NaN"), None);
    }

    #[test]
    fn test_stats_count_joins() {
        let mut stats = RunStats::default();
        stats.record_join(JoinOutcome::Joined);
        stats.record_join(JoinOutcome::UnknownItem);
        stats.record_join(JoinOutcome::UnknownOutlet);
        assert_eq!(stats.lines_joined, 1);
        assert_eq!(stats.lookup_misses, 2);
    }

    #[test]
    fn test_context_merges_prejoined() {
        let mut ctx = RunContext::new("test");
        ctx.tables = tables();
        ctx.tables.join(&stock("101", "C1"));
        ctx.prejoined.push(PriceList::new(Outlet::new("X", "Mail", "A55")));

        let lists = ctx.price_lists();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[1].meta.code, "X");
    }
}
