//! Per-source parsers
//!
//! Triplet sources implement [`TripletFeed`]; pre-joined sources expose
//! functions that turn one decoded file into a [`PriceList`].
//!
//! [`TripletFeed`]: super::TripletFeed
//! [`PriceList`]: skyfeed_common::types::PriceList

pub mod a24;
pub mod a55;
pub mod ave;
pub mod bel;
pub mod stl;

use chrono::NaiveDate;

use super::TripletFeed;

/// Quantity written for sources that publish prices without stock
pub const DEFAULT_QUANTITY: f64 = 5.0;

/// Triplet feed registered under `name`, for the given business date.
pub fn triplet_feed(name: &str, date: NaiveDate) -> Option<Box<dyn TripletFeed>> {
    match name {
        ave::NAME => Some(Box::new(ave::AveFeed::for_date(date))),
        stl::NAME => Some(Box::new(stl::StlFeed::new())),
        _ => None,
    }
}
