//! `a24`: an outlet list plus one XML offer catalog shared by all outlets
//!
//! ```text
//! list  [0] outlet code  [1] name  [2] head  [3] address  [4] registration code  [5] file
//! xml   <shop><offers><offer id=".."><url/><price/><name/><vendor/></offer>...
//! ```
//!
//! Every offer is published for every outlet with a fixed quantity. The offer
//! url goes out as the line's `addr` and `link`.

use serde::Deserialize;
use skyfeed_common::types::{compose_display_name, Outlet, PriceLine, PriceList};
use std::collections::HashMap;
use tracing::debug;

use super::DEFAULT_QUANTITY;
use crate::codec::delimited::{self, DelimitedOptions};
use crate::codec::text::CodePage;
use crate::codec::CodecError;
use crate::normalize::{field, ParsePolicy, RunStats};

pub const NAME: &str = "a24";

const POLICY: ParsePolicy = ParsePolicy::Zero;

pub fn list_options() -> DelimitedOptions {
    DelimitedOptions::new(b';').skip(1).code_page(CodePage::Windows1251)
}

/// Outlets from the list file; rows without a code are skipped.
pub fn parse_outlets(data: &[u8], stats: &mut RunStats) -> Vec<Outlet> {
    let mut outlets = Vec::new();
    for row in delimited::rows(data, &list_options()) {
        match row {
            Ok(row) => {
                stats.rows_read += 1;
                match parse_outlet(&row) {
                    Some(outlet) => outlets.push(outlet),
                    None => stats.rows_skipped += 1,
                }
            },
            Err(e) => {
                stats.row_errors += 1;
                debug!(error = %e, "Skipping outlet row");
            },
        }
    }
    outlets
}

fn parse_outlet(row: &[String]) -> Option<Outlet> {
    let code = field(row, 0)?.trim();
    if code.is_empty() {
        return None;
    }
    let outlet = Outlet::new(code, field(row, 1).unwrap_or_default(), field(row, 2).unwrap_or_default())
        .with_addr(field(row, 3).unwrap_or_default())
        .with_egrpou(field(row, 4).unwrap_or_default());
    Some(outlet)
}

#[derive(Debug, Default, Deserialize)]
struct Catalog {
    #[serde(default)]
    shop: Shop,
}

#[derive(Debug, Default, Deserialize)]
struct Shop {
    #[serde(default)]
    offers: Offers,
}

#[derive(Debug, Default, Deserialize)]
struct Offers {
    #[serde(default)]
    offer: Vec<Offer>,
}

/// One catalog offer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Offer {
    #[serde(rename = "@id")]
    pub id: String,
    pub url: String,
    pub price: String,
    pub name: String,
    pub vendor: String,
}

impl Offer {
    pub fn line(&self) -> PriceLine {
        PriceLine {
            code: self.id.trim().to_string(),
            name: compose_display_name(&self.name, &self.vendor),
            quant: DEFAULT_QUANTITY,
            price: POLICY.number(&self.price).unwrap_or(0.0),
            ..PriceLine::default()
        }
        .with_link(self.url.trim())
    }
}

/// Offers of an XML catalog, one per id (the last one wins), in document order.
pub fn parse_offers(xml: &[u8]) -> Result<Vec<Offer>, CodecError> {
    let text = CodePage::Windows1251.decode(xml);
    let catalog: Catalog = quick_xml::de::from_str(&text)?;

    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, Offer> = HashMap::new();
    for offer in catalog.shop.offers.offer {
        if !by_id.contains_key(&offer.id) {
            order.push(offer.id.clone());
        }
        by_id.insert(offer.id.clone(), offer);
    }

    let offers: Vec<Offer> = order.into_iter().filter_map(|id| by_id.remove(&id)).collect();
    let unpriced = offers.iter().filter(|o| POLICY.number(&o.price) == Some(0.0)).count();
    debug!(offers = offers.len(), unpriced, "Parsed offer catalog");
    Ok(offers)
}

/// Every offer for every outlet.
pub fn price_lists(outlets: &[Outlet], offers: &[Offer]) -> Vec<PriceList> {
    let lines: Vec<PriceLine> = offers.iter().map(Offer::line).collect();
    outlets
        .iter()
        .map(|outlet| PriceList {
            meta: outlet.clone(),
            data: lines.clone(),
        })
        .collect()
}
