//! `stl`: three plain CSV files with fixed names
//!
//! ```text
//! APT.csv  [0] outlet code  [1] name
//! SP.csv   [0] item code    [1] name  [2] manufacturer  [3] country
//! OST.csv  [0] outlet code  [1] item code  [2] quantity  [3] price
//! ```

use skyfeed_common::types::{compose_display_name, CatalogItem, Outlet};

use crate::codec::delimited::DelimitedOptions;
use crate::codec::text::CodePage;
use crate::normalize::{field, FeedLayout, ParsePolicy, StockLine, TripletFeed};

pub const NAME: &str = "stl";
pub const HEAD: &str = "STL";

#[derive(Debug, Clone)]
pub struct StlFeed {
    layout: FeedLayout,
}

impl StlFeed {
    pub fn new() -> Self {
        Self {
            layout: FeedLayout {
                outlets: "APT.csv".to_string(),
                items: "SP.csv".to_string(),
                stock: "OST.csv".to_string(),
                zipped: false,
                options: DelimitedOptions::new(b';').skip(1).code_page(CodePage::Windows1251),
            },
        }
    }
}

impl Default for StlFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl TripletFeed for StlFeed {
    fn name(&self) -> &'static str {
        NAME
    }

    fn head(&self) -> &'static str {
        HEAD
    }

    fn layout(&self) -> &FeedLayout {
        &self.layout
    }

    fn policy(&self) -> ParsePolicy {
        ParsePolicy::Skip
    }

    fn parse_outlet(&self, row: &[String]) -> Option<Outlet> {
        Some(Outlet::new(field(row, 0)?, field(row, 1)?, HEAD))
    }

    fn parse_item(&self, row: &[String]) -> Option<CatalogItem> {
        let name = compose_display_name(field(row, 1)?, field(row, 2).unwrap_or_default());
        let country = field(row, 3).unwrap_or_default();
        Some(CatalogItem::new(field(row, 0)?, &name, country))
    }

    fn parse_stock(&self, row: &[String]) -> Option<StockLine> {
        Some(StockLine {
            outlet: field(row, 0)?.to_string(),
            item: field(row, 1)?.to_string(),
            quant: self.policy().number(field(row, 2)?)?,
            price: self.policy().number(field(row, 3)?)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_item_name_folds_maker_and_country() {
        let item = StlFeed::new()
            .parse_item(&row(&["7", "Aspirin", "Bayer", "Germany"]))
            .unwrap();
        assert_eq!(item.name, "Aspirin Bayer Germany");

        let item = StlFeed::new()
            .parse_item(&row(&["7", "Aspirin Bayer", "BAYER", "Germany"]))
            .unwrap();
        assert_eq!(item.name, "Aspirin Bayer Germany");
    }

    #[test]
    fn test_bad_numbers_drop_the_row() {
        let feed = StlFeed::new();
        assert!(feed.parse_stock(&row(&["1", "7", "x", "2.0"])).is_none());
        assert!(feed.parse_stock(&row(&["1", "7", "1", ""])).is_none());

        let line = feed.parse_stock(&row(&["1", "7", "4", "2.5"])).unwrap();
        assert_eq!((line.outlet.as_str(), line.item.as_str()), ("1", "7"));
        assert_eq!((line.quant, line.price), (4.0, 2.5));
    }
}
