//! `ave`: three zipped CSV files named after the business date
//!
//! ```text
//! apt_DD.MM.YY.zip  [0] outlet code  [1] name  [2] address  [3] schedule
//! tov_DD.MM.YY.zip  [0] item code    [1] name  [2] brand    ...
//! ost_DD.MM.YY.zip  [0] item code    [1] outlet code  [2] quantity  [3] price
//! ```

use chrono::NaiveDate;
use skyfeed_common::types::{CatalogItem, Outlet};

use crate::codec::delimited::DelimitedOptions;
use crate::codec::text::CodePage;
use crate::connector::EntryFilter;
use crate::normalize::{field, FeedLayout, ParsePolicy, StockLine, TripletFeed};

pub const NAME: &str = "ave";
pub const HEAD: &str = "АВЕ";

#[derive(Debug, Clone)]
pub struct AveFeed {
    stamp: String,
    layout: FeedLayout,
}

impl AveFeed {
    pub fn for_date(date: NaiveDate) -> Self {
        let stamp = date.format("%d.%m.%y").to_string();
        let layout = FeedLayout {
            outlets: format!("apt_{}.zip", stamp),
            items: format!("tov_{}.zip", stamp),
            stock: format!("ost_{}.zip", stamp),
            zipped: true,
            options: DelimitedOptions::new(b';').skip(1).code_page(CodePage::Windows1251),
        };
        Self { stamp, layout }
    }
}

impl TripletFeed for AveFeed {
    fn name(&self) -> &'static str {
        NAME
    }

    fn head(&self) -> &'static str {
        HEAD
    }

    fn layout(&self) -> &FeedLayout {
        &self.layout
    }

    /// Only files of the business date are downloaded.
    fn filter(&self) -> EntryFilter {
        EntryFilter::contains(&self.stamp)
    }

    fn policy(&self) -> ParsePolicy {
        ParsePolicy::Zero
    }

    fn parse_outlet(&self, row: &[String]) -> Option<Outlet> {
        let code = field(row, 0)?;
        let name = field(row, 1)?;
        let addr = field(row, 2).unwrap_or_default();
        Some(Outlet::new(code, name, HEAD).with_addr(addr))
    }

    fn parse_item(&self, row: &[String]) -> Option<CatalogItem> {
        let code = field(row, 0)?;
        let name = field(row, 1)?;
        let brand = field(row, 2).unwrap_or_default();
        Some(CatalogItem::new(code, name, brand))
    }

    fn parse_stock(&self, row: &[String]) -> Option<StockLine> {
        Some(StockLine {
            item: field(row, 0)?.to_string(),
            outlet: field(row, 1)?.to_string(),
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

    fn feed() -> AveFeed {
        AveFeed::for_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
    }

    #[test]
    fn test_file_names() {
        let feed = feed();
        assert_eq!(feed.layout().files(), vec!["apt_05.01.24.zip", "tov_05.01.24.zip", "ost_05.01.24.zip"]);
        assert!(feed.filter().accepts("OST_05.01.24.ZIP"));
        assert!(!feed.filter().accepts("ost_04.01.24.zip"));
    }

    #[test]
    fn test_outlet_row() {
        let outlet = feed().parse_outlet(&row(&["101", "", "Main st. 1", "24h"])).unwrap();
        assert_eq!(outlet.code, "101");
        assert_eq!(outlet.name, HEAD);
        assert_eq!(outlet.head, HEAD);
        assert_eq!(outlet.addr, "Main st. 1");
    }

    #[test]
    fn test_stock_row_coerces_to_zero() {
        let line = feed().parse_stock(&row(&["C1", "101", "n/a", "3.40"])).unwrap();
        assert_eq!(line.quant, 0.0);
        assert_eq!(line.price, 3.4);
    }

    #[test]
    fn test_short_rows_are_rejected() {
        assert!(feed().parse_stock(&row(&["C1", "101"])).is_none());
        assert!(feed().parse_outlet(&row(&["101"])).is_none());
    }
}
