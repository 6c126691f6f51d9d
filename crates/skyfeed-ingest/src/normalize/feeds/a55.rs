//! `a55`: DBF price tables mailed as attachments
//!
//! The tables carry no outlet details; those come from the `--meta` JSON
//! object (`name`, `head`, `addr`, `code`, optionally `id`). The first live
//! record of every export is a title row and is ignored.

use serde::Deserialize;
use skyfeed_common::types::{compose_display_name, Outlet, PriceLine, PriceList};
use std::path::Path;
use tracing::debug;

use super::DEFAULT_QUANTITY;
use crate::codec::dbf::DbfTable;
use crate::codec::text::CodePage;
use crate::normalize::RunStats;

pub const NAME: &str = "a55";
pub const CODE_PAGE: CodePage = CodePage::Cp866;

const TITLE_ROWS: usize = 1;

/// Outlet details supplied on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutletMeta {
    pub id: String,
    pub name: String,
    pub head: String,
    pub addr: String,
    /// Registration code
    pub code: String,
}

impl OutletMeta {
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Outlet for one attachment; the attachment's stem stands in for a
    /// missing `id`.
    pub fn outlet(&self, file_name: &str) -> Outlet {
        let code = if self.id.trim().is_empty() {
            Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string())
        } else {
            self.id.trim().to_string()
        };

        Outlet::new(code, self.name.as_str(), self.head.as_str())
            .with_addr(self.addr.as_str())
            .with_egrpou(self.code.as_str())
    }
}

pub fn price_list(meta: &OutletMeta, file_name: &str, table: &DbfTable, stats: &mut RunStats) -> PriceList {
    let mut list = PriceList::new(meta.outlet(file_name));

    for record in table.rows().skip(TITLE_ROWS) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                stats.row_errors += 1;
                debug!(file = file_name, error = %e, "Skipping record");
                continue;
            },
        };
        stats.rows_read += 1;

        list.data.push(PriceLine {
            code: record.text("KOD").trim().to_string(),
            name: compose_display_name(record.text("NAME"), record.text("PROIZVODIT")),
            quant: DEFAULT_QUANTITY,
            price: record.number("CENA").unwrap_or(0.0),
            ..PriceLine::default()
        });
    }

    list
}
