//! `bel`: one ZIP-wrapped DBF table per outlet
//!
//! The outlet is the file itself: its stem is the outlet code and the
//! `APTEKA` column of the first record names it. Each record is one line:
//! `TOVAR` + `PROIZV` for the name, `KOLSTAT` stock and `PRICE`.

use skyfeed_common::types::{compose_display_name, Outlet, PriceLine, PriceList};
use std::path::Path;
use tracing::debug;

use crate::codec::dbf::DbfTable;
use crate::codec::text::CodePage;
use crate::normalize::RunStats;

pub const NAME: &str = "bel";
pub const HEAD: &str = "BEL";
pub const CODE_PAGE: CodePage = CodePage::Cp866;

/// Price list of the outlet delivered as `file_name`.
pub fn price_list(file_name: &str, table: &DbfTable, stats: &mut RunStats) -> PriceList {
    let code = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let mut outlet_name = String::new();
    let mut data = Vec::new();

    for record in table.rows() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                stats.row_errors += 1;
                debug!(file = file_name, error = %e, "Skipping record");
                continue;
            },
        };
        stats.rows_read += 1;

        if outlet_name.is_empty() {
            outlet_name = record.text("APTEKA").trim().to_string();
        }

        data.push(PriceLine {
            code: String::new(),
            name: compose_display_name(record.text("TOVAR"), record.text("PROIZV")),
            quant: record.number("KOLSTAT").unwrap_or(0.0),
            price: record.number("PRICE").unwrap_or(0.0),
            ..PriceLine::default()
        });
    }

    let meta = Outlet::new(code, outlet_name, HEAD).with_file(format!("file:{}", file_name));
    PriceList { meta, data }
}
