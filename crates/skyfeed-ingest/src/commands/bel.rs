//! `bel`: ZIP-wrapped DBF tables from one or more FTP servers
//!
//! `--src` lists the servers separated by commas. All servers are read and
//! all lists published before any file is removed; removal then runs once per
//! server for the files that came from it.

use anyhow::{Context, Result};
use tracing::info;

use super::{ftp_config, publish_all, Session};
use crate::codec::archive;
use crate::codec::dbf::DbfTable;
use crate::connector::ftp::{FtpConfig, FtpSource};
use crate::connector::{delete_entries, fetch_entries, redact, Cleanup, EntryFilter};
use crate::normalize::feeds::bel;
use crate::normalize::RunContext;

/// Split a comma-separated address list, ignoring blanks.
pub fn addresses(src: &str) -> Vec<&str> {
    src.split(',').map(str::trim).filter(|a| !a.is_empty()).collect()
}

pub async fn run(src: &str, session: &Session, ctx: &mut RunContext) -> Result<()> {
    let mut consumed: Vec<(FtpConfig, Vec<String>)> = Vec::new();

    for address in addresses(src) {
        let ftp = ftp_config(address, session)?;
        let connect = ftp.clone();
        let entries = fetch_entries(move || FtpSource::connect(&connect), EntryFilter::extension(".zip"), Cleanup::Batch)
            .try_collect()
            .await
            .with_context(|| format!("Failed to download from {}", redact(address)))?;
        info!(server = %redact(address), files = entries.len(), "Downloaded archives");

        let mut names = Vec::with_capacity(entries.len());
        for entry in entries {
            let unpacked = archive::extract_first(&entry.data)
                .with_context(|| format!("Failed to unpack {}", entry.name))?;
            let table = DbfTable::parse(unpacked.data, bel::CODE_PAGE)
                .with_context(|| format!("Failed to read table in {}", entry.name))?;
            ctx.prejoined.push(bel::price_list(&entry.name, &table, &mut ctx.stats));
            names.push(entry.name);
        }
        consumed.push((ftp, names));
    }

    let lists = ctx.price_lists();
    publish_all(&session.publisher, &lists, &mut ctx.stats).await?;

    for (ftp, names) in consumed {
        delete_entries(move || FtpSource::connect(&ftp), names).await?;
    }
    Ok(())
}
