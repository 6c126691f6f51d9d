//! `ave` and `stl`: three files from one FTP directory, joined

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

use super::{ftp_config, publish_all, Session};
use crate::connector::ftp::{FtpConfig, FtpSource};
use crate::connector::{delete_entries, fetch_entries, Cleanup, EntryFilter};
use crate::normalize::feeds::{ave, stl, triplet_feed};
use crate::normalize::{ingest_triplet, RunContext, TripletFeed};

pub async fn run_ave(src: &str, date: NaiveDate, session: &Session, ctx: &mut RunContext) -> Result<()> {
    let feed = triplet_feed(ave::NAME, date).context("ave feed is not registered")?;
    run_feed(feed.as_ref(), src, Cleanup::Keep, session, ctx).await
}

pub async fn run_stl(src: &str, session: &Session, ctx: &mut RunContext) -> Result<()> {
    let feed = triplet_feed(stl::NAME, chrono::Local::now().date_naive()).context("stl feed is not registered")?;
    run_feed(feed.as_ref(), src, Cleanup::Batch, session, ctx).await
}

/// Download, join and publish one triplet feed.
///
/// With [`Cleanup::Batch`] the three files are deleted only after every list
/// was published.
pub async fn run_feed(
    feed: &dyn TripletFeed,
    src: &str,
    cleanup: Cleanup,
    session: &Session,
    ctx: &mut RunContext,
) -> Result<()> {
    let ftp = ftp_config(src, session)?;
    let files = download(feed, ftp.clone(), cleanup).await?;
    info!(source = feed.name(), files = files.len(), "Downloaded feed files");

    ingest_triplet(feed, &files, ctx).await?;
    let lists = ctx.price_lists();
    publish_all(&session.publisher, &lists, &mut ctx.stats).await?;

    if cleanup == Cleanup::Batch {
        let names: Vec<String> = files.into_keys().collect();
        delete_entries(move || FtpSource::connect(&ftp), names).await?;
    }
    Ok(())
}

async fn download(feed: &dyn TripletFeed, ftp: FtpConfig, cleanup: Cleanup) -> Result<HashMap<String, Bytes>> {
    let expected = feed.layout().files();
    let own = feed.filter();
    let filter = EntryFilter::new(move |name| own.accepts(name) && expected.iter().any(|f| f.eq_ignore_ascii_case(name)));

    let entries = fetch_entries(move || FtpSource::connect(&ftp), filter, cleanup)
        .try_collect()
        .await?;
    Ok(entries.into_iter().map(|e| (e.name, e.data)).collect())
}
