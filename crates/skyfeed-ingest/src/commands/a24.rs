//! `a24`: outlet list and offer catalog pulled over HTTP

use anyhow::{Context, Result};

use super::{publish_all, Session};
use crate::connector::http::HttpPuller;
use crate::normalize::feeds::a24;
use crate::normalize::RunContext;

pub async fn run(src: &str, xml: &str, session: &Session, ctx: &mut RunContext) -> Result<()> {
    let puller = HttpPuller::new(session.client.clone(), session.config.timeouts.pull());

    let catalog = puller.pull(xml).await.context("Failed to pull offer catalog")?;
    let offers = a24::parse_offers(&catalog).context("Failed to parse offer catalog")?;

    let list = puller.pull(src).await.context("Failed to pull outlet list")?;
    let outlets = a24::parse_outlets(&list, &mut ctx.stats);
    ctx.stats.rows_read += offers.len() as u64;

    ctx.prejoined.extend(a24::price_lists(&outlets, &offers));
    let lists = ctx.price_lists();
    publish_all(&session.publisher, &lists, &mut ctx.stats).await
}
