//! `a55`: DBF attachments from a POP3 mailbox
//!
//! Messages are deleted as soon as their attachments were read.

use anyhow::{Context, Result};
use tracing::info;

use super::{pop3_config, publish_all, Session};
use crate::codec::dbf::DbfTable;
use crate::connector::attachments::fetch_attachments;
use crate::connector::{Cleanup, EntryFilter};
use crate::normalize::feeds::a55::{self, OutletMeta};
use crate::normalize::RunContext;

pub async fn run(src: &str, meta: &OutletMeta, session: &Session, ctx: &mut RunContext) -> Result<()> {
    let pop3 = pop3_config(src, session)?;
    let attachments = fetch_attachments(pop3, EntryFilter::extension(".dbf"), Cleanup::Eager)
        .try_collect()
        .await?;
    info!(attachments = attachments.len(), "Downloaded tables");

    for attachment in attachments {
        let table = DbfTable::parse(attachment.data, a55::CODE_PAGE)
            .with_context(|| format!("Failed to read table in {}", attachment.name))?;
        ctx.prejoined
            .push(a55::price_list(meta, &attachment.name, &table, &mut ctx.stats));
    }

    let lists = ctx.price_lists();
    publish_all(&session.publisher, &lists, &mut ctx.stats).await
}
