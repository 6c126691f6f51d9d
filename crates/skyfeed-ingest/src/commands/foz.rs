//! `foz`: gzipped JSON attachments forwarded verbatim
//!
//! A message whose subject is a JSON object with non-empty `key` and `tag`
//! is pushed with those credentials instead of the configured ones.

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info};

use super::{pop3_config, Session};
use crate::connector::attachments::fetch_attachments;
use crate::connector::{Cleanup, EntryFilter};
use crate::normalize::RunContext;
use crate::pipe::PipeItem;
use crate::publish::Credentials;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubjectRoute {
    key: String,
    tag: String,
}

/// Credentials named by a message subject, if it carries both.
pub fn route(subject: &str) -> Option<Credentials> {
    let route: SubjectRoute = serde_json::from_str(subject.trim()).ok()?;
    if route.key.is_empty() || route.tag.is_empty() {
        return None;
    }
    Some(Credentials::new(route.key, route.tag))
}

pub async fn run(src: &str, session: &Session, ctx: &mut RunContext) -> Result<()> {
    let pop3 = pop3_config(src, session)?;
    let default = session.config.credentials();
    let mut attachments = fetch_attachments(pop3, EntryFilter::extension(".gz"), Cleanup::Eager);

    while let Some(item) = attachments.next().await {
        let attachment = match item {
            PipeItem::Item(attachment) => attachment,
            PipeItem::RowError(e) => {
                ctx.stats.row_errors += 1;
                debug!(error = %e, "Skipping attachment");
                continue;
            },
            PipeItem::Fatal(e) => return Err(e),
        };
        ctx.stats.rows_read += 1;

        let routed = attachment.subject.as_deref().and_then(route);
        let credentials = routed.as_ref().unwrap_or(&default);
        session
            .publisher
            .push_gzip_as(attachment.data.to_vec(), &attachment.name, credentials)
            .await?;
        ctx.stats.lists_published += 1;
        info!(file = %attachment.name, tag = %credentials.tag, "Forwarded attachment");
    }
    Ok(())
}
