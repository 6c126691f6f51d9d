//! Mail attachments as entries
//!
//! Each POP3 message is parsed as MIME. The message must be multipart; a
//! top-level part becomes an entry when it is a base64 attachment whose
//! declared file name passes the caller's filter. The message subject travels
//! with every attachment taken from it.

use anyhow::Result;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use tracing::debug;

use super::pop3::{Pop3Config, Pop3Source};
use super::{fetch_entries_with, Cleanup, ConnectorError, EntryFilter, FetchedEntry};
use crate::pipe::RecordPipe;

/// Attachments of every message in a mailbox.
pub fn fetch_attachments(config: Pop3Config, filter: EntryFilter, cleanup: Cleanup) -> RecordPipe<FetchedEntry> {
    fetch_entries_with(move || Pop3Source::connect(&config), filter, cleanup, unpack_message)
}

fn unpack_message(message: FetchedEntry, filter: &EntryFilter) -> Result<Vec<FetchedEntry>> {
    let attachments = extract_attachments(&message.data, filter)?;
    debug!(message = %message.name, attachments = attachments.len(), "Unpacked message");
    Ok(attachments)
}

/// Matching attachments of one raw message.
pub fn extract_attachments(raw: &[u8], filter: &EntryFilter) -> Result<Vec<FetchedEntry>, ConnectorError> {
    let mail = mailparse::parse_mail(raw).map_err(|e| ConnectorError::Mime(e.to_string()))?;

    if !mail.ctype.params.contains_key("boundary") {
        return Err(ConnectorError::Mime(format!(
            "no multipart boundary in '{}' message",
            mail.ctype.mimetype
        )));
    }

    let subject = mail.headers.get_first_value("Subject").unwrap_or_default();

    let mut out = Vec::new();
    for part in &mail.subparts {
        if !is_base64_attachment(part) {
            continue;
        }

        let Some(name) = file_name(part) else {
            continue;
        };
        if !filter.accepts(&name) {
            debug!(attachment = %name, "Attachment skipped by filter");
            continue;
        }

        let data = part
            .get_body_raw()
            .map_err(|e| ConnectorError::Mime(format!("attachment '{}': {}", name, e)))?;

        out.push(FetchedEntry {
            name,
            subject: Some(subject.clone()),
            data: data.into(),
        });
    }

    Ok(out)
}

fn is_base64_attachment(part: &ParsedMail<'_>) -> bool {
    let attachment = part.get_content_disposition().disposition == DispositionType::Attachment;
    let base64 = part
        .headers
        .get_first_value("Content-Transfer-Encoding")
        .map(|v| v.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or(false);
    attachment && base64
}

/// Declared file name: `Content-Type` name, else `Content-Disposition` filename.
fn file_name(part: &ParsedMail<'_>) -> Option<String> {
    part.ctype
        .params
        .get("name")
        .cloned()
        .or_else(|| part.get_content_disposition().params.get("filename").cloned())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
