//! One-shot subcommands.

use anyhow::{Context as _, Result, bail};
use mailfang_api::{EmailCounts, EmailListRecord, EmailListResponse, EmailRecord};
use mailfang_core::{
    CommandClipboard, CopyFeedback, FileStore, MailLayout, Router, SearchState, Store,
};
use serde_json::json;
use tracing::debug;

use crate::Context;
use crate::cli::ListArgs;

/// Lists one page of messages.
///
/// A `--search` value is saved and reused by later runs.
pub async fn list(ctx: &Context, args: ListArgs) -> Result<()> {
    let mut search = Store::<SearchState, _>::load(FileStore::in_config_dir());
    if let Some(query) = args.search {
        search
            .update(|state| state.query = query)
            .context("failed to save search")?;
    }
    let term = search.get().term();
    debug!(page = args.page, ?term, "listing messages");

    let response = if args.unread {
        ctx.api.unread(args.page, term).await?
    } else if args.attachments {
        ctx.api.with_attachments(args.page, term).await?
    } else if let Some(recipient) = &args.recipient {
        ctx.api
            .inbox_for_recipient(recipient, args.page, term)
            .await?
    } else {
        ctx.api.inbox(args.page, term).await?
    };

    match response {
        Some(response) if ctx.json => println!("{}", serde_json::to_string_pretty(&response)?),
        Some(response) => print!("{}", format_list(&response)),
        None => no_content(ctx),
    }
    Ok(())
}

/// Shows one message with decoded headers.
pub async fn show(ctx: &Context, id: &str) -> Result<()> {
    let Some(email) = ctx.api.email(id).await? else {
        no_content(ctx);
        return Ok(());
    };

    if ctx.json {
        let attachment_urls = email
            .attachments
            .iter()
            .map(|a| ctx.api.attachment_url(&a.id).map(String::from))
            .collect::<mailfang_api::Result<Vec<_>>>()?;
        let value = json!({
            "email": email,
            "decoded": {
                "from": email.header_addresses("From"),
                "to": email.header_addresses("To"),
                "cc": email.header_addresses("Cc"),
                "bcc": email.header_addresses("Bcc"),
                "subject": email.decoded_subject(),
            },
            "attachment_urls": attachment_urls,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print!("{}", format_headers(&email));
    for attachment in &email.attachments {
        let name = attachment.filename.as_deref().unwrap_or("(unnamed)");
        let url = ctx.api.attachment_url(&attachment.id)?;
        println!(
            "Attachment: {name} ({}) {url}",
            format_size(attachment.size)
        );
    }
    if let Some(body) = &email.body_text {
        println!();
        println!("{body}");
    }
    Ok(())
}

/// Deletes one message, or all of them.
///
/// Exactly one of `id` and `all` must be given.
pub async fn delete(ctx: &Context, id: Option<&str>, all: bool) -> Result<()> {
    match delete_target(id, all)? {
        DeleteTarget::One(id) => {
            ctx.api.delete_email(id).await?;
            println!("Deleted {id}");
        }
        DeleteTarget::All => {
            ctx.api.delete_all().await?;
            println!("Deleted all messages");
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum DeleteTarget<'a> {
    One(&'a str),
    All,
}

fn delete_target(id: Option<&str>, all: bool) -> Result<DeleteTarget<'_>> {
    match (id, all) {
        (Some(id), false) => Ok(DeleteTarget::One(id)),
        (None, true) => Ok(DeleteTarget::All),
        (Some(_), true) => bail!("pass either a message ID or --all, not both"),
        (None, false) => bail!("nothing to delete: pass a message ID or --all"),
    }
}

/// Prints a message's raw source.
pub async fn raw(ctx: &Context, id: &str) -> Result<()> {
    print!("{}", ctx.api.raw_email(id).await?);
    Ok(())
}

/// Prints a message's sanitized HTML.
///
/// Without an explicit choice, remote content follows the saved layout
/// preference.
pub async fn rendered(ctx: &Context, id: &str, allow_remote_content: Option<bool>) -> Result<()> {
    let allow = allow_remote_content.unwrap_or_else(|| {
        Store::<MailLayout, _>::load(FileStore::in_config_dir())
            .get()
            .allow_remote_content
    });
    debug!(%id, allow, "rendering message");
    print!("{}", ctx.api.rendered_email(id, allow).await?);
    Ok(())
}

/// Prints the sidebar counters.
pub async fn sidebar(ctx: &Context) -> Result<()> {
    match ctx.api.sidebar().await? {
        Some(counts) if ctx.json => println!("{}", serde_json::to_string_pretty(&counts)?),
        Some(counts) => print!("{}", format_counts(&counts)),
        None => no_content(ctx),
    }
    Ok(())
}

/// Copies a message's decoded sender to the clipboard.
pub async fn copy(ctx: &Context, id: &str) -> Result<()> {
    let email = ctx
        .api
        .email(id)
        .await?
        .with_context(|| format!("server returned no content for {id}"))?;
    let sender = email
        .header_addresses("From")
        .into_iter()
        .next()
        .unwrap_or(email.from);

    let feedback = CopyFeedback::new(CommandClipboard);
    feedback.handle_copy(&sender)?;
    debug!(copied = feedback.is_copied(), "clipboard updated");
    println!("Copied {sender}");
    Ok(())
}

/// Resolves a viewer path and opens it in the browser.
pub async fn open(ctx: &Context, path: &str, print: bool) -> Result<()> {
    let location = Router::new().navigate(path, &ctx.api).await?;
    let url = ctx
        .server
        .join(&location.to_string())
        .with_context(|| format!("cannot build a link for {location}"))?;

    if print {
        println!("{url}");
    } else {
        debug!(%url, "opening browser");
        opener::open(url.as_str()).with_context(|| format!("failed to open {url}"))?;
    }
    Ok(())
}

/// Reports a successful reply without a body.
fn no_content(ctx: &Context) {
    if ctx.json {
        println!("null");
    } else {
        println!("No content");
    }
}

/// Renders a list page as one line per message plus a footer.
fn format_list(response: &EmailListResponse) -> String {
    let mut out = String::new();
    if response.emails.is_empty() {
        out.push_str("No messages\n");
    }
    for email in &response.emails {
        out.push_str(&format_row(email));
        out.push('\n');
    }
    let pagination = &response.pagination;
    out.push_str(&format!(
        "page {} of {} ({} total, {} unread)\n",
        pagination.page,
        pagination.total_pages.max(1),
        response.counts.inbox,
        response.counts.unread
    ));
    out
}

fn format_row(email: &EmailListRecord) -> String {
    let marker = match (email.read, email.has_attachments) {
        (false, true) => "*@",
        (false, false) => "* ",
        (true, true) => " @",
        (true, false) => "  ",
    };
    let when = email.date.unwrap_or(email.created_at);
    let subject = email
        .decoded_subject()
        .unwrap_or_else(|| "(no subject)".to_string());
    format!(
        "{marker} {}  {}  {}  {subject}",
        email.id,
        when.format("%Y-%m-%d %H:%M"),
        email.from
    )
}

fn format_headers(email: &EmailRecord) -> String {
    let mut out = String::new();

    let from = email.header_addresses("From");
    if from.is_empty() {
        out.push_str(&format!("From: {}\n", email.from));
    } else {
        out.push_str(&format!("From: {}\n", from.join(", ")));
    }
    for name in ["To", "Cc", "Bcc"] {
        let addresses = email.header_addresses(name);
        if !addresses.is_empty() {
            out.push_str(&format!("{name}: {}\n", addresses.join(", ")));
        }
    }

    let subject = email
        .decoded_subject()
        .unwrap_or_else(|| "(no subject)".to_string());
    out.push_str(&format!("Subject: {subject}\n"));
    let when = email.date.unwrap_or(email.created_at);
    out.push_str(&format!("Date: {}\n", when.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!(
        "Envelope: {} -> {}\n",
        email.from,
        email.recipients.join(", ")
    ));
    out
}

fn format_counts(counts: &EmailCounts) -> String {
    let mut out = format!("Inbox   {}\nUnread  {}\n", counts.inbox, counts.unread);
    for recipient in &counts.recipients {
        out.push_str(&format!("  {}  {}\n", recipient.recipient, recipient.count));
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn record() -> EmailRecord {
        serde_json::from_value(json!({
            "id": "m1",
            "message_id": "<m1@test>",
            "subject": "=?UTF-8?B?SGVsbG8gV29ybGQ=?=",
            "date": "2024-05-01T10:30:00",
            "headers": {
                "From": ["=?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>"],
                "To": ["a@example.com, \"Smith, Jane\" <jane@example.com>"],
                "Cc": ["c@example.com"]
            },
            "created_at": "2024-05-01T10:31:00",
            "from": "bounce@example.com",
            "recipients": ["a@example.com", "jane@example.com"],
            "size": 2048,
            "body_text": "hi",
            "body_html": null,
            "read": false,
            "attachments": []
        }))
        .unwrap()
    }

    #[test]
    fn test_format_headers_decodes_addresses() {
        let text = format_headers(&record());
        assert!(text.contains("From: John Doe <john@example.com>\n"));
        assert!(text.contains("To: a@example.com, \"Smith, Jane\" <jane@example.com>\n"));
        assert!(text.contains("Cc: c@example.com\n"));
        assert!(!text.contains("Bcc:"));
        assert!(text.contains("Subject: Hello World\n"));
        assert!(text.contains("Date: 2024-05-01 10:30:00\n"));
        assert!(text.contains("Envelope: bounce@example.com -> a@example.com, jane@example.com\n"));
    }

    #[test]
    fn test_format_headers_falls_back_to_envelope() {
        let mut email = record();
        email.headers = None;
        email.subject = None;
        let text = format_headers(&email);
        assert!(text.starts_with("From: bounce@example.com\n"));
        assert!(text.contains("Subject: (no subject)\n"));
    }

    #[test]
    fn test_format_row_markers() {
        let mut row = EmailListRecord::from(&record());
        assert_eq!(
            format_row(&row),
            "*  m1  2024-05-01 10:30  bounce@example.com  Hello World"
        );

        row.read = true;
        row.has_attachments = true;
        row.date = None;
        assert_eq!(
            format_row(&row),
            " @ m1  2024-05-01 10:31  bounce@example.com  Hello World"
        );
    }

    #[test]
    fn test_format_list_empty_page() {
        let response: EmailListResponse = serde_json::from_value(json!({
            "emails": [],
            "counts": {"inbox": 0, "recipients": []},
            "pagination": {"page": 1, "per_page": 50, "total_pages": 0}
        }))
        .unwrap();
        assert_eq!(
            format_list(&response),
            "No messages\npage 1 of 1 (0 total, 0 unread)\n"
        );
    }

    #[test]
    fn test_format_counts() {
        let counts: EmailCounts = serde_json::from_value(json!({
            "inbox": 3,
            "unread": 1,
            "recipients": [{"recipient": "a@example.com", "count": 2}]
        }))
        .unwrap();
        assert_eq!(
            format_counts(&counts),
            "Inbox   3\nUnread  1\n  a@example.com  2\n"
        );
    }

    #[test]
    fn test_delete_target_requires_exactly_one() {
        assert_eq!(delete_target(Some("m1"), false).unwrap(), DeleteTarget::One("m1"));
        assert_eq!(delete_target(None, true).unwrap(), DeleteTarget::All);
        assert!(delete_target(None, false).is_err());
        assert!(delete_target(Some("m1"), true).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }
}
