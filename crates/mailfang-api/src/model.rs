//! Wire model of the mailfang HTTP API.
//!
//! Field names match the JSON the server emits. Optional fields are `null` or
//! absent on the wire.

use chrono::NaiveDateTime;
use mailfang_mime::{Headers, decode_mime_words, parse_and_decode_header_values};
use serde::{Deserialize, Serialize};

/// A stored attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment ID, used by the download endpoint.
    pub id: String,
    /// File name from the MIME part, if any.
    pub filename: Option<String>,
    /// MIME type of the part.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// `Content-ID` for inline parts.
    pub content_id: Option<String>,
    /// `Content-Disposition` (`inline` or `attachment`).
    pub disposition: Option<String>,
    /// When the attachment was stored.
    pub created_at: NaiveDateTime,
}

/// A full captured message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Email ID.
    pub id: String,
    /// `Message-ID` header.
    pub message_id: Option<String>,
    /// Subject, possibly containing encoded words.
    pub subject: Option<String>,
    /// `Date` header.
    pub date: Option<NaiveDateTime>,
    /// All message headers.
    pub headers: Option<Headers>,
    /// When the server captured the message.
    pub created_at: NaiveDateTime,
    /// SMTP envelope sender (`MAIL FROM`).
    pub from: String,
    /// SMTP envelope recipients (`RCPT TO`).
    pub recipients: Vec<String>,
    /// Raw size in bytes.
    pub size: u64,
    /// Plain-text body.
    pub body_text: Option<String>,
    /// HTML body.
    pub body_html: Option<String>,
    /// Whether the message has been viewed.
    pub read: bool,
    /// Attachments, in MIME order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl EmailRecord {
    /// Returns the decoded addresses of every `name` header, in order.
    ///
    /// Empty when the record carries no headers.
    #[must_use]
    pub fn header_addresses(&self, name: &str) -> Vec<String> {
        self.headers
            .as_ref()
            .map(|headers| parse_and_decode_header_values(headers.get_all(name)))
            .unwrap_or_default()
    }

    /// Returns the subject with encoded words decoded.
    #[must_use]
    pub fn decoded_subject(&self) -> Option<String> {
        self.subject.as_deref().map(decode_mime_words)
    }
}

/// A message as shown in list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailListRecord {
    /// Email ID.
    pub id: String,
    /// Subject, possibly containing encoded words.
    pub subject: Option<String>,
    /// `Date` header.
    pub date: Option<NaiveDateTime>,
    /// When the server captured the message.
    pub created_at: NaiveDateTime,
    /// SMTP envelope sender.
    pub from: String,
    /// SMTP envelope recipients.
    pub recipients: Vec<String>,
    /// Whether the message has been viewed.
    pub read: bool,
    /// Whether the message has any attachments.
    pub has_attachments: bool,
}

impl EmailListRecord {
    /// Returns the subject with encoded words decoded.
    #[must_use]
    pub fn decoded_subject(&self) -> Option<String> {
        self.subject.as_deref().map(decode_mime_words)
    }
}

impl From<&EmailRecord> for EmailListRecord {
    fn from(record: &EmailRecord) -> Self {
        Self {
            id: record.id.clone(),
            subject: record.subject.clone(),
            date: record.date,
            created_at: record.created_at,
            from: record.from.clone(),
            recipients: record.recipients.clone(),
            read: record.read,
            has_attachments: !record.attachments.is_empty(),
        }
    }
}

/// Message count for one envelope recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientCount {
    /// Recipient address.
    pub recipient: String,
    /// Number of messages addressed to it.
    pub count: u64,
}

/// Sidebar counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCounts {
    /// Total messages.
    pub inbox: u64,
    /// Unread messages. Older servers omit it.
    #[serde(default)]
    pub unread: u64,
    /// Per-recipient counts.
    #[serde(default)]
    pub recipients: Vec<RecipientCount>,
}

/// Pagination of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Current page, starting at 1.
    pub page: u64,
    /// Page size.
    pub per_page: u64,
    /// Number of pages.
    pub total_pages: u64,
}

/// One page of a message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailListResponse {
    /// Messages on this page, newest first.
    pub emails: Vec<EmailListRecord>,
    /// Sidebar counters at the time of the request.
    pub counts: EmailCounts,
    /// Pagination info.
    pub pagination: PaginationInfo,
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

    const RECORD: &str = r#"{
        "id": "0190b3a2",
        "message_id": "<abc@example.com>",
        "subject": "=?UTF-8?Q?Caf=C3=A9?=",
        "date": "2024-05-01T10:30:00",
        "headers": {
            "From": ["=?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>"],
            "Cc": ["a@x.com, \"Doe, Jane\" <jane@y.com>", "c@z.com"]
        },
        "created_at": "2024-05-01T10:30:01.123456",
        "from": "john@example.com",
        "recipients": ["a@x.com"],
        "size": 2048,
        "body_text": "hi",
        "body_html": null,
        "read": false,
        "attachments": [{
            "id": "att1",
            "filename": "report.pdf",
            "content_type": "application/pdf",
            "size": 1024,
            "content_id": null,
            "disposition": "attachment",
            "created_at": "2024-05-01T10:30:01"
        }]
    }"#;

    #[test]
    fn test_email_record_deserialize() {
        let record: EmailRecord = serde_json::from_str(RECORD).unwrap();
        assert_eq!(record.id, "0190b3a2");
        assert_eq!(record.size, 2048);
        assert!(!record.read);
        assert_eq!(record.body_html, None);
        assert_eq!(record.attachments.len(), 1);
        assert_eq!(record.attachments[0].filename.as_deref(), Some("report.pdf"));
        assert_eq!(
            record.date.unwrap().to_string(),
            "2024-05-01 10:30:00"
        );
    }

    #[test]
    fn test_header_addresses_decoded() {
        let record: EmailRecord = serde_json::from_str(RECORD).unwrap();
        assert_eq!(
            record.header_addresses("from"),
            ["John Doe <john@example.com>"]
        );
        assert_eq!(
            record.header_addresses("CC"),
            ["a@x.com", "\"Doe, Jane\" <jane@y.com>", "c@z.com"]
        );
        assert!(record.header_addresses("bcc").is_empty());
    }

    #[test]
    fn test_header_addresses_without_headers() {
        let mut record: EmailRecord = serde_json::from_str(RECORD).unwrap();
        record.headers = None;
        assert!(record.header_addresses("from").is_empty());
    }

    #[test]
    fn test_decoded_subject() {
        let record: EmailRecord = serde_json::from_str(RECORD).unwrap();
        assert_eq!(record.decoded_subject().as_deref(), Some("Café"));
    }

    #[test]
    fn test_list_record_from_email_record() {
        let record: EmailRecord = serde_json::from_str(RECORD).unwrap();
        let list = EmailListRecord::from(&record);
        assert_eq!(list.id, record.id);
        assert!(list.has_attachments);
        assert_eq!(list.recipients, ["a@x.com"]);
    }

    #[test]
    fn test_counts_without_unread() {
        let counts: EmailCounts = serde_json::from_str(
            r#"{"inbox": 3, "recipients": [{"recipient": "a@x.com", "count": 3}]}"#,
        )
        .unwrap();
        assert_eq!(counts.inbox, 3);
        assert_eq!(counts.unread, 0);
        assert_eq!(counts.recipients[0].recipient, "a@x.com");
    }
}
