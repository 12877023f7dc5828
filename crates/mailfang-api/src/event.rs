//! Typed push events.
//!
//! The server pushes JSON objects over the real-time channel:
//!
//! ```json
//! {"event": "new_mail", "email": {...}, "recipients": ["a@x.com"]}
//! {"event": "email_read", "email": {...}}
//! {"event": "email_deleted", "email_id": "0190b3a2"}
//! ```
//!
//! The channel delivers frames unparsed; callers decode them with
//! [`ServerEvent::from_frame`].

use mailfang_realtime::Frame;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::EmailListRecord;

/// A decoded push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A message was captured.
    NewMail {
        /// The new message.
        email: EmailListRecord,
        /// Its envelope recipients.
        recipients: Vec<String>,
    },
    /// A message was viewed for the first time.
    EmailRead {
        /// The message, with `read` set.
        email: EmailListRecord,
    },
    /// A message was deleted.
    EmailDeleted {
        /// ID of the deleted message.
        email_id: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventKind {
    NewMail,
    EmailRead,
    EmailDeleted,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    event: EventKind,
    #[serde(default)]
    email: Option<EmailListRecord>,
    #[serde(default)]
    email_id: Option<String>,
    #[serde(default)]
    recipients: Option<Vec<String>>,
}

impl ServerEvent {
    /// Decodes a push frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not JSON, names an unknown event, or
    /// lacks the field its event requires.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let payload: EventPayload = match frame {
            Frame::Text(text) => serde_json::from_str(text)?,
            Frame::Binary(data) => serde_json::from_slice(data)?,
        };
        Self::from_payload(payload)
    }

    /// Returns the ID of the message the event is about.
    #[must_use]
    pub fn email_id(&self) -> &str {
        match self {
            Self::NewMail { email, .. } | Self::EmailRead { email } => &email.id,
            Self::EmailDeleted { email_id } => email_id,
        }
    }

    fn from_payload(payload: EventPayload) -> Result<Self> {
        match payload.event {
            EventKind::NewMail => {
                let email = payload
                    .email
                    .ok_or_else(|| Error::MalformedEvent("new_mail without email".into()))?;
                let recipients = payload
                    .recipients
                    .unwrap_or_else(|| email.recipients.clone());
                Ok(Self::NewMail { email, recipients })
            }
            EventKind::EmailRead => payload
                .email
                .map(|email| Self::EmailRead { email })
                .ok_or_else(|| Error::MalformedEvent("email_read without email".into())),
            EventKind::EmailDeleted => payload
                .email_id
                .map(|email_id| Self::EmailDeleted { email_id })
                .ok_or_else(|| Error::MalformedEvent("email_deleted without email_id".into())),
        }
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

    const EMAIL: &str = r#"{
        "id": "m1",
        "subject": "Hello",
        "date": null,
        "created_at": "2024-05-01T10:30:00",
        "from": "sender@example.com",
        "recipients": ["a@x.com", "b@y.com"],
        "read": false,
        "has_attachments": false
    }"#;

    #[test]
    fn test_new_mail() {
        let frame = Frame::Text(format!(
            r#"{{"event":"new_mail","email":{EMAIL},"recipients":["a@x.com"]}}"#
        ));
        let event = ServerEvent::from_frame(&frame).unwrap();
        match &event {
            ServerEvent::NewMail { email, recipients } => {
                assert_eq!(email.subject.as_deref(), Some("Hello"));
                assert_eq!(recipients, &["a@x.com"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(event.email_id(), "m1");
    }

    #[test]
    fn test_new_mail_recipients_default_to_envelope() {
        let frame = Frame::Text(format!(r#"{{"event":"new_mail","email":{EMAIL}}}"#));
        let ServerEvent::NewMail { recipients, .. } = ServerEvent::from_frame(&frame).unwrap()
        else {
            panic!("expected new_mail");
        };
        assert_eq!(recipients, ["a@x.com", "b@y.com"]);
    }

    #[test]
    fn test_email_read_from_binary_frame() {
        let frame = Frame::Binary(format!(r#"{{"event":"email_read","email":{EMAIL}}}"#).into_bytes());
        let event = ServerEvent::from_frame(&frame).unwrap();
        assert!(matches!(event, ServerEvent::EmailRead { .. }));
    }

    #[test]
    fn test_email_deleted() {
        let event =
            ServerEvent::from_frame(&Frame::from(r#"{"event":"email_deleted","email_id":"m9"}"#))
                .unwrap();
        assert_eq!(
            event,
            ServerEvent::EmailDeleted {
                email_id: "m9".to_string()
            }
        );
    }

    #[test]
    fn test_missing_fields() {
        let err = ServerEvent::from_frame(&Frame::from(r#"{"event":"email_deleted"}"#)).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));

        let err = ServerEvent::from_frame(&Frame::from(r#"{"event":"new_mail"}"#)).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));
    }

    #[test]
    fn test_unknown_event_and_garbage() {
        assert!(matches!(
            ServerEvent::from_frame(&Frame::from(r#"{"event":"spam"}"#)),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            ServerEvent::from_frame(&Frame::from("not json")),
            Err(Error::Json(_))
        ));
    }
}
