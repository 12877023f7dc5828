//! `watch`: follow push events until interrupted.

use anyhow::Result;
use mailfang_api::ServerEvent;
use mailfang_realtime::{Callbacks, Channel, ChannelConfig, Frame, WebSocketConnector};
use notify_rust::Notification;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::Context;

/// Opens the push channel and prints every event until Ctrl-C.
pub async fn run(ctx: &Context, notify: bool) -> Result<()> {
    let config = ChannelConfig::builder()
        .origin(ctx.server.clone())
        .reconnect_interval(ctx.reconnect_interval)
        .build();
    info!(endpoint = %config.endpoint()?, "watching for mail");

    let (tx, mut frames) = mpsc::unbounded_channel::<Frame>();
    let callbacks = Callbacks::new()
        .on_open(|| info!("push channel connected"))
        .on_error(|e| warn!(error = %e, "push channel error"))
        .on_close(|| warn!("push channel closed"))
        .on_message(move |frame| {
            let _ = tx.send(frame);
        });
    let channel = Channel::open(WebSocketConnector::new(), callbacks, config)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                info!("interrupted");
                break;
            }
            Some(frame) = frames.recv() => match ServerEvent::from_frame(&frame) {
                Ok(event) => {
                    if ctx.json {
                        println!("{}", event_json(&event));
                    } else {
                        println!("{}", describe(&event));
                    }
                    if notify && let ServerEvent::NewMail { email, .. } = &event {
                        show_notification(email.from.clone(), email.decoded_subject()).await;
                    }
                }
                Err(e) => warn!(error = %e, "ignoring push frame"),
            },
        }
    }

    channel.close().await;
    Ok(())
}

fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::NewMail { email, recipients } => format!(
            "new      {}  {} -> {}  {}",
            email.id,
            email.from,
            recipients.join(", "),
            email
                .decoded_subject()
                .unwrap_or_else(|| "(no subject)".to_string())
        ),
        ServerEvent::EmailRead { email } => format!("read     {}", email.id),
        ServerEvent::EmailDeleted { email_id } => format!("deleted  {email_id}"),
    }
}

fn event_json(event: &ServerEvent) -> Value {
    match event {
        ServerEvent::NewMail { email, recipients } => json!({
            "event": "new_mail",
            "email": email,
            "recipients": recipients,
        }),
        ServerEvent::EmailRead { email } => json!({
            "event": "email_read",
            "email": email,
        }),
        ServerEvent::EmailDeleted { email_id } => json!({
            "event": "email_deleted",
            "email_id": email_id,
        }),
    }
}

async fn show_notification(from: String, subject: Option<String>) {
    let result = tokio::task::spawn_blocking(move || {
        Notification::new()
            .appname("mailfang")
            .summary(&format!("New mail from {from}"))
            .body(subject.as_deref().unwrap_or("(no subject)"))
            .show()
            .map(|_| ())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to show notification"),
        Err(e) => warn!(error = %e, "notification task failed"),
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

    fn frame(value: &Value) -> Frame {
        Frame::from(value.to_string())
    }

    fn email() -> Value {
        json!({
            "id": "m1",
            "subject": "=?UTF-8?Q?Caf=C3=A9?=",
            "date": null,
            "created_at": "2024-05-01T10:31:00",
            "from": "shop@example.com",
            "recipients": ["a@example.com"],
            "read": false,
            "has_attachments": false
        })
    }

    #[test]
    fn test_describe_new_mail() {
        let event = ServerEvent::from_frame(&frame(&json!({
            "event": "new_mail",
            "email": email(),
            "recipients": ["a@example.com", "b@example.com"]
        })))
        .unwrap();
        assert_eq!(
            describe(&event),
            "new      m1  shop@example.com -> a@example.com, b@example.com  Café"
        );
    }

    #[test]
    fn test_describe_read_and_deleted() {
        let read = ServerEvent::from_frame(&frame(&json!({
            "event": "email_read",
            "email": email()
        })))
        .unwrap();
        assert_eq!(describe(&read), "read     m1");

        let deleted = ServerEvent::EmailDeleted {
            email_id: "m2".to_string(),
        };
        assert_eq!(describe(&deleted), "deleted  m2");
    }

    #[test]
    fn test_event_json_matches_wire_shape() {
        let wire = json!({
            "event": "new_mail",
            "email": email(),
            "recipients": ["a@example.com"]
        });
        let event = ServerEvent::from_frame(&frame(&wire)).unwrap();
        assert_eq!(event_json(&event), wire);

        let deleted = json!({"event": "email_deleted", "email_id": "m2"});
        let event = ServerEvent::from_frame(&frame(&deleted)).unwrap();
        assert_eq!(event_json(&event), deleted);
    }
}
