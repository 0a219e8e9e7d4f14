//! Fire-and-forget notification fan-out.
//!
//! Mutating operations hand a message to the dispatcher and move on.
//! Email delivery happens on a background worker; realtime listeners
//! get a broadcast event regardless of whether delivery later
//! succeeds. Failures are logged and swallowed, never surfaced to the
//! operation that triggered them.

pub mod events;
pub mod mailer;

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use self::events::{BroadcastEvent, EventHub};
use self::mailer::{MailTransport, OutboundMail};

#[derive(Clone)]
pub struct Dispatcher {
    outbox: mpsc::UnboundedSender<OutboundMail>,
    hub: EventHub,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn MailTransport>, hub: EventHub) -> Self {
        let (outbox, mut rx) = mpsc::unbounded_channel::<OutboundMail>();
        tokio::spawn(async move {
            while let Some(mail) = rx.recv().await {
                if let Err(e) = mailer.send(&mail).await {
                    warn!("failed to deliver notification to {}: {e}", mail.to);
                }
            }
        });
        Self { outbox, hub }
    }

    /// Never raises to the caller. The broadcast fires immediately,
    /// independent of whether the email later goes out.
    pub fn notify(&self, recipient: &str, subject: &str, body: &str) {
        self.hub.publish(
            "notification",
            json!({
                "recipient": recipient,
                "subject": subject,
                "message": body,
            }),
        );

        let mail = OutboundMail {
            to: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        if self.outbox.send(mail).is_err() {
            warn!("notification worker is gone, dropping message");
        }
    }

    /// Transient broadcast-only event, no email involved.
    pub fn emit(&self, event: &str, payload: Value) {
        self.hub.publish(event, payload);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.hub.subscribe()
    }
}
