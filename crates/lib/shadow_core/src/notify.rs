//! Outbound notification collaborator.
//!
//! The authority only ever calls `dispatch`, which hands the event to a
//! spawned task and returns immediately. Delivery failures are logged and
//! never reach the auth operation that triggered them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::AuthError;

/// Webhook request timeout.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Kinds of notification the authority emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    Verification,
}

/// Notification delivery error.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: Value,
    ) -> Result<(), NotifyError>;
}

/// Fire-and-forget delivery. Returns without waiting on the notifier.
pub fn dispatch(
    notifier: &Arc<dyn Notifier>,
    kind: NotificationKind,
    recipient: &str,
    payload: Value,
) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!(?kind, "no async runtime, notification dropped");
        return;
    };
    let notifier = Arc::clone(notifier);
    let recipient = recipient.to_string();
    handle.spawn(async move {
        if let Err(e) = notifier.notify(kind, &recipient, payload).await {
            let err = AuthError::ExternalServiceUnavailable(e.to_string());
            warn!(?kind, error_kind = err.kind(), error = %err, "notification not delivered");
        }
    });
}

/// Notifier that only records events in the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        _recipient: &str,
        _payload: Value,
    ) -> Result<(), NotifyError> {
        info!(?kind, "notification recorded");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    kind: NotificationKind,
    recipient: &'a str,
    payload: Value,
}

/// Notifier that POSTs each event as JSON to a webhook (e.g. a mail relay).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        let body = WebhookBody {
            kind,
            recipient,
            payload,
        };
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(NotifyError::Delivery(format!("webhook HTTP {}", resp.status())));
        }
        debug!(?kind, "notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<(NotificationKind, String)>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn notify(
            &self,
            kind: NotificationKind,
            recipient: &str,
            _payload: Value,
        ) -> Result<(), NotifyError> {
            let _ = self.0.send((kind, recipient.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier(tx));
        dispatch(&notifier, NotificationKind::Welcome, "new@x.com", Value::Null);
        let (kind, recipient) = rx.recv().await.unwrap();
        assert_eq!(kind, NotificationKind::Welcome);
        assert_eq!(recipient, "new@x.com");
    }

    #[test]
    fn dispatch_without_runtime_does_not_panic() {
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        dispatch(&notifier, NotificationKind::Verification, "a@b.c", Value::Null);
    }

    #[tokio::test]
    async fn webhook_failure_is_a_delivery_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/unreachable").unwrap();
        let err = notifier
            .notify(NotificationKind::Welcome, "a@b.c", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(_)));
    }
}
