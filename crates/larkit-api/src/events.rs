//! Background logger for kernel notifications.

use larkit_core::event::EventBus;
use larkit_types::event::KernelEvent;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Log every event published on `events` until the bus closes.
///
/// Tokens are reported by fingerprint and lifetime only.
pub fn spawn_event_logger(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(KernelEvent::ApplicationInitialized { app_id }) => {
                    debug!(app_id = %app_id, "event: application initialized");
                }
                Ok(KernelEvent::TokenRefreshed { fingerprint, token }) => {
                    debug!(
                        fingerprint = %fingerprint,
                        lifetime_secs = token.lifetime_secs(),
                        "event: token refreshed"
                    );
                }
                Ok(KernelEvent::WebhookResponseBuilt { response }) => {
                    debug!(
                        status = response.status,
                        content_type = %response.content_type,
                        "event: webhook response built"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use larkit_types::webhook::WebhookResponse;

    use super::*;

    #[tokio::test]
    async fn logger_exits_when_bus_is_dropped() {
        let events = EventBus::default();
        let handle = spawn_event_logger(&events);
        events.publish(KernelEvent::WebhookResponseBuilt {
            response: WebhookResponse::ok("application/xml", "success"),
        });
        drop(events);
        handle.await.unwrap();
    }
}
