//! Notifications emitted by the kernel on its event bus.
//!
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.
//! Delivery is fire-and-forget; publishers never consume a result.

use serde::{Deserialize, Serialize};

use crate::token::AccessToken;
use crate::webhook::WebhookResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelEvent {
    /// Application state finished wiring; `app_id` fingerprints the configuration.
    ApplicationInitialized { app_id: String },

    /// A fresh token was issued upstream and cached.
    TokenRefreshed {
        fingerprint: String,
        token: AccessToken,
    },

    /// The gateway produced a response for an inbound webhook.
    WebhookResponseBuilt { response: WebhookResponse },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = KernelEvent::WebhookResponseBuilt {
            response: WebhookResponse::ok("application/xml", "success"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "webhook_response_built");
        assert_eq!(json["response"]["body"], "success");
    }
}
