//! Inbound webhook gateway.
//!
//! Drives one request through `Received -> Validated -> Decoded ->
//! Dispatched -> Encoded -> Sent`, or `Rejected` on the first failure.
//!
//! Signature validation is opportunistic: it runs when the request carries a
//! `signature` parameter or when always-validate is on. A caller that omits
//! the parameter therefore skips validation unless the toggle is forced.
//! Deployments that must authenticate every request should enable
//! `always_validate` (or call [`WebhookGateway::force_validate`]).

pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use larkit_types::config::KernelConfig;
use larkit_types::error::KernelError;
use larkit_types::event::KernelEvent;
use larkit_types::message::CanonicalMessage;
use larkit_types::reply::{MarkupValue, ReplyPayload, SUCCESS_MARKER};
use larkit_types::webhook::{
    InboundEnvelope, TEXT_CONTENT_TYPE, WebhookQuery, WebhookResponse, XML_CONTENT_TYPE,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::crypto::{Encrypter, SignatureVerifier};
use crate::event::EventBus;
use crate::message::HandlerRegistry;
use crate::message::{codec, reply};

pub use state::GatewayState;

/// Element carrying the encrypted payload in secure mode, both ways.
pub const ENCRYPT_FIELD: &str = "Encrypt";

fn advance(state: &mut GatewayState, next: GatewayState) {
    debug!(from = %state, to = %next, "webhook state");
    *state = next;
}

pub struct WebhookGateway<V: SignatureVerifier, E: Encrypter> {
    verifier: V,
    encrypter: Option<E>,
    token: Option<SecretString>,
    always_validate: AtomicBool,
    raw_response: bool,
    registry: Arc<HandlerRegistry>,
    events: EventBus,
}

impl<V: SignatureVerifier, E: Encrypter> WebhookGateway<V, E> {
    pub fn new(verifier: V, registry: Arc<HandlerRegistry>, events: EventBus) -> Self {
        Self {
            verifier,
            encrypter: None,
            token: None,
            always_validate: AtomicBool::new(false),
            raw_response: false,
            registry,
            events,
        }
    }

    /// Build a gateway from the top-level configuration.
    ///
    /// `encrypter` is only required when secure-mode requests arrive.
    pub fn from_config(
        config: &KernelConfig,
        verifier: V,
        encrypter: Option<E>,
        registry: Arc<HandlerRegistry>,
        events: EventBus,
    ) -> Self {
        let mut gateway = Self::new(verifier, registry, events)
            .with_always_validate(config.always_validate)
            .with_raw_response(config.raw_response);
        if let Some(token) = &config.token {
            gateway = gateway.with_token(token.clone());
        }
        if let Some(encrypter) = encrypter {
            gateway = gateway.with_encrypter(encrypter);
        }
        gateway
    }

    /// Shared secret used to verify request signatures.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_encrypter(mut self, encrypter: E) -> Self {
        self.encrypter = Some(encrypter);
        self
    }

    pub fn with_always_validate(self, enabled: bool) -> Self {
        self.always_validate.store(enabled, Ordering::Relaxed);
        self
    }

    /// Return handler output verbatim instead of building markup replies.
    pub fn with_raw_response(mut self, enabled: bool) -> Self {
        self.raw_response = enabled;
        self
    }

    /// Require a valid signature on every subsequent request.
    pub fn force_validate(&self) -> &Self {
        self.always_validate.store(true, Ordering::Relaxed);
        self
    }

    pub fn always_validate(&self) -> bool {
        self.always_validate.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Process one inbound request into the response to send back.
    ///
    /// Failures before dispatch are client errors (`BadRequest`,
    /// `MalformedMessage`, `DecryptFailure`) or missing configuration.
    /// Handler failures are returned unmodified as `KernelError::Handler`.
    pub async fn serve(&self, envelope: InboundEnvelope) -> Result<WebhookResponse, KernelError> {
        let mut state = GatewayState::Received;
        debug!(
            method = %envelope.method,
            content_type = envelope.content_type.as_deref().unwrap_or("-"),
            body_len = envelope.body.len(),
            signed = envelope.query.signature().is_some(),
            "webhook received"
        );

        match self.process(&envelope, &mut state).await {
            Ok(response) => {
                advance(&mut state, GatewayState::Sent);
                debug!(
                    content_type = %response.content_type,
                    body_len = response.body.len(),
                    "webhook response built"
                );
                self.events.publish(KernelEvent::WebhookResponseBuilt {
                    response: response.clone(),
                });
                Ok(response)
            }
            Err(e) => {
                let failed_after = state;
                advance(&mut state, GatewayState::Rejected);
                warn!(after = %failed_after, error = %e, "webhook rejected");
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        envelope: &InboundEnvelope,
        state: &mut GatewayState,
    ) -> Result<WebhookResponse, KernelError> {
        let query = &envelope.query;
        if self.always_validate() || query.signature().is_some() {
            self.validate(query)?;
        }
        advance(state, GatewayState::Validated);

        let secure = query.is_secure_mode();
        let message = self.decode(&envelope.body, secure)?;
        advance(state, GatewayState::Decoded);

        let mut payload = self.registry.dispatch(&message).await?;
        advance(state, GatewayState::Dispatched);

        if self.raw_response {
            payload = reply::into_raw_text(payload)?;
        }
        let response = self.build_response(&message, payload, secure)?;
        advance(state, GatewayState::Encoded);
        Ok(response)
    }

    fn encrypter(&self) -> Result<&E, KernelError> {
        self.encrypter.as_ref().ok_or_else(|| {
            KernelError::MissingConfiguration("encryption key required for secure mode".into())
        })
    }

    fn validate(&self, query: &WebhookQuery) -> Result<(), KernelError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| KernelError::MissingConfiguration("webhook token".into()))?;
        let valid = self.verifier.verify(
            token.expose_secret(),
            query.timestamp.as_deref().unwrap_or_default(),
            query.nonce.as_deref().unwrap_or_default(),
            query.signature().unwrap_or_default(),
        );
        if !valid {
            return Err(KernelError::BadRequest("invalid request signature".into()));
        }
        Ok(())
    }

    fn decode(&self, body: &[u8], secure: bool) -> Result<CanonicalMessage, KernelError> {
        let raw = std::str::from_utf8(body)
            .map_err(|_| KernelError::BadRequest("body is not valid UTF-8".into()))?;
        if raw.trim().is_empty() {
            return Err(KernelError::BadRequest("empty message body".into()));
        }

        let (mut fields, mut form) = codec::parse_fields(raw)?;
        if secure {
            let encrypted = fields
                .get(ENCRYPT_FIELD)
                .map(|v| v.to_string())
                .filter(|v| !v.is_empty());
            if let Some(encrypted) = encrypted {
                let plaintext = self.encrypter()?.decrypt(&encrypted)?;
                if plaintext.trim().is_empty() {
                    return Err(KernelError::BadRequest(
                        "empty message after decryption".into(),
                    ));
                }
                (fields, form) = codec::parse_fields_strict(&plaintext)?;
            }
        }

        if fields.is_empty() {
            return Err(KernelError::BadRequest("message has no fields".into()));
        }
        CanonicalMessage::from_fields(fields, form)
    }

    fn build_response(
        &self,
        message: &CanonicalMessage,
        payload: ReplyPayload,
        secure: bool,
    ) -> Result<WebhookResponse, KernelError> {
        match payload {
            ReplyPayload::EmptySuccess => Ok(WebhookResponse::ok(XML_CONTENT_TYPE, SUCCESS_MARKER)),
            ReplyPayload::RawText(text) => Ok(WebhookResponse::ok(TEXT_CONTENT_TYPE, text)),
            ReplyPayload::PassthroughRaw(raw) => Ok(WebhookResponse::ok(
                raw.content_type
                    .unwrap_or_else(|| TEXT_CONTENT_TYPE.to_string()),
                raw.content,
            )),
            ReplyPayload::StructuredMessage(outbound) => {
                // The reply goes back to whoever sent the message.
                let mut body = codec::encode_reply(
                    &message.from_user(),
                    &message.to_user(),
                    Utc::now().timestamp(),
                    &outbound,
                )?;
                if secure {
                    let ciphertext = self.encrypter()?.encrypt(&body)?;
                    body = codec::encode(&[(
                        ENCRYPT_FIELD.to_string(),
                        MarkupValue::text(ciphertext),
                    )])?;
                }
                Ok(WebhookResponse::ok(XML_CONTENT_TYPE, body))
            }
        }
    }
}
