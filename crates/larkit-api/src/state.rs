//! Application state wiring the kernel together.
//!
//! AppState holds the concrete gateway and token manager used by both the
//! CLI and the webhook endpoint. The kernel is generic over its ports;
//! AppState pins them to the larkit-infra adapters.

use std::sync::Arc;

use larkit_core::event::EventBus;
use larkit_core::gateway::WebhookGateway;
use larkit_core::message::HandlerRegistry;
use larkit_core::token::TokenManager;
use larkit_infra::cache::CacheBackend;
use larkit_infra::crypto::{AesCbcEncrypter, Sha1SignatureVerifier, Sha256ContentHasher};
use larkit_infra::http::HttpTokenIssuer;
use larkit_types::config::KernelConfig;
use larkit_types::event::KernelEvent;
use tracing::info;

use crate::http::router::{HEALTH_PATH, normalize_path};
use crate::replies;

/// Concrete type aliases for the kernel generics pinned to infra implementations.
pub type ConcreteTokenManager = TokenManager<HttpTokenIssuer, CacheBackend, Sha256ContentHasher>;

pub type ConcreteGateway = WebhookGateway<Sha1SignatureVerifier, AesCbcEncrypter>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<KernelConfig>,
    pub events: EventBus,
    pub gateway: Arc<ConcreteGateway>,
    pub token_manager: Arc<ConcreteTokenManager>,
}

impl AppState {
    /// Wire the kernel with the built-in reply handlers.
    pub async fn init(config: KernelConfig) -> anyhow::Result<Self> {
        Self::with_registry(config, replies::default_registry()).await
    }

    /// Wire the kernel around a caller-built handler registry.
    ///
    /// Emits `ApplicationInitialized` once everything is in place.
    pub async fn with_registry(
        config: KernelConfig,
        registry: HandlerRegistry,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            normalize_path(&config.server.path) != HEALTH_PATH,
            "webhook path must not be {HEALTH_PATH}"
        );

        let events = EventBus::default();

        let encrypter = config
            .encryption_key
            .as_deref()
            .map(AesCbcEncrypter::from_key_string)
            .transpose()?;
        let gateway = WebhookGateway::from_config(
            &config,
            Sha1SignatureVerifier::new(),
            encrypter,
            Arc::new(registry),
            events.clone(),
        );

        let issuer = HttpTokenIssuer::new(&config.credentials, &config.http)?;
        let cache = CacheBackend::open(&config.cache).await?;
        let token_manager = TokenManager::from_config(
            issuer,
            cache,
            Sha256ContentHasher::new(),
            &config.credentials,
            events.clone(),
        );

        let app_id = token_manager.fingerprint();
        info!(app_id = %app_id, cache = ?config.cache.backend, "application initialized");
        events.publish(KernelEvent::ApplicationInitialized { app_id });

        Ok(Self {
            config: Arc::new(config),
            events,
            gateway: Arc::new(gateway),
            token_manager: Arc::new(token_manager),
        })
    }
}
