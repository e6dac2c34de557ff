//! Ordered handler registry and dispatcher.
//!
//! Handlers are tried in registration order; the first one that does not
//! decline produces the reply. The registry is built at startup and shared
//! read-only (behind an `Arc`) by every gateway invocation.

use std::sync::Arc;

use larkit_types::error::KernelError;
use larkit_types::message::{CanonicalMessage, MessageType};
use larkit_types::reply::ReplyPayload;
use tracing::debug;

use super::handler::{BoxMessageHandler, MessageHandler};
use super::reply::{is_declined, normalize};

/// Predicate deciding whether a handler sees a message.
pub type MessagePredicate = Arc<dyn Fn(&CanonicalMessage) -> bool + Send + Sync>;

/// Which messages a registration applies to.
#[derive(Clone)]
pub enum Matcher {
    /// Every message.
    Any,
    Type(MessageType),
    Types(Vec<MessageType>),
    Predicate(MessagePredicate),
}

impl Matcher {
    pub fn predicate(f: impl Fn(&CanonicalMessage) -> bool + Send + Sync + 'static) -> Self {
        Matcher::Predicate(Arc::new(f))
    }

    pub fn matches(&self, message: &CanonicalMessage) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Type(t) => message.msg_type == *t,
            Matcher::Types(types) => types.contains(&message.msg_type),
            Matcher::Predicate(f) => f(message),
        }
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Any => f.write_str("Any"),
            Matcher::Type(t) => f.debug_tuple("Type").field(t).finish(),
            Matcher::Types(types) => f.debug_tuple("Types").field(types).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<MessageType> for Matcher {
    fn from(t: MessageType) -> Self {
        Matcher::Type(t)
    }
}

#[derive(Debug)]
struct Registration {
    matcher: Matcher,
    handler: BoxMessageHandler,
}

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Registration order is dispatch order.
    pub fn register<H>(&mut self, matcher: impl Into<Matcher>, handler: H) -> &mut Self
    where
        H: MessageHandler + 'static,
    {
        self.registrations.push(Registration {
            matcher: matcher.into(),
            handler: BoxMessageHandler::new(handler),
        });
        self
    }

    /// Register a handler for a single message type.
    pub fn on<H>(&mut self, msg_type: MessageType, handler: H) -> &mut Self
    where
        H: MessageHandler + 'static,
    {
        self.register(Matcher::Type(msg_type), handler)
    }

    /// Register a handler that sees every message.
    pub fn any<H>(&mut self, handler: H) -> &mut Self
    where
        H: MessageHandler + 'static,
    {
        self.register(Matcher::Any, handler)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Run matching handlers in order and normalize the first reply.
    ///
    /// Yields `EmptySuccess` when nothing matches or every handler declines.
    /// Handler errors are returned as `KernelError::Handler`, untouched.
    pub async fn dispatch(&self, message: &CanonicalMessage) -> Result<ReplyPayload, KernelError> {
        for (index, registration) in self.registrations.iter().enumerate() {
            if !registration.matcher.matches(message) {
                continue;
            }
            let response = registration
                .handler
                .handle(message)
                .await
                .map_err(KernelError::Handler)?;
            if is_declined(&response) {
                continue;
            }
            debug!(handler = index, msg_type = %message.msg_type, "handler replied");
            return normalize(response);
        }
        Ok(ReplyPayload::EmptySuccess)
    }
}
