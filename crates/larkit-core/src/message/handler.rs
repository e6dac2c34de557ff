//! Message handler trait and its object-safe wrapper.
//!
//! `MessageHandler` uses RPITIT, so it cannot be a trait object directly.
//! The registry stores handlers as [`BoxMessageHandler`]:
//! 1. `MessageHandlerDyn` is the object-safe version with boxed futures
//! 2. it is blanket-implemented for every `T: MessageHandler`
//! 3. `BoxMessageHandler` wraps `Box<dyn MessageHandlerDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use larkit_types::error::HandlerError;
use larkit_types::message::CanonicalMessage;
use larkit_types::reply::HandlerResponse;

/// Caller-supplied reaction to an inbound message.
///
/// Returning [`HandlerResponse::Empty`] declines the message so the next
/// registered handler gets a chance. Errors propagate unmodified to the
/// caller of the gateway.
pub trait MessageHandler: Send + Sync {
    fn handle(
        &self,
        message: &CanonicalMessage,
    ) -> impl Future<Output = Result<HandlerResponse, HandlerError>> + Send;
}

/// Object-safe version of [`MessageHandler`] with boxed futures.
pub trait MessageHandlerDyn: Send + Sync {
    fn handle_boxed<'a>(
        &'a self,
        message: &'a CanonicalMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandlerResponse, HandlerError>> + Send + 'a>>;
}

impl<T: MessageHandler> MessageHandlerDyn for T {
    fn handle_boxed<'a>(
        &'a self,
        message: &'a CanonicalMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandlerResponse, HandlerError>> + Send + 'a>> {
        Box::pin(self.handle(message))
    }
}

/// Type-erased handler, as stored in the registry.
pub struct BoxMessageHandler {
    inner: Box<dyn MessageHandlerDyn>,
}

impl BoxMessageHandler {
    pub fn new<T: MessageHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Box::new(handler),
        }
    }

    pub async fn handle(&self, message: &CanonicalMessage) -> Result<HandlerResponse, HandlerError> {
        self.inner.handle_boxed(message).await
    }
}

impl std::fmt::Debug for BoxMessageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoxMessageHandler")
    }
}

/// Handler built from an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Adapt an async closure into a [`MessageHandler`].
///
/// The closure receives an owned copy of the message and may return anything
/// convertible into a [`HandlerResponse`] (`&str`, `String`, `Option<_>`,
/// `OutboundMessage`, `Vec<NewsItem>`, ...).
///
/// ```ignore
/// registry.on(MessageType::Text, handler_fn(|msg| async move {
///     Ok::<_, HandlerError>(msg.content().map(|c| format!("echo:{c}")))
/// }));
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F>
where
    F: Fn(CanonicalMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send,
    R: Into<HandlerResponse>,
{
    FnHandler { f }
}

impl<F, Fut, R> MessageHandler for FnHandler<F>
where
    F: Fn(CanonicalMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send,
    R: Into<HandlerResponse>,
{
    fn handle(
        &self,
        message: &CanonicalMessage,
    ) -> impl Future<Output = Result<HandlerResponse, HandlerError>> + Send {
        let fut = (self.f)(message.clone());
        async move { fut.await.map(Into::into) }
    }
}
