//! Inbound message handling: wire codec, handlers, dispatch, reply normalization.

pub mod codec;
pub mod handler;
pub mod registry;
pub mod reply;

pub use handler::{BoxMessageHandler, MessageHandler, handler_fn};
pub use registry::{HandlerRegistry, Matcher};
