//! Built-in reply handlers used by `larkit serve`.
//!
//! Text messages are echoed back; a subscribe event gets a greeting. Every
//! other message falls through to the success marker.

use larkit_core::message::{HandlerRegistry, Matcher, handler_fn};
use larkit_types::error::HandlerError;
use larkit_types::message::{CanonicalMessage, MessageType};

pub const WELCOME_TEXT: &str = "Thanks for subscribing.";

pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    registry.on(
        MessageType::Text,
        handler_fn(|msg: CanonicalMessage| async move {
            Ok::<_, HandlerError>(msg.content().map(|c| format!("echo: {c}")))
        }),
    );

    registry.register(
        Matcher::predicate(is_subscribe),
        handler_fn(|_msg: CanonicalMessage| async move { Ok::<_, HandlerError>(WELCOME_TEXT) }),
    );

    registry
}

fn is_subscribe(message: &CanonicalMessage) -> bool {
    message.msg_type == MessageType::Event
        && message
            .get_str("Event")
            .is_some_and(|e| e.eq_ignore_ascii_case("subscribe"))
}
