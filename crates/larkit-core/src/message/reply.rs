//! Normalization of handler output into a [`ReplyPayload`].
//!
//! Rules:
//! - nothing, an empty string, or the `success` marker acknowledges without a reply
//! - a passthrough raw reply is kept verbatim
//! - strings and numbers become text messages
//! - a list whose first element looks like a news item becomes a news message
//! - anything else that is not already a structured message is rejected

use larkit_types::error::KernelError;
use larkit_types::reply::{
    HandlerResponse, NewsItem, OutboundMessage, ReplyPayload, SUCCESS_MARKER,
};
use serde_json::Value;

/// Whether a handler response declines the message, letting the next
/// handler run.
pub fn is_declined(response: &HandlerResponse) -> bool {
    match response {
        HandlerResponse::Empty => true,
        HandlerResponse::Text(s) => s.is_empty(),
        HandlerResponse::Value(v) => v.is_null(),
        _ => false,
    }
}

pub fn normalize(response: HandlerResponse) -> Result<ReplyPayload, KernelError> {
    match response {
        HandlerResponse::Empty => Ok(ReplyPayload::EmptySuccess),
        HandlerResponse::Text(text) => Ok(text_reply(text)),
        HandlerResponse::Number(n) => Ok(ReplyPayload::StructuredMessage(
            OutboundMessage::text(n.to_string()),
        )),
        HandlerResponse::News(items) if items.is_empty() => Ok(ReplyPayload::EmptySuccess),
        HandlerResponse::News(items) => Ok(ReplyPayload::StructuredMessage(
            OutboundMessage::News { items },
        )),
        HandlerResponse::Message(message) => Ok(ReplyPayload::StructuredMessage(message)),
        HandlerResponse::Raw(raw) => Ok(ReplyPayload::PassthroughRaw(raw)),
        HandlerResponse::Value(value) => normalize_value(value),
    }
}

fn text_reply(text: String) -> ReplyPayload {
    if text.is_empty() || text == SUCCESS_MARKER {
        ReplyPayload::EmptySuccess
    } else {
        ReplyPayload::StructuredMessage(OutboundMessage::text(text))
    }
}

fn looks_like_news_item(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.contains_key("title") || o.contains_key("Title"))
}

fn normalize_value(value: Value) -> Result<ReplyPayload, KernelError> {
    match value {
        Value::Null => Ok(ReplyPayload::EmptySuccess),
        Value::String(s) => Ok(text_reply(s)),
        Value::Number(n) => Ok(ReplyPayload::StructuredMessage(OutboundMessage::text(
            n.to_string(),
        ))),
        Value::Array(items) if items.is_empty() => Ok(ReplyPayload::EmptySuccess),
        Value::Array(items) if items.first().is_some_and(looks_like_news_item) => {
            let items: Vec<NewsItem> = serde_json::from_value(Value::Array(items))
                .map_err(|e| KernelError::InvalidReplyType {
                    found: format!("news list ({e})"),
                })?;
            Ok(ReplyPayload::StructuredMessage(OutboundMessage::News { items }))
        }
        Value::Object(map) if map.contains_key("msg_type") => {
            serde_json::from_value::<OutboundMessage>(Value::Object(map))
                .map(ReplyPayload::StructuredMessage)
                .map_err(|e| KernelError::InvalidReplyType {
                    found: format!("message object ({e})"),
                })
        }
        other => Err(KernelError::InvalidReplyType {
            found: value_kind(&other).to_string(),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Render a payload as the verbatim body used in raw-response mode.
///
/// Acknowledgements and passthrough replies are unchanged; a text message
/// yields its content and any other message its JSON form.
pub fn into_raw_text(payload: ReplyPayload) -> Result<ReplyPayload, KernelError> {
    match payload {
        ReplyPayload::StructuredMessage(OutboundMessage::Text { content }) => {
            Ok(ReplyPayload::RawText(content))
        }
        ReplyPayload::StructuredMessage(message) => serde_json::to_string(&message)
            .map(ReplyPayload::RawText)
            .map_err(|e| KernelError::InvalidReplyType {
                found: format!("unserializable message ({e})"),
            }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larkit_types::reply::RawReply;
    use serde_json::json;

    #[test]
    fn acknowledgements() {
        for response in [
            HandlerResponse::Empty,
            HandlerResponse::text(""),
            HandlerResponse::text("success"),
            HandlerResponse::News(vec![]),
            HandlerResponse::Value(Value::Null),
            HandlerResponse::Value(json!([])),
            HandlerResponse::Value(json!("success")),
        ] {
            assert_eq!(
                normalize(response.clone()).unwrap(),
                ReplyPayload::EmptySuccess,
                "{response:?}"
            );
        }
    }

    #[test]
    fn strings_and_numbers_become_text_messages() {
        assert_eq!(
            normalize(HandlerResponse::text("hello")).unwrap(),
            ReplyPayload::StructuredMessage(OutboundMessage::text("hello"))
        );
        assert_eq!(
            normalize(HandlerResponse::Number(42u64.into())).unwrap(),
            ReplyPayload::StructuredMessage(OutboundMessage::text("42"))
        );
        assert_eq!(
            normalize(HandlerResponse::Value(json!(0))).unwrap(),
            ReplyPayload::StructuredMessage(OutboundMessage::text("0"))
        );
    }

    #[test]
    fn raw_reply_is_passed_through() {
        let raw = RawReply::new("<xml>already sent</xml>").with_content_type("text/xml");
        assert_eq!(
            normalize(HandlerResponse::Raw(raw.clone())).unwrap(),
            ReplyPayload::PassthroughRaw(raw)
        );
    }

    #[test]
    fn news_shaped_list_becomes_news_message() {
        let payload = normalize(HandlerResponse::Value(json!([
            {"Title": "One", "Url": "https://example.com/1"},
            {"title": "Two", "image": "https://example.com/2.png"}
        ])))
        .unwrap();
        let ReplyPayload::StructuredMessage(OutboundMessage::News { items }) = payload else {
            panic!("expected a news message");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://example.com/1");
        assert_eq!(items[1].pic_url, "https://example.com/2.png");
    }

    #[test]
    fn tagged_object_becomes_structured_message() {
        let payload =
            normalize(HandlerResponse::Value(json!({"msg_type": "image", "media_id": "m1"})))
                .unwrap();
        assert_eq!(
            payload,
            ReplyPayload::StructuredMessage(OutboundMessage::Image {
                media_id: "m1".into()
            })
        );
    }

    #[test]
    fn unsupported_shapes_are_invalid() {
        for value in [json!(true), json!({"a": 1}), json!([1, 2]), json!([{"x": 1}])] {
            let err = normalize(HandlerResponse::Value(value.clone())).unwrap_err();
            assert!(
                matches!(err, KernelError::InvalidReplyType { .. }),
                "{value} gave {err:?}"
            );
        }
    }

    #[test]
    fn declined_responses() {
        assert!(is_declined(&HandlerResponse::Empty));
        assert!(is_declined(&HandlerResponse::text("")));
        assert!(is_declined(&HandlerResponse::Value(Value::Null)));
        assert!(!is_declined(&HandlerResponse::text("success")));
        assert!(!is_declined(&HandlerResponse::Value(json!(false))));
    }

    #[test]
    fn raw_text_rendering() {
        let payload =
            into_raw_text(ReplyPayload::StructuredMessage(OutboundMessage::text("hi"))).unwrap();
        assert_eq!(payload, ReplyPayload::RawText("hi".into()));

        let payload = into_raw_text(ReplyPayload::StructuredMessage(OutboundMessage::Image {
            media_id: "m1".into(),
        }))
        .unwrap();
        let ReplyPayload::RawText(body) = payload else {
            panic!("expected raw text");
        };
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["msg_type"], "image");

        assert_eq!(
            into_raw_text(ReplyPayload::EmptySuccess).unwrap(),
            ReplyPayload::EmptySuccess
        );
    }
}
