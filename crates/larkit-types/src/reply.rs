//! Reply shapes: what handlers return, what the gateway sends back.
//!
//! Handlers return a loosely-typed `HandlerResponse`; the dispatcher
//! normalizes it into exactly one `ReplyPayload` variant.

use serde::{Deserialize, Serialize};

/// Literal body acknowledging a webhook without a reply message.
pub const SUCCESS_MARKER: &str = "success";

/// Node in an outbound markup document.
///
/// Children are ordered and may repeat (e.g. several `item` articles).
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupValue {
    /// Written as a CDATA section.
    Text(String),
    /// Written as plain character data.
    Number(i64),
    Node(Vec<(String, MarkupValue)>),
}

impl MarkupValue {
    pub fn text(s: impl Into<String>) -> Self {
        MarkupValue::Text(s.into())
    }
}

/// One article of a news reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    #[serde(default, alias = "Url")]
    pub url: String,
    #[serde(default, alias = "PicUrl", alias = "image")]
    pub pic_url: String,
}

impl NewsItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            url: String::new(),
            pic_url: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_pic_url(mut self, pic_url: impl Into<String>) -> Self {
        self.pic_url = pic_url.into();
        self
    }

    fn to_markup(&self) -> MarkupValue {
        MarkupValue::Node(vec![
            ("Title".into(), MarkupValue::text(&self.title)),
            ("Description".into(), MarkupValue::text(&self.description)),
            ("Url".into(), MarkupValue::text(&self.url)),
            ("PicUrl".into(), MarkupValue::text(&self.pic_url)),
        ])
    }
}

/// A structured outbound message with a known `MsgType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        content: String,
    },
    Image {
        media_id: String,
    },
    Voice {
        media_id: String,
    },
    Video {
        media_id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    News {
        items: Vec<NewsItem>,
    },
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        OutboundMessage::Text {
            content: content.into(),
        }
    }

    /// Value written to the reply's `MsgType` element.
    pub fn msg_type(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Image { .. } => "image",
            OutboundMessage::Voice { .. } => "voice",
            OutboundMessage::Video { .. } => "video",
            OutboundMessage::News { .. } => "news",
        }
    }

    /// Body elements following the `ToUserName`/`FromUserName`/`CreateTime`/`MsgType` header.
    pub fn markup_fields(&self) -> Vec<(String, MarkupValue)> {
        match self {
            OutboundMessage::Text { content } => {
                vec![("Content".into(), MarkupValue::text(content))]
            }
            OutboundMessage::Image { media_id } => vec![(
                "Image".into(),
                MarkupValue::Node(vec![("MediaId".into(), MarkupValue::text(media_id))]),
            )],
            OutboundMessage::Voice { media_id } => vec![(
                "Voice".into(),
                MarkupValue::Node(vec![("MediaId".into(), MarkupValue::text(media_id))]),
            )],
            OutboundMessage::Video {
                media_id,
                title,
                description,
            } => {
                let mut node = vec![("MediaId".into(), MarkupValue::text(media_id))];
                if let Some(title) = title {
                    node.push(("Title".into(), MarkupValue::text(title)));
                }
                if let Some(description) = description {
                    node.push(("Description".into(), MarkupValue::text(description)));
                }
                vec![("Video".into(), MarkupValue::Node(node))]
            }
            OutboundMessage::News { items } => vec![
                ("ArticleCount".into(), MarkupValue::Number(items.len() as i64)),
                (
                    "Articles".into(),
                    MarkupValue::Node(
                        items
                            .iter()
                            .map(|item| ("item".to_string(), item.to_markup()))
                            .collect(),
                    ),
                ),
            ],
        }
    }
}

/// Content sent verbatim, bypassing markup building and encryption.
///
/// Used when a reply was already delivered over a side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReply {
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl RawReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// What a handler hands back. `Empty` declines the message.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResponse {
    Empty,
    Text(String),
    Number(serde_json::Number),
    News(Vec<NewsItem>),
    Message(OutboundMessage),
    Raw(RawReply),
    /// Arbitrary data; normalized by shape.
    Value(serde_json::Value),
}

impl HandlerResponse {
    pub fn text(s: impl Into<String>) -> Self {
        HandlerResponse::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, HandlerResponse::Empty)
    }
}

impl From<&str> for HandlerResponse {
    fn from(s: &str) -> Self {
        HandlerResponse::Text(s.to_string())
    }
}

impl From<String> for HandlerResponse {
    fn from(s: String) -> Self {
        HandlerResponse::Text(s)
    }
}

impl From<OutboundMessage> for HandlerResponse {
    fn from(m: OutboundMessage) -> Self {
        HandlerResponse::Message(m)
    }
}

impl From<Vec<NewsItem>> for HandlerResponse {
    fn from(items: Vec<NewsItem>) -> Self {
        HandlerResponse::News(items)
    }
}

impl<T: Into<HandlerResponse>> From<Option<T>> for HandlerResponse {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(HandlerResponse::Empty)
    }
}

/// Normalized reply. Exactly one variant is active per reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// Handler output sent as-is when the channel runs in raw-response mode.
    RawText(String),
    StructuredMessage(OutboundMessage),
    EmptySuccess,
    PassthroughRaw(RawReply),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_markup_counts_articles() {
        let msg = OutboundMessage::News {
            items: vec![NewsItem::new("a"), NewsItem::new("b").with_url("https://x")],
        };
        let fields = msg.markup_fields();
        assert_eq!(fields[0], ("ArticleCount".to_string(), MarkupValue::Number(2)));
        match &fields[1].1 {
            MarkupValue::Node(items) => {
                assert_eq!(items.len(), 2);
                assert!(items.iter().all(|(k, _)| k == "item"));
            }
            other => panic!("expected node, got {other:?}"),
        }
    }

    #[test]
    fn test_news_item_accepts_markup_names() {
        let item: NewsItem = serde_json::from_value(serde_json::json!({
            "Title": "Hello",
            "PicUrl": "https://img"
        }))
        .unwrap();
        assert_eq!(item.title, "Hello");
        assert_eq!(item.pic_url, "https://img");
        assert!(item.url.is_empty());
    }

    #[test]
    fn test_video_omits_absent_optionals() {
        let msg = OutboundMessage::Video {
            media_id: "m1".into(),
            title: None,
            description: Some("d".into()),
        };
        let fields = msg.markup_fields();
        let MarkupValue::Node(children) = &fields[0].1 else {
            panic!("expected node");
        };
        let names: Vec<&str> = children.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["MediaId", "Description"]);
    }

    #[test]
    fn test_option_into_handler_response() {
        let none: Option<&str> = None;
        assert!(HandlerResponse::from(none).is_empty());
        assert_eq!(HandlerResponse::from(Some("hi")), HandlerResponse::text("hi"));
    }
}
