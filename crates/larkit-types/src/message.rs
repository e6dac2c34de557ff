//! Canonical representation of inbound webhook messages.
//!
//! Whatever the wire format (markup or structured data), an inbound payload
//! is normalized into a `CanonicalMessage`: a resolved `MessageType` plus a
//! flat field mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Field carrying the message type on the markup channel.
pub const MARKUP_TYPE_FIELD: &str = "MsgType";
/// Field carrying the message type on the structured channel.
pub const STRUCTURED_TYPE_FIELD: &str = "msg_type";

/// Kind of inbound message, used to route to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Voice,
    Video,
    ShortVideo,
    Location,
    Link,
    DeviceEvent,
    DeviceText,
    Event,
    File,
    MiniProgramPage,
}

impl MessageType {
    /// The wire value used by the channel.
    pub fn as_wire(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Voice => "voice",
            MessageType::Video => "video",
            MessageType::ShortVideo => "shortvideo",
            MessageType::Location => "location",
            MessageType::Link => "link",
            MessageType::DeviceEvent => "device_event",
            MessageType::DeviceText => "device_text",
            MessageType::Event => "event",
            MessageType::File => "file",
            MessageType::MiniProgramPage => "miniprogrampage",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for MessageType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "voice" => Ok(MessageType::Voice),
            "video" => Ok(MessageType::Video),
            "shortvideo" => Ok(MessageType::ShortVideo),
            "location" => Ok(MessageType::Location),
            "link" => Ok(MessageType::Link),
            "device_event" => Ok(MessageType::DeviceEvent),
            "device_text" => Ok(MessageType::DeviceText),
            "event" => Ok(MessageType::Event),
            "file" => Ok(MessageType::File),
            "miniprogrampage" => Ok(MessageType::MiniProgramPage),
            other => Err(KernelError::BadRequest(format!(
                "unsupported message type '{other}'"
            ))),
        }
    }
}

/// A single field value: markup leaves are strings, structured bodies may
/// carry numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(serde_json::Number),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Flat field mapping of a message. Nested elements use dotted keys.
pub type Fields = BTreeMap<String, FieldValue>;

/// Wire format the message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawForm {
    Markup,
    Structured,
}

/// Internal normalized representation of an inbound webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub msg_type: MessageType,
    pub fields: Fields,
    pub raw_form: RawForm,
}

impl CanonicalMessage {
    /// Resolve the message type from `MsgType`, then `msg_type`, defaulting
    /// to `text` when neither is present.
    pub fn from_fields(fields: Fields, raw_form: RawForm) -> Result<Self, KernelError> {
        let declared = fields
            .get(MARKUP_TYPE_FIELD)
            .or_else(|| fields.get(STRUCTURED_TYPE_FIELD))
            .map(|v| v.to_string());

        let msg_type = match declared {
            Some(t) => t.parse()?,
            None => MessageType::Text,
        };

        Ok(Self {
            msg_type,
            fields,
            raw_form,
        })
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String value of a field; numbers are rendered as text.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.to_string())
    }

    /// Sender of the inbound message (the reply's recipient).
    pub fn from_user(&self) -> String {
        self.get_str("FromUserName").unwrap_or_default()
    }

    /// Recipient of the inbound message (the reply's sender).
    pub fn to_user(&self) -> String {
        self.get_str("ToUserName").unwrap_or_default()
    }

    /// Text content for text messages.
    pub fn content(&self) -> Option<String> {
        self.get_str("Content")
    }
}
