//! Markup / structured wire codec.
//!
//! Inbound bodies are sniffed by their first non-whitespace byte: `<` means
//! the markup form, anything else is tried as a JSON object and otherwise
//! kept as a single opaque `raw` field. Nested elements and objects are
//! flattened into dotted keys (`ScanCodeInfo.ScanType`). Repeated markup
//! leaves under the same key are kept together as JSON array text, the same
//! way structured arrays are.

use std::collections::BTreeMap;

use larkit_types::error::KernelError;
use larkit_types::message::{CanonicalMessage, FieldValue, Fields, RawForm};
use larkit_types::reply::{MarkupValue, OutboundMessage};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

/// Root element of every outbound markup document.
const ROOT_ELEMENT: &str = "xml";

/// Field holding a body that is neither markup nor a JSON object.
pub const RAW_FIELD: &str = "raw";

/// Whether a body is in the markup form (leading `<` after whitespace).
pub fn is_markup(raw: &str) -> bool {
    raw.trim_start().starts_with('<')
}

/// Parse a body into a flat field mapping, reporting which form it used.
///
/// Markup that fails to parse is a `MalformedMessage`; a non-markup body
/// that is not a JSON object becomes `{ "raw": body }`.
pub fn parse_fields(raw: &str) -> Result<(Fields, RawForm), KernelError> {
    if is_markup(raw) {
        return Ok((parse_markup(raw)?, RawForm::Markup));
    }
    Ok((parse_structured(raw), RawForm::Structured))
}

/// Like [`parse_fields`], but a non-markup body must be a JSON object.
///
/// Used for decrypted payloads, where an opaque body means the plaintext
/// is not a message at all.
pub fn parse_fields_strict(raw: &str) -> Result<(Fields, RawForm), KernelError> {
    if is_markup(raw) {
        return Ok((parse_markup(raw)?, RawForm::Markup));
    }
    parse_object(raw)
        .map(|fields| (fields, RawForm::Structured))
        .ok_or_else(|| malformed("payload is neither markup nor a JSON object"))
}

/// Decode a body into a [`CanonicalMessage`].
///
/// An empty body, or one yielding no fields, is a `BadRequest`.
pub fn decode(raw: &str) -> Result<CanonicalMessage, KernelError> {
    if raw.trim().is_empty() {
        return Err(KernelError::BadRequest("empty message body".to_string()));
    }
    let (fields, raw_form) = parse_fields(raw)?;
    if fields.is_empty() {
        return Err(KernelError::BadRequest("message has no fields".to_string()));
    }
    CanonicalMessage::from_fields(fields, raw_form)
}

fn malformed(e: impl std::fmt::Display) -> KernelError {
    KernelError::MalformedMessage(e.to_string())
}

struct Frame {
    name: String,
    text: String,
    has_children: bool,
}

fn flattened_key(stack: &[Frame], leaf: &str) -> String {
    // stack[0] is the document root, which does not contribute to keys.
    let mut parts: Vec<&str> = stack.iter().skip(1).map(|f| f.name.as_str()).collect();
    parts.push(leaf);
    parts.join(".")
}

fn element_name(raw: &[u8]) -> Result<String, KernelError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| malformed(format!("element name is not UTF-8: {e}")))
}

fn parse_markup(raw: &str) -> Result<Fields, KernelError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut leaves: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root_closed = false;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                if root_closed {
                    return Err(malformed("content after document root"));
                }
                let name = element_name(e.name().as_ref())?;
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                }
                stack.push(Frame {
                    name,
                    text: String::new(),
                    has_children: false,
                });
            }
            Event::Empty(e) => {
                let name = element_name(e.name().as_ref())?;
                match stack.last_mut() {
                    Some(parent) => parent.has_children = true,
                    // `<xml/>`: a document with no fields.
                    None => {
                        root_closed = true;
                        continue;
                    }
                }
                leaves
                    .entry(flattened_key(&stack, &name))
                    .or_default()
                    .push(String::new());
            }
            Event::Text(t) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&t.unescape().map_err(malformed)?);
                }
            }
            Event::CData(c) => {
                if let Some(frame) = stack.last_mut() {
                    let bytes = c.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| malformed(format!("CDATA is not UTF-8: {e}")))?;
                    frame.text.push_str(text);
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| malformed("unexpected closing tag"))?;
                if stack.is_empty() {
                    root_closed = true;
                } else if !frame.has_children {
                    leaves
                        .entry(flattened_key(&stack, &frame.name))
                        .or_default()
                        .push(frame.text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed(format!(
            "unclosed element <{}>",
            stack.last().map(|f| f.name.as_str()).unwrap_or_default()
        )));
    }
    Ok(leaves
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                values.pop().unwrap_or_default()
            } else {
                serde_json::Value::from(values).to_string()
            };
            (key, FieldValue::Text(value))
        })
        .collect())
}

fn parse_structured(raw: &str) -> Fields {
    parse_object(raw).unwrap_or_else(|| {
        Fields::from([(RAW_FIELD.to_string(), FieldValue::Text(raw.to_string()))])
    })
}

fn parse_object(raw: &str) -> Option<Fields> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => {
            let mut fields = Fields::new();
            flatten_object("", &map, &mut fields);
            Some(fields)
        }
        _ => None,
    }
}

fn flatten_object(
    prefix: &str,
    map: &serde_json::Map<String, serde_json::Value>,
    out: &mut Fields,
) {
    for (name, value) in map {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            serde_json::Value::Null => {}
            serde_json::Value::String(s) => {
                out.insert(key, FieldValue::Text(s.clone()));
            }
            serde_json::Value::Number(n) => {
                out.insert(key, FieldValue::Number(n.clone()));
            }
            serde_json::Value::Bool(b) => {
                out.insert(key, FieldValue::Text(b.to_string()));
            }
            serde_json::Value::Array(_) => {
                out.insert(key, FieldValue::Text(value.to_string()));
            }
            serde_json::Value::Object(inner) => flatten_object(&key, inner, out),
        }
    }
}

/// Serialize ordered elements as an `<xml>` markup document.
///
/// Text is written as CDATA unless it contains the CDATA terminator, in
/// which case it is escaped character data instead.
pub fn encode(elements: &[(String, MarkupValue)]) -> Result<String, KernelError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, ROOT_ELEMENT, &MarkupValue::Node(elements.to_vec()))?;
    String::from_utf8(writer.into_inner()).map_err(malformed)
}

/// Build a reply document addressed back to the sender of `to_user`'s message.
///
/// The header is always `ToUserName`, `FromUserName`, `CreateTime`,
/// `MsgType`, followed by the message's own elements.
pub fn encode_reply(
    to_user: &str,
    from_user: &str,
    create_time: i64,
    message: &OutboundMessage,
) -> Result<String, KernelError> {
    let mut elements = vec![
        ("ToUserName".to_string(), MarkupValue::text(to_user)),
        ("FromUserName".to_string(), MarkupValue::text(from_user)),
        ("CreateTime".to_string(), MarkupValue::Number(create_time)),
        ("MsgType".to_string(), MarkupValue::text(message.msg_type())),
    ];
    elements.extend(message.markup_fields());
    encode(&elements)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &MarkupValue,
) -> Result<(), KernelError> {
    let write_err = |e: std::io::Error| malformed(format!("failed to write <{name}>: {e}"));

    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_err)?;
    match value {
        MarkupValue::Text(text) if text.contains("]]>") => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_err)?,
        MarkupValue::Text(text) => writer
            .write_event(Event::CData(BytesCData::new(text.as_str())))
            .map_err(write_err)?,
        MarkupValue::Number(n) => writer
            .write_event(Event::Text(BytesText::new(&n.to_string())))
            .map_err(write_err)?,
        MarkupValue::Node(children) => {
            for (child, child_value) in children {
                write_element(writer, child, child_value)?;
            }
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use larkit_types::message::MessageType;
    use larkit_types::reply::NewsItem;

    const TEXT_MESSAGE: &str = "<xml><ToUserName><![CDATA[A]]></ToUserName>\
        <FromUserName><![CDATA[B]]></FromUserName><CreateTime>1700000000</CreateTime>\
        <MsgType><![CDATA[text]]></MsgType><Content><![CDATA[hi]]></Content></xml>";

    #[test]
    fn decode_markup_text_message() {
        let msg = decode(TEXT_MESSAGE).unwrap();
        assert_eq!(msg.msg_type, MessageType::Text);
        assert_eq!(msg.raw_form, RawForm::Markup);
        assert_eq!(msg.to_user(), "A");
        assert_eq!(msg.from_user(), "B");
        assert_eq!(msg.content().as_deref(), Some("hi"));
        assert_eq!(msg.get_str("CreateTime").as_deref(), Some("1700000000"));
    }

    #[test]
    fn decode_plain_text_elements_and_entities() {
        let msg =
            decode("<xml><MsgType>text</MsgType><Content>a &amp; b</Content></xml>").unwrap();
        assert_eq!(msg.content().as_deref(), Some("a & b"));
    }

    #[test]
    fn nested_markup_is_flattened() {
        let raw = "<xml><MsgType>event</MsgType><ScanCodeInfo>\
            <ScanType>qrcode</ScanType><ScanResult>1</ScanResult></ScanCodeInfo></xml>";
        let (fields, form) = parse_fields(raw).unwrap();
        assert_eq!(form, RawForm::Markup);
        assert_eq!(fields["ScanCodeInfo.ScanType"].as_str(), Some("qrcode"));
        assert_eq!(fields["ScanCodeInfo.ScanResult"].as_str(), Some("1"));
        assert!(!fields.contains_key("ScanCodeInfo"));
    }

    #[test]
    fn repeated_markup_leaves_are_kept_as_json_array() {
        let raw = "<xml><MsgType>event</MsgType><Articles>\
            <item><Title>a</Title></item><item><Title>b</Title></item></Articles>\
            <SendPicsInfo><Count>2</Count><PicList><item><PicMd5Sum>x</PicMd5Sum></item>\
            <item><PicMd5Sum>y</PicMd5Sum></item></PicList></SendPicsInfo></xml>";
        let (fields, _) = parse_fields(raw).unwrap();
        assert_eq!(fields["Articles.item.Title"].as_str(), Some(r#"["a","b"]"#));
        assert_eq!(
            fields["SendPicsInfo.PicList.item.PicMd5Sum"].as_str(),
            Some(r#"["x","y"]"#)
        );
        assert_eq!(fields["SendPicsInfo.Count"].as_str(), Some("2"));
        assert_eq!(fields["MsgType"].as_str(), Some("event"));
    }

    #[test]
    fn strict_parse_rejects_opaque_bodies() {
        for raw in ["just some text", "[1,2,3]", "42"] {
            assert!(matches!(
                parse_fields_strict(raw),
                Err(KernelError::MalformedMessage(_))
            ));
        }
        let (fields, form) = parse_fields_strict(r#"{"Content":"hi"}"#).unwrap();
        assert_eq!(form, RawForm::Structured);
        assert_eq!(fields["Content"].as_str(), Some("hi"));
        assert!(parse_fields_strict("<xml><Content>hi</Content></xml>").is_ok());
    }

    #[test]
    fn empty_markup_elements_are_empty_strings() {
        let (fields, _) = parse_fields("<xml><EventKey/><Ticket></Ticket></xml>").unwrap();
        assert_eq!(fields["EventKey"].as_str(), Some(""));
        assert_eq!(fields["Ticket"].as_str(), Some(""));
    }

    #[test]
    fn malformed_markup_is_rejected() {
        for raw in [
            "<xml><Content>hi</xml>",
            "<xml><Content>hi</Content>",
            "<xml></Other>",
        ] {
            let err = parse_fields(raw).unwrap_err();
            assert!(
                matches!(err, KernelError::MalformedMessage(_)),
                "{raw} gave {err:?}"
            );
        }
    }

    #[test]
    fn decode_structured_message() {
        let msg = decode(r#"{"msg_type":"image","MediaId":"m1","CreateTime":1700000000,"extra":{"a":true},"tags":[1,2],"gone":null}"#)
            .unwrap();
        assert_eq!(msg.msg_type, MessageType::Image);
        assert_eq!(msg.raw_form, RawForm::Structured);
        assert_eq!(msg.get_str("MediaId").as_deref(), Some("m1"));
        assert!(matches!(msg.get("CreateTime"), Some(FieldValue::Number(_))));
        assert_eq!(msg.get_str("extra.a").as_deref(), Some("true"));
        assert_eq!(msg.get_str("tags").as_deref(), Some("[1,2]"));
        assert!(msg.get("gone").is_none());
    }

    #[test]
    fn unparseable_structured_body_becomes_raw_field() {
        let msg = decode("just some text").unwrap();
        assert_eq!(msg.msg_type, MessageType::Text);
        assert_eq!(msg.get_str(RAW_FIELD).as_deref(), Some("just some text"));

        let (fields, _) = parse_fields("[1,2,3]").unwrap();
        assert_eq!(fields[RAW_FIELD].as_str(), Some("[1,2,3]"));
    }

    #[test]
    fn empty_bodies_are_bad_requests() {
        assert!(matches!(decode(""), Err(KernelError::BadRequest(_))));
        assert!(matches!(decode("   \n"), Err(KernelError::BadRequest(_))));
        assert!(matches!(decode("<xml></xml>"), Err(KernelError::BadRequest(_))));
        assert!(matches!(decode("<xml/>"), Err(KernelError::BadRequest(_))));
        assert!(matches!(decode("{}"), Err(KernelError::BadRequest(_))));
    }

    #[test]
    fn unknown_message_type_is_bad_request() {
        let err = decode("<xml><MsgType>hologram</MsgType></xml>").unwrap_err();
        assert!(matches!(err, KernelError::BadRequest(_)));
    }

    #[test]
    fn encode_reply_writes_header_then_body() {
        let out = encode_reply("B", "A", 1700000000, &OutboundMessage::text("echo:hi")).unwrap();
        assert_eq!(
            out,
            "<xml><ToUserName><![CDATA[B]]></ToUserName>\
             <FromUserName><![CDATA[A]]></FromUserName>\
             <CreateTime>1700000000</CreateTime>\
             <MsgType><![CDATA[text]]></MsgType>\
             <Content><![CDATA[echo:hi]]></Content></xml>"
        );
    }

    #[test]
    fn encode_news_reply_round_trips_through_parser() {
        let news = OutboundMessage::News {
            items: vec![NewsItem::new("First").with_url("https://example.com/1")],
        };
        let out = encode_reply("B", "A", 1, &news).unwrap();
        let (fields, _) = parse_fields(&out).unwrap();
        assert_eq!(fields["MsgType"].as_str(), Some("news"));
        assert_eq!(fields["ArticleCount"].as_str(), Some("1"));
        assert_eq!(fields["Articles.item.Title"].as_str(), Some("First"));
        assert_eq!(
            fields["Articles.item.Url"].as_str(),
            Some("https://example.com/1")
        );
    }

    #[test]
    fn cdata_terminator_in_text_is_escaped() {
        let out = encode(&[("Content".to_string(), MarkupValue::text("a]]>b<c"))]).unwrap();
        assert!(!out.contains("<![CDATA[a]]>"));
        let (fields, _) = parse_fields(&out).unwrap();
        assert_eq!(fields["Content"].as_str(), Some("a]]>b<c"));
    }
}
