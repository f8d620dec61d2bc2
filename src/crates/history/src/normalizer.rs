//! Conversion between wire payloads and canonical [`ContentPart`]s.
//!
//! Two wire variants are supported:
//!
//! - **Converse**: blocks are keyed by their kind.
//!
//!   ```json
//!   {"text": "Hello"}
//!   {"image": {"format": "png", "source": {"bytes": "iVBORw0K..."}}}
//!   {"document": {"format": "pdf", "name": "report.pdf", "source": {"bytes": "JVBERi0..."}}}
//!   ```
//!
//! - **Messages**: blocks carry a `type` discriminator.
//!
//!   ```json
//!   {"type": "text", "text": "Hello"}
//!   {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "iVBORw0K..."}}
//!   {"type": "document", "source": {"type": "base64", "media_type": "application/pdf", "data": "JVBERi0..."}, "title": "report.pdf"}
//!   ```
//!
//! Input in either shape is accepted regardless of the conversation's wire
//! variant, and output is always produced in the requested one. Blocks that
//! match neither shape are kept as [`ContentPart::Opaque`] and emitted
//! verbatim.
//!
//! # Example
//!
//! ```rust
//! use history::normalizer::{to_canonical, to_wire, WireFormat};
//! use history::ContentPart;
//! use serde_json::json;
//!
//! let parts = to_canonical(&json!({"content": [{"text": "hi"}]}));
//! assert_eq!(parts, vec![ContentPart::text("hi")]);
//!
//! let blocks = to_wire(&parts, WireFormat::Messages);
//! assert_eq!(blocks, vec![json!({"type": "text", "text": "hi"})]);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::content::{ContentPart, DocumentFormat, ImageFormat, Role, Turn};
use crate::error::HistoryError;

/// Default display name for documents serialized without one.
const DEFAULT_DOCUMENT_NAME: &str = "document";

/// Wire shape expected by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Kind-keyed blocks (`{"text": ..}`).
    #[default]
    #[serde(alias = "bedrock")]
    Converse,

    /// Type-tagged blocks (`{"type": "text", "text": ..}`).
    #[serde(alias = "invoke", alias = "alt")]
    Messages,
}

impl WireFormat {
    /// Canonical name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Converse => "converse",
            WireFormat::Messages => "messages",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "converse" | "bedrock" => Ok(WireFormat::Converse),
            "messages" | "invoke" | "alt" => Ok(WireFormat::Messages),
            other => Err(HistoryError::UnknownWireFormat(other.to_string())),
        }
    }
}

/// A turn serialized for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTurn {
    /// Speaker
    pub role: Role,

    /// Blocks in the target wire shape
    pub content: Vec<Value>,
}

// Nested payloads. Unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct BytesSource {
    bytes: String,
}

#[derive(Debug, Deserialize)]
struct ConverseImage {
    #[serde(default)]
    format: Option<String>,
    source: BytesSource,
}

#[derive(Debug, Deserialize)]
struct ConverseDocument {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    name: Option<String>,
    source: BytesSource,
}

#[derive(Debug, Deserialize)]
struct Base64Source {
    #[serde(rename = "type")]
    source_type: String,
    #[serde(default)]
    media_type: Option<String>,
    data: String,
    #[serde(default)]
    name: Option<String>,
}

/// Resolve caller input into canonical parts.
///
/// - a string becomes a single text part
/// - an object with a `content` key is unwrapped
/// - an array is classified element by element
/// - `null` yields no parts
///
/// Never fails: anything unrecognized is kept as [`ContentPart::Opaque`].
pub fn to_canonical(input: &Value) -> Vec<ContentPart> {
    match input {
        Value::Null => Vec::new(),
        Value::String(text) => vec![ContentPart::text(text.clone())],
        Value::Array(blocks) => blocks.iter().map(classify_block).collect(),
        Value::Object(map) => match map.get("content") {
            Some(inner) => to_canonical(inner),
            None => vec![classify_block(input)],
        },
        other => vec![ContentPart::opaque(other.clone())],
    }
}

/// Classify a single block from either wire variant.
pub fn classify_block(block: &Value) -> ContentPart {
    match block {
        Value::String(text) => ContentPart::text(text.clone()),
        Value::Object(map) => {
            let classified = match map.get("type").and_then(Value::as_str) {
                Some(tag) => classify_tagged(tag, map),
                None => classify_keyed(map),
            };
            classified.unwrap_or_else(|| ContentPart::opaque(block.clone()))
        }
        other => ContentPart::opaque(other.clone()),
    }
}

fn classify_tagged(tag: &str, map: &Map<String, Value>) -> Option<ContentPart> {
    match tag {
        "text" => map
            .get("text")
            .and_then(Value::as_str)
            .map(ContentPart::text),
        "image" => match map.get("source") {
            Some(source) => {
                let source = parse_base64_source(source)?;
                let format = source
                    .media_type
                    .as_deref()
                    .map(ImageFormat::from_media_type)
                    .unwrap_or_default();
                Some(ContentPart::image(format, source.data))
            }
            None => map.get("image").and_then(parse_converse_image),
        },
        "document" => match map.get("source") {
            Some(source) => {
                let source = parse_base64_source(source)?;
                let format = source
                    .media_type
                    .as_deref()
                    .map(DocumentFormat::from_media_type)
                    .unwrap_or_default();
                let name = map
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or(source.name);
                Some(ContentPart::document(format, source.data, name))
            }
            None => map.get("document").and_then(parse_converse_document),
        },
        _ => None,
    }
}

fn classify_keyed(map: &Map<String, Value>) -> Option<ContentPart> {
    if let Some(text) = map.get("text") {
        return text.as_str().map(ContentPart::text);
    }
    if let Some(image) = map.get("image") {
        return parse_converse_image(image);
    }
    if let Some(document) = map.get("document") {
        return parse_converse_document(document);
    }
    None
}

fn parse_base64_source(source: &Value) -> Option<Base64Source> {
    let source: Base64Source = serde_json::from_value(source.clone()).ok()?;
    (source.source_type == "base64").then_some(source)
}

fn parse_converse_image(image: &Value) -> Option<ContentPart> {
    let image: ConverseImage = serde_json::from_value(image.clone()).ok()?;
    let format = image
        .format
        .as_deref()
        .map(ImageFormat::from_name)
        .unwrap_or_default();
    Some(ContentPart::image(format, image.source.bytes))
}

fn parse_converse_document(document: &Value) -> Option<ContentPart> {
    let document: ConverseDocument = serde_json::from_value(document.clone()).ok()?;
    let format = document
        .format
        .as_deref()
        .map(DocumentFormat::from_name)
        .unwrap_or_default();
    Some(ContentPart::document(
        format,
        document.source.bytes,
        document.name,
    ))
}

/// Emit canonical parts in the target wire shape.
///
/// An empty slice yields an empty vector.
pub fn to_wire(parts: &[ContentPart], format: WireFormat) -> Vec<Value> {
    parts.iter().map(|part| part_to_wire(part, format)).collect()
}

fn part_to_wire(part: &ContentPart, format: WireFormat) -> Value {
    match (format, part) {
        (_, ContentPart::Opaque { raw }) => raw.clone(),

        (WireFormat::Converse, ContentPart::Text { text }) => json!({ "text": text }),
        (WireFormat::Converse, ContentPart::Image { format, data }) => json!({
            "image": {
                "format": format.as_str(),
                "source": { "bytes": data }
            }
        }),
        (WireFormat::Converse, ContentPart::Document { format, data, name }) => json!({
            "document": {
                "format": format.as_str(),
                "name": name.as_deref().unwrap_or(DEFAULT_DOCUMENT_NAME),
                "source": { "bytes": data }
            }
        }),

        (WireFormat::Messages, ContentPart::Text { text }) => json!({
            "type": "text",
            "text": text
        }),
        (WireFormat::Messages, ContentPart::Image { format, data }) => json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": format.media_type(),
                "data": data
            }
        }),
        (WireFormat::Messages, ContentPart::Document { format, data, name }) => {
            let mut block = json!({
                "type": "document",
                "source": {
                    "type": "base64",
                    "media_type": format.media_type(),
                    "data": data
                }
            });
            if let Some(name) = name {
                block["title"] = Value::String(name.clone());
            }
            block
        }
    }
}

/// Serialize a turn sequence into the target wire shape.
pub fn serialize_turns(turns: &[Turn], format: WireFormat) -> Vec<WireTurn> {
    turns
        .iter()
        .map(|turn| WireTurn {
            role: turn.role,
            content: to_wire(&turn.parts, format),
        })
        .collect()
}
