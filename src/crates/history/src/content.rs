//! Canonical turn and content types.
//!
//! Every payload that enters a [`HistoryStore`](crate::HistoryStore) is
//! normalized into these types, whichever wire shape it arrived in. The wire
//! shapes only reappear at serialization time (see [`crate::normalizer`]).
//!
//! # Example
//!
//! ```rust
//! use history::content::{ContentPart, ImageFormat, Role, Turn};
//!
//! let turn = Turn::new(
//!     Role::User,
//!     vec![
//!         ContentPart::text("What is in this picture?"),
//!         ContentPart::image(ImageFormat::Png, "iVBORw0KGgo="),
//!     ],
//! );
//!
//! assert_eq!(turn.role, Role::User);
//! assert_eq!(turn.text(), "What is in this picture?");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::HistoryError;

/// Speaker of a turn.
///
/// Serializes to the lowercase names both wire variants use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "human" => Ok(Role::User),
            "assistant" | "ai" => Ok(Role::Assistant),
            other => Err(HistoryError::Config(format!("Unknown role: {}", other))),
        }
    }
}

/// Image encodings accepted by the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Fallback for anything unrecognized.
    #[default]
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Infer the format from a file extension (with or without the dot).
    ///
    /// Unknown extensions fall back to [`ImageFormat::Jpeg`].
    pub fn from_extension(ext: &str) -> Self {
        Self::from_name(ext.trim_start_matches('.'))
    }

    /// Parse a short format name such as `"png"` or `"jpg"`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "png" => ImageFormat::Png,
            "gif" => ImageFormat::Gif,
            "webp" => ImageFormat::Webp,
            _ => ImageFormat::Jpeg,
        }
    }

    /// Parse a MIME type such as `"image/png"`.
    pub fn from_media_type(media_type: &str) -> Self {
        let subtype = media_type.rsplit('/').next().unwrap_or(media_type);
        Self::from_name(subtype)
    }

    /// Short name used by the Converse wire variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    /// MIME type used by the Messages wire variant.
    pub fn media_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Document encodings accepted by the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Fallback for anything unrecognized.
    #[default]
    Txt,
    Md,
    Json,
    Csv,
    Xml,
    Yaml,
    Html,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Infer the format from a file extension (with or without the dot).
    ///
    /// Unknown extensions fall back to [`DocumentFormat::Txt`].
    pub fn from_extension(ext: &str) -> Self {
        Self::from_name(ext.trim_start_matches('.'))
    }

    /// Parse a short format name such as `"pdf"` or `"yml"`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "md" | "markdown" => DocumentFormat::Md,
            "json" => DocumentFormat::Json,
            "csv" => DocumentFormat::Csv,
            "xml" => DocumentFormat::Xml,
            "yaml" | "yml" | "x-yaml" => DocumentFormat::Yaml,
            "html" | "htm" => DocumentFormat::Html,
            "pdf" => DocumentFormat::Pdf,
            "docx" | "vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                DocumentFormat::Docx
            }
            _ => DocumentFormat::Txt,
        }
    }

    /// Parse a MIME type such as `"application/pdf"` or `"text/plain"`.
    pub fn from_media_type(media_type: &str) -> Self {
        let subtype = media_type.rsplit('/').next().unwrap_or(media_type);
        Self::from_name(subtype)
    }

    /// Short name used by the Converse wire variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Txt => "txt",
            DocumentFormat::Md => "md",
            DocumentFormat::Json => "json",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Xml => "xml",
            DocumentFormat::Yaml => "yaml",
            DocumentFormat::Html => "html",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }

    /// MIME type used by the Messages wire variant.
    pub fn media_type(&self) -> &'static str {
        match self {
            DocumentFormat::Txt => "text/plain",
            DocumentFormat::Md => "text/markdown",
            DocumentFormat::Json => "application/json",
            DocumentFormat::Csv => "text/csv",
            DocumentFormat::Xml => "application/xml",
            DocumentFormat::Yaml => "application/x-yaml",
            DocumentFormat::Html => "text/html",
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// One unit of a turn's payload.
///
/// Binary payloads keep the base64 text exactly as it was supplied; nothing in
/// this crate decodes or re-encodes it.
///
/// [`ContentPart::Opaque`] holds any block the normalizer could not classify.
/// It is serialized back verbatim so that new provider block types survive a
/// trip through the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content
        text: String,
    },

    /// Inline image.
    Image {
        /// Image encoding
        format: ImageFormat,
        /// Base64-encoded image bytes
        data: String,
    },

    /// Inline document.
    Document {
        /// Document encoding
        format: DocumentFormat,
        /// Base64-encoded document bytes
        data: String,
        /// Display name (usually the file name)
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Unrecognized block, passed through untouched.
    Opaque {
        /// The raw block
        raw: Value,
    },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from base64 data
    pub fn image(format: ImageFormat, data: impl Into<String>) -> Self {
        Self::Image {
            format,
            data: data.into(),
        }
    }

    /// Create a document part from base64 data
    pub fn document(
        format: DocumentFormat,
        data: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        Self::Document {
            format,
            data: data.into(),
            name,
        }
    }

    /// Wrap an unclassified block
    pub fn opaque(raw: Value) -> Self {
        Self::Opaque { raw }
    }

    /// Text content, if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Document { .. } => "document",
            Self::Opaque { .. } => "opaque",
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker
    pub role: Role,

    /// Ordered payload
    pub parts: Vec<ContentPart>,
}

impl Turn {
    /// Create a turn from canonical parts.
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    /// Create a single-text user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Create a single-text assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
