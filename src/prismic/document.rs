//! Prismic document model
//!
//! Field decoding is lenient: a malformed content block or rich-text node
//! decodes to an empty value instead of failing the whole document.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A document as returned by the content source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDocument {
    /// Opaque document id (used by the `after` cursor)
    #[serde(default, deserialize_with = "flexible_text")]
    pub id: String,

    /// Human readable identifier used in URLs
    #[serde(default, deserialize_with = "flexible_text")]
    pub uid: String,

    /// Custom type name
    #[serde(rename = "type", default, deserialize_with = "flexible_text")]
    pub doc_type: String,

    #[serde(default, with = "prismic_date")]
    pub first_publication_date: Option<DateTime<Utc>>,

    #[serde(default, with = "prismic_date")]
    pub last_publication_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient")]
    pub data: PostFields,
}

impl ContentDocument {
    /// Create a document with the given identity and empty fields
    pub fn new(id: &str, uid: &str, doc_type: &str) -> Self {
        Self {
            id: id.to_string(),
            uid: uid.to_string(),
            doc_type: doc_type.to_string(),
            first_publication_date: None,
            last_publication_date: None,
            data: PostFields::default(),
        }
    }
}

/// Fields of the `posts` custom type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFields {
    #[serde(deserialize_with = "flexible_text")]
    pub title: String,

    #[serde(deserialize_with = "flexible_opt_text")]
    pub subtitle: Option<String>,

    #[serde(deserialize_with = "flexible_text")]
    pub author: String,

    #[serde(deserialize_with = "lenient")]
    pub banner: Option<Banner>,

    #[serde(deserialize_with = "lenient_seq")]
    pub content: Vec<ContentBlock>,
}

impl PostFields {
    /// Banner URL, if the image field is filled
    pub fn banner_url(&self) -> Option<&str> {
        self.banner
            .as_ref()
            .and_then(|b| b.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Image field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// One heading + body unit of a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBlock {
    #[serde(deserialize_with = "flexible_text")]
    pub heading: String,

    #[serde(deserialize_with = "lenient_seq")]
    pub body: Vec<RichTextNode>,
}

/// Structured-text node (paragraph, list item, image, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(deserialize_with = "flexible_text")]
    pub text: String,

    #[serde(deserialize_with = "lenient_seq")]
    pub spans: Vec<Span>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

impl RichTextNode {
    /// Create a text node without spans
    pub fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            ..Self::default()
        }
    }

    /// Create a paragraph node
    pub fn paragraph(text: &str) -> Self {
        Self::new(NodeKind::Paragraph, text)
    }
}

/// Rich-text node types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other, rename = "unknown")]
    Unknown,
}

/// Inline formatting range over a node's text
///
/// `start`/`end` are UTF-16 code unit offsets, as produced by the Prismic
/// editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Span {
    pub fn new(start: usize, end: usize, kind: SpanKind) -> Self {
        Self {
            start,
            end,
            kind,
            data: None,
        }
    }

    /// Link target of a hyperlink span
    ///
    /// Web links carry a `url`; document links only carry the target's
    /// `uid`, which maps to a post path.
    pub fn href(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        if let Some(url) = data.get("url").and_then(Value::as_str) {
            return Some(url.to_string());
        }
        data.get("uid")
            .and_then(Value::as_str)
            .map(|uid| format!("/post/{}/", uid))
    }

    /// Name of a label span
    pub fn label(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("label"))
            .and_then(Value::as_str)
    }
}

/// Inline span types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[default]
    #[serde(other)]
    Unknown,
}

/// oEmbed payload of an embed node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub html: Option<String>,
    pub embed_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub provider_name: Option<String>,
}

/// One page of a search response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginatedListing {
    pub page: usize,
    pub results_per_page: usize,
    pub total_results_size: usize,
    pub total_pages: usize,
    /// Opaque cursor for the following page; absent on the last page
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<ContentDocument>,
}

impl PaginatedListing {
    /// Next-page cursor, treating an empty string as the end of the listing
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|t| !t.is_empty())
    }
}

/// Parse a Prismic timestamp (`2021-03-25T19:25:28+0000` or RFC 3339)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

mod prismic_date {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.is_empty() => super::parse_timestamp(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", s))),
            _ => Ok(None),
        }
    }
}

/// Project a JSON value onto plain text
///
/// Strings pass through; rich-text arrays (title fields modelled as
/// structured text) are joined; anything else is empty.
fn text_from_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn flexible_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_from_value(Value::deserialize(deserializer)?))
}

fn flexible_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = text_from_value(Value::deserialize(deserializer)?);
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| T::deserialize(item).unwrap_or_default())
            .collect()),
        _ => Ok(Vec::new()),
    }
}
