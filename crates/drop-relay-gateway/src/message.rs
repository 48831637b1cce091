//! # Message Normalization
//!
//! Reduces the three accepted request shapes — structured JSON, raw
//! text, multipart form — to one typed message descriptor before the
//! payload builder sees it.

use crate::errors::GatewayError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Articles beyond this count are dropped from a news message.
pub const MAX_ARTICLES: usize = 8;

/// Uploaded media must be strictly larger than this.
pub const MIN_MEDIA_BYTES: u64 = 5;

/// Uploaded media must not exceed this.
pub const MAX_MEDIA_BYTES: u64 = 20 * 1024 * 1024;

/// One news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picurl: Option<String>,
}

/// Typed message descriptor produced by normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text {
        content: String,
        mentioned_list: Vec<String>,
        mentioned_mobile_list: Vec<String>,
    },
    Markdown {
        content: String,
    },
    Image {
        base64: String,
        /// Hex MD5 of the decoded bytes; computed during envelope
        /// construction when the client omitted it.
        md5: Option<String>,
    },
    News {
        articles: Vec<Article>,
    },
    /// File message referencing an already-uploaded media id.
    File {
        media_id: String,
    },
    /// File bytes that still need the two-step upload+send dispatch.
    FileUpload {
        filename: String,
        content_type: String,
        data: Bytes,
    },
    /// Template card passed through verbatim.
    TemplateCard {
        card: Value,
    },
}

/// Normalize a structured JSON body.
///
/// The `type` field selects the message kind (`text` when absent); each
/// kind validates its own required fields.
pub fn from_json(value: &Value) -> Result<Message, GatewayError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("text");

    match kind {
        "text" => Ok(Message::Text {
            content: required_content(value)?,
            mentioned_list: string_list(value.get("mentioned_list")),
            mentioned_mobile_list: string_list(value.get("mentioned_mobile_list")),
        }),
        "markdown" => Ok(Message::Markdown {
            content: required_content(value)?,
        }),
        "image" => {
            let base64 = value
                .get("base64")
                .and_then(Value::as_str)
                .filter(|b| !b.is_empty())
                .ok_or_else(|| GatewayError::validation("image requires base64"))?;
            let md5 = value
                .get("md5")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            Ok(Message::Image {
                base64: base64.to_string(),
                md5,
            })
        }
        "news" | "link" => news_from_json(value),
        "file" => {
            let media_id = value
                .get("media_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| GatewayError::validation("file requires media_id"))?;
            Ok(Message::File {
                media_id: media_id.to_string(),
            })
        }
        "template_card" => {
            let card = value
                .get("template_card")
                .filter(|card| card.is_object())
                .ok_or_else(|| {
                    GatewayError::validation("template_card requires a template_card object")
                })?;
            Ok(Message::TemplateCard { card: card.clone() })
        }
        other => Err(GatewayError::Validation {
            message: format!("unknown message type: {other}"),
        }),
    }
}

/// Normalize a raw text body; `kind` comes from the query string.
pub fn from_text(body: &str, kind: Option<&str>) -> Result<Message, GatewayError> {
    match kind {
        Some("markdown") => Ok(Message::Markdown {
            content: body.to_string(),
        }),
        Some("text") | None => Ok(Message::Text {
            content: body.to_string(),
            mentioned_list: Vec::new(),
            mentioned_mobile_list: Vec::new(),
        }),
        Some(other) => Err(GatewayError::Validation {
            message: format!("unsupported type for raw text: {other}"),
        }),
    }
}

/// Normalize an uploaded file into the image channel: the bytes travel
/// base64-encoded in the envelope instead of through the media upload.
pub fn image_from_upload(data: &[u8]) -> Message {
    Message::Image {
        base64: BASE64.encode(data),
        md5: None,
    }
}

/// Normalize an uploaded file into the two-step file channel, enforcing
/// the upstream's media size bounds.
pub fn file_from_upload(
    filename: String,
    content_type: String,
    data: Bytes,
) -> Result<Message, GatewayError> {
    let size = data.len() as u64;
    if size <= MIN_MEDIA_BYTES {
        return Err(GatewayError::Validation {
            message: format!("media too small: {size} bytes"),
        });
    }
    if size > MAX_MEDIA_BYTES {
        return Err(GatewayError::Validation {
            message: format!("media too large: {size} bytes (max {MAX_MEDIA_BYTES})"),
        });
    }
    Ok(Message::FileUpload {
        filename,
        content_type,
        data,
    })
}

/// News shapes: an `articles` array, or a single `{title, url, …}`
/// convenience form.
fn news_from_json(value: &Value) -> Result<Message, GatewayError> {
    if let Some(raw_articles) = value.get("articles").and_then(Value::as_array) {
        let mut articles: Vec<Article> = raw_articles
            .iter()
            .filter_map(|entry| {
                let title = entry.get("title").and_then(Value::as_str)?;
                let url = entry.get("url").and_then(Value::as_str)?;
                if title.is_empty() || url.is_empty() {
                    return None;
                }
                Some(Article {
                    title: title.to_string(),
                    url: url.to_string(),
                    description: entry
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    picurl: entry.get("picurl").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect();
        if articles.is_empty() {
            return Err(GatewayError::validation(
                "news requires at least one article with title and url",
            ));
        }
        articles.truncate(MAX_ARTICLES);
        return Ok(Message::News { articles });
    }

    let title = value.get("title").and_then(Value::as_str).filter(|t| !t.is_empty());
    let url = value.get("url").and_then(Value::as_str).filter(|u| !u.is_empty());
    match (title, url) {
        (Some(title), Some(url)) => Ok(Message::News {
            articles: vec![Article {
                title: title.to_string(),
                url: url.to_string(),
                description: value
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                picurl: value.get("picurl").and_then(Value::as_str).map(str::to_string),
            }],
        }),
        _ => Err(GatewayError::validation("news requires title and url")),
    }
}

/// `content` with scalar coercion: numbers and booleans become their
/// string rendering, everything else is rejected.
fn required_content(value: &Value) -> Result<String, GatewayError> {
    match value.get("content") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(GatewayError::validation("content required")),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
