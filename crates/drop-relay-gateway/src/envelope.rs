//! # Upstream Envelope Construction
//!
//! Turns a normalized [`Message`] into the fixed upstream JSON shape
//! `{msgtype: <kind>, <kind>: {...}}`.

use crate::errors::GatewayError;
use crate::message::Message;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

/// Build the upstream envelope for a message.
///
/// The image kind decodes its payload here so a missing `md5` can be
/// computed over the actual bytes; a payload that does not decode is a
/// validation failure, not an upstream one.
pub fn build_envelope(message: &Message) -> Result<Value, GatewayError> {
    match message {
        Message::Text {
            content,
            mentioned_list,
            mentioned_mobile_list,
        } => Ok(json!({
            "msgtype": "text",
            "text": {
                "content": content,
                "mentioned_list": mentioned_list,
                "mentioned_mobile_list": mentioned_mobile_list,
            }
        })),

        Message::Markdown { content } => Ok(json!({
            "msgtype": "markdown",
            "markdown": { "content": content }
        })),

        Message::Image { base64, md5 } => {
            let decoded = BASE64
                .decode(base64)
                .map_err(|_| GatewayError::validation("image base64 does not decode"))?;
            let digest = match md5 {
                Some(given) => given.clone(),
                None => format!("{:x}", md5::compute(&decoded)),
            };
            Ok(json!({
                "msgtype": "image",
                "image": { "base64": base64, "md5": digest }
            }))
        }

        Message::News { articles } => Ok(json!({
            "msgtype": "news",
            "news": { "articles": articles }
        })),

        Message::File { media_id } => Ok(json!({
            "msgtype": "file",
            "file": { "media_id": media_id }
        })),

        Message::TemplateCard { card } => Ok(json!({
            "msgtype": "template_card",
            "template_card": card
        })),

        // File bytes go through the two-step dispatch; by the time an
        // envelope is built they have become a `File` with a media id.
        Message::FileUpload { .. } => Err(GatewayError::Internal {
            message: "file upload has no envelope before media upload".to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
