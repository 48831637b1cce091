//! # Upstream Dispatcher
//!
//! Sends envelopes to the chat webhook upstream and performs the
//! two-step upload+send for file messages.
//!
//! Upstream failures are data, not errors: every leg's HTTP status and
//! `errcode`/`errmsg` land in the dispatch report so the caller can see
//! exactly which leg failed. Success for a leg means HTTP 2xx and
//! `errcode == 0` when an `errcode` is present at all.

use crate::config::GatewayConfig;
use crate::envelope::build_envelope;
use crate::errors::GatewayError;
use crate::message::Message;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of one upstream HTTP call.
#[derive(Debug, Clone, Default)]
pub struct LegOutcome {
    /// HTTP status, absent on transport failure.
    pub status: Option<u16>,
    pub errcode: Option<i64>,
    pub errmsg: Option<String>,
}

impl LegOutcome {
    /// HTTP 2xx and a zero (or absent) errcode.
    pub fn ok(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
            && self.errcode.unwrap_or(0) == 0
    }
}

/// Structured dispatch result returned to the caller.
///
/// Single-step sends fill only the top-level fields; the two-step file
/// path additionally reports both legs.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errcode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_errcode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_errmsg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_errcode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_errmsg: Option<String>,
}

impl DispatchReport {
    fn single(send: LegOutcome) -> Self {
        Self {
            ok: send.ok(),
            upstream_status: send.status,
            errcode: send.errcode,
            errmsg: send.errmsg,
            media_id: None,
            upload_status: None,
            upload_errcode: None,
            upload_errmsg: None,
            send_status: None,
            send_errcode: None,
            send_errmsg: None,
        }
    }

    fn two_step(media_id: Option<String>, upload: LegOutcome, send: Option<LegOutcome>) -> Self {
        let final_leg = send.clone().unwrap_or_else(|| upload.clone());
        Self {
            ok: upload.ok() && send.as_ref().map(LegOutcome::ok).unwrap_or(false),
            upstream_status: final_leg.status,
            errcode: final_leg.errcode,
            errmsg: final_leg.errmsg,
            media_id,
            upload_status: upload.status,
            upload_errcode: upload.errcode,
            upload_errmsg: upload.errmsg,
            send_status: send.as_ref().and_then(|leg| leg.status),
            send_errcode: send.as_ref().and_then(|leg| leg.errcode),
            send_errmsg: send.and_then(|leg| leg.errmsg),
        }
    }
}

/// Build the multipart body for the upstream media upload.
///
/// The body is assembled exactly once into a sized buffer so the
/// request carries an accurate `Content-Length`; the upstream rejects
/// chunked uploads. One part, field name `media`, CRLF separators,
/// terminating `--<boundary>--`.
pub fn build_media_form(filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("----DropRelayForm{}", hex::encode(rand::random::<[u8; 8]>()));
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"media\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (boundary, body)
}

/// Upstream dispatcher.
pub struct Dispatcher {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl Dispatcher {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Dispatch a normalized message: one-step send, or upload+send for
    /// file bytes.
    pub async fn dispatch(&self, message: Message) -> Result<DispatchReport, GatewayError> {
        match message {
            Message::FileUpload {
                filename,
                content_type,
                data,
            } => {
                let (media_id, upload) = self.upload_media(&filename, &content_type, &data).await;
                match media_id {
                    Some(media_id) if upload.ok() => {
                        let envelope = build_envelope(&Message::File {
                            media_id: media_id.clone(),
                        })?;
                        let send = self.send_envelope(&envelope).await;
                        Ok(DispatchReport::two_step(Some(media_id), upload, Some(send)))
                    }
                    _ => {
                        warn!(
                            status = ?upload.status,
                            errcode = ?upload.errcode,
                            "media upload leg failed"
                        );
                        Ok(DispatchReport::two_step(None, upload, None))
                    }
                }
            }
            other => {
                let envelope = build_envelope(&other)?;
                let send = self.send_envelope(&envelope).await;
                Ok(DispatchReport::single(send))
            }
        }
    }

    /// POST the envelope to the send endpoint.
    async fn send_envelope(&self, envelope: &Value) -> LegOutcome {
        debug!(msgtype = %envelope["msgtype"], "sending upstream envelope");
        let response = self.client.post(&self.config.send_url).json(envelope).send().await;
        Self::read_leg(response).await.1
    }

    /// POST file bytes to the upload endpoint; returns the media id on
    /// success.
    async fn upload_media(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> (Option<String>, LegOutcome) {
        let (boundary, body) = build_media_form(filename, content_type, data);
        let response = self
            .client
            .post(&self.config.upload_url)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await;
        Self::read_leg(response).await
    }

    /// Reduce an upstream response to its leg outcome, pulling
    /// `media_id` out when present.
    async fn read_leg(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> (Option<String>, LegOutcome) {
        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let body: Value = response.json().await.unwrap_or(Value::Null);
                let outcome = LegOutcome {
                    status: Some(status),
                    errcode: body.get("errcode").and_then(Value::as_i64),
                    errmsg: body
                        .get("errmsg")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                };
                let media_id = body
                    .get("media_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (media_id, outcome)
            }
            Err(err) => (
                None,
                LegOutcome {
                    status: None,
                    errcode: None,
                    errmsg: Some(err.to_string()),
                },
            ),
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
