//! OpenAI-compatible chat completions client
//!
//! Uses `POST {api_url}/chat/completions` with `stream: true`. The server
//! answers with server-sent events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hi"}}]}
//! data: [DONE]
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::{LlmClient, LlmError, LlmMessage, TokenStream};
use crate::config::OpenAiConfig;

/// One decoded server-sent event line
#[derive(Debug, PartialEq)]
enum SseLine {
    Content(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine, LlmError> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        // Blank keep-alives, comments, `event:` lines
        return Ok(SseLine::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let data: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| LlmError::Stream(format!("invalid chunk {payload:?}: {e}")))?;

    if let Some(message) = data.get("error").and_then(|e| e.get("message")) {
        return Err(LlmError::Stream(
            message.as_str().unwrap_or("unknown upstream error").to_string(),
        ));
    }

    match data
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
    {
        Some(content) if !content.is_empty() => Ok(SseLine::Content(content.to_string())),
        _ => Ok(SseLine::Skip),
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model_name.clone(),
            temperature: config.temperature.clamp(0.0, 2.0),
            max_tokens: config.max_tokens,
            http_client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_url)
    }

    fn request_body(&self, messages: &[LlmMessage]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_stream(&self, messages: Vec<LlmMessage>) -> Result<TokenStream, LlmError> {
        let mut request = self
            .http_client
            .post(self.completions_url())
            .json(&self.request_body(&messages));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let (tx, rx) = mpsc::channel(100);
        let mut stream = response.bytes_stream();

        // Dropping the receiver ends this task and closes the upstream connection
        tokio::spawn(async move {
            // Raw bytes: a chunk boundary may split a multi-byte character
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::Http(e))).await;
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    match parse_sse_line(&String::from_utf8_lossy(&line)) {
                        Ok(SseLine::Content(token)) => {
                            if tx.send(Ok(token)).await.is_err() {
                                tracing::debug!("Token receiver dropped, closing upstream stream");
                                return;
                            }
                        }
                        Ok(SseLine::Done) => return,
                        Ok(SseLine::Skip) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // Servers may omit the trailing newline on the last event
            if let Ok(SseLine::Content(token)) = parse_sse_line(&String::from_utf8_lossy(&buffer)) {
                let _ = tx.send(Ok(token)).await;
            }
        });

        Ok(rx)
    }
}
