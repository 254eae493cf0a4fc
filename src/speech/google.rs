use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::{debug, error};
use reqwest::Client;
use url::Url;

use super::SpeechSynthesizer;
use crate::app_config::SpeechConfig;
use crate::captions::{is_valid_caption, split_sentence, SplitState};
use crate::errors::ProviderError;

/// Longest text the translate endpoint accepts in one request
pub const MAX_REQUEST_CHARS: usize = 100;

/// Client for the Google Translate text-to-speech endpoint
pub struct GoogleTranslateTts {
    /// HTTP client for making requests
    client: Client,
    /// Endpoint URL
    endpoint: String,
}

impl GoogleTranslateTts {
    /// Create a new client from the speech configuration
    pub fn new(config: &SpeechConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Split text into request-sized chunks.
    ///
    /// Long text is broken with the caption splitter so chunks end at
    /// commas or spaces rather than mid-word. Chunks with nothing to speak
    /// are dropped.
    pub fn request_chunks(text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= MAX_REQUEST_CHARS {
            return vec![text.to_string()];
        }

        split_sentence(text, MAX_REQUEST_CHARS, SplitState::Unprocessed)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| is_valid_caption(chunk))
            .collect()
    }

    /// Build the request URL for one chunk
    pub fn request_url(&self, chunk: &str, language: &str, idx: usize, total: usize) -> Result<Url, ProviderError> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", language),
                ("client", "tw-ob"),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid speech endpoint '{}': {}", self.endpoint, e)))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, ProviderError> {
        let chunks = Self::request_chunks(text);
        if chunks.is_empty() {
            return Err(ProviderError::RequestFailed("Nothing to synthesize: text is empty".to_string()));
        }

        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.request_url(chunk, language, idx, chunks.len())?;
            debug!("Requesting speech chunk {}/{} ({} chars)", idx + 1, chunks.len(), chunk.chars().count());

            let response = self.client.get(url).send().await?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to get error response text".to_string());
                error!("Speech API error ({}): {}", status, error_text);
                return Err(ProviderError::from_status(status.as_u16(), error_text));
            }

            let body = response.bytes().await?;
            if body.is_empty() {
                return Err(ProviderError::ParseError(format!(
                    "Speech API returned no audio for chunk {}",
                    idx + 1
                )));
            }
            audio.extend_from_slice(&body);
        }

        Ok(audio.freeze())
    }
}
