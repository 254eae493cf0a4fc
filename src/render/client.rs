use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::app_config::RenderConfig;
use crate::errors::{ProviderError, RenderError};

/// Lifecycle of a render job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Planned,
    Waiting,
    Transcribing,
    Rendering,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RenderStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A render job as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub id: String,
    pub status: RenderStatus,

    /// Finished video, once succeeded
    #[serde(default)]
    pub url: Option<String>,

    /// Preview image, once succeeded
    #[serde(default)]
    pub snapshot_url: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,
}

/// A render from a template stored in the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRender {
    pub template_id: String,

    /// Element id to replacement value
    #[serde(default)]
    pub modifications: Map<String, Value>,
}

/// Client for the render service HTTP API
pub struct RenderClient {
    /// HTTP client for API requests
    client: Client,
    /// Renders endpoint URL
    endpoint: String,
    /// API key sent as a Bearer token
    api_key: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl RenderClient {
    /// Create a client from the render configuration
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        if config.api_key.trim().is_empty() {
            return Err(RenderError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        })
    }

    /// Submit a render from a full scene description
    pub async fn submit_source(&self, source: &Value) -> Result<Vec<RenderJob>, RenderError> {
        self.submit(&json!({ "source": source })).await
    }

    /// Submit a render from a stored template
    pub async fn submit_template(&self, template: &TemplateRender) -> Result<Vec<RenderJob>, RenderError> {
        self.submit(template).await
    }

    async fn submit<T: Serialize + ?Sized>(&self, body: &T) -> Result<Vec<RenderJob>, RenderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(ProviderError::from)?;

        let body: Value = Self::read_json(response).await?;

        // The service answers with an array of jobs; tolerate a bare job
        let jobs = if body.is_array() {
            serde_json::from_value::<Vec<RenderJob>>(body)
        } else {
            serde_json::from_value::<RenderJob>(body).map(|job| vec![job])
        }
        .map_err(|e| ProviderError::ParseError(format!("Failed to parse render jobs: {}", e)))?;

        if jobs.is_empty() {
            return Err(ProviderError::ParseError("Render API returned no jobs".to_string()).into());
        }

        for job in &jobs {
            info!("Render {} submitted ({:?})", job.id, job.status);
        }
        Ok(jobs)
    }

    /// Fetch the current state of a render
    pub async fn status(&self, id: &str) -> Result<RenderJob, RenderError> {
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint, id))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(ProviderError::from)?;

        let body = Self::read_json(response).await?;
        serde_json::from_value(body)
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse render status: {}", e)).into())
    }

    /// Poll a render until it succeeds, fails or the polling window closes
    pub async fn wait_for(&self, id: &str) -> Result<RenderJob, RenderError> {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));

        let started = Instant::now();
        let result = loop {
            let job = match self.status(id).await {
                Ok(job) => job,
                Err(e) => break Err(e),
            };
            spinner.set_message(format!("Render {}: {:?}", id, job.status));
            debug!("Render {} status: {:?}", id, job.status);

            match job.status {
                RenderStatus::Succeeded => break Ok(job),
                RenderStatus::Failed => {
                    break Err(RenderError::Failed {
                        id: id.to_string(),
                        message: job.error_message.unwrap_or_else(|| "no error message".to_string()),
                    });
                }
                _ => {}
            }

            if started.elapsed() + self.poll_interval > self.poll_timeout {
                break Err(RenderError::Timeout {
                    id: id.to_string(),
                    secs: self.poll_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        };

        spinner.finish_and_clear();
        match &result {
            Ok(job) => info!("Render {} completed: {}", id, job.url.as_deref().unwrap_or("-")),
            Err(e) => error!("{}", e),
        }
        result
    }

    /// Download a finished file, returning the number of bytes written
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, RenderError> {
        let response = self.client.get(url).send().await.map_err(ProviderError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), error_text).into());
        }

        let bytes = response.bytes().await.map_err(ProviderError::from)?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        info!("Saved {} ({} bytes)", dest.display(), bytes.len());
        Ok(bytes.len() as u64)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, RenderError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Render API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text).into());
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse render API response: {}", e)).into())
    }
}
