//! Typed client for the loopback embedding service.
//!
//! The service speaks a two-endpoint JSON protocol: `POST /embed` with
//! `{"texts": [...]}` and `GET /health`. An unreachable service is
//! [`MemoryError::EmbedderUnavailable`]; a reachable one answering with a
//! non-2xx status or an unexpected shape is
//! [`MemoryError::EmbedderProtocol`]. The client holds no cache.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, Result};

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
    dimensions: usize,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    #[allow(dead_code)]
    model: String,
    dimensions: usize,
}

pub struct HttpEmbedder {
    base_url: String,
    dimensions: usize,
    client: reqwest::blocking::Client,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .map_err(|e| MemoryError::EmbedderUnavailable(format!("client build: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dimensions: config.dimensions,
            client,
        })
    }
}

impl Embedder for HttpEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embed", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&EmbedRequest { texts })
            .send()
            .map_err(|e| MemoryError::EmbedderUnavailable(format!("{url}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(MemoryError::EmbedderProtocol(format!(
                "embed returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = resp
            .json()
            .map_err(|e| MemoryError::EmbedderProtocol(format!("embed response parse: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(MemoryError::EmbedderProtocol(format!(
                "sent {} texts, got {} embeddings",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        if parsed.dimensions != self.dimensions
            || parsed.embeddings.iter().any(|e| e.len() != self.dimensions)
        {
            return Err(MemoryError::EmbedderProtocol(format!(
                "expected {}-dimensional vectors, got {}",
                self.dimensions, parsed.dimensions
            )));
        }

        debug!(count = texts.len(), "embedded batch");
        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Probe `GET /health` with a hard 2 s deadline. Any failure — network,
    /// status, schema, or a dimension that disagrees with configuration —
    /// reads as unavailable.
    fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let resp = match self.client.get(&url).timeout(HEALTH_TIMEOUT).send() {
            Ok(r) => r,
            Err(_) => return false,
        };
        if !resp.status().is_success() {
            return false;
        }
        match resp.json::<HealthResponse>() {
            Ok(h) => h.status == "ok" && h.dimensions == self.dimensions,
            Err(_) => false,
        }
    }
}
