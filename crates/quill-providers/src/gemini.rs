//! Gemini embedding client.
//!
//! Talks to the Google Generative Language API with an explicit
//! `outputDimensionality`, so every returned vector is checked against the
//! configured dimensionality — a mismatch is an error, never a silent
//! truncate or pad. Batches go through `:batchEmbedContents` in one request.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use quill_core::config::EmbeddingConfig;
use quill_core::error::{QuillError, Result};
use quill_core::traits::Embedder;

pub struct GeminiEmbedder {
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuillError::Http(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            client,
        })
    }

    /// The embedding model is sensitive to raw newlines.
    fn normalize(text: &str) -> String {
        text.replace('\n', " ")
    }

    fn embed_request(&self, text: &str) -> Value {
        json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [ { "text": Self::normalize(text) } ] },
            "outputDimensionality": self.dimensions,
        })
    }

    /// Batch body: one `embed_request` entry per input, in input order, so
    /// a batched text is encoded exactly as it would be on its own.
    fn batch_request(&self, texts: &[String]) -> Value {
        let requests: Vec<Value> =
            texts.iter().map(|t| self.embed_request(t)).collect();
        json!({ "requests": requests })
    }

    fn check_dimensions(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.dimensions {
            return Err(QuillError::Embedding(format!(
                "provider returned {} dims, expected {}",
                values.len(),
                self.dimensions
            )));
        }
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!(
            "{}/models/{}:{}?key={}",
            self.endpoint, self.model, path, self.api_key
        );
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| QuillError::Embedding(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuillError::Embedding(format!(
                "API error {status}: {text}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| QuillError::Embedding(format!("invalid response: {e}")))
    }
}

fn extract_values(embedding: &Value) -> Result<Vec<f32>> {
    embedding["values"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect()
        })
        .ok_or_else(|| QuillError::Embedding("no values in response".into()))
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = self.embed_request(text);
        let json = self.post("embedContent", &body).await?;
        let values = extract_values(&json["embedding"])?;
        self.check_dimensions(&values)?;
        Ok(values)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let body = self.batch_request(texts);
        let json = self.post("batchEmbedContents", &body).await?;

        let embeddings = json["embeddings"]
            .as_array()
            .ok_or_else(|| QuillError::Embedding("no embeddings in response".into()))?;
        if embeddings.len() != texts.len() {
            return Err(QuillError::Embedding(format!(
                "batch returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        let mut out = Vec::with_capacity(embeddings.len());
        for e in embeddings {
            let values = extract_values(e)?;
            self.check_dimensions(&values)?;
            out.push(values);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
