use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Thin client for a llama-server style `/completion` endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    stream: bool,
    n_predict: usize,
    temperature: f32,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

impl CompletionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout) // network-level bound, on top of the engine's
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = CompletionRequest {
            prompt,
            stream: false,
            n_predict: 64,
            temperature: 0.4,
            stop: vec!["User:".to_string(), "System:".to_string()],
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("LLM server error: {}", response.status()));
        }

        let body: CompletionResponse = response.json().await?;
        Ok(body.content.trim().to_string())
    }
}
