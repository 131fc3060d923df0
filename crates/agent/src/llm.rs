use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use sachet_core::config::{LlmConfig, LlmProvider};

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Error bodies are cut to this many characters before they reach an error message.
const ERROR_BODY_LIMIT: usize = 300;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(config)?),
        LlmProvider::Ollama => Arc::new(OllamaClient::new(config)?),
    };
    Ok(client)
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .context("failed to build HTTP client")
}

fn base_url_or(config: &LlmConfig, default: &str) -> String {
    config.base_url.as_deref().unwrap_or(default).trim_end_matches('/').to_string()
}

async fn read_json(response: reqwest::Response, label: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        bail!("{label} returned HTTP {}: {snippet}", status.as_u16());
    }

    response.json::<Value>().await.with_context(|| format!("{label} returned a non-JSON body"))
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: base_url_or(config, GEMINI_DEFAULT_BASE_URL),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Asks for a JSON reply so the text can be parsed directly.
pub fn gemini_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

pub fn extract_gemini_text(body: &Value) -> Result<String> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("gemini response has no candidate content"))?;

    let text: String =
        parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();
    if text.trim().is_empty() {
        bail!("gemini response candidate contained no text");
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| anyhow!("gemini api key is not configured (set SACHET_LLM_API_KEY)"))?;

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&gemini_request_body(prompt))
            .send()
            .await
            .context("gemini request failed")?;

        let body = read_json(response, "gemini").await?;
        extract_gemini_text(&body)
    }
}

pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: base_url_or(config, OLLAMA_DEFAULT_BASE_URL),
            model: config.model.clone(),
        })
    }
}

pub fn ollama_request_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "prompt": prompt,
        "stream": false,
        "format": "json"
    })
}

pub fn extract_ollama_text(body: &Value) -> Result<String> {
    body.get("response")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("ollama response has no `response` text"))
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&ollama_request_body(&self.model, prompt))
            .send()
            .await
            .context("ollama request failed")?;

        let body = read_json(response, "ollama").await?;
        extract_ollama_text(&body)
    }
}
