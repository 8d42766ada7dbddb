use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;

use super::{ authorized_http, post_json, structured_only, ChatClient, ChatCompletionBody, CompletionRequest };
use crate::error::{ ChatError, Result };
use crate::llm::{ BackendKind, LlmConfig };

const OLLAMA_CLOUD_URL: &str = "https://ollama.com";

/// Ollama cloud through its OpenAI-compatible route.
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

impl OllamaClient {
    pub fn new(api_key: &str, completion_model: String, base_url: Option<String>) -> Result<Self> {
        Ok(Self {
            http: authorized_http(api_key)?,
            base_url: base_url.unwrap_or_else(|| OLLAMA_CLOUD_URL.into()),
            completion_model,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.backend != BackendKind::Ollama {
            return Err(ChatError::config("Invalid config type for OllamaClient"));
        }
        Self::new(&config.api_key, config.model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let messages = structured_only(BackendKind::Ollama, request)?;
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatCompletionBody::new(&self.completion_model, messages, request);
        post_json(&self.http, &url, &body, &[]).await
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}
