use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;

use super::{ authorized_http, post_json, structured_only, ChatClient, ChatCompletionBody, CompletionRequest };
use crate::error::{ ChatError, Result };
use crate::llm::{ BackendKind, LlmConfig };

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const APP_TITLE: &str = "chatline";

pub struct OpenRouterClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, model: String, base_url: Option<String>) -> Result<Self> {
        Ok(Self {
            http: authorized_http(api_key)?,
            model,
            base_url: base_url.unwrap_or_else(|| OPENROUTER_URL.to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.backend != BackendKind::OpenRouter {
            return Err(ChatError::config("Invalid config type for OpenRouterClient"));
        }
        Self::new(&config.api_key, config.model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let messages = structured_only(BackendKind::OpenRouter, request)?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatCompletionBody::new(&self.model, messages, request);
        post_json(&self.http, &url, &body, &[("X-Title", APP_TITLE)]).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}
