pub mod huggingface;
pub mod ollama;
pub mod openrouter;

use async_trait::async_trait;
use log::{ debug, error, warn };
use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{ BackendKind, LlmConfig };
use self::huggingface::HuggingFaceClient;
use self::ollama::OllamaClient;
use self::openrouter::OpenRouterClient;
use crate::error::{ ChatError, Result, TransportError };
use crate::models::chat::Message;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Structured(Vec<Message>),
    Flat(String),
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: Prompt,
    pub params: GenerationParams,
    pub stop: Vec<String>,
}

/// One hosted inference endpoint. Implementations return the decoded JSON
/// body untouched; locating the text in it is left to the caller.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;

    /// URL the given request is posted to.
    fn endpoint(&self, _request: &CompletionRequest) -> String {
        self.get_base_url()
    }
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>> {
    let client: Arc<dyn ChatClient> = match config.backend {
        BackendKind::HuggingFace => {
            let specific_client = HuggingFaceClient::from_config(config)?;
            Arc::new(specific_client)
        }
        BackendKind::OpenRouter => {
            let specific_client = OpenRouterClient::from_config(config)?;
            Arc::new(specific_client)
        }
        BackendKind::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) fn authorized_http(api_key: &str) -> Result<HttpClient> {
    if api_key.trim().is_empty() {
        return Err(ChatError::config("API key is required"));
    }
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
            ChatError::config(format!("Invalid API key format: {}", e))
        )?
    );

    HttpClient::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| ChatError::config(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) async fn post_json(
    http: &HttpClient,
    url: &str,
    payload: &(impl Serialize + Sync),
    extra_headers: &[(&str, &str)]
) -> Result<Value> {
    debug!("POST {}", url);
    let mut req = http.post(url).json(payload);
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read error body from {}: {}", url, e);
                String::new()
            }
        };
        error!("{} returned {}: {}", url, status, body);
        return Err(
            (TransportError::Status {
                status: status.as_u16(),
                body,
            }).into()
        );
    }

    let text = resp.text().await?;
    // Some endpoints answer with bare text rather than JSON.
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Chat-completions body shared by the OpenAI-compatible routes.
#[derive(Serialize)]
pub(crate) struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "no_stops")]
    pub stop: &'a [String],
    pub stream: bool,
}

impl<'a> ChatCompletionBody<'a> {
    pub fn new(model: &'a str, messages: &'a [Message], request: &'a CompletionRequest) -> Self {
        Self {
            model,
            messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            stop: &request.stop,
            stream: false,
        }
    }
}

pub(crate) fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

pub(crate) fn structured_only(backend: BackendKind, request: &CompletionRequest) -> Result<&[Message]> {
    match &request.prompt {
        Prompt::Structured(messages) => Ok(messages),
        Prompt::Flat(_) =>
            Err(ChatError::config(format!("{} only accepts structured message lists", backend))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_requires_key() {
        let config = LlmConfig {
            backend: BackendKind::OpenRouter,
            api_key: "  ".to_string(),
            model: "some/model".to_string(),
            base_url: None,
        };
        assert!(matches!(new_client(&config), Err(ChatError::Configuration(_))));
    }

    #[test]
    fn test_chat_body_omits_empty_stop() {
        let messages = vec![Message::user("hi")];
        let request = CompletionRequest {
            prompt: Prompt::Structured(messages.clone()),
            params: GenerationParams::default(),
            stop: Vec::new(),
        };
        let body = serde_json::to_value(ChatCompletionBody::new("m", &messages, &request)).unwrap();
        assert!(body.get("stop").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_structured_only_rejects_flat() {
        let request = CompletionRequest {
            prompt: Prompt::Flat("<|assistant|>".to_string()),
            params: GenerationParams::default(),
            stop: Vec::new(),
        };
        assert!(structured_only(BackendKind::Ollama, &request).is_err());
    }
}
