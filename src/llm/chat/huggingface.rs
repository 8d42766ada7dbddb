use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

use super::{ authorized_http, post_json, ChatClient, ChatCompletionBody, CompletionRequest, Prompt };
use crate::error::{ ChatError, Result };
use crate::llm::{ BackendKind, LlmConfig };

const INFERENCE_API_URL: &str = "https://api-inference.huggingface.co";
const ROUTER_URL: &str = "https://router.huggingface.co";

/// Hugging Face hosted inference. Flat prompts go to the text-generation
/// route of the model, message lists to the chat-completions router.
pub struct HuggingFaceClient {
    http: HttpClient,
    model: String,
    base_url: Option<String>,
}

#[derive(Serialize)]
struct TextGenerationRequest<'a> {
    inputs: &'a str,
    parameters: TextGenerationParameters<'a>,
}

#[derive(Serialize)]
struct TextGenerationParameters<'a> {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    return_full_text: bool,
    #[serde(skip_serializing_if = "super::no_stops")]
    stop: &'a [String],
}

impl HuggingFaceClient {
    pub fn new(api_key: &str, model: String, base_url: Option<String>) -> Result<Self> {
        Ok(Self {
            http: authorized_http(api_key)?,
            model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.backend != BackendKind::HuggingFace {
            return Err(ChatError::config("Invalid config type for HuggingFaceClient"));
        }
        Self::new(&config.api_key, config.model.clone(), config.base_url.clone())
    }

    fn text_generation_url(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(INFERENCE_API_URL);
        format!("{}/models/{}", base.trim_end_matches('/'), self.model)
    }

    fn chat_url(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(ROUTER_URL);
        format!("{}/v1/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatClient for HuggingFaceClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        match &request.prompt {
            Prompt::Flat(inputs) => {
                let body = TextGenerationRequest {
                    inputs,
                    parameters: TextGenerationParameters {
                        max_new_tokens: request.params.max_tokens,
                        temperature: request.params.temperature,
                        top_p: request.params.top_p,
                        return_full_text: false,
                        stop: &request.stop,
                    },
                };
                post_json(&self.http, &self.endpoint(request), &body, &[]).await
            }
            Prompt::Structured(messages) => {
                let body = ChatCompletionBody::new(&self.model, messages, request);
                post_json(&self.http, &self.endpoint(request), &body, &[]).await
            }
        }
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| ROUTER_URL.to_string())
    }

    fn endpoint(&self, request: &CompletionRequest) -> String {
        match request.prompt {
            Prompt::Flat(_) => self.text_generation_url(),
            Prompt::Structured(_) => self.chat_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::GenerationParams;
    use crate::models::chat::Message;

    #[test]
    fn test_urls() {
        let client = HuggingFaceClient::new("hf_x", "HuggingFaceH4/zephyr-7b-beta".to_string(), None).unwrap();
        assert_eq!(
            client.text_generation_url(),
            "https://api-inference.huggingface.co/models/HuggingFaceH4/zephyr-7b-beta"
        );
        assert_eq!(client.chat_url(), "https://router.huggingface.co/v1/chat/completions");

        let local = HuggingFaceClient::new("hf_x", "m".to_string(), Some("http://localhost:8080/".to_string())).unwrap();
        assert_eq!(local.text_generation_url(), "http://localhost:8080/models/m");
    }

    #[test]
    fn test_endpoint_follows_prompt_form() {
        let client = HuggingFaceClient::new("hf_x", "HuggingFaceH4/zephyr-7b-beta".to_string(), None).unwrap();
        let mut request = CompletionRequest {
            prompt: Prompt::Structured(vec![Message::user("hi")]),
            params: GenerationParams::default(),
            stop: Vec::new(),
        };
        assert_eq!(client.endpoint(&request), "https://router.huggingface.co/v1/chat/completions");
        assert_eq!(client.get_base_url(), "https://router.huggingface.co");

        request.prompt = Prompt::Flat("<|user|>\nhi</s>\n<|assistant|>\n".to_string());
        assert_eq!(
            client.endpoint(&request),
            "https://api-inference.huggingface.co/models/HuggingFaceH4/zephyr-7b-beta"
        );
    }
}
