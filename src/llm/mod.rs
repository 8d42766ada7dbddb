pub mod chat;
pub mod extract;
pub mod profile;
pub mod prompt;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;

use self::profile::RequestForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    HuggingFace,
    OpenRouter,
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::HuggingFace => "huggingface",
            BackendKind::OpenRouter => "openrouter",
            BackendKind::Ollama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::HuggingFace => "mistralai/Mistral-7B-Instruct-v0.3",
            BackendKind::OpenRouter => "mistralai/mistral-7b-instruct",
            BackendKind::Ollama => "gpt-oss:20b",
        }
    }

    /// Only the Hugging Face text-generation route takes a flat prompt.
    pub fn supports(&self, form: RequestForm) -> bool {
        match form {
            RequestForm::Structured => true,
            RequestForm::Flat => *self == BackendKind::HuggingFace,
        }
    }

    /// Provider-specific variable checked when no generic credential is set.
    pub fn credential_env(&self) -> &'static str {
        match self {
            BackendKind::HuggingFace => "HF_TOKEN",
            BackendKind::OpenRouter => "OPENROUTER_API_KEY",
            BackendKind::Ollama => "OLLAMA_API_KEY",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseBackendError {
    message: String,
}

impl fmt::Display for ParseBackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseBackendError {}
impl FromStr for BackendKind {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(BackendKind::HuggingFace),
            "openrouter" => Ok(BackendKind::OpenRouter),
            "ollama" => Ok(BackendKind::Ollama),
            _ =>
                Err(ParseBackendError {
                    message: format!("Invalid backend: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: BackendKind,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}
