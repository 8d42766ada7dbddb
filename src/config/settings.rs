use log::info;
use serde_json::Value;
use std::fs;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::cli::Args;
use crate::config::profiles::load_profiles;
use crate::error::{ ChatError, Result };
use crate::history::ConversationStore;
use crate::llm::chat::GenerationParams;
use crate::llm::profile::{ catalogue_model_id, profile_name_for_model, BackendProfile };
use crate::llm::{ BackendKind, LlmConfig };
use crate::models::chat::Message;

const MAX_TOKENS_RANGE: RangeInclusive<u32> = 50..=1000;
const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.1..=1.0;
const TOP_P_RANGE: RangeInclusive<f32> = 0.1..=1.0;
/// Profile name that picks the built-in markup from the model id.
pub const AUTO_PROFILE: &str = "auto";

/// Everything a chat session needs, validated up front.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub llm: LlmConfig,
    pub profile: BackendProfile,
    pub params: GenerationParams,
    pub timeout: Duration,
    /// Messages a fresh or cleared session starts with.
    pub seed: Vec<Message>,
    /// Transcript to resume from, empty when starting fresh.
    pub history: Vec<Message>,
}

impl SessionConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        Self::from_args_with_env(args, |name| std::env::var(name).ok())
    }

    pub fn from_args_with_env<F>(args: &Args, env: F) -> Result<Self> where F: Fn(&str) -> Option<String> {
        let backend: BackendKind = args.backend
            .parse()
            .map_err(|e| ChatError::config(format!("{}", e)))?;

        let api_key = resolve_api_key(args, backend, &env)?;
        let model = match args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(name) =>
                match catalogue_model_id(name) {
                    Some(id) => {
                        info!("Model '{}' resolved to {}", name, id);
                        id.to_string()
                    }
                    None => name.to_string(),
                }
            None => backend.default_model().to_string(),
        };

        let profile = select_profile(args, backend, &model)?;
        if !backend.supports(profile.request_form()) {
            return Err(
                ChatError::config(
                    format!("Profile '{}' needs a flat prompt, which {} does not accept", profile.name, backend)
                )
            );
        }

        let params = GenerationParams {
            max_tokens: check_range("max tokens", args.max_tokens, MAX_TOKENS_RANGE)?,
            temperature: check_range("temperature", args.temperature, TEMPERATURE_RANGE)?,
            top_p: check_range("top-p", args.top_p, TOP_P_RANGE)?,
        };
        if args.timeout_secs == 0 {
            return Err(ChatError::config("timeout must be at least one second"));
        }

        let mut seed = Vec::new();
        if let Some(system) = args.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            seed.push(Message::system(system));
        }
        if let Some(greeting) = args.greeting.as_deref().filter(|s| !s.trim().is_empty()) {
            seed.push(Message::assistant(greeting));
        }

        let history = match &args.history_path {
            Some(path) => load_history(path)?,
            None => Vec::new(),
        };

        Ok(Self {
            llm: LlmConfig {
                backend,
                api_key,
                model,
                base_url: args.base_url.clone().filter(|u| !u.trim().is_empty()),
            },
            profile,
            params,
            timeout: Duration::from_secs(args.timeout_secs),
            seed,
            history,
        })
    }
}

fn resolve_api_key<F>(args: &Args, backend: BackendKind, env: &F) -> Result<String> where F: Fn(&str) -> Option<String> {
    if !args.api_key.trim().is_empty() {
        return Ok(args.api_key.trim().to_string());
    }
    env(backend.credential_env())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(||
            ChatError::config(
                format!("No API key for {}: set CHAT_API_KEY or {}", backend, backend.credential_env())
            )
        )
}

fn select_profile(args: &Args, backend: BackendKind, model: &str) -> Result<BackendProfile> {
    let mut profiles = load_profiles(args.profiles_path.as_deref())?;
    let name = match args.profile.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        // Only Hugging Face serves raw text generation; the others always take messages.
        Some(AUTO_PROFILE) if backend == BackendKind::HuggingFace => profile_name_for_model(model).to_string(),
        Some(AUTO_PROFILE) | None => "chat".to_string(),
        Some(name) => name.to_string(),
    };
    profiles
        .remove(&name)
        .ok_or_else(|| ChatError::config(format!("Unknown profile '{}'", name)))
}

fn check_range<T: PartialOrd + std::fmt::Display>(label: &str, value: T, range: RangeInclusive<T>) -> Result<T> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(
            ChatError::config(
                format!("{} must be between {} and {}, got {}", label, range.start(), range.end(), value)
            )
        )
    }
}

fn load_history(path: &str) -> Result<Vec<Message>> {
    let file_content = fs
        ::read_to_string(path)
        .map_err(|e| ChatError::config(format!("Failed to read history file '{}': {}", path, e)))?;
    let entries = match serde_json::from_str::<Value>(&file_content) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            return Err(ChatError::config(format!("History file '{}' must hold a JSON array", path)));
        }
        Err(e) => {
            return Err(ChatError::config(format!("Failed to parse history file '{}': {}", path, e)));
        }
    };
    let messages = ConversationStore::sanitize(&entries);
    info!("Resuming {} message(s) from {}", messages.len(), path);
    Ok(messages)
}
