use serde::{ Deserialize, Serialize };
use std::collections::HashMap;

use crate::models::chat::Role;

/// Where a backend puts the generated text in its JSON reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeShape {
    /// `[{"generated_text": "..."}]`
    GeneratedTextList,
    /// `{"choices": [{"message": {"content": "..."}}]}`
    Choices,
    /// `{"generated_text": "..."}`
    GeneratedText,
}

impl EnvelopeShape {
    pub const ALL: [EnvelopeShape; 3] = [
        EnvelopeShape::GeneratedTextList,
        EnvelopeShape::Choices,
        EnvelopeShape::GeneratedText,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestForm {
    /// `{model, messages}`
    Structured,
    /// `{inputs, parameters}`
    Flat,
}

/// Per-model turn markup for flat prompts.
///
/// Templates use `{role}` and `{content}` placeholders. `turn` is used for
/// every role without its own override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTemplate {
    pub turn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<String>,
    #[serde(default)]
    pub open_assistant: String,
}

impl TurnTemplate {
    pub fn new(turn: impl Into<String>, open_assistant: impl Into<String>) -> Self {
        Self {
            turn: turn.into(),
            system: None,
            user: None,
            assistant: None,
            open_assistant: open_assistant.into(),
        }
    }

    pub fn pattern_for(&self, role: Role) -> &str {
        let specific = match role {
            Role::System => self.system.as_deref(),
            Role::User => self.user.as_deref(),
            Role::Assistant => self.assistant.as_deref(),
        };
        specific.unwrap_or(&self.turn)
    }

    pub fn render(&self, role: Role, content: &str) -> String {
        // Role goes in first so placeholder-looking text inside content stays literal.
        self.pattern_for(role).replace("{role}", role.as_str()).replace("{content}", content)
    }
}

impl Default for TurnTemplate {
    fn default() -> Self {
        Self::new("{role}: {content}\n", "assistant:")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_template: Option<TurnTemplate>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    pub response_envelope_shape: EnvelopeShape,
}

impl BackendProfile {
    pub fn request_form(&self) -> RequestForm {
        if self.turn_template.is_some() { RequestForm::Flat } else { RequestForm::Structured }
    }

    pub fn open_assistant_marker(&self) -> &str {
        self.turn_template.as_ref().map(|t| t.open_assistant.as_str()).unwrap_or("")
    }

    pub fn chat() -> Self {
        Self {
            name: "chat".to_string(),
            turn_template: None,
            stop_sequences: Vec::new(),
            response_envelope_shape: EnvelopeShape::Choices,
        }
    }

    pub fn zephyr() -> Self {
        Self {
            name: "zephyr".to_string(),
            turn_template: Some(TurnTemplate::new("<|{role}|>\n{content}</s>\n", "<|assistant|>\n")),
            stop_sequences: strings(&["</s>", "<|user|>", "<|system|>"]),
            response_envelope_shape: EnvelopeShape::GeneratedTextList,
        }
    }

    pub fn mistral() -> Self {
        let mut template = TurnTemplate::new("[INST] {content} [/INST]", "");
        template.assistant = Some(" {content}</s>".to_string());
        Self {
            name: "mistral".to_string(),
            turn_template: Some(template),
            stop_sequences: strings(&["</s>", "[INST]"]),
            response_envelope_shape: EnvelopeShape::GeneratedTextList,
        }
    }

    pub fn llama3() -> Self {
        Self {
            name: "llama3".to_string(),
            turn_template: Some(
                TurnTemplate::new(
                    "<|start_header_id|>{role}<|end_header_id|>\n\n{content}<|eot_id|>",
                    "<|start_header_id|>assistant<|end_header_id|>\n\n"
                )
            ),
            stop_sequences: strings(&["<|eot_id|>", "<|end_of_text|>", "<|start_header_id|>"]),
            response_envelope_shape: EnvelopeShape::GeneratedTextList,
        }
    }

    pub fn phi3() -> Self {
        Self {
            name: "phi3".to_string(),
            turn_template: Some(TurnTemplate::new("<|{role}|>\n{content}<|end|>\n", "<|assistant|>\n")),
            stop_sequences: strings(&["<|end|>", "<|endoftext|>", "<|user|>"]),
            response_envelope_shape: EnvelopeShape::GeneratedTextList,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn builtin_profiles() -> HashMap<String, BackendProfile> {
    [
        BackendProfile::chat(),
        BackendProfile::zephyr(),
        BackendProfile::mistral(),
        BackendProfile::llama3(),
        BackendProfile::phi3(),
    ]
        .into_iter()
        .map(|profile| (profile.name.clone(), profile))
        .collect()
}

/// Display name and model id of the models offered out of the box.
pub const MODEL_CATALOGUE: &[(&str, &str)] = &[
    ("Mistral 7B", "mistralai/Mistral-7B-Instruct-v0.3"),
    ("Llama 3 8B", "meta-llama/Meta-Llama-3-8B-Instruct"),
    ("Zephyr 7B", "HuggingFaceH4/zephyr-7b-beta"),
    ("Microsoft Phi-3", "microsoft/Phi-3-mini-4k-instruct"),
];

/// Model id behind a catalogue display name, matched case-insensitively.
pub fn catalogue_model_id(name: &str) -> Option<&'static str> {
    let name = name.trim();
    MODEL_CATALOGUE.iter()
        .find(|(display, _)| display.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

/// Picks the built-in profile whose markup a model id expects.
pub fn profile_name_for_model(model: &str) -> &'static str {
    let model = model.to_lowercase();
    if model.contains("zephyr") {
        "zephyr"
    } else if model.contains("llama-3") || model.contains("llama3") {
        "llama3"
    } else if model.contains("phi-3") || model.contains("phi3") {
        "phi3"
    } else if model.contains("mistral") || model.contains("mixtral") {
        "mistral"
    } else {
        "chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_form_follows_template() {
        assert_eq!(BackendProfile::chat().request_form(), RequestForm::Structured);
        assert_eq!(BackendProfile::zephyr().request_form(), RequestForm::Flat);
    }

    #[test]
    fn test_render_keeps_content_placeholders_literal() {
        let template = TurnTemplate::new("<|{role}|>{content}</s>", "<|assistant|>");
        assert_eq!(template.render(Role::User, "say {role}"), "<|user|>say {role}</s>");
    }

    #[test]
    fn test_role_override() {
        let profile = BackendProfile::mistral();
        let template = profile.turn_template.unwrap();
        assert_eq!(template.render(Role::User, "hi"), "[INST] hi [/INST]");
        assert_eq!(template.render(Role::Assistant, "hello"), " hello</s>");
    }

    #[test]
    fn test_catalogue_models_map_to_builtins() {
        let builtins = builtin_profiles();
        let names: Vec<&str> = MODEL_CATALOGUE
            .iter()
            .map(|(_, id)| profile_name_for_model(id))
            .collect();
        assert_eq!(names, vec!["mistral", "llama3", "zephyr", "phi3"]);
        assert!(names.iter().all(|name| builtins.contains_key(*name)));
        assert_eq!(profile_name_for_model("openai/gpt-4o"), "chat");
    }

    #[test]
    fn test_catalogue_names_resolve_to_ids() {
        assert_eq!(catalogue_model_id("Zephyr 7B"), Some("HuggingFaceH4/zephyr-7b-beta"));
        assert_eq!(catalogue_model_id("  microsoft phi-3 "), Some("microsoft/Phi-3-mini-4k-instruct"));
        assert_eq!(catalogue_model_id("HuggingFaceH4/zephyr-7b-beta"), None);
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let json = r####"{
            "turn_template": { "turn": "### {role}\n{content}\n", "open_assistant": "### assistant\n" },
            "stop_sequences": ["###"],
            "response_envelope_shape": "generated_text"
        }"####;
        let profile: BackendProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.response_envelope_shape, EnvelopeShape::GeneratedText);
        assert_eq!(profile.open_assistant_marker(), "### assistant\n");
        assert!(profile.turn_template.unwrap().user.is_none());
    }
}
