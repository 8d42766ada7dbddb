use log::{ debug, error, info, warn };
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::settings::SessionConfig;
use crate::error::{ ChatError, Result, TransportError };
use crate::history::ConversationStore;
use crate::llm::chat::{ ChatClient, CompletionRequest, GenerationParams, Prompt };
use crate::llm::extract::{ clean, extract };
use crate::llm::profile::{ BackendProfile, RequestForm };
use crate::llm::prompt::{ build_flat, build_structured };
use crate::models::chat::{ Message, Role };

pub const EMPTY_REPLY_FALLBACK: &str = "(The model returned an empty response.)";
pub const MALFORMED_REPLY_FALLBACK: &str = "Sorry, I couldn't understand the model's response.";
pub const ERROR_PREFIX: &str = "❌ Error: ";

/// What a completed turn appended to the transcript.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Assistant message now at the end of the transcript.
    pub reply: String,
    /// Why `reply` is a fallback or an inline error rather than model output.
    pub error: Option<ChatError>,
}

impl TurnOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One conversation against one backend. Turns run strictly one after another.
pub struct ChatSession {
    client: Arc<dyn ChatClient>,
    store: ConversationStore,
    seed: Vec<Message>,
    profile: BackendProfile,
    params: GenerationParams,
    timeout: Duration,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>, config: &SessionConfig) -> Self {
        let initial = if config.history.is_empty() {
            config.seed.clone()
        } else {
            resumed_with_instructions(&config.seed, &config.history)
        };
        Self {
            client,
            store: ConversationStore::with_seed(initial),
            seed: config.seed.clone(),
            profile: config.profile.clone(),
            params: config.params,
            timeout: config.timeout,
        }
    }

    pub fn history(&self) -> &[Message] {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    pub fn model(&self) -> String {
        self.client.get_model()
    }

    /// Request for the transcript as it stands, in the profile's wire form.
    pub fn build_request(&self) -> CompletionRequest {
        let prompt = match self.profile.request_form() {
            RequestForm::Structured => Prompt::Structured(build_structured(&self.store)),
            RequestForm::Flat => Prompt::Flat(build_flat(&self.store, &self.profile)),
        };
        CompletionRequest {
            prompt,
            params: self.params,
            stop: self.profile.stop_sequences.clone(),
        }
    }

    /// Appends the user's message, asks the backend, and appends exactly one
    /// assistant message: the cleaned reply, a fallback, or an inline error.
    ///
    /// Only blank input is returned as `Err`, and then nothing is appended.
    pub async fn submit_turn(&mut self, raw_user_text: &str) -> Result<TurnOutcome> {
        self.store.push(Message::user(raw_user_text.trim()))?;

        let request = self.build_request();
        debug!("Sending {} message(s) to {}", self.store.len(), self.client.endpoint(&request));

        let outcome = match timeout(self.timeout, self.client.complete(&request)).await {
            Ok(Ok(raw)) => self.interpret(&raw),
            Ok(Err(e)) => self.failed(e),
            Err(_) => self.failed(TransportError::Timeout(self.timeout).into()),
        };

        self.store.push(Message::assistant(outcome.reply.clone()))?;
        Ok(outcome)
    }

    fn interpret(&self, raw: &serde_json::Value) -> TurnOutcome {
        match extract(raw, &self.profile) {
            Ok(text) => {
                let reply = clean(&text, &self.profile);
                if reply.is_empty() {
                    warn!("Model returned an empty reply");
                    TurnOutcome { reply: EMPTY_REPLY_FALLBACK.to_string(), error: None }
                } else {
                    TurnOutcome { reply, error: None }
                }
            }
            Err(e) => {
                warn!("Could not read backend response: {}", e);
                TurnOutcome { reply: MALFORMED_REPLY_FALLBACK.to_string(), error: Some(e) }
            }
        }
    }

    fn failed(&self, e: ChatError) -> TurnOutcome {
        error!("Turn failed: {}", e);
        TurnOutcome {
            reply: format!("{}{}", ERROR_PREFIX, e),
            error: Some(e),
        }
    }

    /// Resets the transcript to the session's seed messages.
    pub fn clear_session(&mut self) -> &[Message] {
        self.store.clear(Some(self.seed.as_slice()));
        info!("Session cleared, {} seed message(s) restored", self.seed.len());
        self.store.all()
    }

    pub fn count(&self, role: Role) -> usize {
        self.store.all().iter().filter(|m| m.role == role).count()
    }
}

/// Resumed history keeps the seed's system messages in front unless it already opens with its own.
fn resumed_with_instructions(seed: &[Message], history: &[Message]) -> Vec<Message> {
    if history.first().is_some_and(|m| m.role == Role::System) {
        return history.to_vec();
    }
    seed.iter()
        .filter(|m| m.role == Role::System)
        .chain(history.iter())
        .cloned()
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::{ config, Scripted, ScriptedClient };
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_structured_turn() {
        let client = ScriptedClient::new(vec![
            Scripted::Reply(json!({ "choices": [{ "message": { "content": "  Hi there!  " } }] }))
        ]);
        let seed = vec![Message::system("Be brief.")];
        let mut session = ChatSession::new(client.clone(), &config(BackendProfile::chat(), seed));

        let outcome = session.submit_turn("  Hello  ").await.unwrap();
        assert!(outcome.is_ok());
        assert_eq!(outcome.reply, "Hi there!");
        assert_eq!(
            session.history(),
            &[Message::system("Be brief."), Message::user("Hello"), Message::assistant("Hi there!")]
        );

        let seen = client.seen.lock().unwrap();
        assert_eq!(
            seen[0].prompt,
            Prompt::Structured(vec![Message::system("Be brief."), Message::user("Hello")])
        );
    }

    #[tokio::test]
    async fn test_flat_turn_cleans_reply() {
        let client = ScriptedClient::new(vec![
            Scripted::Reply(json!([{ "generated_text": "<|assistant|>\nSure.</s>\n<|user|>\nignored" }]))
        ]);
        let mut session = ChatSession::new(client.clone(), &config(BackendProfile::zephyr(), Vec::new()));

        let outcome = session.submit_turn("Help?").await.unwrap();
        assert_eq!(outcome.reply, "Sure.");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].prompt, Prompt::Flat("<|user|>\nHelp?</s>\n<|assistant|>\n".to_string()));
        assert_eq!(seen[0].stop, BackendProfile::zephyr().stop_sequences);
    }

    #[tokio::test]
    async fn test_blank_input_rejected_without_call() {
        let client = ScriptedClient::new(Vec::new());
        let mut session = ChatSession::new(client.clone(), &config(BackendProfile::chat(), Vec::new()));

        let err = session.submit_turn("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(session.is_empty());
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        let client = ScriptedClient::new(vec![Scripted::Reply(json!([{ "generated_text": "  </s>" }]))]);
        let mut session = ChatSession::new(client, &config(BackendProfile::zephyr(), Vec::new()));

        let outcome = session.submit_turn("Hi").await.unwrap();
        assert!(outcome.is_ok());
        assert_eq!(session.history()[1], Message::assistant(EMPTY_REPLY_FALLBACK));
    }

    #[tokio::test]
    async fn test_malformed_reply_uses_fallback() {
        let client = ScriptedClient::new(vec![Scripted::Reply(json!({ "output": "?" }))]);
        let mut session = ChatSession::new(client, &config(BackendProfile::chat(), Vec::new()));

        let outcome = session.submit_turn("Hi").await.unwrap();
        assert!(matches!(outcome.error, Some(ChatError::MalformedResponse(_))));
        assert_eq!(outcome.reply, MALFORMED_REPLY_FALLBACK);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_is_appended_inline() {
        let client = ScriptedClient::new(vec![Scripted::Status(503, "Model is loading")]);
        let mut session = ChatSession::new(client, &config(BackendProfile::chat(), Vec::new()));

        let outcome = session.submit_turn("Hi").await.unwrap();
        assert!(outcome.error.as_ref().is_some_and(|e| e.is_retryable()));
        assert_eq!(outcome.reply, "❌ Error: backend returned 503: Model is loading");
        assert_eq!(session.history().last(), Some(&Message::assistant(outcome.reply.clone())));
    }

    #[tokio::test]
    async fn test_timeout_fails_turn() {
        let client = ScriptedClient::new(vec![Scripted::Hang]);
        let mut session = ChatSession::new(client, &config(BackendProfile::chat(), Vec::new()));

        let outcome = session.submit_turn("Hi").await.unwrap();
        assert!(matches!(outcome.error, Some(ChatError::Transport(TransportError::Timeout(_)))));
        assert!(outcome.reply.starts_with(ERROR_PREFIX));
        assert_eq!(session.count(Role::Assistant), 1);
    }

    #[tokio::test]
    async fn test_clear_restores_seed() {
        let client = ScriptedClient::new(vec![
            Scripted::Reply(json!({ "choices": [{ "message": { "content": "ok" } }] }))
        ]);
        let seed = vec![Message::assistant("hi")];
        let mut session = ChatSession::new(client, &config(BackendProfile::chat(), seed.clone()));

        session.submit_turn("Hello").await.unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(session.clear_session(), seed.as_slice());
        assert_eq!(session.clear_session(), seed.as_slice());
    }

    #[tokio::test]
    async fn test_resumed_history_replaces_seed_until_clear() {
        let client = ScriptedClient::new(Vec::new());
        let mut cfg = config(BackendProfile::chat(), vec![Message::assistant("Welcome")]);
        cfg.history = vec![Message::user("earlier"), Message::assistant("reply")];
        let mut session = ChatSession::new(client, &cfg);

        assert_eq!(session.history(), cfg.history.as_slice());
        assert_eq!(session.clear_session(), &[Message::assistant("Welcome")]);
    }

    #[tokio::test]
    async fn test_resumed_history_keeps_system_prompt() {
        let client = ScriptedClient::new(vec![
            Scripted::Reply(json!({ "choices": [{ "message": { "content": "Sure." } }] }))
        ]);
        let mut cfg = config(
            BackendProfile::chat(),
            vec![Message::system("Be brief."), Message::assistant("Welcome")]
        );
        cfg.history = vec![Message::user("hello")];
        let mut session = ChatSession::new(client.clone(), &cfg);

        assert_eq!(session.history(), &[Message::system("Be brief."), Message::user("hello")]);

        session.submit_turn("Again").await.unwrap();
        let seen = client.seen.lock().unwrap();
        match &seen[0].prompt {
            Prompt::Structured(messages) => assert_eq!(messages[0], Message::system("Be brief.")),
            other => panic!("expected structured prompt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resumed_history_with_own_system_prompt_is_untouched() {
        let client = ScriptedClient::new(Vec::new());
        let mut cfg = config(BackendProfile::chat(), vec![Message::system("Be brief.")]);
        cfg.history = vec![Message::system("Answer in French."), Message::user("bonjour")];
        let session = ChatSession::new(client, &cfg);

        assert_eq!(session.history(), cfg.history.as_slice());
    }
}
