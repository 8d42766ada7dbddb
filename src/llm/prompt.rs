use crate::history::ConversationStore;
use crate::models::chat::{ Message, Role };

use super::profile::{ BackendProfile, TurnTemplate };

/// Message list for chat-completion backends, system turns hoisted to the front.
pub fn build_structured(store: &ConversationStore) -> Vec<Message> {
    let (mut ordered, rest): (Vec<Message>, Vec<Message>) = store
        .all()
        .iter()
        .cloned()
        .partition(|m| m.role == Role::System);
    ordered.extend(rest);
    ordered
}

/// Single prompt string ending in an open assistant turn for the model to continue.
pub fn build_flat(store: &ConversationStore, profile: &BackendProfile) -> String {
    let fallback;
    let template = match &profile.turn_template {
        Some(template) => template,
        None => {
            fallback = TurnTemplate::default();
            &fallback
        }
    };

    let mut prompt = String::new();
    for message in store.all() {
        prompt.push_str(&template.render(message.role, &message.content));
    }
    prompt.push_str(&template.open_assistant);
    prompt
}
