use log::debug;
use serde_json::Value;

use crate::error::{ ChatError, Result };

use super::profile::{ BackendProfile, EnvelopeShape };

fn read_shape(raw: &Value, shape: EnvelopeShape) -> Option<&str> {
    match shape {
        EnvelopeShape::GeneratedTextList => raw.get(0)?.get("generated_text")?.as_str(),
        EnvelopeShape::Choices => raw.pointer("/choices/0/message/content")?.as_str(),
        EnvelopeShape::GeneratedText => raw.as_object()?.get("generated_text")?.as_str(),
    }
}

/// Pulls the generated text out of a backend reply.
///
/// The profile's envelope is tried first, then the other known envelopes.
/// A bare JSON string is taken as the text itself.
pub fn extract(raw: &Value, profile: &BackendProfile) -> Result<String> {
    if let Value::String(text) = raw {
        return Ok(text.clone());
    }

    let preferred = profile.response_envelope_shape;
    if let Some(text) = read_shape(raw, preferred) {
        return Ok(text.to_string());
    }

    for shape in EnvelopeShape::ALL.into_iter().filter(|s| *s != preferred) {
        if let Some(text) = read_shape(raw, shape) {
            debug!("Response matched {:?} instead of expected {:?}", shape, preferred);
            return Ok(text.to_string());
        }
    }

    if let Some(error) = raw.get("error").and_then(Value::as_str) {
        return Err(ChatError::malformed(format!("backend reported: {}", error)));
    }
    Err(ChatError::malformed(format!("no generated text in {:?} envelope", preferred)))
}

/// Strips the open assistant marker and anything from the first stop sequence on.
pub fn clean(text: &str, profile: &BackendProfile) -> String {
    let marker = profile.open_assistant_marker().trim();
    let mut rest = text.trim_start();
    if !marker.is_empty() {
        while let Some(stripped) = rest.strip_prefix(marker) {
            rest = stripped.trim_start();
        }
    }

    let cut = profile.stop_sequences
        .iter()
        .filter(|stop| !stop.is_empty())
        .filter_map(|stop| rest.find(stop.as_str()))
        .min()
        .unwrap_or(rest.len());

    rest[..cut].trim().to_string()
}
