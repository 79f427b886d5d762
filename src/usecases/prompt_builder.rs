//! System prompt construction with dynamic style overrides and context
//! injection.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::tolerant_lookup;

fn length_instruction(key: &str) -> Option<&'static str> {
    match key {
        "short" => Some("Keep responses brief, 1-2 sentences."),
        "medium" => Some("Use a few sentences to answer fully."),
        "long" => Some("Provide detailed, thorough answers."),
        _ => None,
    }
}

fn tone_instruction(key: &str) -> Option<&'static str> {
    match key {
        "friendly" => Some("Maintain a warm, friendly tone."),
        "professional" => Some("Maintain a professional, businesslike tone."),
        "casual" => Some("Keep the tone relaxed and casual."),
        _ => None,
    }
}

fn formality_instruction(key: &str) -> Option<&'static str> {
    match key {
        "formal" => Some("Use formal language and complete sentences."),
        "informal" => Some("Use informal, conversational language."),
        _ => None,
    }
}

fn lookup_str<'a>(config: &'a serde_json::Map<String, Value>, snake_key: &str) -> Option<&'a str> {
    tolerant_lookup(config, snake_key).and_then(Value::as_str)
}

/// Build the full system prompt: base prompt, a `<dynamic_style_overrides>`
/// block, an optional `<context_data>` block, and `{placeholder}`
/// substitution from `dynamic_vars` when `dynamic_vars_enabled` is set.
///
/// `config` is a JSON object mirroring an agent's stored configuration
/// (tolerant of snake_case or camelCase keys, matching how the PATCH
/// endpoint and the agent repository store these values).
pub fn build_system_prompt(config: &serde_json::Map<String, Value>, context: Option<&HashMap<String, String>>) -> String {
    let base_prompt = config
        .get("system_prompt")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("You are a helpful assistant.");

    let length = lookup_str(config, "response_length").unwrap_or("short");
    let tone = lookup_str(config, "conversation_tone").unwrap_or("friendly");
    let formality = lookup_str(config, "conversation_formality").unwrap_or("informal");

    let mut style_lines = Vec::new();
    if let Some(instr) = length_instruction(length) {
        style_lines.push(format!("- Length: {instr}"));
    }
    if let Some(instr) = tone_instruction(tone) {
        style_lines.push(format!("- Tone: {instr}"));
    }
    if let Some(instr) = formality_instruction(formality) {
        style_lines.push(format!("- Formality: {instr}"));
    }

    let mut prompt = format!(
        "{base_prompt}\n\n<dynamic_style_overrides>\n{}\n</dynamic_style_overrides>\n",
        style_lines.join("\n")
    );

    if let Some(context) = context {
        if !context.is_empty() {
            let context_str = context
                .iter()
                .map(|(k, v)| format!("- {k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n");
            prompt.push_str(&format!("\n<context_data>\n{context_str}\n</context_data>\n"));
        }
    }

    let dynamic_vars_enabled = config
        .get("dynamic_vars_enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if dynamic_vars_enabled {
        if let Some(vars) = config.get("dynamic_vars") {
            let vars_map = match vars {
                Value::String(s) => serde_json::from_str::<Value>(s).ok(),
                other => Some(other.clone()),
            };
            if let Some(Value::Object(vars_map)) = vars_map {
                for (key, value) in vars_map {
                    let placeholder = format!("{{{key}}}");
                    let replacement = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    prompt = prompt.replace(&placeholder, &replacement);
                }
            }
        }
    }

    prompt
}
