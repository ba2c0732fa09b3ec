use polisense_common::config::LlmRoleConfig;

use super::loader::{ConfigError, EngineConfig, DIALOGUE_PROMPT, EXPLANATION_PROMPT};

const PROVIDERS: &[&str] = &["gemini", "anthropic"];
const TRANSCRIPT_STORES: &[&str] = &["memory", "redis"];

/// Validate the complete engine configuration.
///
/// Collects every violation before failing so one run shows all of them.
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_classifier(config, &mut errors);
    validate_llm(config, &mut errors);
    validate_analysis(config, &mut errors);
    validate_chat(config, &mut errors);
    validate_prompts(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

fn validate_classifier(config: &EngineConfig, errors: &mut Vec<String>) {
    let c = &config.system.classifier;

    if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
        errors.push("classifier.base_url must be an http(s) URL".into());
    }
    if !c.upload_path.starts_with('/') {
        errors.push("classifier.upload_path must start with '/'".into());
    }
    if c.timeout_seconds == 0 {
        errors.push("classifier.timeout_seconds must be > 0".into());
    }
}

fn validate_llm(config: &EngineConfig, errors: &mut Vec<String>) {
    let validate_role = |role: &LlmRoleConfig, name: &str, errors: &mut Vec<String>| {
        if !PROVIDERS.contains(&role.provider.as_str()) {
            errors.push(format!(
                "llm.{}.provider must be one of {:?}, got {:?}",
                name, PROVIDERS, role.provider
            ));
        }
        if role.model.is_empty() {
            errors.push(format!("llm.{}.model must not be empty", name));
        }
        if role.max_tokens == 0 {
            errors.push(format!("llm.{}.max_tokens must be > 0", name));
        }
        if let Some(temp) = role.temperature {
            if !(0.0..=2.0).contains(&temp) {
                errors.push(format!(
                    "llm.{}.temperature must be between 0.0 and 2.0",
                    name
                ));
            }
        }
        if role.timeout_seconds == 0 {
            errors.push(format!("llm.{}.timeout_seconds must be > 0", name));
        }
    };

    validate_role(&config.system.llm.explanation, "explanation", errors);
    validate_role(&config.system.llm.dialogue, "dialogue", errors);
}

fn validate_analysis(config: &EngineConfig, errors: &mut Vec<String>) {
    let a = &config.system.analysis;

    if a.evidence_top_k == 0 {
        errors.push("analysis.evidence_top_k must be > 0".into());
    }
    if !(0.0..100.0).contains(&a.direction_threshold) {
        errors.push("analysis.direction_threshold must be in [0, 100)".into());
    }
}

fn validate_chat(config: &EngineConfig, errors: &mut Vec<String>) {
    let c = &config.system.chat;

    if !TRANSCRIPT_STORES.contains(&c.store.as_str()) {
        errors.push(format!(
            "chat.store must be one of {:?}, got {:?}",
            TRANSCRIPT_STORES, c.store
        ));
    }
    if c.key_prefix.is_empty() {
        errors.push("chat.key_prefix must not be empty".into());
    }
}

fn validate_prompts(config: &EngineConfig, errors: &mut Vec<String>) {
    for name in [EXPLANATION_PROMPT, DIALOGUE_PROMPT] {
        match config.prompt(name) {
            Some(text) if !text.trim().is_empty() => {}
            Some(_) => errors.push(format!("prompts/{}.md must not be empty", name)),
            None => errors.push(format!("prompts/{}.md is required", name)),
        }
    }
}
