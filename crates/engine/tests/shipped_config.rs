//! The config directory that ships with the repo must load and validate.
use std::path::PathBuf;

use polisense_engine::config::{self, DIALOGUE_PROMPT, EXPLANATION_PROMPT};

#[test]
fn test_shipped_config_is_valid() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config");
    let config = config::load_config(&dir).expect("shipped config must validate");

    assert_eq!(config.system.chat.key_prefix, "polisense_chat_");
    assert_eq!(config.system.analysis.evidence_top_k, 5);
    assert_eq!(config.system.analysis.direction_threshold, 10.0);
    assert!(config
        .prompt(EXPLANATION_PROMPT)
        .is_some_and(|p| p.contains("PoliSense")));
    assert!(config.prompt(DIALOGUE_PROMPT).is_some());
}
