mod loader;
mod validation;

pub use loader::{load_config, ConfigError, EngineConfig, DIALOGUE_PROMPT, EXPLANATION_PROMPT};
pub use validation::validate;
