use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from system.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub classifier: ClassifierConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// External classification service endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL, e.g. "http://localhost:8000". Overridable via CLASSIFIER_BASE_URL.
    pub base_url: String,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Generative model configuration per role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Metadata extraction and bias explanation.
    pub explanation: LlmRoleConfig,
    /// Follow-up dialogue about the analyzed document.
    pub dialogue: LlmRoleConfig,
}

/// Configuration for a single generative role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmRoleConfig {
    /// Provider name ("gemini" or "anthropic").
    pub provider: String,
    /// Model identifier (e.g. "gemini-2.5-flash").
    pub model: String,
    /// Max tokens in the response.
    pub max_tokens: u32,
    /// Temperature (0.0–2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Whole-request timeout. A hung call fails instead of holding its caller forever.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Score normalization and grounding parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How many evidence sentences are handed to the explanation model.
    pub evidence_top_k: usize,
    /// |score| above this leans Left/Right; at or below it is Center.
    pub direction_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            evidence_top_k: 5,
            direction_threshold: 10.0,
        }
    }
}

/// Conversation persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Transcript backend: "memory" or "redis".
    pub store: String,
    /// Prefix for transcript keys; the session id is appended.
    pub key_prefix: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            store: "memory".into(),
            key_prefix: "polisense_chat_".into(),
        }
    }
}

fn default_upload_path() -> String {
    "/upload".into()
}

fn default_timeout_seconds() -> u64 {
    120
}
