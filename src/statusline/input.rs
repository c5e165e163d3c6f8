//! Status record the assistant pipes to the statusline command.
//!
//! Every field is optional; a record with missing sections still renders
//! whatever modules can work with.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusInput {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub model: Option<ModelInfo>,
    pub workspace: Option<Workspace>,
    pub cost: Option<Cost>,
    pub context_window: Option<ContextWindow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: Option<String>,
    #[serde(default = "unknown_model")]
    pub display_name: String,
}

fn unknown_model() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub current_dir: String,
    pub project_dir: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cost {
    pub total_cost_usd: Option<f64>,
    pub total_duration_ms: Option<u64>,
    pub total_api_duration_ms: Option<u64>,
    pub total_lines_added: Option<u64>,
    pub total_lines_removed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextWindow {
    pub context_window_size: Option<u64>,
    pub total_input_tokens: Option<u64>,
    pub total_output_tokens: Option<u64>,
    pub current_usage: Option<CurrentUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
}

impl CurrentUsage {
    /// Tokens occupying the context window (output tokens excluded).
    #[must_use]
    pub fn context_tokens(&self) -> u64 {
        self.input_tokens + self.cache_creation_input_tokens + self.cache_read_input_tokens
    }
}

impl StatusInput {
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    /// Directory git commands should run in.
    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.workspace
            .as_ref()
            .map(|w| w.current_dir.as_str())
            .filter(|d| !d.is_empty())
            .or(self.cwd.as_deref())
    }
}
