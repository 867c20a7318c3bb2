//! Agent settings persistence (agent-config.json).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub const DEFAULT_API_PREFIX: &str = "gradio_api";
pub const DEFAULT_API_NAME: &str = "run_with_stream";
pub const DEFAULT_LLM_PROVIDER: &str = "gemini";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash-exp";

pub const DEFAULT_TASK: &str = r#"
Analyze the latest 10 tweets from the X.com following page to extract cashtags and contract addresses (CAs) as follows:

1. Identify cashtags (e.g., $TOKEN) and their corresponding contract addresses (CAs).
   Add the results to a JSON array, e.g. [{ "cashtag": "$TOKEN", "contract_address": "CA" }]
2. If a cashtag is found but no CA is included:
   - Search X.com for the CA (max 10 tweets of search).
   - If found, add it to the JSON array. Otherwise, add: { "cashtag": "$TOKEN", "contract_address": null }.
3. If a token is mentioned without a cashtag:
   - Record it as: { "cashtag": "unknown_cashtag", "contract_address": "CA" } (or null if no CA is found).
4. If something is being shilled but there is no cashtag or CA, search X.com for key words of the message to find the cashtag or the CA, then follow the previous points.
5. If nothing is found, skip the tweet. Do not return empty entries such as
   { "cashtag": "unknown_cashtag", "contract_address": null }.

The final output must only contain a JSON array of the format:
[
  { "cashtag": "$TOKEN", "contract_address": "CA" },
  { "cashtag": "unknown_cashtag", "contract_address": null }
]

Do not include any additional text, explanations, or metadata outside the JSON array.
"#;

/// Stored agent configuration (persisted to agent-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub base_url: String,
    /// Path segment in front of `/call/...`. Empty for servers that mount the
    /// queue API at the root.
    pub api_prefix: String,
    pub api_name: String,
    /// Position of the final answer in the endpoint's output list.
    pub result_index: usize,
    pub agent_type: String,
    pub llm_provider: String,
    pub llm_model_name: String,
    pub llm_temperature: f64,
    pub use_own_browser: bool,
    pub keep_browser_open: bool,
    pub headless: bool,
    pub disable_security: bool,
    pub enable_recording: bool,
    pub task: String,
    /// Passed through to the agent verbatim. Read from the file or from
    /// `CASHWATCH_AGENT_INFO`, never written back.
    #[serde(skip_serializing)]
    pub additional_info: Option<String>,
    pub max_steps: u32,
    pub max_actions_per_step: u32,
    pub tool_calling_method: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7788".into(),
            api_prefix: DEFAULT_API_PREFIX.into(),
            api_name: DEFAULT_API_NAME.into(),
            result_index: 1,
            agent_type: "custom".into(),
            llm_provider: DEFAULT_LLM_PROVIDER.into(),
            llm_model_name: DEFAULT_LLM_MODEL.into(),
            llm_temperature: 1.0,
            use_own_browser: true,
            keep_browser_open: true,
            headless: false,
            disable_security: true,
            enable_recording: true,
            task: DEFAULT_TASK.trim().to_string(),
            additional_info: None,
            max_steps: 100,
            max_actions_per_step: 10,
            tool_calling_method: "auto".into(),
            config_path: PathBuf::new(),
        }
    }
}

impl AgentSettings {
    /// Load settings from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut settings: AgentSettings = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        settings.config_path = config_path.to_path_buf();

        if settings.additional_info.is_none() {
            settings.additional_info = std::env::var("CASHWATCH_AGENT_INFO").ok();
        }

        settings
    }

    /// Save settings to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved agent settings to {}", self.config_path.display());
        Ok(())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `{base}/{prefix}/call/{api}`
    pub fn call_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let api = self.api_name.trim_start_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/call/{}", base, api)
        } else {
            format!("{}/{}/call/{}", base, prefix, api)
        }
    }

    /// Positional input list for the endpoint.
    pub fn request_data(&self) -> Vec<serde_json::Value> {
        vec![
            json!(self.agent_type),
            json!(self.llm_provider),
            json!(self.llm_model_name),
            json!(self.llm_temperature),
            json!(self.use_own_browser),
            json!(self.keep_browser_open),
            json!(self.headless),
            json!(self.disable_security),
            json!(self.enable_recording),
            json!(self.task),
            json!(self.additional_info.clone().unwrap_or_default()),
            json!(self.max_steps),
            json!(self.max_actions_per_step),
            json!(self.tool_calling_method),
        ]
    }
}
