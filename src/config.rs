use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub mensa: MensaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// API key for the LLM endpoint. Falls back to `OPENAI_API_KEY` when
    /// unset; may stay empty for local servers that ignore it.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Falls back to the `TELEGRAM_TOKEN` env var when unset.
    #[serde(default)]
    pub bot_token: String,
    /// Empty list means every user may talk to the bot.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MensaConfig {
    #[serde(default = "default_location")]
    pub default_location: String,
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: Vec<String>,
    #[serde(default = "default_openmensa_base_url")]
    pub openmensa_base_url: String,
    #[serde(default = "default_chat_system_prompt")]
    pub chat_system_prompt: String,
}

impl Default for MensaConfig {
    fn default() -> Self {
        Self {
            default_location: default_location(),
            excluded_categories: default_excluded_categories(),
            openmensa_base_url: default_openmensa_base_url(),
            chat_system_prompt: default_chat_system_prompt(),
        }
    }
}

fn default_location() -> String {
    "Kiepenheuerallee".to_string()
}
fn default_excluded_categories() -> Vec<String> {
    vec!["Salattheke".to_string(), "Dessert".to_string()]
}
fn default_openmensa_base_url() -> String {
    crate::openmensa::DEFAULT_BASE_URL.to_string()
}
fn default_chat_system_prompt() -> String {
    "Du bist ein hilfsbereiter Assistent, der auch Informationen über die Uni-Mensa geben kann. \
     Antworte bitte auf Deutsch."
        .to_string()
}

impl AppConfig {
    /// Load `config.toml`. API key and bot token fall back to the
    /// `OPENAI_API_KEY` / `TELEGRAM_TOKEN` environment variables (usually
    /// via `.env`) when the file leaves them empty.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
        let mut config: AppConfig = toml::from_str(&raw)?;

        if config.provider.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                config.provider.api_key = key;
            }
        }
        if config.telegram.bot_token.trim().is_empty() {
            if let Ok(token) = std::env::var("TELEGRAM_TOKEN") {
                config.telegram.bot_token = token;
            }
        }

        Ok(config)
    }
}
