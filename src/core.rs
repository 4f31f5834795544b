use std::sync::Arc;

use tracing::info;

use crate::channels::MensaBot;
use crate::config::AppConfig;
use crate::mensa::MensaRegistry;
use crate::openmensa::OpenMensaClient;
use crate::providers::{LlmClient, OpenAiCompatibleProvider};

/// Wire up the provider, the OpenMensa client, and the Telegram channel,
/// then run the dispatcher until shutdown.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    if config.telegram.bot_token.trim().is_empty() {
        anyhow::bail!(
            "No Telegram bot token configured (set telegram.bot_token or TELEGRAM_TOKEN)"
        );
    }

    let registry = MensaRegistry::default();
    let default_mensa = registry
        .canonical_name(&config.mensa.default_location)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown default mensa location '{}' (available: {})",
                config.mensa.default_location,
                registry.names_joined()
            )
        })?
        .to_string();

    let provider = OpenAiCompatibleProvider::new(
        &config.provider.base_url,
        &config.provider.api_key,
        &config.provider.model,
        config.provider.temperature,
    )
    .map_err(|e| anyhow::anyhow!(e))?;
    info!(
        model = provider.model(),
        base_url = %config.provider.base_url,
        "LLM provider configured"
    );
    let llm: Arc<dyn LlmClient> = Arc::new(provider);

    let menu_client =
        OpenMensaClient::new(&config.mensa.openmensa_base_url).map_err(|e| anyhow::anyhow!(e))?;
    info!(
        base_url = %config.mensa.openmensa_base_url,
        default_mensa = %default_mensa,
        "OpenMensa client configured"
    );

    let bot = Arc::new(MensaBot::new(
        &config,
        default_mensa,
        llm,
        registry,
        menu_client,
    ));
    bot.run().await;
    Ok(())
}
