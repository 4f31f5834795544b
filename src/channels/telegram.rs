//! Telegram front end: receives messages, runs them through intent
//! resolution, and answers in German.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::dates;
use crate::intent::{self, Command};
use crate::meals;
use crate::mensa::MensaRegistry;
use crate::openmensa::OpenMensaClient;
use crate::providers::LlmClient;

pub struct MensaBot {
    bot: Bot,
    llm: Arc<dyn LlmClient>,
    registry: MensaRegistry,
    menu_client: OpenMensaClient,
    default_mensa: String,
    excluded_categories: Vec<String>,
    chat_system_prompt: String,
    /// Empty list means every user may talk to the bot.
    allowed_user_ids: Vec<u64>,
    /// Per-chat mensa preference. In-memory only, reset on restart.
    preferences: Mutex<HashMap<ChatId, String>>,
}

impl MensaBot {
    pub fn new(
        config: &AppConfig,
        default_mensa: String,
        llm: Arc<dyn LlmClient>,
        registry: MensaRegistry,
        menu_client: OpenMensaClient,
    ) -> Self {
        Self {
            bot: Bot::new(config.telegram.bot_token.clone()),
            llm,
            registry,
            menu_client,
            default_mensa,
            excluded_categories: config.mensa.excluded_categories.clone(),
            chat_system_prompt: config.mensa.chat_system_prompt.clone(),
            allowed_user_ids: config.telegram.allowed_user_ids.clone(),
            preferences: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(self: Arc<Self>) {
        info!("Starting Telegram dispatcher");

        let handler = dptree::entry().branch(Update::filter_message().endpoint({
            let channel = Arc::clone(&self);
            move |msg: teloxide::types::Message, bot: Bot| {
                let channel = Arc::clone(&channel);
                async move {
                    channel.handle_message(msg, bot).await;
                    respond(())
                }
            }
        }));

        Dispatcher::builder(self.bot.clone(), handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_message(&self, msg: teloxide::types::Message, bot: Bot) {
        let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
        if !self.allowed_user_ids.is_empty() && !self.allowed_user_ids.contains(&user_id) {
            warn!(user_id, "Unauthorized user attempted access");
            return;
        }

        let Some(text) = msg.text() else {
            debug!(chat_id = msg.chat.id.0, "Ignoring non-text message");
            return;
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        let chat_id = msg.chat.id;
        if let Err(e) = self.handle_text(chat_id, &text).await {
            warn!(chat_id = chat_id.0, error = %e, "Message handling failed");
            let _ = bot
                .send_message(
                    chat_id,
                    "❌ Es ist ein Fehler aufgetreten. Bitte versuche es später noch einmal.",
                )
                .await;
        }
    }

    async fn handle_text(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        // /start gets its own welcome flow instead of the help alias.
        if text.split_whitespace().next() == Some("/start") {
            return self.handle_start(chat_id).await;
        }

        let (command, args) =
            intent::resolve_message(text, Some(self.llm.as_ref()), &self.registry).await;
        debug!(chat_id = chat_id.0, command = %command, ?args, "Resolved message");

        match command {
            Command::Help => self.send(chat_id, &self.help_text()).await,
            Command::Menu => self.handle_menu(chat_id, &args).await,
            Command::SetMensa => self.handle_set_mensa(chat_id, &args).await,
            Command::Settings => self.handle_settings(chat_id).await,
            Command::Restart => self.handle_restart(chat_id).await,
            Command::Chat => self.handle_chat(chat_id, text).await,
            Command::Unknown => {
                self.send(
                    chat_id,
                    "Das habe ich leider nicht verstanden. Nutze /hilfe für eine Übersicht der Befehle.",
                )
                .await
            }
        }
    }

    async fn handle_start(&self, chat_id: ChatId) -> anyhow::Result<()> {
        self.preferences
            .lock()
            .await
            .insert(chat_id, self.default_mensa.clone());
        let welcome = format!(
            "👋 Willkommen beim Mensa-Bot!\n\n\
             Ich sage dir, was es in der Mensa zu essen gibt, und beantworte \
             auch sonstige Fragen.\n\n\
             Deine Standard-Mensa ist: {}\n\n{}",
            self.default_mensa,
            self.help_text()
        );
        self.send(chat_id, &welcome).await
    }

    async fn handle_menu(&self, chat_id: ChatId, args: &[String]) -> anyhow::Result<()> {
        let date = if args.is_empty() {
            Local::now().date_naive()
        } else {
            dates::resolve_date(&args.join(" "), Some(self.llm.as_ref())).await
        };
        let mensa = self.preferred_mensa(chat_id).await;
        let report = meals::menu_report(
            &self.registry,
            &self.menu_client,
            self.llm.as_ref(),
            &mensa,
            date,
            &self.excluded_categories,
        )
        .await;
        self.send(chat_id, &report).await
    }

    async fn handle_set_mensa(&self, chat_id: ChatId, args: &[String]) -> anyhow::Result<()> {
        let Some(requested) = args.first() else {
            return self
                .send(
                    chat_id,
                    &format!(
                        "Bitte gib einen Mensa-Standort an.\nVerfügbare Standorte: {}",
                        self.registry.names_joined()
                    ),
                )
                .await;
        };

        match self.registry.canonical_name(requested) {
            Some(name) => {
                self.preferences
                    .lock()
                    .await
                    .insert(chat_id, name.to_string());
                self.send(
                    chat_id,
                    &format!("✅ Deine Standard-Mensa wurde zu {} geändert.", name),
                )
                .await
            }
            None => {
                self.send(
                    chat_id,
                    &format!(
                        "❌ Ungültiger Mensa-Standort: {}\nVerfügbare Standorte: {}",
                        requested,
                        self.registry.names_joined()
                    ),
                )
                .await
            }
        }
    }

    async fn handle_settings(&self, chat_id: ChatId) -> anyhow::Result<()> {
        let mensa = self.preferred_mensa(chat_id).await;
        self.send(
            chat_id,
            &format!(
                "⚙️ Deine aktuellen Einstellungen:\n\n\
                 📍 Mensa: {}\n\n\
                 Um deine Mensa zu ändern, nutze:\n/mensa <standort>",
                mensa
            ),
        )
        .await
    }

    async fn handle_restart(&self, chat_id: ChatId) -> anyhow::Result<()> {
        self.preferences.lock().await.remove(&chat_id);
        self.send(
            chat_id,
            &format!(
                "🔄 Alle Einstellungen wurden zurückgesetzt.\nStandard-Mensa ist jetzt: {}",
                self.default_mensa
            ),
        )
        .await
    }

    async fn handle_chat(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        let reply = self.llm.complete(&self.chat_system_prompt, text).await?;
        self.send(chat_id, &reply).await
    }

    async fn preferred_mensa(&self, chat_id: ChatId) -> String {
        self.preferences
            .lock()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_else(|| self.default_mensa.clone())
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.bot.send_message(chat_id, text).await?;
        Ok(())
    }

    fn help_text(&self) -> String {
        format!(
            "Verfügbare Befehle:\n\
             /menu [datum] - Speiseplan anzeigen (z.B. /menu morgen, /menu 2025-03-10)\n\
             /mensa <standort> - Standard-Mensa ändern\n\
             /einstellungen - Aktuelle Einstellungen anzeigen\n\
             /neustart - Einstellungen zurücksetzen\n\
             /hilfe - Diese Übersicht anzeigen\n\n\
             Verfügbare Standorte: {}\n\n\
             Du kannst mich auch einfach fragen, z.B.:\n\
             „Was gibt es morgen zu essen?“\n\
             „Wechsle meine Mensa zu Griebnitzsee“",
            self.registry.names_joined()
        )
    }
}
