//! LLM-assisted intent classification for messages the rules cannot place.

use chrono::NaiveDate;
use tracing::debug;

use super::{rules, Command, Intent};
use crate::dates::CANONICAL_FORMAT;
use crate::mensa::MensaRegistry;
use crate::providers::{extract_json_object, LlmClient};

fn classification_prompt(registry: &MensaRegistry) -> String {
    format!(
        "You are a helpful assistant that classifies user messages into intents.\n\
         Analyze the user's message and determine which command they want to use.\n\
         \n\
         Available commands:\n\
         - help: the user wants help or information about available commands\n\
         - menu: the user wants to see the menu (possibly for a specific date)\n\
         - mensa: the user wants to change their preferred mensa location\n\
         - chat: the user just wants to chat or ask a general question\n\
         - settings: the user wants to change settings\n\
         - restart: the user wants to restart or reset the conversation\n\
         \n\
         Respond with a JSON object containing:\n\
         {{\n\
             \"command\": \"one of [help, menu, mensa, chat, settings, restart]\",\n\
             \"date\": \"YYYY-MM-DD if a date is mentioned, otherwise null\",\n\
             \"mensa_location\": \"location name if mentioned (corrected to one of: {names}), otherwise null\"\n\
         }}\n\
         \n\
         Only include the JSON in your response, nothing else.",
        names = registry.names_joined(),
    )
}

/// Classify via the LLM, falling back to the rule-based classifier on any
/// failure: invocation error, missing JSON, or a malformed object.
pub async fn classify_with_llm(
    text: &str,
    llm: &dyn LlmClient,
    registry: &MensaRegistry,
) -> Intent {
    match try_classify(text, llm, registry).await {
        Some(intent) => intent,
        None => {
            debug!("LLM classification failed, using rule-based fallback");
            rules::classify(text, registry)
        }
    }
}

async fn try_classify(
    text: &str,
    llm: &dyn LlmClient,
    registry: &MensaRegistry,
) -> Option<Intent> {
    let user_message = format!("Classify this message: '{}'", text);
    let raw = match llm
        .complete(&classification_prompt(registry), &user_message)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "LLM intent classification failed");
            return None;
        }
    };

    let object = extract_json_object(&raw)?;
    let value: serde_json::Value = serde_json::from_str(object).ok()?;

    let command = value
        .get("command")
        .and_then(|v| v.as_str())
        .map(Command::parse)
        .unwrap_or(Command::Unknown);
    let date = value
        .get("date")
        .and_then(|v| v.as_str())
        .and_then(|s| NaiveDate::parse_from_str(s, CANONICAL_FORMAT).ok());
    let mensa_location = value
        .get("mensa_location")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Some(Intent {
        command,
        args: Vec::new(),
        date,
        mensa_location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingLlm, FixedLlm};

    fn registry() -> MensaRegistry {
        MensaRegistry::default()
    }

    #[tokio::test]
    async fn structured_reply_becomes_an_intent() {
        let llm = FixedLlm::new(
            r#"Sure! {"command": "menu", "date": "2025-03-14", "mensa_location": null}"#,
        );
        let intent = classify_with_llm("was läuft freitag", &llm, &registry()).await;
        assert_eq!(intent.command, Command::Menu);
        assert_eq!(
            intent.date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
        );
        assert_eq!(intent.mensa_location, None);
    }

    #[tokio::test]
    async fn location_is_taken_verbatim_from_the_reply() {
        let llm = FixedLlm::new(
            r#"{"command": "mensa", "date": null, "mensa_location": "Griebnitzsee"}"#,
        );
        let intent = classify_with_llm("andere mensa bitte", &llm, &registry()).await;
        assert_eq!(intent.command, Command::SetMensa);
        assert_eq!(intent.mensa_location, Some("Griebnitzsee".to_string()));
    }

    #[tokio::test]
    async fn missing_command_defaults_to_unknown() {
        let llm = FixedLlm::new(r#"{"date": null, "mensa_location": null}"#);
        let intent = classify_with_llm("hm", &llm, &registry()).await;
        assert_eq!(intent.command, Command::Unknown);
    }

    #[tokio::test]
    async fn invocation_failure_falls_back_to_rules() {
        let llm = FailingLlm;
        let text = "Zeig mir das Menü";
        let intent = classify_with_llm(text, &llm, &registry()).await;
        assert_eq!(intent, rules::classify(text, &registry()));
        assert_eq!(intent.command, Command::Menu);
    }

    #[tokio::test]
    async fn json_free_reply_falls_back_to_rules() {
        let llm = FixedLlm::new("I cannot classify that, sorry.");
        let text = "Wie spät ist es?";
        let intent = classify_with_llm(text, &llm, &registry()).await;
        assert_eq!(intent, rules::classify(text, &registry()));
        assert_eq!(intent.command, Command::Chat);
    }
}
