//! Message-intent resolution: a deterministic rule pass with LLM escalation
//! for ambiguous messages.
//!
//! The LLM is consulted only when the rule-based classifier is genuinely
//! uncertain (the message landed in `Chat`) and a client is available. Every failure path inside the
//! pipeline has a silent fallback; resolution never returns an error.

pub mod llm;
pub mod rules;

use std::fmt;

use chrono::NaiveDate;

use crate::dates;
use crate::mensa::MensaRegistry;
use crate::providers::LlmClient;

/// The closed set of commands a message can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Menu,
    SetMensa,
    Chat,
    Settings,
    Restart,
    Unknown,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Menu => "menu",
            Command::SetMensa => "mensa",
            Command::Chat => "chat",
            Command::Settings => "settings",
            Command::Restart => "restart",
            Command::Unknown => "unknown",
        }
    }

    /// Parse an LLM-provided command name. Unrecognized names map to `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "help" => Command::Help,
            "menu" => Command::Menu,
            "mensa" => Command::SetMensa,
            "chat" => Command::Chat,
            "settings" => Command::Settings,
            "restart" => Command::Restart,
            _ => Command::Unknown,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved meaning of a message. Immutable once constructed: `Menu` may carry
/// a date, `SetMensa` may carry a location, other commands carry neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub command: Command,
    pub args: Vec<String>,
    pub date: Option<NaiveDate>,
    pub mensa_location: Option<String>,
}

impl Intent {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            args: Vec::new(),
            date: None,
            mensa_location: None,
        }
    }

    pub fn with_args(command: Command, args: Vec<String>) -> Self {
        Self {
            command,
            args,
            date: None,
            mensa_location: None,
        }
    }
}

/// Resolve a raw message to a command plus argument list.
///
/// The rule-based classifier runs first. An ambiguous `Chat` result escalates
/// to date resolution (when menu vocabulary is present) or full LLM
/// classification. Post-processing then folds resolved dates and locations
/// into the argument list the command handlers consume.
pub async fn resolve_message(
    text: &str,
    llm: Option<&dyn LlmClient>,
    registry: &MensaRegistry,
) -> (Command, Vec<String>) {
    let mut intent = rules::classify(text, registry);

    if intent.command == Command::Chat {
        if let Some(llm) = llm {
            if rules::mentions_menu(text) {
                // Likely a menu request whose date phrasing the rules missed.
                let date = dates::resolve_date(text, Some(llm)).await;
                intent = Intent {
                    command: Command::Menu,
                    args: Vec::new(),
                    date: Some(date),
                    mensa_location: None,
                };
            } else {
                intent = llm::classify_with_llm(text, llm, registry).await;
            }
        }
    }

    match intent.command {
        Command::Menu => {
            if let Some(date) = intent.date {
                (Command::Menu, vec![dates::canonical(date)])
            } else if let Some(llm) = llm {
                let date = dates::resolve_date(text, Some(llm)).await;
                (Command::Menu, vec![dates::canonical(date)])
            } else {
                (Command::Menu, intent.args)
            }
        }
        Command::SetMensa => {
            if let Some(location) = intent.mensa_location {
                (Command::SetMensa, vec![location])
            } else if let Some(location) = registry.find_in_text(text) {
                (Command::SetMensa, vec![location])
            } else {
                (Command::SetMensa, intent.args)
            }
        }
        command => (command, intent.args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::canonical;
    use crate::testing::{FailingLlm, FixedLlm};
    use chrono::Local;

    fn registry() -> MensaRegistry {
        MensaRegistry::default()
    }

    #[tokio::test]
    async fn slash_commands_never_escalate() {
        let llm = FailingLlm;
        let (command, args) =
            resolve_message("/hilfe", Some(&llm), &registry()).await;
        assert_eq!(command, Command::Help);
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn explicit_menu_date_is_idempotent_with_and_without_llm() {
        let llm = FixedLlm::new("1999-01-01"); // must never be consulted for the date
        for llm_opt in [None, Some(&llm as &dyn crate::providers::LlmClient)] {
            let (command, args) =
                resolve_message("/menu 2025-03-10", llm_opt, &registry()).await;
            assert_eq!(command, Command::Menu);
            assert_eq!(args, vec!["2025-03-10".to_string()]);
        }
    }

    #[tokio::test]
    async fn menu_keywords_without_llm_keep_empty_args() {
        let (command, args) =
            resolve_message("Was gibt es heute zu essen?", None, &registry()).await;
        assert_eq!(command, Command::Menu);
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn menu_keywords_with_llm_resolve_a_date() {
        // "heute" is resolved by the relative matcher; the LLM is never called.
        let llm = FailingLlm;
        let (command, args) =
            resolve_message("Was gibt es heute zu essen?", Some(&llm), &registry()).await;
        assert_eq!(command, Command::Menu);
        assert_eq!(args, vec![canonical(Local::now().date_naive())]);
    }

    #[tokio::test]
    async fn mensa_change_free_text_extracts_location() {
        let (command, args) = resolve_message(
            "Ich möchte zur Mensa Griebnitzsee wechseln",
            None,
            &registry(),
        )
        .await;
        assert_eq!(command, Command::SetMensa);
        assert_eq!(args, vec!["griebnitzsee".to_string()]);
    }

    #[tokio::test]
    async fn unknown_location_passes_through_for_downstream_validation() {
        let (command, args) = resolve_message("/mensa Unknownplace", None, &registry()).await;
        assert_eq!(command, Command::SetMensa);
        assert_eq!(args, vec!["Unknownplace".to_string()]);
    }

    #[tokio::test]
    async fn ambiguous_chat_escalates_to_llm_classification() {
        let llm = FixedLlm::new(
            r#"{"command": "settings", "date": null, "mensa_location": null}"#,
        );
        let (command, args) =
            resolve_message("Wo kann ich was anpassen?", Some(&llm), &registry()).await;
        assert_eq!(command, Command::Settings);
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_rule_result() {
        let llm = FailingLlm;
        let (command, args) =
            resolve_message("Wie spät ist es?", Some(&llm), &registry()).await;
        // Full fallback: same outcome as the rule-based classifier alone.
        assert_eq!(command, Command::Chat);
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn chat_stays_chat_without_llm() {
        let (command, args) = resolve_message("Wie spät ist es?", None, &registry()).await;
        assert_eq!(command, Command::Chat);
        assert!(args.is_empty());
    }

    #[test]
    fn command_parse_round_trips() {
        for command in [
            Command::Help,
            Command::Menu,
            Command::SetMensa,
            Command::Chat,
            Command::Settings,
            Command::Restart,
        ] {
            assert_eq!(Command::parse(command.as_str()), command);
        }
        assert_eq!(Command::parse("frobnicate"), Command::Unknown);
    }
}
