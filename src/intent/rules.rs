//! Deterministic rule-based message classification.
//!
//! Two modes: slash-command parsing against a bilingual synonym table, and
//! keyword regexes over lower-cased free text. Pure over the input text plus
//! the location registry.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Command, Intent};
use crate::mensa::MensaRegistry;

static HELP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(hilfe|befehle|kommandos|help|commands)\b").unwrap());
static MENU_KEYWORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(menü|menu|essen|speiseplan|mahlzeit|gerichte)\b").unwrap());
static MENU_COLLOQUIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(was gibt es|was gibt's)\b").unwrap());
static MENSA_CHANGE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "mensa griebnitzsee wechseln": allow one word between noun and verb
        Regex::new(r"\b(mensa|kantine)\s+(?:\w+\s+)?(?:wechseln|ändern|einstellen|setzen)\b")
            .unwrap(),
        Regex::new(r"\b(wechsle|ändere)\s+(?:die\s+|meine\s+)?mensa\b").unwrap(),
    ]
});
static SETTINGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(einstellungen|settings|konfiguration|config)\b").unwrap());
static RESTART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(neustart|restart|reset|zurücksetzen)\b").unwrap());

/// True when the text mentions menu vocabulary. The orchestrator uses this to
/// steer ambiguous messages into date resolution instead of full LLM
/// classification.
pub fn mentions_menu(text: &str) -> bool {
    MENU_KEYWORDS_RE.is_match(&text.to_lowercase())
}

/// Classify a message with the synonym table and keyword regexes alone.
pub fn classify(text: &str, registry: &MensaRegistry) -> Intent {
    if let Some(stripped) = text.strip_prefix('/') {
        return classify_command(stripped);
    }

    let lower = text.to_lowercase();

    if HELP_RE.is_match(&lower) {
        return Intent::new(Command::Help);
    }
    if MENU_KEYWORDS_RE.is_match(&lower) || MENU_COLLOQUIAL_RE.is_match(&lower) {
        return Intent::new(Command::Menu);
    }
    if MENSA_CHANGE_RES.iter().any(|re| re.is_match(&lower)) {
        let mut intent = Intent::new(Command::SetMensa);
        intent.mensa_location = registry.find_in_text(&lower);
        return intent;
    }
    if SETTINGS_RE.is_match(&lower) {
        return Intent::new(Command::Settings);
    }
    if RESTART_RE.is_match(&lower) {
        return Intent::new(Command::Restart);
    }

    Intent::new(Command::Chat)
}

/// Parse a slash command: first token picks the command, the rest become
/// arguments verbatim (dates for `menu`, a location for `mensa`).
fn classify_command(stripped: &str) -> Intent {
    let mut tokens = stripped.split_whitespace();
    let command = tokens.next().unwrap_or("").to_lowercase();
    let args: Vec<String> = tokens.map(str::to_string).collect();

    match command.as_str() {
        "start" | "hilfe" | "help" => Intent::new(Command::Help),
        "menu" | "menü" => Intent::with_args(Command::Menu, args),
        "mensa" => Intent::with_args(Command::SetMensa, args),
        "chat" => Intent::new(Command::Chat),
        "einstellungen" | "settings" => Intent::new(Command::Settings),
        "neustart" | "restart" => Intent::new(Command::Restart),
        _ => Intent::new(Command::Unknown),
    }
}
