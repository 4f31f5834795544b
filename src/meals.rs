//! LLM-assisted meal tagging and menu report formatting.
//!
//! Every failure path here degrades to user-facing German text or an
//! "unknown" tag; nothing in this module returns an error to the caller.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::dates::format_date_for_display;
use crate::mensa::MensaRegistry;
use crate::openmensa::OpenMensaClient;
use crate::providers::{extract_json_object, LlmClient};

const FALLBACK_EMOJI: &str = "🍽️";

const MEAL_CLASSIFICATION_PROMPT: &str = "\
You are a helpful assistant that classifies meals as vegetarian or non-vegetarian.
Analyze the meal name and ingredients to determine if it's vegetarian.
Respond in JSON format as follows:
{
    \"type\": \"vegetarian\" or \"non-vegetarian\",
    \"emojis\": [\"emoji1\", \"emoji2\", \"emoji3\"]
}

Include 1-3 fitting food emojis. Note that the input text is German, but the
output should be in English. Choose appropriate emojis based on the
ingredients or type of dish.

Example 1:
Input: \"Spaghetti Bolognese\"
Output: {\"type\": \"non-vegetarian\", \"emojis\": [\"🍝\", \"🥩\"]}

Example 2:
Input: \"Kartoffeln mit Spiegelei\"
Output: {\"type\": \"vegetarian\", \"emojis\": [\"🥔\", \"🍳\"]}

Example 3:
Input: \"Hamburger\"
Output: {\"type\": \"non-vegetarian\", \"emojis\": [\"🍔\"]}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealKind {
    Vegetarian,
    NonVegetarian,
    Unknown,
}

/// Tag a meal as vegetarian or not, with 1-3 food emojis. Any failure
/// (invocation error, missing JSON, an unexpected type) yields
/// `(Unknown, 🍽️)`.
pub async fn classify_meal(meal_name: &str, llm: &dyn LlmClient) -> (MealKind, String) {
    match try_classify(meal_name, llm).await {
        Some(result) => result,
        None => (MealKind::Unknown, FALLBACK_EMOJI.to_string()),
    }
}

async fn try_classify(meal_name: &str, llm: &dyn LlmClient) -> Option<(MealKind, String)> {
    let user_message = format!(
        "Classify this meal as vegetarian or non-vegetarian: {}",
        meal_name
    );
    let raw = match llm.complete(MEAL_CLASSIFICATION_PROMPT, &user_message).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, meal = meal_name, "Meal classification failed");
            return None;
        }
    };

    let value: serde_json::Value = serde_json::from_str(extract_json_object(&raw)?).ok()?;
    let kind = match value.get("type").and_then(|v| v.as_str())? {
        "vegetarian" => MealKind::Vegetarian,
        "non-vegetarian" => MealKind::NonVegetarian,
        _ => return None,
    };
    let emojis = value
        .get("emojis")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|e| e.as_str()).collect::<String>())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_EMOJI.to_string());

    Some((kind, emojis))
}

/// Fetch, classify, and format the menu for a mensa and date. Errors come
/// back as user-facing German text, never as `Err`.
pub async fn menu_report(
    registry: &MensaRegistry,
    client: &OpenMensaClient,
    llm: &dyn LlmClient,
    mensa_name: &str,
    date: NaiveDate,
    excluded_categories: &[String],
) -> String {
    let display_date = format_date_for_display(date);
    let header = format!(
        "Gerichte in der Mensa {} am {}:\n{}",
        mensa_name,
        display_date,
        "=".repeat(35)
    );

    let canteen_id = match registry.id_for(mensa_name) {
        Ok(id) => id,
        Err(e) => return format!("{}\n{}", header, e),
    };

    match client.is_closed(canteen_id, date).await {
        Ok(true) => {
            return format!(
                "{}\nDie Mensa {} ist am {} geschlossen.",
                header, mensa_name, display_date
            )
        }
        Ok(false) => {}
        Err(e) => {
            return format!(
                "{}\nGerichte für {} konnten nicht abgerufen werden: {}",
                header, display_date, e
            )
        }
    }

    let meals = match client.meals(canteen_id, date, excluded_categories).await {
        Ok(meals) => meals,
        Err(e) => {
            return format!(
                "{}\nGerichte für {} konnten nicht abgerufen werden: {}",
                header, display_date, e
            )
        }
    };
    if meals.is_empty() {
        return format!("{}\nKeine Gerichte für den {} verfügbar.", header, display_date);
    }

    let mut vegetarian: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut non_vegetarian: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for meal in meals {
        let (kind, emojis) = classify_meal(&meal.name, llm).await;
        let line = format!("{} {} ({:.2}€)", emojis, meal.name, meal.price);
        // Unknown goes to the non-vegetarian section, the safe default for
        // anyone filtering on the vegetarian one.
        let bucket = if kind == MealKind::Vegetarian {
            &mut vegetarian
        } else {
            &mut non_vegetarian
        };
        bucket.entry(meal.category).or_default().push(line);
    }

    let mut output = vec![header];
    output.push(format_section("🥦 VEGETARISCHE GERICHTE", &vegetarian));
    output.push(format_section("🥩 NICHT-VEGETARISCHE GERICHTE", &non_vegetarian));
    output.join("\n")
}

fn format_section(title: &str, groups: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = format!("\n{}\n{}", title, "-".repeat(50));
    for (category, meals) in groups {
        out.push_str(&format!("\n\n{}:", category));
        for meal in meals {
            out.push_str(&format!("\n  • {}", meal));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingLlm, FixedLlm};

    #[tokio::test]
    async fn structured_reply_tags_the_meal() {
        let llm = FixedLlm::new(r#"{"type": "vegetarian", "emojis": ["🥔", "🍳"]}"#);
        let (kind, emojis) = classify_meal("Kartoffeln mit Spiegelei", &llm).await;
        assert_eq!(kind, MealKind::Vegetarian);
        assert_eq!(emojis, "🥔🍳");
    }

    #[tokio::test]
    async fn commentary_around_the_json_is_tolerated() {
        let llm = FixedLlm::new(r#"Here you go: {"type": "non-vegetarian", "emojis": ["🍔"]}"#);
        let (kind, emojis) = classify_meal("Hamburger", &llm).await;
        assert_eq!(kind, MealKind::NonVegetarian);
        assert_eq!(emojis, "🍔");
    }

    #[tokio::test]
    async fn missing_emojis_use_the_fallback() {
        let llm = FixedLlm::new(r#"{"type": "vegetarian"}"#);
        let (kind, emojis) = classify_meal("Salat", &llm).await;
        assert_eq!(kind, MealKind::Vegetarian);
        assert_eq!(emojis, FALLBACK_EMOJI);
    }

    #[tokio::test]
    async fn invalid_type_and_failures_degrade_to_unknown() {
        for llm in [
            &FixedLlm::new(r#"{"type": "pescetarian", "emojis": ["🐟"]}"#) as &dyn LlmClient,
            &FixedLlm::new("no json at all"),
            &FailingLlm,
        ] {
            let (kind, emojis) = classify_meal("Mysteriöses Gericht", llm).await;
            assert_eq!(kind, MealKind::Unknown);
            assert_eq!(emojis, FALLBACK_EMOJI);
        }
    }

    #[test]
    fn sections_group_meals_by_category() {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        groups
            .entry("Angebot 1".to_string())
            .or_default()
            .push("🍝🥩 Spaghetti Bolognese (3.50€)".to_string());
        let section = format_section("🥩 NICHT-VEGETARISCHE GERICHTE", &groups);
        assert!(section.contains("🥩 NICHT-VEGETARISCHE GERICHTE"));
        assert!(section.contains("\n\nAngebot 1:"));
        assert!(section.contains("\n  • 🍝🥩 Spaghetti Bolognese (3.50€)"));
    }
}
