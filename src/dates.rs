//! Natural-language date resolution for menu queries.
//!
//! Resolution is layered: an explicit `YYYY-MM-DD` token or a cheap keyword /
//! weekday match wins outright, an optional LLM extraction pass handles the
//! rest, and today's date is the universal fallback. The resolver never fails.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::providers::LlmClient;

/// Canonical date form used throughout the pipeline.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

static EXPLICIT_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());
static TODAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(heute|today)\b").unwrap());
static TOMORROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(morgen|tomorrow)\b").unwrap());
static DAY_AFTER_TOMORROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(übermorgen|day after tomorrow)\b").unwrap());

/// Weekday names recognized in German and English queries.
const WEEKDAYS: [(&str, Weekday); 14] = [
    ("montag", Weekday::Mon),
    ("dienstag", Weekday::Tue),
    ("mittwoch", Weekday::Wed),
    ("donnerstag", Weekday::Thu),
    ("freitag", Weekday::Fri),
    ("samstag", Weekday::Sat),
    ("sonntag", Weekday::Sun),
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Format a date in canonical `YYYY-MM-DD` form.
pub fn canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

/// Resolve a natural-language date expression against the current day.
pub async fn resolve_date(query: &str, llm: Option<&dyn LlmClient>) -> NaiveDate {
    resolve_date_on(query, Local::now().date_naive(), llm).await
}

pub(crate) async fn resolve_date_on(
    query: &str,
    today: NaiveDate,
    llm: Option<&dyn LlmClient>,
) -> NaiveDate {
    if let Some(date) = resolve_relative(query, today) {
        return date;
    }
    if let Some(llm) = llm {
        if let Some(date) = resolve_with_llm(query, today, llm).await {
            return date;
        }
    }
    today
}

/// Explicit-date, keyword, and weekday matching. No LLM involved.
pub(crate) fn resolve_relative(query: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = query.to_lowercase();

    if let Some(m) = EXPLICIT_DATE_RE.captures(&lower) {
        if let Ok(date) = NaiveDate::parse_from_str(&m[1], CANONICAL_FORMAT) {
            return Some(date);
        }
    }
    if TODAY_RE.is_match(&lower) {
        return Some(today);
    }
    if TOMORROW_RE.is_match(&lower) {
        return Some(today + Duration::days(1));
    }
    if DAY_AFTER_TOMORROW_RE.is_match(&lower) {
        return Some(today + Duration::days(2));
    }
    for (name, weekday) in WEEKDAYS {
        if lower.contains(name) {
            return Some(next_occurrence(today, weekday));
        }
    }
    None
}

/// The next calendar date falling on `target`, strictly after `today`.
/// A weekday naming today's weekday means next week, never today.
fn next_occurrence(today: NaiveDate, target: Weekday) -> NaiveDate {
    let mut days_ahead = target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64;
    if days_ahead <= 0 {
        days_ahead += 7;
    }
    today + Duration::days(days_ahead)
}

fn extraction_prompt(today: NaiveDate) -> String {
    format!(
        "You are a helpful assistant that extracts date information from text.\n\
         Extract the date mentioned in the user's query relative to today.\n\
         Today's date is {today}.\n\
         \n\
         Important rules:\n\
         1. ALWAYS use the current year ({year}) unless explicitly specified otherwise\n\
         2. For weekdays, find the NEXT occurrence of that day\n\
         3. For relative days (e.g., \"morgen\", \"übermorgen\", \"tomorrow\"), calculate from today\n\
         4. For specific dates (e.g., \"23. Mai\"), use the current or next occurrence\n\
         \n\
         Respond ONLY with the date in YYYY-MM-DD format. \
         If no date is mentioned, respond with today's date.",
        today = canonical(today),
        year = today.year(),
    )
}

async fn resolve_with_llm(
    query: &str,
    today: NaiveDate,
    llm: &dyn LlmClient,
) -> Option<NaiveDate> {
    let user_message = format!("Extract the date from: '{}'", query);
    let raw = match llm.complete(&extraction_prompt(today), &user_message).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "LLM date extraction failed");
            return None;
        }
    };
    let parsed = match NaiveDate::parse_from_str(raw.trim(), CANONICAL_FORMAT) {
        Ok(date) => date,
        Err(e) => {
            debug!(error = %e, raw = %raw.trim(), "LLM returned an unparseable date");
            return None;
        }
    };
    if parsed < today {
        // A date without a year that already passed means its next occurrence.
        return parsed.with_year(today.year() + 1);
    }
    Some(parsed)
}

/// German weekday name for a date.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

/// Display form used in bot replies, e.g. "Montag, 10.03.2025".
pub fn format_date_for_display(date: NaiveDate) -> String {
    format!("{}, {}", weekday_name(date), date.format("%d.%m.%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingLlm, FixedLlm};

    // A Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[tokio::test]
    async fn today_synonyms_resolve_to_today() {
        let today = monday();
        for query in ["heute", "today", "Was gibt es heute zu essen?"] {
            assert_eq!(resolve_date_on(query, today, None).await, today);
        }
    }

    #[tokio::test]
    async fn tomorrow_and_day_after() {
        let today = monday();
        assert_eq!(
            resolve_date_on("menü für morgen", today, None).await,
            today + Duration::days(1)
        );
        assert_eq!(
            resolve_date_on("essen übermorgen", today, None).await,
            today + Duration::days(2)
        );
        // "übermorgen" must not be shadowed by the "morgen" token.
        assert_eq!(
            resolve_date_on("übermorgen", today, None).await,
            today + Duration::days(2)
        );
    }

    #[tokio::test]
    async fn weekday_matching_today_advances_a_full_week() {
        let today = monday();
        assert_eq!(
            resolve_date_on("Menü für Montag", today, None).await,
            today + Duration::days(7)
        );
    }

    #[tokio::test]
    async fn other_weekdays_stay_within_the_week() {
        let today = monday();
        for (query, offset) in [
            ("dienstag", 1),
            ("mittwoch", 2),
            ("donnerstag", 3),
            ("freitag", 4),
            ("samstag", 5),
            ("sonntag", 6),
        ] {
            assert_eq!(
                resolve_date_on(query, today, None).await,
                today + Duration::days(offset),
                "query: {}",
                query
            );
        }
    }

    #[tokio::test]
    async fn explicit_canonical_date_wins() {
        let today = monday();
        let resolved = resolve_date_on("/menu 2025-03-14", today, None).await;
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[tokio::test]
    async fn no_pattern_and_no_llm_defaults_to_today() {
        let today = monday();
        assert_eq!(resolve_date_on("irgendwas anderes", today, None).await, today);
    }

    #[tokio::test]
    async fn llm_date_is_used_when_rules_miss() {
        let today = monday();
        let llm = FixedLlm::new("2025-05-23");
        let resolved = resolve_date_on("essen am 23. Mai", today, Some(&llm)).await;
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2025, 5, 23).unwrap());
    }

    #[tokio::test]
    async fn past_llm_date_rolls_into_next_year() {
        let today = monday();
        let llm = FixedLlm::new("2025-01-02");
        let resolved = resolve_date_on("essen am 2. Januar", today, Some(&llm)).await;
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
    }

    #[tokio::test]
    async fn unparseable_llm_output_falls_back_to_today() {
        let today = monday();
        let llm = FixedLlm::new("next Friday, probably");
        assert_eq!(resolve_date_on("am Feiertag", today, Some(&llm)).await, today);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_today() {
        let today = monday();
        let llm = FailingLlm;
        assert_eq!(resolve_date_on("am Feiertag", today, Some(&llm)).await, today);
    }

    #[test]
    fn display_formatting() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(weekday_name(date), "Montag");
        assert_eq!(format_date_for_display(date), "Montag, 10.03.2025");
        assert_eq!(canonical(date), "2025-03-10");
    }

    mod proptest_weekdays {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn weekday_queries_land_strictly_ahead(day_offset in 0i64..3650, name_idx in 0usize..14) {
                let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                let today = base + Duration::days(day_offset);
                let (name, weekday) = WEEKDAYS[name_idx];
                let resolved = resolve_relative(name, today).unwrap();
                let ahead = (resolved - today).num_days();
                prop_assert!(ahead >= 1 && ahead <= 7);
                prop_assert_eq!(resolved.weekday(), weekday);
                if today.weekday() == weekday {
                    prop_assert_eq!(ahead, 7);
                }
            }

            #[test]
            fn resolver_never_panics(query in "\\PC{0,80}", day_offset in 0i64..3650) {
                let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                let _ = resolve_relative(&query, base + Duration::days(day_offset));
            }
        }
    }
}
