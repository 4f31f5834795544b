mod error;
mod openai_compatible;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

pub use error::{ProviderError, ProviderErrorKind};
pub use openai_compatible::OpenAiCompatibleProvider;

/// Single-turn text completion backed by an LLM.
///
/// The intent pipeline treats this as an injected capability: hand in a
/// system prompt plus the user message, get raw text back. Failures are
/// surfaced as errors and recovered by the deterministic fallbacks; no
/// streaming is required.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String>;
}

/// Build an HTTP client with a panic-safe fallback when system proxy discovery
/// is unavailable in the runtime environment.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, String> {
    // Test environments (and some constrained runtimes) can panic inside
    // macOS system proxy discovery. Skip that code path entirely for tests.
    if cfg!(test)
        || matches!(
            std::env::var("MENSABOT_DISABLE_SYSTEM_PROXY_DISCOVERY").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        )
    {
        return Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e));
    }

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Client::builder().timeout(timeout).build()
    })) {
        Ok(Ok(client)) => return Ok(client),
        Ok(Err(e)) => {
            warn!(
                error = %e,
                "HTTP client build with system proxy support failed; retrying with proxy discovery disabled"
            );
        }
        Err(_) => {
            warn!(
                "HTTP client build panicked during system proxy discovery; retrying with proxy discovery disabled"
            );
        }
    }

    Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Extract the first brace-delimited JSON object from LLM output, tolerating
/// surrounding commentary. Returns the object slice including both braces.
pub(crate) fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_object() {
        assert_eq!(
            extract_json_object(r#"{"command": "menu"}"#),
            Some(r#"{"command": "menu"}"#)
        );
    }

    #[test]
    fn extracts_object_from_commentary() {
        let raw = r#"Sure! Here is the classification: {"command": "menu", "date": null} Hope that helps."#;
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{"command": "menu", "date": null}"#)
        );
    }

    #[test]
    fn handles_nested_objects_and_braces_in_strings() {
        let raw = r#"{"outer": {"inner": "has a } brace"}} trailing"#;
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{"outer": {"inner": "has a } brace"}}"#)
        );
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{unterminated"), None);
    }
}
