//! Registry of supported mensa locations and their OpenMensa identifiers.

use std::fmt;

/// Fixed mapping from mensa location names to OpenMensa canteen ids.
///
/// Any location accepted by the pipeline must exist here; unregistered names
/// surface as [`MensaLookupError`], never as a silent default.
#[derive(Debug, Clone)]
pub struct MensaRegistry {
    entries: Vec<(&'static str, u32)>,
}

impl Default for MensaRegistry {
    fn default() -> Self {
        Self {
            entries: vec![("Kiepenheuerallee", 57), ("Griebnitzsee", 62)],
        }
    }
}

impl MensaRegistry {
    /// OpenMensa id for a location. Case-insensitive.
    pub fn id_for(&self, name: &str) -> Result<u32, MensaLookupError> {
        self.entries
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
            .ok_or_else(|| MensaLookupError {
                name: name.to_string(),
            })
    }

    /// Canonical spelling for a location. Case-insensitive.
    pub fn canonical_name(&self, name: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .map(|(registered, _)| *registered)
    }

    /// Registered location names in canonical spelling.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Comma-separated canonical names, for prompts and user-facing hints.
    pub fn names_joined(&self) -> String {
        self.names().collect::<Vec<_>>().join(", ")
    }

    /// Scan free text for any registered location name. Returns the
    /// lowercased name when found.
    pub fn find_in_text(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        self.names()
            .map(|name| name.to_lowercase())
            .find(|name| lower.contains(name.as_str()))
    }
}

/// Lookup failure for a location not present in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MensaLookupError {
    pub name: String,
}

impl fmt::Display for MensaLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unbekannte Mensa: {}", self.name)
    }
}

impl std::error::Error for MensaLookupError {}
