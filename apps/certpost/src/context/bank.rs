//! Context bank — typical experiences and safe framing phrases, keyed by event type.
//!
//! Loaded once from `context.json`; read-only for the rest of the run.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One event type's entry in the bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub typical_experiences: Vec<String>,
    #[serde(default)]
    pub safe_framing: Vec<String>,
}

impl EventContext {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.typical_experiences.is_empty()
            && self.safe_framing.is_empty()
    }
}

/// The full bank. `BTreeMap` keeps prompt rendering stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBank {
    #[serde(default)]
    event_types: BTreeMap<String, EventContext>,
}

static EMPTY_CONTEXT: EventContext = EventContext {
    description: String::new(),
    typical_experiences: Vec::new(),
    safe_framing: Vec::new(),
};

impl ContextBank {
    /// Loads the bank from `path`. A missing file is an empty bank; malformed JSON is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "No context bank at {}, prompts will carry no event context",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read context bank {}", path.display()))?;
        let bank = Self::from_json(&raw)
            .with_context(|| format!("Context bank {} is not valid JSON", path.display()))?;

        debug!("Loaded context bank with {} event types", bank.len());
        Ok(bank)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Returns the entry for `event_type`, or an empty entry when the key is unknown.
    pub fn lookup(&self, event_type: &str) -> &EventContext {
        self.event_types
            .get(event_type)
            .unwrap_or(&EMPTY_CONTEXT)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.event_types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.event_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_types.is_empty()
    }

    /// Renders one event type as a prompt section. Empty string for an unknown key.
    pub fn render_entry(&self, event_type: &str) -> String {
        let entry = self.lookup(event_type);
        if entry.is_empty() {
            return String::new();
        }

        let mut out = format!("### {}\n", title_case(event_type));
        if !entry.description.is_empty() {
            out.push_str(&entry.description);
            out.push('\n');
        }
        if !entry.typical_experiences.is_empty() {
            out.push_str("Typical experiences:\n");
            for exp in &entry.typical_experiences {
                out.push_str(&format!("  - {exp}\n"));
            }
        }
        if !entry.safe_framing.is_empty() {
            out.push_str("Safe framing phrases:\n");
            for phrase in &entry.safe_framing {
                out.push_str(&format!("  - \"{phrase}\"\n"));
            }
        }
        out
    }

    /// Renders every event type, in key order, separated by blank lines.
    pub fn render_all(&self) -> String {
        self.event_types
            .keys()
            .map(|k| self.render_entry(k))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `hackathon_or_competition` → `Hackathon Or Competition`
fn title_case(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
