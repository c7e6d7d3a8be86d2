//! Event classification — decides which context-bank entry a certificate belongs to.
//!
//! Pluggable, trait-based. The pipeline holds an `Arc<dyn EventClassifier>` so the
//! classification strategy can change without touching the lookup or the generator.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::context::bank::ContextBank;

/// What a classifier gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    /// Certificate filename without extension.
    pub file_stem: &'a str,
    pub notes: Option<&'a str>,
}

#[async_trait]
pub trait EventClassifier: Send + Sync {
    /// Returns a bank key, or `None` when no event type fits.
    async fn classify(&self, input: ClassifyInput<'_>, bank: &ContextBank) -> Option<String>;
}

/// Matches bank keys against the words of the filename and notes.
///
/// A key matches when every word of it (split on `_`/`-`) appears in the input.
/// Among matches the key with the most words wins; ties go to the first key in order.
pub struct KeywordEventClassifier;

#[async_trait]
impl EventClassifier for KeywordEventClassifier {
    async fn classify(&self, input: ClassifyInput<'_>, bank: &ContextBank) -> Option<String> {
        classify_by_keywords(input, bank)
    }
}

fn classify_by_keywords(input: ClassifyInput<'_>, bank: &ContextBank) -> Option<String> {
    let mut haystack = tokenize(input.file_stem);
    if let Some(notes) = input.notes {
        haystack.extend(tokenize(notes));
    }
    if haystack.is_empty() {
        return None;
    }

    let mut best: Option<(&str, usize)> = None;
    for key in bank.event_types() {
        let words = tokenize(key);
        if words.is_empty() || !words.iter().all(|w| haystack.contains(w)) {
            continue;
        }
        if best.map_or(true, |(_, n)| words.len() > n) {
            best = Some((key, words.len()));
        }
    }

    best.map(|(key, _)| key.to_string())
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
