//! Keyword capability matching and destination extraction.

use crate::types::Capability;

use super::CapabilityMatcher;

const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "forecast",
    "rain",
    "rainy",
    "raining",
    "sunny",
    "snow",
    "snowy",
    "climate",
];

const ATTRACTION_KEYWORDS: &[&str] = &[
    "attraction",
    "attractions",
    "sightseeing",
    "sights",
    "museum",
    "museums",
    "landmark",
    "landmarks",
    "visit",
    "recommend",
    "tour",
];

/// Words that introduce a destination, e.g. "weather in Beijing".
const DESTINATION_PREPOSITIONS: &[&str] = &["in", "to", "at", "for", "around", "near"];

/// Case-insensitive whole-word keyword matcher. Capabilities come back
/// ordered by where their first keyword appears in the text, left to right.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher;

impl KeywordMatcher {
    pub fn new() -> Self {
        Self
    }

    fn first_mention(words: &[String], keywords: &[&str]) -> Option<usize> {
        words
            .iter()
            .position(|word| keywords.contains(&word.as_str()))
    }
}

impl CapabilityMatcher for KeywordMatcher {
    fn detect(&self, text: &str) -> Vec<Capability> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|word| trim_punctuation(word).to_lowercase())
            .collect();

        let mut found: Vec<(usize, Capability)> = Vec::new();
        if let Some(position) = Self::first_mention(&words, WEATHER_KEYWORDS) {
            found.push((position, Capability::Weather));
        }
        if let Some(position) = Self::first_mention(&words, ATTRACTION_KEYWORDS) {
            found.push((position, Capability::Attractions));
        }
        found.sort_by_key(|(position, _)| *position);
        found
            .into_iter()
            .map(|(_, capability)| capability)
            .collect()
    }
}

/// Pull a destination out of free text: the capitalized phrase following a
/// destination preposition ("weather in New York" -> "New York"), falling
/// back to the first capitalized phrase that does not open the text.
pub fn extract_destination(text: &str) -> Option<String> {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(trim_punctuation)
        .filter(|word| !word.is_empty())
        .collect();

    for (index, word) in words.iter().enumerate() {
        let lowered = word.to_lowercase();
        if DESTINATION_PREPOSITIONS.contains(&lowered.as_str()) {
            if let Some(phrase) = capitalized_phrase(&words, index + 1) {
                return Some(phrase);
            }
        }
    }

    // No preposition introduced the place; take the first capitalized phrase
    // past the opening word.
    for index in 1..words.len() {
        if let Some(phrase) = capitalized_phrase(&words, index) {
            return Some(phrase);
        }
    }
    None
}

fn capitalized_phrase(words: &[&str], start: usize) -> Option<String> {
    let mut phrase: Vec<&str> = Vec::new();
    for word in words.iter().skip(start) {
        if is_capitalized(word) && *word != "I" {
            phrase.push(word);
        } else {
            break;
        }
    }
    if phrase.is_empty() {
        None
    } else {
        Some(phrase.join(" "))
    }
}

fn is_capitalized(word: &str) -> bool {
    word.chars()
        .next()
        .map(|first| first.is_uppercase())
        .unwrap_or(false)
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|character: char| !character.is_alphanumeric())
}
