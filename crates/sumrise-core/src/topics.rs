//! Human-readable labels for topic slugs.

use std::collections::BTreeSet;

const MINOR_WORDS: &[&str] = &[
    "and", "or", "of", "the", "a", "an", "to", "in", "on", "for", "with", "by",
];

/// Slugs whose label can't be derived mechanically.
const LABEL_OVERRIDES: &[(&str, &str)] = &[("order-of-operations", "Order of Operations")];

/// Label for a topic slug; `None` or an empty slug means every topic.
pub fn topic_label(slug: Option<&str>) -> String {
    let Some(slug) = slug.filter(|s| !s.is_empty()) else {
        return "All topics".to_string();
    };
    if let Some((_, label)) = LABEL_OVERRIDES.iter().find(|(s, _)| *s == slug) {
        return label.to_string();
    }

    let spaced = slug.replace(['-', '_'], " ").to_lowercase();
    spaced
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && MINOR_WORDS.contains(&word) {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Unique `(slug, label)` pairs sorted by label.
pub fn topic_options<'a>(slugs: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
    let unique: BTreeSet<&str> = slugs.into_iter().filter(|s| !s.is_empty()).collect();
    let mut options: Vec<(String, String)> = unique
        .into_iter()
        .map(|s| (s.to_string(), topic_label(Some(s))))
        .collect();
    options.sort_by(|a, b| a.1.cmp(&b.1));
    options
}
