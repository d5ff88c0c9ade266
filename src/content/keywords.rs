use std::collections::HashMap;

/// Average adult reading speed used when nothing else is configured.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Maximum number of tags suggested for a page.
pub const MAX_SUGGESTED_TAGS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Minutes needed to read `text`, rounded up. Empty text takes zero minutes.
pub fn estimate_reading_time(text: &str, words_per_minute: u32) -> u32 {
    let words = text.split_whitespace().count() as u32;
    words.div_ceil(words_per_minute.max(1))
}

/// Picks the most frequent meaningful words of `text` as tag suggestions.
///
/// Words are lower-cased and stripped of surrounding punctuation; words of
/// three characters or fewer and stop words are ignored. Ties keep the order
/// in which words first appeared.
pub fn suggest_tags(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    for word in text.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() <= 3 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        let next_rank = counts.len();
        counts.entry(word).or_insert((0, next_rank)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first_seen))| (word, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(MAX_SUGGESTED_TAGS)
        .map(|(word, _, _)| word)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reading_time_rounds_up() {
        let text = "word ".repeat(201);
        assert_eq!(estimate_reading_time(&text, 200), 2);
        assert_eq!(estimate_reading_time("one two", 200), 1);
    }

    #[test]
    fn test_reading_time_empty_text() {
        assert_eq!(estimate_reading_time("   ", 200), 0);
    }

    #[test]
    fn test_reading_time_zero_speed_does_not_panic() {
        assert_eq!(estimate_reading_time("a b c", 0), 3);
    }

    #[test]
    fn test_suggest_tags_by_frequency() {
        let text = "rust rust rust tokio tokio async the the the the with with";
        assert_eq!(suggest_tags(text), vec!["rust", "tokio", "async"]);
    }

    #[test]
    fn test_suggest_tags_ties_keep_first_seen_order() {
        let text = "zeta alpha beta gamma delta epsilon";
        assert_eq!(
            suggest_tags(text),
            vec!["zeta", "alpha", "beta", "gamma", "delta"]
        );
    }

    #[test]
    fn test_suggest_tags_strips_punctuation_and_case() {
        let text = "Serde, serde. SERDE! json";
        assert_eq!(suggest_tags(text), vec!["serde", "json"]);
    }

    #[test]
    fn test_suggest_tags_skips_short_words() {
        assert!(suggest_tags("a an the cat dog").is_empty());
    }
}
