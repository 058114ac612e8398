//! Text cleaning shared by keyword extraction, topic matching, and the
//! prediction side of the system.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+|www\.\S+").unwrap());
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").unwrap());
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").unwrap());
static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\sáéíóúüñÁÉÍÓÚÜÑ]").unwrap());

/// Normalize raw mention text.
///
/// Lowercases, strips URL and @mention tokens, keeps hashtag words without
/// the `#`, applies NFKD, replaces everything outside the Latin
/// alphanumeric set with spaces, and collapses whitespace. The steps run
/// in exactly this order; combining marks produced by NFKD fall outside
/// the allowed set and become spaces.
pub fn clean(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_urls = URL_RE.replace_all(&lowered, "");
    let no_mentions = MENTION_RE.replace_all(&no_urls, "");
    let no_hashtags = HASHTAG_RE.replace_all(&no_mentions, "$1");
    let decomposed: String = no_hashtags.nfkd().collect();
    let spaced = NON_ALNUM_RE.replace_all(&decomposed, " ");
    spaced.split_whitespace().join(" ")
}

/// Tokenize cleaned text, keeping words longer than two characters.
pub fn tokens(text: &str) -> Vec<String> {
    clean(text)
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_urls_mentions_and_hashtag_markers() {
        assert_eq!(clean("Check http://x.co @bob #GreatDay"), "check greatday");
        assert_eq!(clean("#Great #Day @bob http://x.co"), "great day");
        assert_eq!(clean("see www.example.com now"), "see now");
    }

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(clean("  SO   Much;;; Noise!!! "), "so much noise");
    }

    #[test]
    fn folds_trailing_accents_to_ascii() {
        assert_eq!(clean("café"), "cafe");
    }

    #[test]
    fn empty_and_symbol_only_input_yield_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("!!! ... ???"), "");
    }

    #[test]
    fn tokens_drop_short_words() {
        assert_eq!(
            tokens("I am SO done with delays"),
            vec!["done", "with", "delays"]
        );
        assert!(tokens("a an to").is_empty());
    }

    #[test]
    fn tokens_survive_hashtags_and_mentions() {
        assert_eq!(tokens("@united #delayed again"), vec!["delayed", "again"]);
    }
}
