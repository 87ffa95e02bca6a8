//! Text canonicalization used to compare titles and artists across providers.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use url::Url;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").unwrap());

static NOISE_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:official|video|lyrics?|audio|mv|hd|uhd|4k|remaster(?:ed)?)\b").unwrap()
});

static FEATURE_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:feat|ft)\.|\b(?:feat|ft|featuring|with)\b").unwrap());

static TOPIC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s*-\s*topic\s*$").unwrap());

static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:[a-z][a-z0-9+.-]*://|www\.)\S*").unwrap());

/// URL words that say nothing about the song.
const STRUCTURAL_TOKENS: &[&str] = &[
    "youtube", "youtu", "watch", "v", "list", "feature", "si", "index", "t",
];

/// Lowercases, folds diacritics, turns dashes and underscores into spaces and
/// collapses whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '-' | '\u{2013}' | '\u{2014}' | '_' => ' ',
            other => other,
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes bracketed content, then keeps only what precedes the first `|`,
/// then drops marketing words and featuring markers.
pub fn strip_title_noise(title: &str) -> String {
    let title = BRACKETED.replace_all(title, " ");
    let title = title.split('|').next().unwrap_or_default();
    let title = NOISE_TOKENS.replace_all(title, " ");
    let title = FEATURE_MARKERS.replace_all(&title, " ");
    normalize(&title)
}

/// Drops the " - Topic" suffix of auto-generated YouTube channels.
pub fn strip_artist_noise(artist: &str) -> String {
    normalize(&TOPIC_SUFFIX.replace(artist, ""))
}

/// Turns a URL into search text built from its host, path and query words.
/// Input that does not parse as a URL has any embedded links removed instead.
pub fn deurl_to_text(input: &str) -> String {
    let Ok(url) = Url::parse(input.trim()) else {
        return normalize(&EMBEDDED_URL.replace_all(input, " "));
    };

    let mut words: Vec<String> = Vec::new();

    if let Some(host) = url.host_str() {
        let labels: Vec<&str> = host.trim_start_matches("www.").split('.').collect();
        // The top-level domain is dropped along with "www".
        let keep = if labels.len() > 1 { labels.len() - 1 } else { labels.len() };
        words.extend(labels[..keep].iter().map(|l| l.to_string()));
    }

    words.extend(
        url.path()
            .split(['/', '_'])
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace("%20", " ")),
    );

    for (key, value) in url.query_pairs() {
        words.push(key.into_owned());
        words.push(value.into_owned());
    }

    let text = normalize(&words.join(" "));
    text.split(' ')
        .filter(|token| !STRUCTURAL_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
