//! Text clean-up for user-written posts and comments.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Words masked by [`filter_sensitive_words`].
pub const DEFAULT_SENSITIVE_WORDS: [&str; 3] = ["MD", "鉴证", "你妈"];

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Each punctuation class and the full-width mark it is normalised to.
/// Whitespace following the mark is dropped.
static PUNCTUATION: LazyLock<[(Regex, &'static str); 4]> = LazyLock::new(|| {
    [
        (Regex::new(r"[,，]\s*").expect("valid regex"), "，"),
        (Regex::new(r"[.。]\s*").expect("valid regex"), "。"),
        (Regex::new(r"[!！]\s*").expect("valid regex"), "！"),
        (Regex::new(r"[?？]\s*").expect("valid regex"), "？"),
    ]
});

/// A tag that can be suggested for a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTag {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl ContentTag {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedContent {
    pub processed_content: String,
    pub suggested_tags: Vec<ContentTag>,
}

/// Steps run by [`process_content`], in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentOptions {
    pub filter_sensitive: bool,
    pub format: bool,
    pub format_paragraphs: bool,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            filter_sensitive: true,
            format: true,
            format_paragraphs: true,
        }
    }
}

/// Mask every case-insensitive occurrence of each word with one `*` per
/// character.
pub fn filter_words(content: &str, words: &[&str]) -> String {
    let mut filtered = content.to_string();
    for word in words.iter().filter(|w| !w.is_empty()) {
        let Ok(pattern) = RegexBuilder::new(&regex::escape(word))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        let mask = "*".repeat(word.chars().count());
        filtered = pattern.replace_all(&filtered, mask.as_str()).into_owned();
    }
    filtered
}

pub fn filter_sensitive_words(content: &str) -> String {
    filter_words(content, &DEFAULT_SENSITIVE_WORDS)
}

/// Collapse whitespace runs to one space and normalise punctuation to its
/// full-width form.
pub fn format_text(content: &str) -> String {
    let mut formatted = WHITESPACE_RUN.replace_all(content, " ").into_owned();
    for (pattern, mark) in PUNCTUATION.iter() {
        formatted = pattern.replace_all(&formatted, *mark).into_owned();
    }
    formatted
}

/// Split on blank lines, trim each paragraph, drop empty ones and join them
/// back with a single blank line.
pub fn format_paragraphs(content: &str) -> String {
    PARAGRAPH_BREAK
        .split(content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Case-insensitive whole-word matcher for `needle`, using ASCII word
/// characters: a word edge of the needle must meet a non-word character or
/// the end of the text, a non-word edge must meet a word character.
fn whole_word_regex(needle: &str) -> Option<Regex> {
    let first = needle.chars().next()?;
    let last = needle.chars().next_back()?;
    let before = if is_word_char(first) { r"(?:^|[^0-9A-Za-z_])" } else { "[0-9A-Za-z_]" };
    let after = if is_word_char(last) { r"(?:$|[^0-9A-Za-z_])" } else { "[0-9A-Za-z_]" };
    RegexBuilder::new(&format!("{}{}{}", before, regex::escape(needle), after))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Suggest every tag whose value appears in `content` as a whole word.
/// The content itself is returned unchanged.
pub fn enhance_content(content: &str, tags: &[ContentTag]) -> EnhancedContent {
    let mut suggested_tags: Vec<ContentTag> = Vec::new();
    for tag in tags {
        let found = whole_word_regex(&tag.value).is_some_and(|re| re.is_match(content));
        if found && !suggested_tags.contains(tag) {
            suggested_tags.push(tag.clone());
        }
    }
    EnhancedContent {
        processed_content: content.to_string(),
        suggested_tags,
    }
}

pub fn process_content(content: &str, options: &ContentOptions) -> String {
    let mut processed = content.to_string();
    if options.filter_sensitive {
        processed = filter_sensitive_words(&processed);
    }
    if options.format {
        processed = format_text(&processed);
    }
    if options.format_paragraphs {
        processed = format_paragraphs(&processed);
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_case_insensitive() {
        assert_eq!(filter_sensitive_words("what the md is this MD"), "what the ** is this **");
        assert_eq!(filter_sensitive_words("不要鉴证"), "不要**");
        assert_eq!(filter_sensitive_words(""), "");
    }

    #[test]
    fn test_filter_escapes_words() {
        assert_eq!(filter_words("a+b a.b", &["a.b"]), "a+b ***");
    }

    #[test]
    fn test_format_text_normalises_punctuation() {
        assert_eq!(format_text("Hello,   world.  Nice!  Right ?"), "Hello，world。Nice！Right ？");
        assert_eq!(format_text("line one\n\nline two"), "line one line two");
    }

    #[test]
    fn test_format_paragraphs() {
        assert_eq!(format_paragraphs("  first  \n\n\n\n second\n\n \n\nthird"), "first\n\nsecond\n\nthird");
        assert_eq!(format_paragraphs("single\nline"), "single\nline");
    }

    #[test]
    fn test_enhance_content_whole_words_only() {
        let tags = vec![
            ContentTag::new("lake", "Lake"),
            ContentTag::new("park", "Park"),
            ContentTag::new("lake", "Lake"),
        ];
        let enhanced = enhance_content("Walked around the LAKE near Parking lot", &tags);
        assert_eq!(enhanced.suggested_tags, vec![ContentTag::new("lake", "Lake")]);
        assert_eq!(enhanced.processed_content, "Walked around the LAKE near Parking lot");
    }

    #[test]
    fn test_enhance_content_overlapping_candidates() {
        let tags = vec![ContentTag::new("aa", "")];
        assert_eq!(enhance_content("aaa aa", &tags).suggested_tags.len(), 1);
        assert!(enhance_content("aaa", &tags).suggested_tags.is_empty());
    }

    #[test]
    fn test_enhance_content_punctuation_edges() {
        let tags = vec![ContentTag::new("c++", "C++"), ContentTag::new("#travel", "")];
        let enhanced = enhance_content("learning C++11 today, #travel", &tags);
        assert_eq!(enhanced.suggested_tags, vec![ContentTag::new("c++", "C++")]);
        assert!(enhance_content("about C++", &tags).suggested_tags.is_empty());
        assert_eq!(enhance_content("go#travel", &tags).suggested_tags.len(), 1);
    }

    #[test]
    fn test_enhance_content_without_tags() {
        let enhanced = enhance_content("anything", &[]);
        assert!(enhanced.suggested_tags.is_empty());
    }

    #[test]
    fn test_process_content_steps() {
        let all = process_content("md says hi ,  there", &ContentOptions::default());
        assert_eq!(all, "** says hi ，there");

        let none = ContentOptions {
            filter_sensitive: false,
            format: false,
            format_paragraphs: false,
        };
        assert_eq!(process_content("md  ,x", &none), "md  ,x");
    }
}
