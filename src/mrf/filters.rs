use std::sync::LazyLock;

use unicode_segmentation::UnicodeSegmentation;

static AMMONIA: LazyLock<ammonia::Builder> = LazyLock::new(ammonia::Builder::empty);

/// Number of words of note content that end up in a log line.
const LOG_EXCERPT_WORDS: u32 = 24;

/// Plain text excerpt of HTML note content, short enough for a log line.
pub(super) fn log_excerpt(content: Option<&str>) -> String {
    content
        .map(|html| excerpt(&to_text(html), LOG_EXCERPT_WORDS))
        .unwrap_or_default()
}

/// Strip HTML tags from a string
fn to_text(value: &str) -> String {
    AMMONIA.clean(value).to_string()
}

/// Truncate a string to a certain number of words, marking the cut with an
/// ellipsis. Each CJK character is counted as one word.
fn excerpt(value: &str, words: u32) -> String {
    let mut word_count = 0;
    let mut result = String::new();

    for word in value.split_word_bounds() {
        if word_count >= words {
            result.push_str("...");
            return result;
        }
        result.push_str(word);
        if !word
            .chars()
            .any(|c| c.is_whitespace() || c.is_ascii_punctuation())
        {
            word_count += 1;
        }
    }

    result
}
