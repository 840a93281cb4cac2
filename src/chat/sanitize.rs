//! Markdown sanitizer for streamed assistant text.
//!
//! The chat UI renders plain text, so surface markers (bold, italic, list
//! and header prefixes) are stripped from each fragment before display.
//! This is a pure line-oriented transform with no semantic reinterpretation.
//!
//! Sanitization is applied per streamed fragment, not to the accumulated
//! whole. A marker pair split exactly across a fragment boundary (`**`
//! opening in one delta, closing in the next) is therefore not stripped.
//! That is a documented limitation: buffering fragments to catch it would
//! add latency to perceived streaming.

use std::sync::LazyLock;

use regex::Regex;

static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").expect("valid regex"));
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(.+?)_").expect("valid regex"));
static NUMBERED_LIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s+").expect("valid regex"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[-*•]\s+").expect("valid regex"));
static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#+\s+").expect("valid regex"));

/// Strip lightweight markdown markers from `text`.
///
/// Removes `**bold**`/`__bold__` and `*italic*`/`_italic_` pairs, and
/// leading numbered-list, bullet, and header markers on each line. The
/// transform is idempotent: sanitizing already-sanitized text is a no-op.
#[must_use]
pub fn strip_markdown(text: &str) -> String {
    let text = BOLD_STARS.replace_all(text, "$1");
    let text = BOLD_UNDERSCORES.replace_all(&text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "$1");
    let text = NUMBERED_LIST.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    HEADER.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_bold_and_list_markers() {
        let input = "**Breathe** deeply.\n1. Notice your breath\n- Let go";
        assert_eq!(strip_markdown(input), "Breathe deeply.\nNotice your breath\nLet go");
    }

    #[test]
    fn test_strips_headers_and_underscores() {
        assert_eq!(strip_markdown("## Morning\n__focus__ on _one_ thing"), "Morning\nfocus on one thing");
    }

    #[test]
    fn test_idempotent() {
        let input = "**Bold** and *italic*\n2. step\n• point\n# Title";
        let once = strip_markdown(input);
        assert_eq!(strip_markdown(&once), once);
    }

    #[test]
    fn test_plain_text_untouched() {
        let input = "Nothing to remove here. 3 + 4 = 7.";
        assert_eq!(strip_markdown(input), input);
    }

    #[test]
    fn test_marker_split_across_fragments_is_not_stripped() {
        // Each fragment is sanitized independently; an unpaired `**` stays.
        assert_eq!(strip_markdown("**Brea"), "**Brea");
        assert_eq!(strip_markdown("the**"), "the**");
    }
}
