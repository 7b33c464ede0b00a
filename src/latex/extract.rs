//! Math-span extraction: find every `$$ … $$` region of a reply.
//!
//! Scanning is left to right and non-greedy, so the first `$$` after an
//! opening marker always closes it; nested markers are not supported. A
//! trailing `$$` without a partner is ignored.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_DISPLAY_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$").unwrap());

/// Return the raw contents of every `$$…$$` pair in document order.
///
/// Spans may contain newlines. Empty pairs (`$$$$`) yield an empty string so
/// the count always equals the number of matched pairs.
pub fn extract_math_spans(text: &str) -> Vec<String> {
    RE_DISPLAY_MATH
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_spans_in_order() {
        let text = r"Solve $$x^2+1=0$$ then $$\text{note: } y=2$$";
        assert_eq!(
            extract_math_spans(text),
            vec!["x^2+1=0".to_string(), r"\text{note: } y=2".to_string()]
        );
    }

    #[test]
    fn no_markers_yields_nothing() {
        assert!(extract_math_spans("plain text, $5 and $6").is_empty());
        assert!(extract_math_spans("").is_empty());
    }

    #[test]
    fn spans_may_cross_lines() {
        let text = "Matrix:\n$$\na + b\n= c\n$$\ndone";
        assert_eq!(extract_math_spans(text), vec!["\na + b\n= c\n".to_string()]);
    }

    #[test]
    fn unmatched_trailing_marker_is_ignored() {
        let text = "$$a$$ and then $$b";
        assert_eq!(extract_math_spans(text), vec!["a".to_string()]);
        assert!(extract_math_spans("only $$ one marker").is_empty());
    }

    #[test]
    fn nested_markers_close_at_first_partner() {
        // `$$a $$b$$ c$$` → first pair "a ", second pair " c" is preceded by
        // "b" which sits outside any pair.
        let spans = extract_math_spans("$$a $$b$$ c$$");
        assert_eq!(spans, vec!["a ".to_string(), " c".to_string()]);
    }
}
