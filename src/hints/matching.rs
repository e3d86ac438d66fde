//! Matching typed input against hinted elements.

use crate::dom::tree::normalize_whitespace;
use crate::hints::assign::ElementWithHint;

/// Lower-cased words of a filter text
pub fn filter_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Whether every word occurs somewhere in `text`, ignoring case
pub fn text_matches(text: &str, words: &[String]) -> bool {
    let haystack = normalize_whitespace(text).to_lowercase();
    words.iter().all(|word| haystack.contains(word.as_str()))
}

/// Weight of an element under an active text filter: shorter texts win
pub fn filter_weight(text: &str) -> f64 {
    let chars = normalize_whitespace(text).chars().count();
    1.0 / chars.max(1) as f64
}

/// Outcome of the hint characters typed so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintMatch {
    /// No shown hint starts with the input
    None,
    /// Some hints start with the input, none equals it
    Partial,
    /// A hint equals the input
    Exact(String),
}

/// Match typed hint characters against the shown hints
pub fn match_hint_chars(elements: &[ElementWithHint], entered: &str) -> HintMatch {
    let mut partial = false;
    for element in elements.iter().filter(|e| !e.hidden) {
        if element.hint == entered {
            return HintMatch::Exact(element.hint.clone());
        }
        if element.hint.starts_with(entered) {
            partial = true;
        }
    }
    if partial { HintMatch::Partial } else { HintMatch::None }
}

/// The hint shared by every shown element, if there is exactly one
pub fn single_hint(elements: &[ElementWithHint]) -> Option<&str> {
    let mut shown = elements.iter().filter(|e| !e.hidden).map(|e| e.hint.as_str());
    let first = shown.next()?;
    shown.all(|hint| hint == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::assign::tests::element;

    #[test]
    fn test_text_matches() {
        let words = filter_words("  Sign   IN ");
        assert_eq!(words, vec!["sign", "in"]);
        assert!(text_matches("Please sign\n in here", &words));
        assert!(!text_matches("Sign up", &words));
        assert!(text_matches("anything", &[]));
    }

    #[test]
    fn test_filter_weight() {
        assert_eq!(filter_weight("ab"), 0.5);
        assert_eq!(filter_weight(""), 1.0);
        assert!(filter_weight("Go") > filter_weight("Go somewhere else"));
    }

    #[test]
    fn test_match_hint_chars() {
        let mut elements = vec![element(0, 1.0, 0.0, 0.0), element(1, 1.0, 0.0, 0.0)];
        elements[0].hint = "a".to_string();
        elements[1].hint = "ba".to_string();

        assert_eq!(match_hint_chars(&elements, "b"), HintMatch::Partial);
        assert_eq!(match_hint_chars(&elements, "ba"), HintMatch::Exact("ba".to_string()));
        assert_eq!(match_hint_chars(&elements, "c"), HintMatch::None);

        elements[1].hidden = true;
        assert_eq!(match_hint_chars(&elements, "b"), HintMatch::None);
    }

    #[test]
    fn test_single_hint() {
        let mut elements = vec![element(0, 1.0, 0.0, 0.0), element(1, 1.0, 0.0, 0.0)];
        elements[0].hint = "a".to_string();
        elements[1].hint = "a".to_string();
        assert_eq!(single_hint(&elements), Some("a"));

        elements[1].hint = "b".to_string();
        assert_eq!(single_hint(&elements), None);

        elements[1].hidden = true;
        assert_eq!(single_hint(&elements), Some("a"));
        assert_eq!(single_hint(&[]), None);
    }
}
