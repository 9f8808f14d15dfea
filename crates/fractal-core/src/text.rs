//! Text utilities.

/// Approximate token count: whitespace-split word count × 1.3.
///
/// Good enough for budget accounting; exact tokenization is a model concern.
pub fn estimate_tokens(text: &str) -> i64 {
    if text.is_empty() {
        return 0;
    }
    (text.split_whitespace().count() as f64 * 1.3) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn whitespace_only_is_zero() {
        assert_eq!(estimate_tokens("   \n\t "), 0);
    }

    #[test]
    fn scales_with_words() {
        assert_eq!(estimate_tokens("one two three four"), 5); // 4 * 1.3 = 5.2
        assert_eq!(estimate_tokens("hello"), 1);
    }

    #[test]
    fn collapses_repeated_whitespace() {
        assert_eq!(estimate_tokens("a  b\n\nc"), estimate_tokens("a b c"));
    }
}
