use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    // Letters of the target alphabet; everything else separates terms.
    static ref TERM_RE: Regex = Regex::new(r"[a-záéíóúüñ]+").expect("valid regex");
}

/// Extract the set of distinct index terms from raw text.
///
/// The whole text is lowercased, then maximal runs of `a-z` and the accented
/// vowels `á é í ó ú ü` plus `ñ` become terms. No stemming, no stop words.
/// The set is ordered so callers iterate it deterministically.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    TERM_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Alice, alice; ALICE!");
        assert_eq!(t.len(), 1);
        assert!(t.contains("alice"));
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("1234 -- ?!").is_empty());
    }
}
