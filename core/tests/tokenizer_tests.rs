use booksearch_core::tokenizer::tokenize;

#[test]
fn it_lowercases_and_collapses_duplicates() {
    let words = tokenize("Alice ALICE alice. The Queen; the queen!");
    let expected: Vec<&str> = vec!["alice", "queen", "the"];
    assert_eq!(words.iter().map(String::as_str).collect::<Vec<_>>(), expected);
}

#[test]
fn it_keeps_spanish_accents() {
    let words = tokenize("La CANCIÓN del niño pingüino está aquí");
    assert!(words.contains("canción"));
    assert!(words.contains("niño"));
    assert!(words.contains("pingüino"));
    assert!(words.contains("está"));
    assert!(words.contains("aquí"));
}

#[test]
fn it_splits_on_unrecognized_characters() {
    let words = tokenize("rock'n'roll e-mail naïve abc123def");
    for w in ["rock", "n", "roll", "e", "mail", "na", "ve", "abc", "def"] {
        assert!(words.contains(w), "missing {w}");
    }
    assert!(!words.iter().any(|w| w.chars().any(|c| c.is_ascii_digit())));
}

#[test]
fn it_does_not_stem() {
    let words = tokenize("Running runners run");
    assert_eq!(words.len(), 3);
}
