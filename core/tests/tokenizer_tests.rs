use search_core::tokenizer::{list_stems, parse, stem, unique_stems};

#[test]
fn it_normalizes_and_stems() {
    let words = list_stems("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Accents are decomposed and dropped: café -> cafe
    assert!(words.iter().any(|w| w.starts_with("cafe")));
}

#[test]
fn it_keeps_stopwords() {
    let words = parse("The quick brown fox and the lazy dog");
    assert_eq!(words.len(), 8);
    assert_eq!(words[0], "the");
    assert_eq!(words[4], "and");
}

#[test]
fn it_drops_digits_and_punctuation() {
    assert_eq!(parse("R2-D2 v1.0: hello_world"), vec!["rd", "v", "helloworld"]);
    assert!(parse("1234 !!! ...").is_empty());
}

#[test]
fn stems_are_stable() {
    assert_eq!(stem("running"), "run");
    assert_eq!(stem(&stem("running")), "run");
    let unique = unique_stems("runs running runner");
    assert!(unique.contains("run"));
    assert!(unique.len() <= 2);
}
