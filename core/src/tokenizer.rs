use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref CLEAN: Regex = Regex::new(r"[^\p{Alphabetic}\s]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Normalize a line (NFD, strip everything that is not a letter or whitespace,
/// lowercase) and split it into raw tokens.
pub fn parse(line: &str) -> Vec<String> {
    let decomposed = line.nfd().collect::<String>();
    CLEAN
        .replace_all(&decomposed, "")
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Snowball (English) stem of a single token.
pub fn stem(token: &str) -> String {
    STEMMER.stem(token).into_owned()
}

/// Stems of every token in `text`, in order, duplicates kept.
pub fn list_stems(text: &str) -> Vec<String> {
    let mut stems = Vec::new();
    stem_line(text, &mut stems);
    stems
}

/// Sorted, de-duplicated stems of `line`.
pub fn unique_stems(line: &str) -> BTreeSet<String> {
    let mut stems = BTreeSet::new();
    stem_line(line, &mut stems);
    stems
}

fn stem_line<C: Extend<String>>(line: &str, out: &mut C) {
    out.extend(parse(line).iter().map(|token| stem(token)));
}
