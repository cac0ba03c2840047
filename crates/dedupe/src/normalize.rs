//! Address normalization: free text → [`CanonicalKey`].
//!
//! Every function here is total. Unrecognizable input yields empty fields,
//! never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::CanonicalKey;

/// UK postcode: outward code (1-2 letters, 1-2 digits, optional letter),
/// optional space, inward code (digit + 2 letters). Applied to upper-cased text.
static POSTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z]{1,2}\d{1,2}[A-Z]?)\s?(\d[A-Z]{2})\b").expect("postcode pattern")
});

/// Standalone house number: digits with an optional trailing letter ("12", "7b").
static HOUSE_NO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+[a-z]?)\b").expect("house number pattern"));

/// Listing boilerplate that shows up inside address fields. Phrases are stored
/// as token sequences after punctuation stripping ("to-rent" → "torent").
const NOISE_PHRASES: &[&[&str]] = &[
    &["to", "let"],
    &["torent"],
    &["for", "rent"],
    &["new", "instruction"],
    &["available", "now"],
    &["available", "immediately"],
];

/// Street-type abbreviations. Punctuated variants ("rd.", "terr.") lose their
/// punctuation before lookup, so only the bare spellings are listed.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("road", "rd"),
    ("street", "st"),
    ("avenue", "ave"),
    ("drive", "dr"),
    ("lane", "ln"),
    ("crescent", "cres"),
    ("place", "pl"),
    ("close", "cl"),
    ("court", "ct"),
    ("terrace", "ter"),
    ("terr", "ter"),
];

/// Extract a UK postcode, upper-cased with no internal space. Empty when absent.
pub fn extract_postcode(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    let upper = address.to_uppercase();
    POSTCODE_RE
        .captures(&upper)
        .map(|c| format!("{}{}", &c[1], &c[2]))
        .unwrap_or_default()
}

/// First standalone house-number token, lower-cased. Empty when absent.
pub fn extract_house_number(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    let lower = address.to_lowercase();
    HOUSE_NO_RE
        .captures(&lower)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// Lower-case, strip punctuation, drop noise phrases and abbreviate street types.
///
/// Idempotent: `normalize_street(&normalize_street(s)) == normalize_street(s)`.
pub fn normalize_street(address: &str) -> String {
    let cleaned: String = address
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let tokens = strip_noise(cleaned.split_whitespace().collect());
    tokens
        .into_iter()
        .map(abbreviate)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the canonical key for an address.
pub fn canonical_key(address: &str) -> CanonicalKey {
    let postcode = extract_postcode(address);
    let house_number = extract_house_number(address);
    let street = normalize_street(address)
        .split_whitespace()
        .filter(|t| *t != house_number)
        .collect::<Vec<_>>()
        .join(" ");

    CanonicalKey {
        postcode,
        house_number,
        street,
    }
}

fn abbreviate(token: &str) -> &str {
    ABBREVIATIONS
        .iter()
        .find(|(long, _)| *long == token)
        .map(|(_, short)| *short)
        .unwrap_or(token)
}

// Removing one phrase can join its neighbours into another, so repeat until stable.
fn strip_noise(mut tokens: Vec<&str>) -> Vec<&str> {
    loop {
        let hit = NOISE_PHRASES.iter().find_map(|phrase| {
            tokens
                .windows(phrase.len())
                .position(|w| w == *phrase)
                .map(|at| (at, phrase.len()))
        });
        match hit {
            Some((at, len)) => {
                tokens.drain(at..at + len);
            }
            None => return tokens,
        }
    }
}
