//! Lexical canonicalization of administrative names.
//!
//! Geocoders and the schedule API disagree on honorifics ("Provinsi",
//! "Daerah Istimewa", "Kabupaten", "Kota", ...). Everything here works on
//! whitespace-separated words; a trailing period on a word is ignored when
//! comparing against a token set, so "Kab." and "kab" are the same token.

/// Which token sets apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameContext {
    Province,
    City,
}

const PROVINCE_LEADING: &[&str] = &["provinsi", "prov", "daerah", "istimewa", "khusus"];
const PROVINCE_EMBEDDED: &[&str] = &["daerah", "istimewa", "khusus", "ibukota"];

const CITY_TOKENS: &[&str] = &[
    "kabupaten",
    "kab",
    "kota",
    "city",
    "daerah",
    "khusus",
    "district",
    "regency",
    "municipality",
];

/// Leading tokens stripped from province *reference* entries.
const PROVINCE_ENTRY_PREFIXES: &[&str] = &["provinsi", "prov", "d.i", "daerah", "istimewa"];

/// Leading tokens stripped from city *reference* entries.
const CITY_ENTRY_PREFIXES: &[&str] = &["kab", "kota"];

fn is_token(word: &str, set: &[&str]) -> bool {
    let bare = word.trim_end_matches('.');
    !bare.is_empty() && set.contains(&bare)
}

fn token_sets(ctx: NameContext) -> (&'static [&'static str], &'static [&'static str]) {
    match ctx {
        NameContext::Province => (PROVINCE_LEADING, PROVINCE_EMBEDDED),
        NameContext::City => (CITY_TOKENS, CITY_TOKENS),
    }
}

fn strip_pass(words: &[String], ctx: NameContext) -> Vec<String> {
    let (leading, embedded) = token_sets(ctx);
    let start = words
        .iter()
        .position(|w| !is_token(w, leading))
        .unwrap_or(words.len());
    words[start..]
        .iter()
        .filter(|w| !is_token(w, embedded))
        .cloned()
        .collect()
}

/// Lower-case `raw`, drop honorific/type tokens for `ctx`, collapse whitespace.
///
/// Runs to a fixed point so the result is stable under re-normalization.
pub fn normalize(raw: &str, ctx: NameContext) -> String {
    let mut words: Vec<String> = raw
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    loop {
        let next = strip_pass(&words, ctx);
        if next.len() == words.len() {
            break;
        }
        words = next;
    }
    words.join(" ")
}

pub fn normalize_province(raw: &str) -> String {
    normalize(raw, NameContext::Province)
}

pub fn normalize_city(raw: &str) -> String {
    normalize(raw, NameContext::City)
}

/// Comparison form of a reference entry: lower-cased, leading honorific
/// words removed, whitespace collapsed. Semantic words are kept, so
/// "Kota Administrasi Jakarta Selatan" becomes "administrasi jakarta selatan".
pub fn strip_entry(entry: &str, ctx: NameContext) -> String {
    let prefixes = match ctx {
        NameContext::Province => PROVINCE_ENTRY_PREFIXES,
        NameContext::City => CITY_ENTRY_PREFIXES,
    };
    let lower = entry.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let start = match ctx {
        // "D.I. Daerah Istimewa X" style stacks are all honorific.
        NameContext::Province => words
            .iter()
            .position(|w| !is_token(w, prefixes))
            .unwrap_or(words.len()),
        NameContext::City => usize::from(words.first().is_some_and(|w| is_token(w, prefixes))),
    };
    words[start..].join(" ")
}
