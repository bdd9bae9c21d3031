//! Province and city resolvers.
//!
//! Both work the same way: normalize the query, strip each reference entry,
//! then try exact equality before bidirectional containment. The first entry
//! in list order wins within each stage.

use super::normalize::{normalize, strip_entry, NameContext};
use super::types::{CityType, Match, MatchKind};
use tracing::{debug, trace};

/// Type prefix carried by a raw or canonical city name, if any.
pub fn leading_city_type(name: &str) -> Option<CityType> {
    let first = name.split_whitespace().next()?.to_lowercase();
    match first.trim_end_matches('.') {
        "kab" | "kabupaten" => Some(CityType::Regency),
        "kota" => Some(CityType::City),
        _ => None,
    }
}

fn stripped_forms<S: AsRef<str>>(list: &[S], ctx: NameContext) -> Vec<(&str, String)> {
    list.iter()
        .map(|entry| {
            let entry: &str = entry.as_ref();
            (entry, strip_entry(entry, ctx))
        })
        .collect()
}

fn partial_match<'a>(query: &str, stripped: &[(&'a str, String)]) -> Option<&'a str> {
    stripped
        .iter()
        .find(|(_, s)| !s.is_empty() && (query.contains(s.as_str()) || s.contains(query)))
        .map(|(entry, _)| *entry)
}

fn found(entry: &str, kind: MatchKind) -> Option<Match> {
    Some(Match {
        name: entry.to_string(),
        kind,
    })
}

/// Map a free-form province name onto an entry of `reference`.
///
/// Returns `None` when the query normalizes to nothing or no entry matches.
pub fn resolve_province<S: AsRef<str>>(raw: &str, reference: &[S]) -> Option<Match> {
    let query = normalize(raw, NameContext::Province);
    if query.is_empty() {
        trace!(raw, "province query empty after normalization");
        return None;
    }
    let stripped = stripped_forms(reference, NameContext::Province);

    if let Some((entry, _)) = stripped.iter().find(|(_, s)| *s == query) {
        debug!(raw, query = %query, entry = *entry, "province exact match");
        return found(entry, MatchKind::Exact);
    }

    match partial_match(&query, &stripped) {
        Some(entry) => {
            debug!(raw, query = %query, entry, "province partial match");
            found(entry, MatchKind::Partial)
        }
        None => {
            debug!(raw, query = %query, candidates = reference.len(), "province not found");
            None
        }
    }
}

/// Try each candidate in order; the first one that resolves wins.
/// Blank candidates are skipped.
pub fn resolve_first_province<C: AsRef<str>, S: AsRef<str>>(
    candidates: &[C],
    reference: &[S],
) -> Option<Match> {
    candidates
        .iter()
        .map(C::as_ref)
        .filter(|c| !c.trim().is_empty())
        .find_map(|c| resolve_province(c, reference))
}

/// Map a free-form city/regency name onto an entry of a province-scoped `reference`.
///
/// `raw` may carry a "Kab."/"Kota" prefix. When several entries match exactly
/// (e.g. "Kab. Bogor" and "Kota Bogor"), the one whose type agrees with that
/// prefix is preferred; otherwise list order decides.
pub fn resolve_city<S: AsRef<str>>(raw: &str, reference: &[S]) -> Option<Match> {
    let query = normalize(raw, NameContext::City);
    if query.is_empty() {
        trace!(raw, "city query empty after normalization");
        return None;
    }
    let hint = leading_city_type(raw);
    let stripped = stripped_forms(reference, NameContext::City);

    let exact: Vec<&str> = stripped
        .iter()
        .filter(|(_, s)| *s == query)
        .map(|(entry, _)| *entry)
        .collect();
    let typed = hint.and_then(|h| {
        exact
            .iter()
            .copied()
            .find(|entry| leading_city_type(entry) == Some(h))
    });
    if let Some(entry) = typed.or_else(|| exact.first().copied()) {
        debug!(raw, query = %query, entry, ties = exact.len(), "city exact match");
        return found(entry, MatchKind::Exact);
    }

    match partial_match(&query, &stripped) {
        Some(entry) => {
            debug!(raw, query = %query, entry, "city partial match");
            found(entry, MatchKind::Partial)
        }
        None => {
            debug!(raw, query = %query, candidates = reference.len(), "city not found");
            None
        }
    }
}
