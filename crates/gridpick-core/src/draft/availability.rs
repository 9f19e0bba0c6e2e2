// Unclaimed drivers for a draft week.

use std::collections::HashSet;

use super::pick::DraftPick;

/// Display ordering key: case-insensitive surname, then full name, then the
/// raw name so distinct catalog entries never tie.
pub fn surname_key(name: &str) -> (String, String, String) {
    let trimmed = name.trim();
    let surname = trimmed.split_whitespace().last().unwrap_or("");
    (
        surname.to_lowercase(),
        trimmed.to_lowercase(),
        trimmed.to_string(),
    )
}

/// Catalog entries not claimed by any pick, ordered by [`surname_key`].
pub fn available(catalog: &[String], picks: &[DraftPick]) -> Vec<String> {
    available_by(catalog, picks, |name| surname_key(name))
}

/// Catalog entries not claimed by any pick, ordered by a caller-supplied key.
///
/// Duplicate catalog entries collapse to one. Ties on `key` are broken by the
/// name itself so the result is always deterministic.
pub fn available_by<K, F>(catalog: &[String], picks: &[DraftPick], key: F) -> Vec<String>
where
    K: Ord,
    F: Fn(&str) -> K,
{
    let claimed: HashSet<&str> = picks.iter().map(|p| p.item.as_str()).collect();
    let mut seen = HashSet::new();

    let mut open: Vec<&String> = catalog
        .iter()
        .filter(|item| !claimed.contains(item.as_str()))
        .filter(|item| seen.insert(item.as_str()))
        .collect();

    open.sort_by(|a, b| {
        key(a.as_str())
            .cmp(&key(b.as_str()))
            .then_with(|| a.cmp(b))
    });
    open.into_iter().cloned().collect()
}

/// Whether `item` is in the catalog and not yet claimed.
pub fn is_available(catalog: &[String], picks: &[DraftPick], item: &str) -> bool {
    catalog.iter().any(|c| c == item) && !picks.iter().any(|p| p.item == item)
}
