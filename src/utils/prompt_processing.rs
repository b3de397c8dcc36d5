use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    pub(crate) static ref PLACEHOLDER_MATCH_RE: Regex =
        Regex::new(r"\{\[.*?\]\}").expect("placeholder pattern is a valid regex");
}

#[inline]
pub(crate) fn strip_format(key: &str) -> &str {
    //! Strips "{\[" and "\]}" for a string, which is algorithmically unsafe.
    //! Ensure the string is properly formatted like "{\[a\]}".
    &key[2..key.len() - 2]
}

/// Replaces all placeholders in `template` with their filling values.
///
/// Values are inserted literally and never re-scanned, so a value that itself looks like a
/// placeholder (or contains `$`) ends up in the output verbatim. Placeholders without a value
/// are left as they are.
pub(crate) fn replace_all_placeholders(template: &str, mapping: &HashMap<String, Option<String>>) -> String {
    PLACEHOLDER_MATCH_RE
        .replace_all(template, |captures: &Captures| {
            let match_text = &captures[0];
            match mapping.get(strip_format(match_text)) {
                Some(Some(value)) => value.clone(),
                _ => match_text.to_string(),
            }
        })
        .into_owned()
}

pub(crate) fn get_placeholders(string: &str) -> HashSet<String> {
    PLACEHOLDER_MATCH_RE
        .captures_iter(string)
        .map(|captures| strip_format(&captures[0]).to_string())
        .collect()
}
