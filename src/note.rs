//! Note rendering for a picked search result: file path, body and link.

use crate::collection::{
    DEFAULT_CATEGORY_NAME, DEFAULT_COLLECTION_NAME, DEFAULT_DESIGNATOR, Item,
};

const UNKNOWN_AUTHOR: &str = "Unknown Author";
const UNTITLED: &str = "Untitled";

/// Body of a freshly created reference note.
pub fn note_content(item: &Item) -> String {
    let field = |value: &Option<String>| value.as_deref().unwrap_or_default().to_string();
    format!(
        "COLLECTION: {}\nTITLE: \"{}\"\nAUTHOR: {}\nPUBLISHER: {}\nDATE: {}\nURL: {}\nRIS: {}\nDESCRIPTION: {}\n\n-----------------------------------\nWRITE BELOW ->\n\n",
        item.collection_name,
        field(&item.title),
        field(&item.author),
        field(&item.publisher),
        field(&item.date),
        field(&item.url),
        field(&item.ris),
        field(&item.description),
    )
}

/// Vault-relative path: `(s) {designator}_{collection}/{category}/{author} — {title}.md`.
pub fn note_path(item: &Item) -> String {
    let author = sanitize(item.author.as_deref().filter(|a| !a.is_empty()).unwrap_or(UNKNOWN_AUTHOR));
    let title = sanitize(item.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(UNTITLED));
    format!("{}/{author} — {title}.md", folder_path(item))
}

/// Folder for an item's notes. Each segment comes from the source document
/// and is reduced to a single safe path component.
pub fn folder_path(item: &Item) -> String {
    format!(
        "(s) {}_{}/{}",
        path_component(&item.designator, DEFAULT_DESIGNATOR),
        path_component(&item.collection_name, DEFAULT_COLLECTION_NAME),
        path_component(&item.category_name, DEFAULT_CATEGORY_NAME),
    )
}

/// Wiki link inserted in place of the trigger.
pub fn wiki_link(path: &str) -> String {
    format!("[[{path}]]")
}

/// Neutralize separators and reserved characters. A segment left empty or
/// made only of dots falls back to `default`.
fn path_component(s: &str, default: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().all(|c| c == '.') {
        default.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Replace every character that is unsafe in a file name with a space.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '–' | '—' | '_' | '.' | '\'') {
                c
            } else {
                ' '
            }
        })
        .collect()
}
