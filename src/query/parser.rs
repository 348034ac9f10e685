//! Boolean query grammar.
//!
//! Precedence: a standalone `OR` anywhere splits the whole query on every
//! `OR`; otherwise a standalone `AND` splits on every `AND`; otherwise the
//! query is split on whitespace. Keywords match case-insensitively and only
//! on word boundaries, so `ORacle` or `band` never split.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Or,
    And,
    /// Whitespace-separated words, all of which must match.
    Words,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub mode: QueryMode,
    /// Trimmed term-groups. In `Or`/`And` mode a group may be empty
    /// (e.g. `"war AND"`); empty groups match nothing.
    pub terms: Vec<String>,
}

impl ParsedQuery {
    pub fn parse(query: &str) -> Self {
        if let Some(terms) = split_on_keyword(query, "OR") {
            return Self {
                mode: QueryMode::Or,
                terms,
            };
        }
        if let Some(terms) = split_on_keyword(query, "AND") {
            return Self {
                mode: QueryMode::And,
                terms,
            };
        }
        Self {
            mode: QueryMode::Words,
            terms: query.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// A single bare term: searched once with the whole query string.
    pub fn is_basic(&self) -> bool {
        self.mode == QueryMode::Words && self.terms.len() <= 1
    }
}

/// Split on every standalone occurrence of `keyword`, or `None` if it never occurs.
fn split_on_keyword(query: &str, keyword: &str) -> Option<Vec<String>> {
    let positions = keyword_positions(query, keyword);
    if positions.is_empty() {
        return None;
    }

    let mut terms = Vec::with_capacity(positions.len() + 1);
    let mut start = 0;
    for pos in positions {
        terms.push(query[start..pos].trim().to_string());
        start = pos + keyword.len();
    }
    terms.push(query[start..].trim().to_string());
    Some(terms)
}

fn keyword_positions(query: &str, keyword: &str) -> Vec<usize> {
    let bytes = query.as_bytes();
    let len = keyword.len();
    let mut positions = Vec::new();
    let mut i = 0;

    while i + len <= bytes.len() {
        if bytes[i..i + len].eq_ignore_ascii_case(keyword.as_bytes())
            && boundary_before(query, i)
            && boundary_after(query, i + len)
        {
            positions.push(i);
            i += len;
        } else {
            i += 1;
        }
    }
    positions
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn boundary_before(query: &str, at: usize) -> bool {
    query[..at].chars().next_back().is_none_or(|c| !is_word_char(c))
}

fn boundary_after(query: &str, at: usize) -> bool {
    query[at..].chars().next().is_none_or(|c| !is_word_char(c))
}
