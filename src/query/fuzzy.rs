//! Approximate string matching over an item's searchable fields.
//!
//! A term matches a field when some substring of the field is within
//! `threshold * term_len` edits of the term. The score is that edit count
//! divided by the term length: 0.0 is an exact substring hit, larger is worse.

use crate::collection::Item;

pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Fields included in the index. The verbatim `ris` blob is not searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Author,
    Description,
    Category,
    Publisher,
    Date,
    Tags,
}

pub const SEARCH_FIELDS: [SearchField; 7] = [
    SearchField::Title,
    SearchField::Author,
    SearchField::Description,
    SearchField::Category,
    SearchField::Publisher,
    SearchField::Date,
    SearchField::Tags,
];

impl SearchField {
    fn values(self, item: &Item) -> Vec<&str> {
        match self {
            Self::Title => item.title.as_deref().into_iter().collect(),
            Self::Author => item.author.as_deref().into_iter().collect(),
            Self::Description => item.description.as_deref().into_iter().collect(),
            Self::Category => vec![item.category_name.as_str()],
            Self::Publisher => item.publisher.as_deref().into_iter().collect(),
            Self::Date => item.date.as_deref().into_iter().collect(),
            Self::Tags => item.tags.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Position of the item in the indexed slice.
    pub index: usize,
    pub score: f64,
}

/// Lowercased field text for every item of one collection.
pub struct FuzzyIndex {
    records: Vec<Vec<Vec<char>>>,
    threshold: f64,
}

impl FuzzyIndex {
    pub fn new(items: &[Item], threshold: f64) -> Self {
        let records = items
            .iter()
            .map(|item| {
                SEARCH_FIELDS
                    .iter()
                    .flat_map(|field| field.values(item))
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_lowercase().chars().collect())
                    .collect()
            })
            .collect();
        Self { records, threshold }
    }

    /// Items matching `pattern`, best score first; ties keep index order.
    /// A blank pattern matches nothing.
    pub fn search(&self, pattern: &str) -> Vec<Hit> {
        let pattern: Vec<char> = pattern.trim().to_lowercase().chars().collect();
        if pattern.is_empty() {
            return Vec::new();
        }

        let max_errors = max_errors(self.threshold, pattern.len());
        let mut hits: Vec<Hit> = self
            .records
            .iter()
            .enumerate()
            .filter_map(|(index, fields)| {
                let best = fields
                    .iter()
                    .filter_map(|text| substring_distance(&pattern, text, max_errors))
                    .min()?;
                Some(Hit {
                    index,
                    score: best as f64 / pattern.len() as f64,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.index.cmp(&b.index)));
        hits
    }
}

fn max_errors(threshold: f64, pattern_len: usize) -> usize {
    // Epsilon absorbs float error such as 0.4 * 5 = 2.0000000000000004.
    (threshold.max(0.0) * pattern_len as f64 + 1e-9).floor() as usize
}

/// Smallest edit distance between `pattern` and any substring of `text`
/// (Sellers' algorithm), or `None` once it provably exceeds `max_errors`.
pub(crate) fn substring_distance(pattern: &[char], text: &[char], max_errors: usize) -> Option<usize> {
    // Row 0 is all zeros: a match may start anywhere in the text.
    let mut prev = vec![0usize; text.len() + 1];
    let mut cur = vec![0usize; text.len() + 1];

    for (i, &p) in pattern.iter().enumerate() {
        cur[0] = i + 1;
        let mut row_min = cur[0];
        for (j, &t) in text.iter().enumerate() {
            let substitution = prev[j] + usize::from(p != t);
            let deletion = prev[j + 1] + 1;
            let insertion = cur[j] + 1;
            cur[j + 1] = substitution.min(deletion).min(insertion);
            row_min = row_min.min(cur[j + 1]);
        }
        // Row minima never decrease, so nothing below can recover.
        if row_min > max_errors {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev.iter().copied().min().filter(|&d| d <= max_errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn item(title: &str) -> Item {
        Item {
            title: Some(title.into()),
            collection_name: "Lib".into(),
            designator: "LIB".into(),
            category_name: "Books".into(),
            ..Default::default()
        }
    }

    #[test]
    fn exact_substring_has_zero_distance() {
        assert_eq!(substring_distance(&chars("great"), &chars("the great war"), 2), Some(0));
    }

    #[test]
    fn one_typo_costs_one_edit() {
        assert_eq!(substring_distance(&chars("grat"), &chars("the great war"), 2), Some(1));
        assert_eq!(substring_distance(&chars("graet"), &chars("the great war"), 2), Some(2));
    }

    #[test]
    fn too_many_edits_is_none() {
        assert_eq!(substring_distance(&chars("xyzzy"), &chars("the great war"), 2), None);
    }

    #[test]
    fn pattern_longer_than_text_counts_missing_chars() {
        assert_eq!(substring_distance(&chars("wars"), &chars("war"), 1), Some(1));
        assert_eq!(substring_distance(&chars("warfare"), &chars("war"), 2), None);
    }

    #[test]
    fn max_errors_scales_with_threshold() {
        assert_eq!(max_errors(0.4, 1), 0);
        assert_eq!(max_errors(0.4, 2), 0);
        assert_eq!(max_errors(0.4, 3), 1);
        assert_eq!(max_errors(0.4, 5), 2);
        assert_eq!(max_errors(0.4, 10), 4);
        assert_eq!(max_errors(0.0, 10), 0);
    }

    #[test]
    fn search_is_case_insensitive() {
        let index = FuzzyIndex::new(&[item("The Great War")], DEFAULT_THRESHOLD);
        let hits = index.search("GREAT");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn search_ranks_best_match_first() {
        let items = [item("Grate Expectations"), item("The Great War"), item("Moby Dick")];
        let index = FuzzyIndex::new(&items, DEFAULT_THRESHOLD);

        let hits = index.search("great");
        let order: Vec<_> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, [1, 0]);
        assert!(hits[0].score < hits[1].score);
    }

    #[test]
    fn ties_keep_index_order() {
        let items = [item("war one"), item("war two"), item("war three")];
        let index = FuzzyIndex::new(&items, DEFAULT_THRESHOLD);
        let order: Vec<_> = index.search("war").iter().map(|h| h.index).collect();
        assert_eq!(order, [0, 1, 2]);
    }

    #[test]
    fn matches_any_indexed_field() {
        let mut by_author = item("Untitled");
        by_author.author = Some("Tolkien".into());
        let mut by_tag = item("Untitled");
        by_tag.tags = vec!["medieval".into()];
        let mut by_date = item("Untitled");
        by_date.date = Some("1914".into());

        let index = FuzzyIndex::new(&[by_author, by_tag, by_date], DEFAULT_THRESHOLD);
        assert_eq!(index.search("tolkien")[0].index, 0);
        assert_eq!(index.search("medieval")[0].index, 1);
        assert_eq!(index.search("1914")[0].index, 2);
    }

    #[test]
    fn category_name_is_indexed() {
        let index = FuzzyIndex::new(&[item("Untitled")], DEFAULT_THRESHOLD);
        assert_eq!(index.search("books").len(), 1);
    }

    #[test]
    fn ris_blob_is_not_indexed() {
        let mut record = item("Untitled");
        record.ris = Some("zanzibar".into());
        let index = FuzzyIndex::new(&[record], DEFAULT_THRESHOLD);
        assert!(index.search("zanzibar").is_empty());
    }

    #[test]
    fn blank_pattern_matches_nothing() {
        let index = FuzzyIndex::new(&[item("The Great War")], DEFAULT_THRESHOLD);
        assert!(index.search("").is_empty());
        assert!(index.search("   ").is_empty());
    }

    #[test]
    fn tolerates_minor_typos() {
        let index = FuzzyIndex::new(&[item("Great Expectations")], DEFAULT_THRESHOLD);
        assert_eq!(index.search("expectatoins").len(), 1);
        assert!(index.search("zzzzzz").is_empty());
    }
}
