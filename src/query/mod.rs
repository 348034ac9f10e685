//! Query engine: parse a boolean query, run it against each collection
//! independently, and return one ranked result set per collection.

pub mod fuzzy;
pub mod parser;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::{Collection, Item};
use fuzzy::{DEFAULT_THRESHOLD, FuzzyIndex};
pub use parser::{ParsedQuery, QueryMode};

/// Matches for one collection. Present even when `items` is empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub collection_name: String,
    pub designator: String,
    pub items: Vec<Item>,
}

impl QueryResult {
    /// The unfiltered view of a collection, used when there is no query.
    pub fn unfiltered(collection: &Collection) -> Self {
        Self {
            collection_name: collection.collection_name.clone(),
            designator: collection.designator.clone(),
            items: collection.items.clone(),
        }
    }
}

/// Search every collection with the default similarity threshold.
pub fn search(collections: &[Collection], query: &str) -> Vec<QueryResult> {
    search_with_threshold(collections, query, DEFAULT_THRESHOLD)
}

pub fn search_with_threshold(
    collections: &[Collection],
    query: &str,
    threshold: f64,
) -> Vec<QueryResult> {
    let parsed = ParsedQuery::parse(query);
    debug!(mode = ?parsed.mode, terms = ?parsed.terms, "query parsed");

    collections
        .iter()
        .map(|collection| {
            let matched = match_collection(collection, &parsed, query, threshold);
            debug!(
                collection = %collection.collection_name,
                matched = matched.len(),
                "collection searched"
            );
            QueryResult {
                collection_name: collection.collection_name.clone(),
                designator: collection.designator.clone(),
                items: matched
                    .into_iter()
                    .map(|i| collection.items[i].clone())
                    .collect(),
            }
        })
        .collect()
}

/// Indices of matching items, in result order. Item identity is its index.
fn match_collection(
    collection: &Collection,
    parsed: &ParsedQuery,
    raw_query: &str,
    threshold: f64,
) -> Vec<usize> {
    if collection.items.is_empty() {
        return Vec::new();
    }
    let index = FuzzyIndex::new(&collection.items, threshold);
    let hits_for = |term: &str| -> Vec<usize> { index.search(term).iter().map(|h| h.index).collect() };

    if parsed.is_basic() {
        return hits_for(raw_query);
    }

    match parsed.mode {
        QueryMode::Or => union(parsed.terms.iter().map(|t| hits_for(t.as_str()))),
        QueryMode::And | QueryMode::Words => {
            intersection(parsed.terms.iter().map(|t| hits_for(t.as_str())).collect())
        }
    }
}

/// Concatenate hit lists, keeping the first occurrence of each item.
fn union(lists: impl Iterator<Item = Vec<usize>>) -> Vec<usize> {
    let mut seen = HashSet::new();
    lists.flatten().filter(|i| seen.insert(*i)).collect()
}

/// Items present in every hit list, in the order of the first list.
fn intersection(lists: Vec<Vec<usize>>) -> Vec<usize> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };
    let rest: Vec<HashSet<usize>> = rest.iter().map(|l| l.iter().copied().collect()).collect();
    first
        .iter()
        .copied()
        .filter(|i| rest.iter().all(|set| set.contains(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(collection: &str, title: &str) -> Item {
        Item {
            title: Some(title.into()),
            collection_name: collection.into(),
            designator: "MISC".into(),
            category_name: "Uncategorized".into(),
            ..Default::default()
        }
    }

    fn collection(name: &str, titles: &[&str]) -> Collection {
        Collection {
            collection_name: name.into(),
            designator: name.to_uppercase(),
            homepage_url: None,
            items: titles.iter().map(|t| item(name, t)).collect(),
        }
    }

    fn titles(result: &QueryResult) -> Vec<&str> {
        result
            .items
            .iter()
            .map(|i| i.title.as_deref().unwrap_or_default())
            .collect()
    }

    fn two_libraries() -> Vec<Collection> {
        vec![
            collection("Lib1", &["The Great War"]),
            collection("Lib2", &["Great Expectations"]),
        ]
    }

    #[test]
    fn single_term_matches_in_every_collection() {
        let results = search(&two_libraries(), "great");
        assert_eq!(titles(&results[0]), ["The Great War"]);
        assert_eq!(titles(&results[1]), ["Great Expectations"]);
    }

    #[test]
    fn or_is_evaluated_per_collection() {
        let results = search(&two_libraries(), "war OR expectations");
        assert_eq!(titles(&results[0]), ["The Great War"]);
        assert_eq!(titles(&results[1]), ["Great Expectations"]);
    }

    #[test]
    fn and_requires_every_term_on_one_item() {
        let results = search(&[collection("Lib1", &["The Great War"])], "war AND expectations");
        assert_eq!(results.len(), 1);
        assert!(results[0].items.is_empty());
    }

    #[test]
    fn and_keeps_items_matching_all_terms() {
        let lib = collection("Lib", &["The Great War", "War and Peace", "Great Expectations"]);
        let results = search(&[lib], "great AND war");
        assert_eq!(titles(&results[0]), ["The Great War"]);
    }

    #[test]
    fn implicit_and_over_whitespace_tokens() {
        let lib = collection("Lib", &["The Great War", "Great Expectations", "Civil War"]);
        let results = search(&[lib], "great war");
        assert_eq!(titles(&results[0]), ["The Great War"]);
    }

    #[test]
    fn or_deduplicates_items_hit_by_several_terms() {
        let lib = collection("Lib", &["The Great War", "Peace"]);
        let results = search(&[lib], "great OR war OR peace");
        assert_eq!(titles(&results[0]), ["The Great War", "Peace"]);
    }

    #[test]
    fn or_keeps_identical_items_at_different_positions() {
        let lib = collection("Lib", &["Dune", "Dune"]);
        let results = search(&[lib], "dune OR frank");
        assert_eq!(results[0].items.len(), 2);
    }

    #[test]
    fn empty_and_group_matches_nothing() {
        let lib = collection("Lib", &["The Great War"]);
        assert!(search(&[lib], "war AND").remove(0).items.is_empty());
    }

    #[test]
    fn empty_or_group_contributes_nothing() {
        let lib = collection("Lib", &["The Great War"]);
        assert_eq!(titles(&search(&[lib], "war OR")[0]), ["The Great War"]);
    }

    #[test]
    fn every_collection_is_reported_in_order() {
        let collections = vec![
            collection("A", &["Moby Dick"]),
            collection("Empty", &[]),
            collection("B", &["The Great War"]),
        ];
        let results = search(&collections, "great");
        let names: Vec<_> = results.iter().map(|r| r.collection_name.as_str()).collect();
        assert_eq!(names, ["A", "Empty", "B"]);
        assert!(results[0].items.is_empty());
        assert!(results[1].items.is_empty());
        assert_eq!(results[2].designator, "B");
    }

    #[test]
    fn and_results_are_subset_of_or_results() {
        let lib = collection(
            "Lib",
            &["The Great War", "War and Peace", "Great Expectations", "Moby Dick", "Great Gatsby"],
        );
        let collections = [lib];
        for (a, b) in [("great", "war"), ("peace", "moby"), ("gatsby", "great"), ("dick", "war")] {
            let and = search(&collections, &format!("{a} AND {b}"));
            let or = search(&collections, &format!("{a} OR {b}"));
            for item in &and[0].items {
                assert!(or[0].items.contains(item), "{a} AND {b} produced {item:?} missing from OR");
            }
        }
    }

    #[test]
    fn repeated_searches_are_identical() {
        let lib = collection("Lib", &["The Great War", "Great Expectations", "Grate Things"]);
        let collections = [lib];
        for q in ["great", "great OR war", "great AND war", "grat wor"] {
            assert_eq!(search(&collections, q), search(&collections, q));
        }
    }

    #[test]
    fn unfiltered_copies_collection() {
        let lib = collection("Lib", &["One", "Two"]);
        let result = QueryResult::unfiltered(&lib);
        assert_eq!(result.collection_name, "Lib");
        assert_eq!(titles(&result), ["One", "Two"]);
    }

    #[test]
    fn stricter_threshold_drops_typos() {
        let lib = collection("Lib", &["The Great War"]);
        let collections = [lib];
        assert_eq!(search_with_threshold(&collections, "graet", 0.4)[0].items.len(), 1);
        assert!(search_with_threshold(&collections, "graet", 0.0)[0].items.is_empty());
    }

    #[test]
    fn union_and_intersection_helpers() {
        assert_eq!(union(vec![vec![2, 1], vec![1, 3]].into_iter()), [2, 1, 3]);
        assert_eq!(intersection(vec![vec![3, 1, 2], vec![2, 3]]), [3, 2]);
        assert!(intersection(vec![]).is_empty());
    }
}
