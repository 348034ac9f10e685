//! Host session: owns the settings and the reader, and turns a query string
//! into the per-collection results shown to the user.

use tracing::{debug, info};

use crate::collection::{Collection, pin_collection};
use crate::config::Settings;
use crate::loader::{HttpSourceReader, LoadReport, SourceLocator, SourceReader, load_all};
use crate::query::{QueryResult, search_with_threshold};

pub struct Session<R = HttpSourceReader> {
    settings: Settings,
    reader: R,
}

impl Session<HttpSourceReader> {
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        Ok(Self::with_reader(settings, HttpSourceReader::new()?))
    }
}

impl<R: SourceReader> Session<R> {
    pub fn with_reader(settings: Settings, reader: R) -> Self {
        Self { settings, reader }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The built-in source first (when enabled), then the enabled registered
    /// sources. A locator listed twice is loaded once.
    pub fn locators(&self) -> Vec<SourceLocator> {
        let default = self
            .settings
            .enable_default_source
            .then(|| SourceLocator::parse(&self.settings.default_source_url));

        let mut locators: Vec<SourceLocator> = Vec::new();
        for locator in default.into_iter().chain(self.settings.enabled_locators()) {
            if !locators.contains(&locator) {
                locators.push(locator);
            }
        }
        locators
    }

    /// Load every active source with the pinned collection moved to the front.
    pub async fn load(&self) -> LoadReport {
        let locators = self.locators();
        debug!(sources = locators.len(), "loading sources");
        let mut report = load_all(&self.reader, &locators).await;
        if let Some(pinned) = &self.settings.pinned_collection {
            pin_collection(&mut report.collections, pinned);
        }
        report
    }

    /// Results for `query` over already loaded collections. A blank query
    /// returns every collection unfiltered.
    pub fn resolve(&self, collections: &[Collection], query: &str) -> Vec<QueryResult> {
        if query.trim().is_empty() {
            return collections.iter().map(QueryResult::unfiltered).collect();
        }
        search_with_threshold(collections, query, self.settings.threshold)
    }

    pub async fn query(&self, query: &str) -> Vec<QueryResult> {
        let report = self.load().await;
        let results = self.resolve(&report.collections, query);
        info!(
            query,
            collections = results.len(),
            hits = results.iter().map(|r| r.items.len()).sum::<usize>(),
            "query resolved"
        );
        results
    }

    /// Status line naming the collections that answered, e.g. `Active: BST | LOC`.
    pub fn active_line(&self, results: &[QueryResult]) -> String {
        let designators: Vec<&str> = results.iter().map(|r| r.designator.as_str()).collect();
        format!("Active: {}", designators.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceDescriptor;
    use crate::loader::LoadError;
    use std::collections::HashMap;

    struct MockReader {
        bodies: HashMap<String, String>,
    }

    impl SourceReader for MockReader {
        async fn read(&self, locator: &SourceLocator) -> Result<String, LoadError> {
            self.bodies
                .get(&locator.to_string())
                .cloned()
                .ok_or(LoadError::Status(404))
        }
    }

    fn doc(name: &str, designator: &str, titles: &[&str]) -> String {
        let items: Vec<_> = titles.iter().map(|t| serde_json::json!({"title": t})).collect();
        serde_json::json!({
            "Collection": {"name": name, "designator": designator, "Categories": [{"name": "Main", "items": items}]}
        })
        .to_string()
    }

    fn settings(default_url: &str, sources: &[&str]) -> Settings {
        Settings {
            default_source_url: default_url.to_string(),
            sources: sources.iter().map(|s| SourceDescriptor::new(*s)).collect(),
            ..Settings::default()
        }
    }

    fn session(settings: Settings) -> Session<MockReader> {
        let bodies = [
            ("default.json", doc("BiblicalStory", "BST", &["The Great Flood"])),
            ("lib1.json", doc("Lib1", "L1", &["The Great War"])),
            ("lib2.json", doc("Lib2", "L2", &["Great Expectations"])),
        ];
        let reader = MockReader {
            bodies: bodies.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        };
        Session::with_reader(settings, reader)
    }

    fn names(results: &[QueryResult]) -> Vec<&str> {
        results.iter().map(|r| r.collection_name.as_str()).collect()
    }

    #[test]
    fn locators_put_default_first_and_dedupe() {
        let s = session(settings("default.json", &["lib1.json", "default.json", "lib1.json"]));
        let locators: Vec<String> = s.locators().iter().map(ToString::to_string).collect();
        assert_eq!(locators, ["default.json", "lib1.json"]);
    }

    #[test]
    fn locators_skip_disabled_default_and_sources() {
        let mut cfg = settings("default.json", &["lib1.json", "lib2.json"]);
        cfg.enable_default_source = false;
        cfg.sources[0].enabled = false;
        let locators: Vec<String> = session(cfg).locators().iter().map(ToString::to_string).collect();
        assert_eq!(locators, ["lib2.json"]);
    }

    #[tokio::test]
    async fn blank_query_returns_everything_unfiltered() {
        let s = session(settings("default.json", &["lib1.json", "lib2.json"]));
        let results = s.query("   ").await;
        assert_eq!(names(&results), ["BiblicalStory", "Lib1", "Lib2"]);
        assert!(results.iter().all(|r| r.items.len() == 1));
    }

    #[tokio::test]
    async fn pinned_collection_moves_to_front() {
        let mut cfg = settings("default.json", &["lib1.json", "lib2.json"]);
        cfg.pinned_collection = Some("Lib2".into());
        let results = session(cfg).query("").await;
        assert_eq!(names(&results), ["Lib2", "BiblicalStory", "Lib1"]);
    }

    #[tokio::test]
    async fn query_filters_and_drops_unreachable_sources() {
        let s = session(settings("default.json", &["lib1.json", "missing.json", "lib2.json"]));
        let results = s.query("war").await;

        assert_eq!(names(&results), ["BiblicalStory", "Lib1", "Lib2"]);
        assert!(results[0].items.is_empty());
        assert_eq!(results[1].items[0].title.as_deref(), Some("The Great War"));
        assert!(results[2].items.is_empty());
    }

    #[tokio::test]
    async fn load_reports_failed_sources() {
        let s = session(settings("default.json", &["missing.json"]));
        let report = s.load().await;
        assert_eq!(report.collections.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].locator, "missing.json");
    }

    #[tokio::test]
    async fn active_line_lists_designators_in_order() {
        let s = session(settings("default.json", &["lib1.json", "lib2.json"]));
        let results = s.query("great").await;
        assert_eq!(s.active_line(&results), "Active: BST | L1 | L2");
    }

    #[test]
    fn active_line_with_no_collections() {
        let s = session(settings("default.json", &[]));
        assert_eq!(s.active_line(&[]), "Active: ");
    }
}
