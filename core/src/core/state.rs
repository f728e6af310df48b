//! Mutable BFS bookkeeping for one crawl run.
//!
//! Owned by a single `Spider::scan` call and dropped once the result is
//! produced. Tasks never touch it: they hand their discovered links back to
//! the controller, which folds them in after each batch.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::utils::extractor::FormDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub seed: String,
    pub urls: Vec<String>,
    #[serde(default)]
    pub forms: Vec<FormDescriptor>,
}

#[derive(Debug)]
pub struct CrawlState {
    seed: String,
    visited: HashSet<String>,
    visit_order: Vec<String>,
    frontier: Vec<String>,
    forms: Vec<FormDescriptor>,
    depth: u32,
}

impl CrawlState {
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            frontier: vec![seed.clone()],
            seed,
            visited: HashSet::new(),
            visit_order: Vec::new(),
            forms: Vec::new(),
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn frontier(&self) -> &[String] {
        &self.frontier
    }

    pub fn visited_count(&self) -> usize {
        self.visit_order.len()
    }

    /// Records `url` as seen. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if self.visited.insert(url.to_string()) {
            self.visit_order.push(url.to_string());
            true
        } else {
            false
        }
    }

    /// Takes the current layer, leaving an empty frontier behind for the
    /// links the layer discovers.
    pub fn take_layer(&mut self) -> Vec<String> {
        std::mem::take(&mut self.frontier)
    }

    /// Folds one batch's outcome back in: the processed URLs become visited,
    /// and every discovered URL not yet seen is both visited and queued for
    /// the next layer. Returns how many new URLs were queued.
    pub fn absorb_batch(&mut self, batch: &[String], discovered: Vec<String>) -> usize {
        for url in batch {
            self.mark_visited(url);
        }

        let mut queued = 0;
        for url in discovered {
            if self.mark_visited(&url) {
                self.frontier.push(url);
                queued += 1;
            }
        }
        queued
    }

    pub fn record_forms(&mut self, forms: Vec<FormDescriptor>) {
        self.forms.extend(forms);
    }

    pub fn advance_depth(&mut self) {
        self.depth += 1;
    }

    pub fn into_result(self) -> CrawlResult {
        CrawlResult {
            seed: self.seed,
            urls: self.visit_order,
            forms: self.forms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = CrawlState::new("https://a.test/");
        assert_eq!(state.frontier(), &["https://a.test/".to_string()]);
        assert_eq!(state.depth(), 0);
        assert_eq!(state.visited_count(), 0);
    }

    #[test]
    fn test_absorb_dedups_against_visited() {
        let mut state = CrawlState::new("https://a.test/");
        let layer = state.take_layer();

        let queued = state.absorb_batch(
            &layer,
            vec![
                "https://a.test/".to_string(),
                "https://a.test/one".to_string(),
                "https://a.test/one".to_string(),
                "https://a.test/two".to_string(),
            ],
        );

        assert_eq!(queued, 2);
        assert_eq!(state.frontier().len(), 2);
        assert_eq!(state.visited_count(), 3);
    }

    #[test]
    fn test_result_keeps_first_visit_order() {
        let mut state = CrawlState::new("https://a.test/");
        let layer = state.take_layer();
        state.absorb_batch(&layer, vec!["https://a.test/b".to_string(), "https://a.test/a".to_string()]);
        state.advance_depth();

        let result = state.into_result();
        assert_eq!(result.seed, "https://a.test/");
        assert_eq!(
            result.urls,
            vec!["https://a.test/", "https://a.test/b", "https://a.test/a"]
        );
    }

    #[test]
    fn test_crawl_result_json_round_trip() {
        let result = CrawlResult {
            seed: "https://a.test/".to_string(),
            urls: vec!["https://a.test/".to_string(), "https://a.test/x".to_string()],
            forms: vec![FormDescriptor {
                id: 0,
                url: "https://a.test/x".to_string(),
                fields: Vec::new(),
            }],
        };

        let json = serde_json::to_string_pretty(&result).unwrap();
        assert!(json.contains("\"seed\""));
        assert!(json.contains("\"urls\""));

        let parsed: CrawlResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_result_without_forms_still_loads() {
        let parsed: CrawlResult =
            serde_json::from_str(r#"{"seed": "https://a.test/", "urls": ["https://a.test/"]}"#)
                .unwrap();
        assert!(parsed.forms.is_empty());
    }
}
