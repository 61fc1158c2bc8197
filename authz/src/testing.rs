//! In-memory collaborators shared by the unit tests.

use crate::context::RequestContext;
use crate::error::Result;
use crate::store::{Document, Filter, ResourceStore, SearchParam};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A store that keeps documents per collection and understands the subset of
/// filter operators the engine emits for lookups.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    pub searches: Mutex<Vec<SearchParam>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, document: Value) {
        if let Value::Object(document) = document {
            self.collections
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(document);
        }
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn matches(document: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => condition
            .as_array()
            .is_some_and(|items| items.iter().all(|f| f.as_object().is_some_and(|f| matches(document, f)))),
        "$or" => condition
            .as_array()
            .is_some_and(|items| items.iter().any(|f| f.as_object().is_some_and(|f| matches(document, f)))),
        field => {
            let actual = document.get(field).unwrap_or(&Value::Null);
            match condition {
                Value::Object(ops) => ops.iter().all(|(op, expected)| match op.as_str() {
                    "$eq" => loose_eq(actual, expected),
                    "$ne" => !loose_eq(actual, expected),
                    "$in" => expected
                        .as_array()
                        .is_some_and(|items| items.iter().any(|item| loose_eq(actual, item))),
                    "$nin" => expected
                        .as_array()
                        .is_some_and(|items| !items.iter().any(|item| loose_eq(actual, item))),
                    "$regex" => match (actual.as_str(), expected.as_str()) {
                        (Some(text), Some(pattern)) => {
                            Regex::new(pattern).is_ok_and(|regex| regex.is_match(text))
                        }
                        _ => false,
                    },
                    "$options" => true,
                    _ => false,
                }),
                expected => loose_eq(actual, expected),
            }
        }
    })
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn search_auth_resource(
        &self,
        _ctx: &RequestContext,
        param: SearchParam,
    ) -> Result<Vec<Document>> {
        self.searches.lock().unwrap().push(param.clone());
        let collections = self.collections.lock().unwrap();
        let documents = collections
            .get(&param.collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| matches(document, &param.filter))
                    .skip(param.offset)
                    .take(param.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(documents)
    }

    async fn count_by_filter(
        &self,
        _ctx: &RequestContext,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<u64>> {
        let collections = self.collections.lock().unwrap();
        let documents = collections.get(table).cloned().unwrap_or_default();
        Ok(filters
            .iter()
            .map(|filter| documents.iter().filter(|d| matches(d, filter)).count() as u64)
            .collect())
    }
}
