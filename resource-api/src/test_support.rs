//! In-memory model for tests
//!
//! [`MemoryModel`] keeps documents in a vector, records every store call,
//! and can be primed to fail a given operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::handlers::js_to_string;
use crate::repository::{
    Criteria, Document, FindQuery, Model, Populate, StoreError, StoreOperation, StoreResult,
    ID_FIELD,
};

/// A 24 character hexadecimal id derived from `n`
pub(crate) fn oid(n: u64) -> String {
    format!("{n:024x}")
}

/// A recorded store call
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Find(FindQuery),
    FindById(String, Vec<Populate>),
    Count(Criteria),
    Save(Document),
    Remove(Document),
}

#[derive(Default)]
struct State {
    documents: Vec<Document>,
    calls: Vec<Call>,
    failures: HashMap<StoreOperation, StoreError>,
    count: Option<u64>,
    next_id: u64,
}

/// Model of `User` documents in the `users` collection
#[derive(Clone, Default)]
pub(crate) struct MemoryModel {
    state: Arc<Mutex<State>>,
}

impl MemoryModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_documents(documents: Vec<Value>) -> Self {
        let model = Self::new();
        model.state().documents = documents
            .into_iter()
            .map(|value| Document::from_value(value).expect("test documents are objects"))
            .collect();
        model
    }

    /// Fail every call of `operation` with `error`
    pub(crate) fn fail(&self, operation: StoreOperation, error: StoreError) {
        self.state().failures.insert(operation, error);
    }

    /// Answer every count with `count`
    pub(crate) fn set_count(&self, count: u64) {
        self.state().count = Some(count);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub(crate) fn find_calls(&self) -> Vec<FindQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Find(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn saved(&self) -> Vec<Document> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Save(document) => Some(document),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn documents(&self) -> Vec<Document> {
        self.state().documents.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory model lock poisoned")
    }

    fn record(&self, call: Call, operation: StoreOperation) -> StoreResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(error) = state.failures.get(&operation).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

/// Top-level equality on the non-operator keys of `criteria`
fn matches(document: &Document, criteria: &Criteria) -> bool {
    let Some(criteria) = criteria.as_object() else {
        return true;
    };
    criteria
        .iter()
        .filter(|(key, _)| !key.starts_with('$'))
        .all(|(key, expected)| match document.get(key) {
            Some(actual) if actual == expected => true,
            Some(actual) => expected.as_str() == Some(js_to_string(actual).as_str()),
            None => false,
        })
}

impl Model for MemoryModel {
    fn model_name(&self) -> &str {
        "User"
    }

    fn collection_name(&self) -> &str {
        "users"
    }

    async fn find(&self, query: FindQuery) -> StoreResult<Vec<Document>> {
        let state = self.record(Call::Find(query.clone()), StoreOperation::Find)?;
        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit as usize
        };
        Ok(state
            .documents
            .iter()
            .filter(|document| matches(document, &query.criteria))
            .skip(query.skip as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str, populate: &[Populate]) -> StoreResult<Option<Document>> {
        let state = self.record(
            Call::FindById(id.to_string(), populate.to_vec()),
            StoreOperation::FindById,
        )?;
        Ok(state
            .documents
            .iter()
            .find(|document| document.id().as_deref() == Some(id))
            .cloned())
    }

    async fn count_documents(&self, criteria: &Criteria) -> StoreResult<u64> {
        let state = self.record(Call::Count(criteria.clone()), StoreOperation::Count)?;
        Ok(state.count.unwrap_or_else(|| {
            state
                .documents
                .iter()
                .filter(|document| matches(document, criteria))
                .count() as u64
        }))
    }

    async fn save(&self, document: Document) -> StoreResult<Document> {
        let mut state = self.record(Call::Save(document.clone()), StoreOperation::Save)?;
        let mut document = document;
        let id = match document.id() {
            Some(id) => id,
            None => {
                state.next_id += 1;
                let id = oid(0xf000 + state.next_id);
                document.set(ID_FIELD, Value::String(id.clone()));
                id
            }
        };

        let existing = state
            .documents
            .iter()
            .position(|existing| existing.id().as_deref() == Some(id.as_str()));
        match existing {
            Some(index) => state.documents[index] = document.clone(),
            None => state.documents.push(document.clone()),
        }
        Ok(document)
    }

    async fn remove(&self, document: &Document) -> StoreResult<()> {
        let mut state = self.record(Call::Remove(document.clone()), StoreOperation::Remove)?;
        let id = document.id();
        state.documents.retain(|existing| existing.id() != id);
        Ok(())
    }
}
