//! Vector store gateway: upsert, filtered similarity search, delete by id.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::document::{EmbeddingRecord, Metadata, SearchResult, UpsertAck};
use crate::error::Result;

/// A storage backend for embedding records with similarity search.
///
/// The store owns query embedding: `search` takes query text. An empty query
/// asks for an unranked scan of the records matching the filter, which the
/// engine uses to enumerate a document's chunks and to sample the index.
///
/// # Example
///
/// ```rust,ignore
/// use docreader_rag::{InMemoryVectorStore, MetadataFilter, SearchOptions, VectorStore};
///
/// let store = InMemoryVectorStore::new(embedder);
/// store.upsert(&records).await?;
/// let options = SearchOptions::new(5).with_filter(MetadataFilter::eq("documentId", "doc-1"));
/// let results = store.search("how do I reset?", &options).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by id.
    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<UpsertAck>;

    /// Search for at most `options.top_k` records relevant to `query`.
    ///
    /// Returns results ordered by descending score.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Parameters of a [`VectorStore::search`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
    pub min_relevance: Option<f32>,
}

impl SearchOptions {
    pub fn new(top_k: usize) -> Self {
        Self { top_k, filter: None, min_relevance: None }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = Some(min_relevance);
        self
    }
}

/// A condition on a single metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// The field equals the value.
    Eq(Value),
    /// The field equals one of the values.
    In(Vec<Value>),
}

impl FilterCondition {
    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Eq(expected), Some(actual)) => expected == actual,
            (Self::In(allowed), Some(actual)) => allowed.contains(actual),
            (_, None) => false,
        }
    }
}

/// A conjunction of per-field metadata conditions.
///
/// Renders to the common wire shape with [`to_json`](MetadataFilter::to_json):
/// `{"field": value}` for equality and `{"field": {"$in": [...]}}` for membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, FilterCondition)>,
}

impl MetadataFilter {
    /// A filter requiring `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_eq(field, value)
    }

    /// A filter requiring `field ∈ values`.
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::default().and_in(field, values)
    }

    /// Add an equality condition.
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), FilterCondition::Eq(value.into())));
        self
    }

    /// Add a membership condition.
    pub fn and_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((field.into(), FilterCondition::In(values)));
        self
    }

    /// The field conditions in insertion order.
    pub fn conditions(&self) -> &[(String, FilterCondition)] {
        &self.conditions
    }

    /// Whether `metadata` satisfies every condition. Missing fields never match.
    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(metadata.and_then(|m| m.get(field))))
    }

    /// Render the filter as a JSON object.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (field, condition) in &self.conditions {
            let rendered = match condition {
                FilterCondition::Eq(value) => value.clone(),
                FilterCondition::In(values) => json!({ "$in": values }),
            };
            object.insert(field.clone(), rendered);
        }
        Value::Object(object)
    }
}
