//! In-memory vector store: ordering, filtering, scans, and deletion.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::MockEmbedder;
use docreader_rag::{
    DOCUMENT_ID_KEY, EmbeddingRecord, InMemoryVectorStore, Metadata, MetadataFilter, RagConfig,
    RagEngine, SearchOptions, VectorStore,
};
use docreader_rag::{Document, IndexOptions, RetrievalOptions};
use proptest::prelude::*;
use serde_json::json;

fn record(id: &str, document_id: &str, vector: Vec<f32>) -> EmbeddingRecord {
    let mut metadata = Metadata::new();
    metadata.insert(DOCUMENT_ID_KEY.to_string(), json!(document_id));
    EmbeddingRecord { id: id.to_string(), vector, text: format!("text {id}"), metadata }
}

/// Generate a non-zero embedding of the mock embedder's dimension.
fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, common::DIM)
        .prop_filter("non-zero embedding", |v| v.iter().map(|x| x * x).sum::<f32>() > 1e-6)
}

fn arb_record() -> impl Strategy<Value = EmbeddingRecord> {
    ("[a-z]{3,8}", prop_oneof![Just("doc-a"), Just("doc-b")], arb_embedding())
        .prop_map(|(id, doc, vector)| record(&id, doc, vector))
}

/// *For any* set of stored records, a text search returns at most `top_k`
/// results, all within `[0, 1]`, ordered by descending score.
mod prop_inmemory_search_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            records in proptest::collection::vec(arb_record(), 1..20),
            query in "[a-z ]{1,30}",
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new(Arc::new(MockEmbedder::default()));

                let mut deduped: HashMap<String, EmbeddingRecord> = HashMap::new();
                for r in &records {
                    deduped.entry(r.id.clone()).or_insert_with(|| r.clone());
                }
                let unique: Vec<EmbeddingRecord> = deduped.into_values().collect();

                store.upsert(&unique).await.unwrap();
                let results = store.search(&query, &SearchOptions::new(top_k)).await.unwrap();
                (results, unique.len())
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique_count);
            for r in &results {
                prop_assert!((0.0..=1.0).contains(&r.score));
            }
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[tokio::test]
async fn filter_restricts_results() {
    let store = InMemoryVectorStore::new(Arc::new(MockEmbedder::default()));
    store
        .upsert(&[
            record("a0", "doc-a", vec![1.0, 0.0, 0.0]),
            record("b0", "doc-b", vec![1.0, 0.0, 0.0]),
            record("c0", "doc-c", vec![1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let options = SearchOptions::new(10)
        .with_filter(MetadataFilter::is_in(DOCUMENT_ID_KEY, ["doc-a", "doc-c"]));
    let results = store.search("hello", &options).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a0", "c0"]);
}

#[tokio::test]
async fn empty_query_scans_in_insertion_order() {
    let store = InMemoryVectorStore::new(Arc::new(MockEmbedder::default()));
    store
        .upsert(&[
            record("x", "doc-a", vec![0.0, 1.0, 0.0]),
            record("y", "doc-b", vec![1.0, 0.0, 0.0]),
            record("z", "doc-a", vec![0.0, 0.0, 1.0]),
        ])
        .await
        .unwrap();

    let results = store.search("", &SearchOptions::new(10)).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["x", "y", "z"]);
    assert!(results.iter().all(|r| r.score == 0.0));

    let options = SearchOptions::new(10).with_filter(MetadataFilter::eq(DOCUMENT_ID_KEY, "doc-a"));
    assert_eq!(store.search("", &options).await.unwrap().len(), 2);
}

#[tokio::test]
async fn upsert_replaces_and_delete_removes() {
    let store = InMemoryVectorStore::new(Arc::new(MockEmbedder::default()));
    let ack = store.upsert(&[record("a", "doc-a", vec![1.0, 0.0, 0.0])]).await.unwrap();
    assert_eq!(ack.upserted_count, 1);
    assert_eq!(ack.ids, ["a"]);

    let mut replaced = record("a", "doc-a", vec![0.0, 1.0, 0.0]);
    replaced.text = "new text".into();
    store.upsert(&[replaced]).await.unwrap();
    assert_eq!(store.len().await, 1);
    assert_eq!(store.search("", &SearchOptions::new(1)).await.unwrap()[0].text, "new text");

    store.delete(&["a".to_string(), "missing".to_string()]).await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn engine_round_trip_over_in_memory_store() {
    let embedder = Arc::new(MockEmbedder::default());
    let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
    let config = RagConfig::builder().chunk_size(20).chunk_overlap(5).build().unwrap();
    let engine = RagEngine::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store.clone())
        .build()
        .unwrap();

    let result = engine
        .index_documents(&[
            Document::new("guide", "Ownership moves values between bindings in Rust code."),
            Document::new("notes", "Borrowing lends access without moving."),
        ])
        .await;
    assert_eq!(result.failed, 0);
    let stored = store.len().await;
    assert!(stored > 2);

    let stats = engine.index_stats().await;
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.total_chunks, stored);

    let context = engine
        .retrieve_context("ownership", &RetrievalOptions::default().document_ids(["notes"]))
        .await
        .unwrap();
    assert!(context.total_chunks > 0);
    assert_eq!(context.document_ids, ["notes"]);

    let removed = engine.remove_document("guide").await.unwrap();
    assert!(removed > 0);
    assert_eq!(store.len().await, stored - removed);
    assert_eq!(engine.index_stats().await.total_documents, 1);

    engine.index_document(&Document::new("guide", "Back again."), &IndexOptions::default()).await.unwrap();
    assert!(engine.health_check().await.is_healthy());
}
