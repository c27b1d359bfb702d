//! Prompt composition over retrieved context.

mod common;

use std::sync::Arc;

use common::{MockEmbedder, MockStore, result};
use docreader_rag::{
    ContextChunk, DEFAULT_SYSTEM_PROMPT, PromptOptions, RagConfig, RagContext, RagEngine,
    RetrievalOptions, estimate_tokens, format_context_for_claude,
};

fn engine(store: Arc<MockStore>, config: RagConfig) -> RagEngine {
    RagEngine::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbedder::default()))
        .vector_store(store)
        .build()
        .unwrap()
}

#[test]
fn two_chunk_context_renders_citations() {
    let context = RagContext::from_chunks(vec![
        ContextChunk::from(result("a", "doc-1", 0, 0.95)),
        ContextChunk::from(result("b", "doc-2", 4, 0.72)),
    ]);
    let text = format_context_for_claude(&context);

    for needle in [
        "[Source 1]",
        "[Source 2]",
        "Document: doc-1",
        "Position: 0",
        "Relevance: 95.0%",
        "Relevance: 72.0%",
        "---",
        "text of a",
    ] {
        assert!(text.contains(needle), "missing {needle:?} in:\n{text}");
    }
    assert!(text.find("[Source 1]") < text.find("[Source 2]"));
}

#[tokio::test]
async fn prepare_prompt_uses_default_system_prompt() {
    let store = Arc::new(MockStore::with_results(vec![
        result("a", "doc-1", 0, 0.95),
        result("b", "doc-2", 1, 0.9),
    ]));
    let engine = engine(store, RagConfig::default());

    let prompt = engine.prepare_prompt("What is borrowing?", &PromptOptions::default()).await.unwrap();

    assert_eq!(prompt.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert!(prompt.user_prompt.starts_with("Context:"));
    assert!(prompt.user_prompt.contains("[Source 2]"));
    assert!(prompt.user_prompt.ends_with("What is borrowing?"));
    let context_at = prompt.user_prompt.find("[Source 1]").unwrap();
    let query_at = prompt.user_prompt.find("What is borrowing?").unwrap();
    assert!(context_at < query_at);
    assert_eq!(prompt.context.total_chunks, 2);
}

#[tokio::test]
async fn custom_system_prompt_overrides_verbatim() {
    let engine = engine(Arc::new(MockStore::default()), RagConfig::default());
    let options = PromptOptions { system_prompt: Some("Answer in French.".into()), ..Default::default() };

    let prompt = engine.prepare_prompt("q", &options).await.unwrap();
    assert_eq!(prompt.system_prompt, "Answer in French.");
    assert!(prompt.user_prompt.contains("No relevant context was found."));
    assert!(prompt.context.is_empty());
}

#[tokio::test]
async fn token_budget_packs_context() {
    let mut big = result("big", "doc-1", 0, 0.95);
    big.text = "x".repeat(400);
    let mut small = result("small", "doc-2", 0, 0.9);
    small.text = "y".repeat(40);
    let store = Arc::new(MockStore::with_results(vec![big, small]));
    let engine = engine(store, RagConfig::default());

    let options = PromptOptions {
        retrieval: RetrievalOptions::default().top_k(2),
        token_budget: Some(50),
        ..Default::default()
    };
    let prompt = engine.prepare_prompt("q", &options).await.unwrap();

    assert_eq!(prompt.context.total_chunks, 1);
    assert_eq!(prompt.context.document_ids, ["doc-2"]);
    let used: usize = prompt.context.chunks.iter().map(|c| estimate_tokens(&c.text)).sum();
    assert!(used <= 50);
}

#[tokio::test]
async fn configured_budget_applies_by_default() {
    let mut long = result("long", "doc-1", 0, 0.95);
    long.text = "z".repeat(4000);
    let store = Arc::new(MockStore::with_results(vec![long]));
    let config = RagConfig::builder().context_token_budget(100).build().unwrap();
    let engine = engine(store, config);

    let prompt = engine.prepare_prompt("q", &PromptOptions::default()).await.unwrap();
    assert!(prompt.context.is_empty());
}
