//! Prompt composition: citation blocks, system prompt, and context windows.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::context::RagContext;
use crate::document::{POSITION_KEY, metadata_value_to_string};
use crate::retrieval::RetrievalOptions;

/// The system prompt used when the caller does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful reading assistant helping the user \
understand their documents. Answer using only the provided context. Cite every claim with the \
matching [Source N] label. If the context does not contain the answer, say so plainly instead \
of guessing.";

const SEPARATOR: &str = "---";

/// Tokens set aside for the prompt scaffolding around the context.
const PROMPT_OVERHEAD_TOKENS: usize = 500;

/// Options for [`prepare_prompt`](crate::RagEngine::prepare_prompt).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptOptions {
    /// Replaces [`DEFAULT_SYSTEM_PROMPT`] verbatim.
    pub system_prompt: Option<String>,
    pub retrieval: RetrievalOptions,
    /// Pack the retrieved context into this many estimated tokens.
    pub token_budget: Option<usize>,
}

/// A prompt ready for the downstream language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreparedPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub context: RagContext,
}

/// Render `context` as numbered citation blocks separated by `---` lines.
///
/// ```text
/// [Source 1]
/// Document: doc-1
/// Position: 0
/// Relevance: 95.0%
///
/// chunk text
///
/// ---
///
/// [Source 2]
/// ...
/// ```
pub fn format_context_for_claude(context: &RagContext) -> String {
    let blocks: Vec<String> = context
        .chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut block = format!("[Source {}]\n", i + 1);
            let document = chunk.document_id().unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(block, "Document: {document}");
            if let Some(position) = chunk.metadata.get(POSITION_KEY) {
                let _ = writeln!(block, "Position: {}", metadata_value_to_string(position));
            }
            let _ = writeln!(block, "Relevance: {:.1}%", f64::from(chunk.score) * 100.0);
            block.push('\n');
            block.push_str(&chunk.text);
            block
        })
        .collect();

    blocks.join(&format!("\n\n{SEPARATOR}\n\n"))
}

/// Build the user-facing message: a `Context:` section with the citation
/// blocks, followed by the query.
pub fn compose_user_prompt(query: &str, context: &RagContext) -> String {
    let body = if context.is_empty() {
        "No relevant context was found.".to_string()
    } else {
        format_context_for_claude(context)
    };
    format!("Context:\n\n{body}\n\nQuestion: {query}")
}

/// Pick the system prompt: the caller's verbatim, or the default.
pub fn system_prompt(custom: Option<&str>) -> String {
    custom.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string()
}

/// Tokens reserved for the model's answer, by model family.
fn output_reserve(model: &str) -> usize {
    let model = model.to_ascii_lowercase();
    if model.contains("opus") || model.contains("sonnet") { 4096 } else { 2048 }
}

/// Tokens of `total_budget` that may be spent on retrieved context for
/// `model`.
///
/// Reserves the model's output allowance plus prompt overhead. When the
/// budget cannot cover that reservation, half of it is returned so the
/// answer always keeps some room. The result is below `total_budget` for any
/// non-zero budget.
pub fn optimal_context_window(total_budget: usize, model: &str) -> usize {
    let reserved = output_reserve(model) + PROMPT_OVERHEAD_TOKENS;
    if total_budget > reserved { total_budget - reserved } else { total_budget / 2 }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::ContextChunk;
    use crate::document::{DOCUMENT_ID_KEY, Metadata};

    fn chunk(doc: &str, position: Option<usize>, score: f32, text: &str) -> ContextChunk {
        let mut metadata = Metadata::new();
        metadata.insert(DOCUMENT_ID_KEY.to_string(), json!(doc));
        if let Some(position) = position {
            metadata.insert(POSITION_KEY.to_string(), json!(position));
        }
        ContextChunk { text: text.to_string(), score, metadata }
    }

    #[test]
    fn renders_citation_blocks() {
        let context = RagContext::from_chunks(vec![
            chunk("doc-1", Some(0), 0.95, "Rust has ownership."),
            chunk("doc-2", None, 0.8, "Borrowing is checked."),
        ]);
        let text = format_context_for_claude(&context);
        let expected = "[Source 1]\nDocument: doc-1\nPosition: 0\nRelevance: 95.0%\n\n\
                        Rust has ownership.\n\n---\n\n\
                        [Source 2]\nDocument: doc-2\nRelevance: 80.0%\n\nBorrowing is checked.";
        assert_eq!(text, expected);
    }

    #[test]
    fn chunk_text_is_rendered_verbatim() {
        let context =
            RagContext::from_chunks(vec![chunk("doc-1", Some(0), 0.5, "  indented\ntrailing  \n")]);
        let text = format_context_for_claude(&context);
        assert!(text.ends_with("\n\n  indented\ntrailing  \n"));
    }

    #[test]
    fn user_prompt_puts_context_before_question() {
        let context = RagContext::from_chunks(vec![chunk("doc-1", Some(2), 0.5, "body")]);
        let prompt = compose_user_prompt("What is it?", &context);
        assert!(prompt.starts_with("Context:\n\n[Source 1]"));
        assert!(prompt.ends_with("Question: What is it?"));

        let empty = compose_user_prompt("q", &RagContext::default());
        assert!(empty.contains("No relevant context was found."));
    }

    #[test]
    fn custom_system_prompt_replaces_default() {
        assert_eq!(system_prompt(Some("Be brief.")), "Be brief.");
        assert_eq!(system_prompt(None), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn context_window_leaves_room_for_output() {
        assert_eq!(optimal_context_window(200_000, "claude-3-opus"), 200_000 - 4596);
        assert_eq!(optimal_context_window(200_000, "claude-3-haiku"), 200_000 - 2548);
        assert_eq!(optimal_context_window(200_000, "some-model"), 200_000 - 2548);
        assert_eq!(optimal_context_window(1000, "claude-3-5-sonnet"), 500);
        for budget in [1usize, 2, 10, 4596, 4597, 100_000] {
            assert!(optimal_context_window(budget, "claude-3-opus") < budget);
        }
    }
}
