//! Prompt templates and text helpers for the RAG pipeline

use crate::domain::models::Chunk;

const REASONING_END_TAG: &str = "</think>";

/// Ask the model to restate the user's question in a more precise form
pub fn query_rewrite_prompt(query: &str) -> String {
    format!(
        "Rewrite the following question in a more professional, academic phrasing \
         while keeping its core meaning.\n\n\
         Question: {query}\n\n\
         Reply with the rewritten question only, no explanation, at most 30 words. Output:"
    )
}

/// Context block fed to the answer stage
pub fn inject_context(original_query: &str, rewritten_query: &str, context: &[Chunk]) -> String {
    let mut block = format!(
        "Original question: {original_query}\nRewritten question: {rewritten_query}\nContext:\n"
    );
    for chunk in context {
        block.push_str("- ");
        block.push_str(&chunk.text);
        block.push('\n');
    }
    block
}

pub fn rag_answer_prompt(context_block: &str) -> String {
    format!(
        "```\n{context_block}\n```\n\n\
         Answer the user's question based on the context above:"
    )
}

/// Drop everything up to and including a closing `</think>` tag
pub fn strip_reasoning(text: &str) -> &str {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    match text.to_ascii_lowercase().find(REASONING_END_TAG) {
        Some(idx) => &text[idx + REASONING_END_TAG.len()..],
        None => text,
    }
}

/// Query handed to the search stage: the cleaned rewrite, or the original
/// question when the rewrite produced nothing usable.
pub fn search_query<'a>(rewritten: &'a str, original: &'a str) -> &'a str {
    let cleaned = strip_reasoning(rewritten).trim();
    if cleaned.is_empty() {
        original.trim()
    } else {
        cleaned
    }
}

/// Conversation title: the first ten characters of the latest message, as sent
pub fn chat_title(content: &str) -> String {
    content.chars().take(10).collect()
}
