//! Grounded answers over a retrieval result.

use crate::error::{RetrieveError, RetrieveResult};
use crate::request::RetrievalResult;
use neogpt_core::{LanguageModel, Usage};
use serde::{Deserialize, Serialize};

/// System prompt for answering from retrieved context.
pub const ANSWER_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that answers questions based on the provided context from the user's documents and the web.

Guidelines:
- Base your answers on the context provided
- If the context doesn't contain enough information, acknowledge that
- Be concise but thorough
- When relevant, mention which source(s) your answer is based on
- Do not make up information not present in the context"#;

/// A hit as shown to the user next to the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub location: String,
    pub excerpt: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceReference>,
    /// Retrieval and answer generation combined.
    pub usage: Usage,
}

/// Build the answer prompt with numbered context blocks.
pub fn build_answer_prompt(question: &str, result: &RetrievalResult) -> String {
    let mut prompt = String::new();

    prompt.push_str("Use the following context to answer the question. If the context doesn't contain relevant information, say so.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str("─────────────────────────────────────\n");

    for (i, hit) in result.hits().iter().enumerate() {
        prompt.push_str(&format!("\n[{}] From: {}\n", i + 1, hit.source_location));
        prompt.push_str(&hit.content);
        prompt.push('\n');
    }

    prompt.push_str("\n─────────────────────────────────────\n\n");
    prompt.push_str(&format!("Question: {}\n\n", question));
    prompt.push_str("Answer:");

    prompt
}

/// Shortened hit list for display.
pub fn source_references(result: &RetrievalResult) -> Vec<SourceReference> {
    result
        .hits()
        .iter()
        .map(|hit| SourceReference {
            location: hit.source_location.clone(),
            excerpt: truncate_content(&hit.content, 200),
            score: hit.score,
        })
        .collect()
}

/// Answer `question` from `result`. An empty result is refused before the
/// model is called.
pub async fn answer(
    model: &dyn LanguageModel,
    question: &str,
    result: &RetrievalResult,
) -> RetrieveResult<Answer> {
    if result.is_empty() {
        return Err(RetrieveError::NoContext);
    }

    let prompt = build_answer_prompt(question, result);
    let generation = model.generate(&prompt, Some(ANSWER_SYSTEM_PROMPT)).await?;

    let mut usage = result.usage();
    usage += generation.usage;

    Ok(Answer {
        text: generation.text.trim().to_string(),
        sources: source_references(result),
        usage,
    })
}

/// Truncate content to a maximum length in characters, adding an ellipsis.
pub fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
