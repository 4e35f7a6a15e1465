//! Prompt template for grounded answers.
//!
//! The system turn carries a fixed instruction followed by the retrieved
//! context; the user turn carries the question verbatim.

use crate::models::ScoredChunk;

/// Fixed instruction placed ahead of the retrieved context.
pub const SYSTEM_INSTRUCTION: &str = "You are a professional AI assistant. Use only the retrieved context below to answer the user's question accurately.\n\
- If the answer is not in the context or you are unsure, say \"I don't know\".\n\
- Keep responses concise, at most 3 sentences.";

/// Separator between context chunks.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// A two-turn chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Render as a single block of text, for completion-style endpoints.
    pub fn to_text(&self) -> String {
        format!("{}\n\nQuestion: {}\n\nAnswer:", self.system, self.user)
    }
}

/// Build the prompt for `query` over `context`.
///
/// Context chunks are appended in retrieval order, whole chunks only,
/// until adding the next one would push the context past
/// `max_context_chars` characters.
pub fn build_prompt(query: &str, context: &[ScoredChunk], max_context_chars: usize) -> Prompt {
    Prompt {
        system: format!(
            "{}\n\nContext:\n{}",
            SYSTEM_INSTRUCTION,
            build_context(context, max_context_chars)
        ),
        user: query.trim().to_string(),
    }
}

/// Concatenate chunk texts within the character budget.
pub fn build_context(context: &[ScoredChunk], max_context_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for sc in context {
        let text = sc.chunk.text.trim();
        if text.is_empty() {
            continue;
        }
        let extra = text.chars().count()
            + if out.is_empty() {
                0
            } else {
                CONTEXT_SEPARATOR.len()
            };
        if used + extra > max_context_chars {
            break;
        }
        if !out.is_empty() {
            out.push_str(CONTEXT_SEPARATOR);
        }
        out.push_str(text);
        used += extra;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn scored(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: String::new(),
                source: "a.pdf".to_string(),
                document_index: 0,
                chunk_index: 0,
                start: 0,
                page: 1,
                text: text.to_string(),
                hash: String::new(),
            },
            score: 1.0,
        }
    }

    #[test]
    fn test_prompt_contains_instruction_context_and_query() {
        let prompt = build_prompt(
            "  What is the capital of France? ",
            &[scored("The capital of France is Paris.")],
            1000,
        );
        assert!(prompt.system.starts_with(SYSTEM_INSTRUCTION));
        assert!(prompt.system.contains("I don't know"));
        assert!(prompt.system.contains("3 sentences"));
        assert!(prompt.system.ends_with("The capital of France is Paris."));
        assert_eq!(prompt.user, "What is the capital of France?");
    }

    #[test]
    fn test_context_respects_budget() {
        let chunks = vec![scored("aaaa"), scored("bbbb"), scored("cccc")];
        assert_eq!(build_context(&chunks, 10), "aaaa\n\nbbbb");
        assert_eq!(build_context(&chunks, 3), "");
    }

    #[test]
    fn test_to_text_places_question_last() {
        let prompt = build_prompt("Why?", &[scored("Because.")], 100);
        let text = prompt.to_text();
        assert!(text.ends_with("Question: Why?\n\nAnswer:"));
    }
}
