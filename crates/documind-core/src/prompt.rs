//! Grounding prompt assembly.
//!
//! Produces the instruction sent to the generative model: answer only
//! from the supplied excerpts, each tagged with its provenance, followed
//! by the verbatim question.

use std::fmt::Write;

use crate::models::RetrievalResult;

/// Reply used when nothing relevant was retrieved.
pub const NO_RELEVANT_CONTENT: &str =
    "I couldn't find that information in the uploaded document.";

/// Separator placed between excerpts.
const EXCERPT_SEPARATOR: &str = "\n\n---\n\n";

/// Provenance tag for one excerpt, e.g. `[Excerpt 2 | chunk 14 | page 3]`.
pub fn provenance_tag(ordinal: usize, chunk_id: usize, page: Option<u32>) -> String {
    match page {
        Some(p) => format!("[Excerpt {} | chunk {} | page {}]", ordinal, chunk_id, p),
        None => format!("[Excerpt {} | chunk {}]", ordinal, chunk_id),
    }
}

/// Build the grounding prompt for `question` over `retrieval`.
///
/// Excerpts appear in retrieval order, numbered from 1. With an empty
/// retrieval the prompt still forbids outside knowledge and instructs the
/// model to reply with [`NO_RELEVANT_CONTENT`].
pub fn build_grounding_prompt(question: &str, retrieval: &RetrievalResult) -> String {
    let mut prompt = String::from(
        "You are DocuMind, an assistant that answers questions about an uploaded document.\n\
         Answer using ONLY the document excerpts provided below.\n\
         \n\
         RULES:\n\
         - Do not use outside knowledge.\n",
    );
    let _ = writeln!(
        prompt,
        "- If the answer is not in the excerpts, reply exactly: \"{}\"",
        NO_RELEVANT_CONTENT
    );
    prompt.push_str(
        "- Be clear and concise.\n\
         - When helpful, cite the excerpt tags your answer relies on.\n\
         \n\
         DOCUMENT EXCERPTS:\n",
    );

    if retrieval.is_empty() {
        prompt.push_str("(no relevant excerpts were found)\n");
    } else {
        let excerpts: Vec<String> = retrieval
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "{}\n{}",
                    provenance_tag(i + 1, e.chunk.id, e.chunk.page),
                    e.chunk.text
                )
            })
            .collect();
        prompt.push_str(&excerpts.join(EXCERPT_SEPARATOR));
        prompt.push('\n');
    }

    let _ = write!(prompt, "\nQUESTION:\n{}\n\nANSWER:", question);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ScoredChunk};

    fn entry(id: usize, text: &str, page: Option<u32>, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id,
                text: text.to_string(),
                start: 0,
                end: text.chars().count(),
                page,
            },
            score,
        }
    }

    #[test]
    fn test_tags() {
        assert_eq!(provenance_tag(1, 4, Some(2)), "[Excerpt 1 | chunk 4 | page 2]");
        assert_eq!(provenance_tag(3, 0, None), "[Excerpt 3 | chunk 0]");
    }

    #[test]
    fn test_prompt_contains_excerpts_in_order() {
        let retrieval = RetrievalResult {
            entries: vec![
                entry(7, "Refunds take 14 days.", Some(3), 0.9),
                entry(2, "Contact support by email.", None, 0.5),
            ],
        };
        let prompt = build_grounding_prompt("How long do refunds take?", &retrieval);
        let first = prompt.find("[Excerpt 1 | chunk 7 | page 3]\nRefunds take 14 days.").unwrap();
        let second = prompt.find("[Excerpt 2 | chunk 2]\nContact support by email.").unwrap();
        assert!(first < second);
        assert!(prompt.contains("ONLY the document excerpts"));
        assert!(prompt.ends_with("QUESTION:\nHow long do refunds take?\n\nANSWER:"));
        assert!(prompt.contains(EXCERPT_SEPARATOR));
    }

    #[test]
    fn test_empty_retrieval_instructs_not_found() {
        let prompt = build_grounding_prompt("Anything?", &RetrievalResult::default());
        assert!(prompt.contains("(no relevant excerpts were found)"));
        assert!(prompt.contains(NO_RELEVANT_CONTENT));
        assert!(prompt.contains("Anything?"));
    }

    #[test]
    fn test_question_is_verbatim() {
        let q = "  What about \"quotes\" & {braces}?  ";
        let prompt = build_grounding_prompt(q, &RetrievalResult::default());
        assert!(prompt.contains(q));
    }
}
