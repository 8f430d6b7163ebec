//! ABOUTME: Pure prompt composition (§4.D)
//! ABOUTME: No I/O, no LLM calls — same inputs always produce the same strings

use scholarly_core::types::{Message, Role};

/// One of the fixed system prompt roles a graph node selects (§4.E).
/// Bodies are plain text with no runtime interpolation beyond the fixed
/// markers the node itself assembles into the user text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTemplate {
    Answer,
    OutOfScope,
    Router,
    Guardrail,
    Grader,
    Rewriter,
}

impl SystemTemplate {
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            SystemTemplate::Answer => {
                "You are a research assistant answering questions about academic papers. \
                 Use only the retrieved context provided below to ground your answer. Cite \
                 sources inline using their arxiv id in square brackets, e.g. [1706.03762]. \
                 If the context is insufficient, say so plainly rather than guessing."
            }
            SystemTemplate::OutOfScope => {
                "You are a research assistant whose scope is academic papers. The user's \
                 question falls outside that scope. Reply with a brief, polite redirection \
                 that explains what you can help with instead. Do not attempt to answer the \
                 question itself."
            }
            SystemTemplate::Router => {
                "You are the routing component of a research assistant. Given the current \
                 query, the conversation so far, and the history of tool calls already made, \
                 decide whether to call one more tool or to generate the final answer now. \
                 Respond only with the requested structured output."
            }
            SystemTemplate::Guardrail => {
                "You are a scope guardrail for a research-paper assistant. Score, from 0 to \
                 100, how confident you are that the user's query is answerable from an \
                 academic paper corpus. Respond only with the requested structured output."
            }
            SystemTemplate::Grader => {
                "You judge whether a retrieved passage is materially relevant to a query. \
                 Respond only with the requested structured output."
            }
            SystemTemplate::Rewriter => {
                "Rewrite the user's query to improve retrieval recall against an academic \
                 paper corpus, preserving its original intent. Respond only with the \
                 requested structured output."
            }
        }
    }
}

/// One retrieved passage, formatted into the retrieved-context block.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub arxiv_id: String,
    pub title: String,
    pub text: String,
}

const CONVERSATION_LINE_LIMIT: usize = 500;

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Formats the last `window * 2` messages as alternating `"User: …"` /
/// `"Assistant: …"` lines, each truncated to 500 characters. `None` if
/// `messages` is empty (§4.D: "omitted entirely if empty").
#[must_use]
pub fn format_conversation_block(messages: &[Message]) -> Option<String> {
    if messages.is_empty() {
        return None;
    }
    let lines: Vec<String> = messages
        .iter()
        .map(|m| {
            let label = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{label}: {}", truncate_chars(&m.content, CONVERSATION_LINE_LIMIT))
        })
        .collect();
    Some(lines.join("\n"))
}

/// Formats retrieved chunks as `"[arxiv_id] title\nchunk_text"` blocks
/// joined by a blank line. `None` if `chunks` is empty.
#[must_use]
pub fn format_context_block(chunks: &[ContextChunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }
    let blocks: Vec<String> = chunks
        .iter()
        .map(|c| format!("[{}] {}\n{}", c.arxiv_id, c.title, c.text))
        .collect();
    Some(blocks.join("\n\n"))
}

/// Formats the query block under a caller-chosen label, defaulting to
/// `"Question"`.
#[must_use]
pub fn format_query_block(query: &str, label: Option<&str>) -> String {
    format!("{}: {}", label.unwrap_or("Question"), query)
}

/// Composes the `(system_text, user_text)` pair for one LLM call. Block
/// order in `user_text` is fixed: conversation, retrieved context, query,
/// notes (§4.D).
#[must_use]
pub fn compose(
    template: SystemTemplate,
    conversation: &[Message],
    context: &[ContextChunk],
    query: &str,
    query_label: Option<&str>,
    note: Option<&str>,
) -> (String, String) {
    let mut blocks = Vec::with_capacity(4);
    if let Some(block) = format_conversation_block(conversation) {
        blocks.push(block);
    }
    if let Some(block) = format_context_block(context) {
        blocks.push(block);
    }
    blocks.push(format_query_block(query, query_label));
    if let Some(note) = note {
        if !note.is_empty() {
            blocks.push(note.to_string());
        }
    }
    (template.text().to_string(), blocks.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conversation_and_context_are_omitted() {
        let (_, user) = compose(SystemTemplate::Answer, &[], &[], "What is BERT?", None, None);
        assert_eq!(user, "Question: What is BERT?");
    }

    #[test]
    fn block_order_is_fixed() {
        let conversation = vec![Message::user("hi"), Message::assistant("hello")];
        let context = vec![ContextChunk {
            arxiv_id: "1706.03762".to_string(),
            title: "Attention Is All You Need".to_string(),
            text: "The dominant sequence transduction models...".to_string(),
        }];
        let (_, user) = compose(
            SystemTemplate::Answer,
            &conversation,
            &context,
            "What is attention?",
            None,
            Some("Limited sources found"),
        );
        let conv_pos = user.find("User: hi").unwrap();
        let ctx_pos = user.find("[1706.03762]").unwrap();
        let query_pos = user.find("Question: What is attention?").unwrap();
        let note_pos = user.find("Limited sources found").unwrap();
        assert!(conv_pos < ctx_pos);
        assert!(ctx_pos < query_pos);
        assert!(query_pos < note_pos);
    }

    #[test]
    fn composition_is_deterministic() {
        let conversation = vec![Message::user("hi")];
        let first = compose(SystemTemplate::Router, &conversation, &[], "q", None, None);
        let second = compose(SystemTemplate::Router, &conversation, &[], "q", None, None);
        assert_eq!(first, second);
    }

    #[test]
    fn conversation_lines_are_truncated_to_500_chars() {
        let long = "x".repeat(600);
        let conversation = vec![Message::user(long)];
        let (_, user) = compose(SystemTemplate::Answer, &conversation, &[], "q", None, None);
        let line = user.lines().next().unwrap();
        assert_eq!(line.len(), "User: ".len() + 500);
    }

    #[test]
    fn custom_query_label_is_honored() {
        let (_, user) = compose(
            SystemTemplate::Guardrail,
            &[],
            &[],
            "some text",
            Some("Query"),
            None,
        );
        assert_eq!(user, "Query: some text");
    }
}
