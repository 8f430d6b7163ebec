//! ABOUTME: Process-wide tool registry and built-in tools (§4.B)
//! ABOUTME: Grounded on llmspell-core's Tool trait and llmspell-agents's tool_manager registration pattern

pub mod list_papers;
pub mod registry;
pub mod retrieve_chunks;
pub mod web_search;

pub use list_papers::ListPapersTool;
pub use registry::ToolRegistry;
pub use retrieve_chunks::RetrieveChunksTool;
pub use web_search::{HttpWebSearchClient, WebResult, WebSearchClient, WebSearchTool};
