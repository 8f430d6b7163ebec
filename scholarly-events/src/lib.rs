//! ABOUTME: Event protocol, SPSC channel, and SSE encoding (§4.G, §4.H)
//! ABOUTME: Grounded on llmspell-events's universal_event.rs and stream.rs, adapted from a broadcast bus to a single-consumer bounded channel

pub mod channel;
pub mod event;
pub mod sse;

pub use channel::{channel, EventReceiver, EventSender};
pub use event::{Event, Metadata, Step};
