//! The chat flow: quota gate, context gathering, completion, response
//! shaping, and deferred bookkeeping.

pub mod service;

pub use service::{ChatOutcome, ChatReply, ChatRequest, ChatService};
