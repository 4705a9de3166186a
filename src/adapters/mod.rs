//! Bundled provider adapters
//!
//! Each adapter owns the wire format of one vendor family and translates
//! between it and the gateway's generic request/result shapes.

pub mod openai_compat;
pub mod speech;

pub use openai_compat::OpenAiCompatAdapter;
pub use speech::SpeechAdapter;
