//! Completion backends: the external service that turns a conversation's
//! turn history into the assistant's next reply.

pub mod openai;
pub mod provider;

pub use openai::OpenAiBackend;
pub use provider::{
    Choice, Completion, CompletionBackend, CompletionError, CompletionOptions, NullBackend,
};
