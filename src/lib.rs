//! # ragchat: Retrieval-Augmented Chat
//!
//! Terminal chat loop that fetches supporting documents from a pluggable
//! retrieval backend, formats them into a context block and asks an
//! OpenAI-compatible completion endpoint for an answer.
//!
//! ## Architecture
//!
//! - **[`config`]**: Environment map (`.env` + process env), JSON settings, validation
//! - **[`document`]**: Canonical `Document`, record normalization, context formatting
//! - **[`source`]**: `RetrievalSource` trait with none / Vectorize / Pinecone backends
//! - **[`llm`]**: Completion client trait, OpenAI client, fail-soft `AnswerGenerator`
//! - **[`chat`]**: `RagChat` orchestrator and the `ChatEvent` reporting channel
//! - **[`http`]**: Shared HTTP client with opt-in relaxed-TLS fallback
//! - **[`cli`]**: Arguments, terminal output and the spinner reporter

pub mod chat;
pub mod cli;
pub mod config;
pub mod document;
pub mod http;
pub mod llm;
pub mod source;
