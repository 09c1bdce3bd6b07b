#![deny(missing_docs)]

//! Core library for pdfchat: PDF question answering over Ollama and Qdrant.

/// HTTP routing and REST handlers.
pub mod api;
/// Terminal client: HTTP calls and the tabbed answer session.
pub mod client;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
