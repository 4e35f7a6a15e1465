//! # pdfqa
//!
//! Chat with your PDFs: retrieval-augmented question answering over a set
//! of uploaded documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │  Ingest  │──▶│  Chunk   │──▶│  Embed   │──▶│ VectorIndex │
//! │ lopdf    │   │ overlap  │   │ Gemini…  │   │  (memory)   │
//! └──────────┘   └──────────┘   └──────────┘   └──────┬──────┘
//!                                                      │ top-k
//!                          ┌──────────────┐   ┌────────▼──────┐
//!          question ──────▶│   Pipeline   │──▶│  Synthesizer  │──▶ answer
//!                          └──────▲───────┘   └───────────────┘
//!                                 │
//!                     ┌───────────┴──────────┐
//!                     │ CLI chat  │ HTTP API │
//!                     └──────────────────────┘
//! ```
//!
//! The runtime-free pieces (models, chunker, index, prompt, transcript, the
//! provider traits and the error type) live in `pdfqa-core`. This crate
//! adds PDF extraction, HTTP providers, the pipeline controller, sessions,
//! and the two front ends.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and `PDFQA_*` overrides |
//! | [`extract`] | Page-level PDF text extraction |
//! | [`ingest`] | Paths to documents |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Chat-model providers |
//! | [`pipeline`] | Load / ask / reset state machine |
//! | [`session`] | Per-conversation pipeline and transcript |
//! | [`server`] | HTTP API |
//! | [`chat`] | Terminal REPL and one-shot ask |
//! | [`inspect`] | Offline extraction and chunking report |

pub mod chat;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
mod http;
pub mod ingest;
pub mod inspect;
pub mod pipeline;
pub mod server;
pub mod session;
