//! # pdfqa core
//!
//! Runtime-free building blocks of the pdfqa question-answering pipeline:
//! document models, the overlapping chunker, embedding and generation
//! traits, the in-memory vector index, the prompt template, and the
//! conversation transcript.
//!
//! This crate has no tokio, HTTP, or filesystem dependencies. Concrete
//! providers and the pipeline controller live in the `pdfqa` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod prompt;
pub mod transcript;

pub use error::{PipelineError, NOT_READY_MESSAGE};
