//! # docvec core
//!
//! Pure logic shared by the `docvec` application: data models, text
//! normalization, the recursive text splitter, the vector store and model
//! traits, page-level retrieval, and prompt templates.
//!
//! This crate contains no tokio runtime, HTTP clients, filesystem I/O, or
//! logging. Concrete backends live in the `docvec` app crate.

pub mod chunk;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod retrieval;
pub mod store;
