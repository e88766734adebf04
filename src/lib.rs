//! # docvec
//!
//! Dual-granularity document indexing and retrieval-augmented answers.
//!
//! Every uploaded document is indexed twice: once as full pages and once as
//! small overlapping chunks. Questions are matched against the chunks, and
//! the distinct pages behind the best chunks become the context handed to a
//! language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐   ┌────────────────┐
//! │   File   │──▶│  Processor   │──▶│ Normalize │──▶│  Vector store  │
//! │ PDF/text │   │ pages+chunks │   │  + embed  │   │ _pages/_chunks │
//! └──────────┘   └──────────────┘   └───────────┘   └───────┬────────┘
//!                                                           │
//!              query ──▶ chunk search ──▶ page dedup ──▶ page fetch
//!                                                           │
//!                                          prompt ──▶ LLM ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docvec upload ./manual.pdf
//! docvec chunks manual.pdf "reset procedure"
//! docvec ask manual.pdf "How do I reset the device?"
//! docvec delete manual.pdf
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`documents`] | Per-document orchestration and collection naming |
//! | [`repository`] | Normalize, embed, store and search records |
//! | [`processor`] | PDF and text extraction, page-wise chunking |
//! | [`embedding`] | Embedding backends (Ollama, OpenAI, hash, local) |
//! | [`llm`] | Language model backends (Ollama, OpenAI) |
//! | [`qdrant`] | Qdrant REST vector store |
//! | [`http`] | Shared HTTP client and retry helper |
//! | [`progress`] | Upload progress on stderr |
//! | [`setup`] | Wiring a [`config::Config`] into backends |
//! | [`error`] | Boundary error type |

pub mod config;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod http;
pub mod llm;
pub mod processor;
pub mod progress;
pub mod qdrant;
pub mod repository;
pub mod setup;
