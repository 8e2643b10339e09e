//! # Beampool
//!
//! Parallel ensemble beam-search decoding over a fixed pool of workers.
//!
//! ## Overview
//!
//! A [`Translator`] loads an ensemble of models once, then decodes a corpus by
//! queueing one [`Request`](communication::Request) per sentence on a shared
//! FIFO. Long-lived workers pull requests, run beam search through the
//! [`Decoder`](model::Decoder) collaborator, length-normalize and rank the
//! candidates, and push a [`Response`](communication::Response) back. The
//! orchestrator slots every response into a [`ResultTable`] by its original
//! index, so output order never depends on which worker finished first.
//!
//! ## Architecture
//!
//! ### Worker pool
//!
//! [`core`] holds the worker loop and the [`RequestHandler`](core::handler::RequestHandler)
//! seam. A worker that fails, or panics, reports a failure result instead of a
//! response and stops; the orchestrator aborts the run on the first failure and
//! terminates every worker before returning.
//!
//! ### Decoding
//!
//! [`decode`] turns raw beam output into ranked candidates. [`constraint`]
//! restricts which target factors may follow each lemma for factored models.
//!
//! ### Output
//!
//! [`output`] renders hypotheses as text, scores them against references and
//! exports a JSON trace.
//!
//! ## Features
//!
//! - **builtin-models** - Registers the `copy` reference model type
//!

pub mod communication;
pub mod config;
pub mod constraint;
pub mod core;
pub mod data;
pub mod decode;
pub mod error;
pub mod model;
pub mod output;
pub mod result_table;
pub mod translator;

pub use config::TranslationSettings;
pub use error::{DecodeError, Result};
pub use result_table::{ResultTable, Translation};
pub use translator::{RunStats, Translator};
