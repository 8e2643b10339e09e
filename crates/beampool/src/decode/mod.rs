//! Per-request decode post-processing.
//!
//! Beam search accumulates log-probability additively, so raw scores favour
//! short hypotheses. Candidates are length-normalized, the `nbest` lowest are
//! kept in ascending order, and every parallel field follows that order.

mod handler;
mod selection;

pub use handler::EnsembleHandler;
pub use selection::{length_normalize, nbest_order, select};
