//! # Model Collaborator
//!
//! The neural model lives outside this crate. The pool only needs:
//!
//! * [`Model`] - a loaded ensemble member exposing its [`ModelOptions`]
//! * [`Decoder`] - the beam search over the whole ensemble
//! * [`Dictionary`] - token/id vocabularies and their inverted view
//! * [`ModelRegistry`] - model-type identifiers resolved to constructors at startup
//!
//! Models are loaded once and shared read-only by every worker through an
//! [`Ensemble`] behind an `Arc`.

mod dictionary;
mod options;
mod registry;

#[cfg_attr(docsrs, doc(cfg(feature = "builtin-models")))]
#[cfg(feature = "builtin-models")]
/// Reference model type `copy`, which echoes the source sentence.
pub mod copy;

use std::sync::Arc;

use crate::communication::{Alignment, Payload};
use crate::constraint::ConstraintTable;
use crate::error::Result;

pub use dictionary::{Dictionary, EOS, UNK, UNK_TOKEN};
pub use options::{ModelOptions, check_ensemble};
pub use registry::{ModelConstructor, ModelKind, ModelRegistry};

/// A loaded ensemble member.
pub trait Model: Send + Sync {
    /// Display name, usually the model file name.
    fn name(&self) -> &str;

    fn options(&self) -> &ModelOptions;
}

/// The models decoded together, in the order they were given.
#[derive(Clone)]
pub struct Ensemble {
    models: Vec<Arc<dyn Model>>,
}

impl Ensemble {
    pub fn new(models: Vec<Arc<dyn Model>>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[Arc<dyn Model>] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.models.iter().map(|model| model.name().to_string()).collect()
    }
}

/// Knobs handed to [`Decoder::beam_search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub beam_size: usize,
    /// Candidates the caller will keep; decoders may still return the full beam.
    pub nbest: usize,
    pub suppress_unk: bool,
    pub return_alignment: bool,
}

/// Unnormalized beam search output, one entry per candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBeam {
    pub hypotheses: Vec<Vec<u32>>,
    /// Accumulated negative log-probabilities; lower is better.
    pub scores: Vec<f32>,
    pub alignments: Option<Vec<Alignment>>,
    /// Empty for models without target factors.
    pub factor_hypotheses: Vec<Vec<u32>>,
}

/// Ensemble beam search.
///
/// The search is CPU bound and synchronous. Workers run it on the blocking
/// thread pool, so `n_jobs` searches proceed in parallel.
///
/// The constraint table is consulted while generating factor sequences: for a
/// lemma `l` only factors in `constraints.lookup(l)` are permitted.
pub trait Decoder: Send + Sync {
    fn beam_search(
        &self,
        payload: &Payload,
        ensemble: &Ensemble,
        params: &SearchParams,
        constraints: &ConstraintTable,
    ) -> Result<RawBeam>;
}
