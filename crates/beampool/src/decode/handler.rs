use std::panic;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;
use tracing::trace;

use super::selection::select;
use crate::communication::{Request, Response};
use crate::constraint::ConstraintTable;
use crate::core::handler::RequestHandler;
use crate::error::{DecodeError, Result};
use crate::model::{Decoder, Ensemble, SearchParams};

/// Decodes one request with the full ensemble and post-processes the beam.
///
/// One instance is shared by every worker; all of its state is read-only.
/// The beam search itself runs on tokio's blocking pool, so a CPU-bound
/// decoder never stalls the runtime and workers decode in parallel.
pub struct EnsembleHandler {
    /// The loaded models, shared with the orchestrator
    pub ensemble: Arc<Ensemble>,

    /// Beam search over the ensemble
    pub decoder: Arc<dyn Decoder>,

    pub constraints: Arc<ConstraintTable>,

    pub params: SearchParams,

    /// Length normalization exponent
    pub normalization_alpha: f32,
}

#[async_trait]
impl RequestHandler for EnsembleHandler {
    type Request = Request;
    type Response = Response;

    /// Runs beam search, length-normalizes the candidates and keeps the n-best.
    async fn handle(&self, request: Request) -> Result<Response> {
        let Request { index, payload } = request;
        let decoder = self.decoder.clone();
        let ensemble = self.ensemble.clone();
        let constraints = self.constraints.clone();
        let params = self.params;

        let search = task::spawn_blocking(move || decoder.beam_search(&payload, &ensemble, &params, &constraints));
        let beam = match search.await {
            Ok(beam) => beam?,
            // Re-raise on the worker so its failure guard reports the panic.
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(err) => {
                return Err(DecodeError::WorkerDecodeFailure(format!(
                    "beam search for sentence {index} did not finish: {err}"
                )));
            }
        };
        trace!(index, candidates = beam.hypotheses.len(), "beam search finished");
        select(index, beam, self.params.nbest, self.normalization_alpha)
    }
}
