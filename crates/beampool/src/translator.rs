//! The orchestrator: owns the worker pool for one decode run.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::communication::{Request, Response, WorkerResult};
use crate::config::TranslationSettings;
use crate::constraint::ConstraintTable;
use crate::core::pool::spawn_workers;
use crate::core::worker::WorkerHandle;
use crate::data::SampleSource;
use crate::decode::EnsembleHandler;
use crate::error::{DecodeError, Result};
use crate::model::{Decoder, Dictionary, EOS, Ensemble, ModelOptions, ModelRegistry, check_ensemble};
use crate::result_table::ResultTable;

/// Throughput of a finished run. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub sentences: usize,
    /// Tokens in the best hypotheses, EOS excluded.
    pub words: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn sentences_per_sec(&self) -> f64 {
        per_second(self.sentences, self.elapsed)
    }

    pub fn words_per_sec(&self) -> f64 {
        per_second(self.words, self.elapsed)
    }
}

fn per_second(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

fn model_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Distributes sentences over a fixed pool of workers and restores input order.
///
/// Models, dictionaries and constraints are loaded once in [`prepare`](Self::prepare)
/// and shared read-only with every worker. Each [`run`](Self::run) starts a fresh
/// pool and tears it down before returning.
pub struct Translator {
    settings: TranslationSettings,
    ensemble: Arc<Ensemble>,
    decoder: Arc<dyn Decoder>,
    source_dictionaries: Vec<Arc<Dictionary>>,
    target_dictionary: Arc<Dictionary>,
    target_factor_dictionary: Option<Arc<Dictionary>>,
    constraints: Arc<ConstraintTable>,
}

impl Translator {
    /// Loads the ensemble and everything shared by the workers.
    ///
    /// Fails before any worker starts when the settings are invalid, a model
    /// type is unknown, or ensembled models disagree on their target
    /// (factor) vocabulary sizes.
    pub fn prepare(settings: TranslationSettings, registry: &ModelRegistry) -> Result<Self> {
        settings.validate()?;

        let mut options = Vec::with_capacity(settings.models.len());
        for path in &settings.models {
            options.push((model_name(path), ModelOptions::for_model(path)?));
        }
        check_ensemble(&options)?;

        let first = options[0].1.clone();
        if settings.factored && !first.is_factored() {
            return Err(DecodeError::InvalidSettings(
                "factored decoding requested but the model has no target factors".into(),
            ));
        }
        let decoder = registry.resolve(&first.model_type)?.decoder.clone();

        let mut models = Vec::with_capacity(options.len());
        for ((name, model_options), path) in options.into_iter().zip(&settings.models) {
            let kind = registry.resolve(&model_options.model_type)?;
            info!(model = %name, model_type = %model_options.model_type, "loading model");
            models.push((kind.construct)(model_options, path)?);
        }

        let source_dictionaries = first
            .source_dictionaries()
            .iter()
            .map(|path| Dictionary::load(path).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        let target_path = first
            .target_dictionary()
            .ok_or_else(|| DecodeError::InvalidSettings("model options list no target dictionary".into()))?;
        let target_dictionary = Dictionary::load(target_path)?;
        let target_factor_dictionary = first.target_factor_dictionary().map(Dictionary::load).transpose()?;

        Self::from_parts(
            settings,
            Ensemble::new(models),
            decoder,
            source_dictionaries,
            target_dictionary,
            target_factor_dictionary,
        )
    }

    /// Assembles a translator from already loaded parts and builds the
    /// constraint table.
    pub fn from_parts(
        settings: TranslationSettings,
        ensemble: Ensemble,
        decoder: Arc<dyn Decoder>,
        source_dictionaries: Vec<Arc<Dictionary>>,
        target_dictionary: Dictionary,
        target_factor_dictionary: Option<Dictionary>,
    ) -> Result<Self> {
        settings.validate()?;

        let constraints = match &target_factor_dictionary {
            Some(factors) => {
                ConstraintTable::build(settings.constraint_file.as_deref(), &target_dictionary, factors)?
            }
            None => {
                if let Some(path) = &settings.constraint_file {
                    warn!(path = %path.display(), "model predicts no target factors, ignoring constraint file");
                }
                ConstraintTable::unconstrained(0)
            }
        };

        Ok(Self {
            settings,
            ensemble: Arc::new(ensemble),
            decoder,
            source_dictionaries,
            target_dictionary: Arc::new(target_dictionary),
            target_factor_dictionary: target_factor_dictionary.map(Arc::new),
            constraints: Arc::new(constraints),
        })
    }

    pub fn settings(&self) -> &TranslationSettings {
        &self.settings
    }

    pub fn model_names(&self) -> Vec<String> {
        self.settings.models.iter().map(|path| model_name(path)).collect()
    }

    pub fn source_dictionaries(&self) -> &[Arc<Dictionary>] {
        &self.source_dictionaries
    }

    pub fn target_dictionary(&self) -> &Dictionary {
        &self.target_dictionary
    }

    pub fn target_factor_dictionary(&self) -> Option<&Dictionary> {
        self.target_factor_dictionary.as_deref()
    }

    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    /// Decodes every sentence of `samples` and returns them in input order.
    ///
    /// Starts `n_jobs` workers, queues all sentences, then collects exactly one
    /// response per sentence. The first failure from any worker aborts the
    /// run: no partial table is returned. Workers are terminated on every path.
    pub async fn run<S>(&self, samples: &mut S) -> Result<(ResultTable, RunStats)>
    where
        S: SampleSource + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let total = samples.len();
        let jobs = self.settings.resolved_jobs();
        samples.rewind();
        info!(%run_id, sentences = total, jobs, beam_size = self.settings.beam_size, "starting decode pool");

        let handler = Arc::new(EnsembleHandler {
            ensemble: self.ensemble.clone(),
            decoder: self.decoder.clone(),
            constraints: self.constraints.clone(),
            params: self.settings.search_params(),
            normalization_alpha: self.settings.normalization_alpha,
        });
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let workers = spawn_workers(jobs, handler, Arc::new(Mutex::new(dispatch_rx)), result_tx);

        let started = Instant::now();
        let outcome = Self::dispatch_and_collect(samples, total, dispatch_tx, &mut result_rx).await;

        join_all(workers.into_iter().map(WorkerHandle::terminate)).await;
        debug!(%run_id, "worker pool terminated");

        let table = match outcome {
            Ok(table) => table,
            Err(err) => {
                error!(%run_id, error = %err, "decode run aborted");
                return Err(err);
            }
        };

        let stats = RunStats {
            sentences: total,
            words: table
                .best_hypotheses()
                .iter()
                .map(|hypothesis| hypothesis.iter().take_while(|id| **id != EOS).count())
                .sum(),
            elapsed: started.elapsed(),
        };
        if self.settings.nbest == 1 {
            info!(
                %run_id,
                sentences = stats.sentences,
                elapsed_secs = stats.elapsed.as_secs_f64(),
                sentences_per_sec = stats.sentences_per_sec(),
                words_per_sec = stats.words_per_sec(),
                "decode finished"
            );
        } else {
            info!(
                %run_id,
                sentences = stats.sentences,
                elapsed_secs = stats.elapsed.as_secs_f64(),
                sentences_per_sec = stats.sentences_per_sec(),
                "decode finished"
            );
        }
        Ok((table, stats))
    }

    async fn dispatch_and_collect<S>(
        samples: &mut S,
        total: usize,
        dispatch: UnboundedSender<Request>,
        results: &mut UnboundedReceiver<WorkerResult<Response>>,
    ) -> Result<ResultTable>
    where
        S: SampleSource + ?Sized,
    {
        for index in 0..total {
            let payload = samples
                .next_sample()
                .ok_or(DecodeError::SourceExhausted { expected: total, found: index })?;
            if dispatch.send(Request::new(index, payload)).is_err() {
                // Every worker is gone; the collector below reports why.
                break;
            }
        }
        drop(dispatch);

        let mut table = ResultTable::new(total);
        for _ in 0..total {
            match results.recv().await {
                Some(WorkerResult::Ok(response)) => {
                    debug!(index = response.index, "collected response");
                    table.insert(response)?;
                }
                Some(WorkerResult::Failed(reason)) => {
                    return Err(DecodeError::WorkerDecodeFailure(reason));
                }
                None => {
                    return Err(DecodeError::WorkerDecodeFailure(format!(
                        "all workers exited with {} of {} responses collected",
                        table.filled(),
                        total
                    )));
                }
            }
        }
        table.ensure_complete()?;
        Ok(table)
    }
}
