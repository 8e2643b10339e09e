//! `beampool` binary: translate files with an ensemble over a worker pool.
//!
//! ```bash
//! RUST_LOG=info beampool --models model.npz --jobs 4 --source test.de --output test.en \
//!     --references test.en.ref --metrics exact
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use beampool::data::TextCorpus;
use beampool::model::ModelRegistry;
use beampool::output::{
    BpeMerge, FilterChain, OutputStream, ReferenceSets, Renderer, ScorerRegistry, TraceMetadata,
    check_reference_count, export_trace, write_trace,
};
use beampool::{ResultTable, TranslationSettings, Translator};

#[derive(Parser)]
#[command(
    name = "beampool",
    version = env!("CARGO_PKG_VERSION"),
    about = "Parallel ensemble beam-search decoding"
)]
struct Cli {
    /// Model files to ensemble. Options are read from `<model>.json`.
    #[arg(long, num_args = 1.., required = true)]
    models: Vec<PathBuf>,

    /// Number of decode workers, 0 for one per CPU core.
    #[arg(short = 'p', long = "jobs", default_value_t = 0)]
    jobs: usize,

    #[arg(short = 'k', long, default_value_t = 5)]
    beam_size: usize,

    /// Candidates written per sentence.
    #[arg(short = 'n', long, default_value_t = 1)]
    nbest: usize,

    #[arg(long, default_value_t = 1.0)]
    normalization_alpha: f32,

    /// Source files. Reads stdin when omitted.
    #[arg(long, num_args = 1..)]
    source: Vec<PathBuf>,

    /// Output file per source. Writes to stdout when missing.
    #[arg(long, num_args = 1..)]
    output: Vec<PathBuf>,

    /// Reference sets as comma separated files, e.g. `ref.0,ref.1`.
    /// Source `i` is scored against set `i % sets`.
    #[arg(long, num_args = 1..)]
    references: Vec<String>,

    /// Metrics to compute against the references.
    #[arg(long, num_args = 1..)]
    metrics: Vec<String>,

    /// Write a JSON trace of each run.
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Append scores to every output line.
    #[arg(long)]
    print_scores: bool,

    #[arg(long)]
    suppress_unk: bool,

    /// Keep BPE subword joints in the output.
    #[arg(long)]
    no_filter: bool,

    /// Decode lemma and factor streams.
    #[arg(long)]
    factored: bool,

    /// Lexicon constraints for target factors.
    #[arg(long)]
    constraints: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> TranslationSettings {
        TranslationSettings {
            models: self.models.clone(),
            n_jobs: self.jobs,
            beam_size: self.beam_size,
            nbest: self.nbest,
            normalization_alpha: self.normalization_alpha,
            suppress_unk: self.suppress_unk,
            get_alignment: self.export_json.is_some(),
            factored: self.factored,
            constraint_file: self.constraints.clone(),
        }
    }

    fn reference_sets(&self) -> Vec<Vec<PathBuf>> {
        self.references
            .iter()
            .map(|set| set.split(',').filter(|path| !path.is_empty()).map(PathBuf::from).collect())
            .collect()
    }

    /// Rejects reference and metric flags that cannot work, before any
    /// decoding. Factored references need one file per output stream, even
    /// when they only feed the JSON trace.
    fn check_references(&self, sets: &[Vec<PathBuf>]) -> Result<()> {
        for set in sets {
            check_reference_count(self.factored, set.len())?;
        }
        if !self.metrics.is_empty() {
            if sets.is_empty() {
                bail!("--metrics needs at least one --references set");
            }
            if self.output.len() < self.source.len().max(1) {
                bail!("scoring needs an --output file for every source");
            }
        }
        Ok(())
    }

    fn filters(&self) -> FilterChain {
        if self.no_filter {
            FilterChain::new()
        } else {
            FilterChain::new().with(BpeMerge)
        }
    }

    fn streams(&self) -> &'static [(OutputStream, &'static str)] {
        if self.factored {
            &[
                (OutputStream::Lemmas, "lemmas"),
                (OutputStream::Factors, "factors"),
                (OutputStream::Joined, "joined"),
            ]
        } else {
            &[(OutputStream::Lemmas, "")]
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let reference_paths = cli.reference_sets();
    cli.check_references(&reference_paths)?;
    let scorers = ScorerRegistry::with_builtin();
    let metrics = cli
        .metrics
        .iter()
        .map(|name| scorers.get(name))
        .collect::<beampool::Result<Vec<_>>>()?;
    let references = ReferenceSets::load(&reference_paths)?;

    let translator = Translator::prepare(cli.settings(), &ModelRegistry::with_builtin())
        .context("failed to prepare the ensemble")?;
    let filters = cli.filters();

    let sources: Vec<Option<&Path>> = if cli.source.is_empty() {
        vec![None]
    } else {
        cli.source.iter().map(|path| Some(path.as_path())).collect()
    };

    for (index, source) in sources.into_iter().enumerate() {
        let label = source.map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string());
        let mut corpus = load_corpus(source, &translator)?;

        let (table, _stats) = translator
            .run(&mut corpus)
            .await
            .with_context(|| format!("translation of {label} failed"))?;

        let renderer = Renderer::new(translator.target_dictionary(), translator.target_factor_dictionary(), &filters);
        let written = write_outputs(cli, &renderer, &table, cli.output.get(index))?;

        if !metrics.is_empty() {
            let set = &reference_paths[index % reference_paths.len()];
            for (hypothesis, reference) in written.iter().zip(set) {
                for scorer in &metrics {
                    let score = scorer.compute(reference, hypothesis)?;
                    println!("{}: {score}", hypothesis.display());
                }
            }
        }

        if let Some(path) = &cli.export_json {
            let path = trace_path(path, index, cli.source.len());
            let trace = export_trace(
                &table,
                corpus.source_tokens(),
                &references,
                index,
                translator.target_dictionary(),
                translator.target_factor_dictionary(),
                TraceMetadata { models: translator.model_names(), beam_size: cli.beam_size },
            );
            let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_trace(&trace, &mut writer)?;
            writer.flush()?;
            info!(path = %path.display(), sentences = trace.data.len(), "wrote json trace");
        }
    }
    Ok(())
}

fn load_corpus(source: Option<&Path>, translator: &Translator) -> Result<TextCorpus> {
    let dictionaries = translator.source_dictionaries();
    match source {
        Some(path) => Ok(TextCorpus::load(path, dictionaries)?),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("cannot read stdin")?;
            Ok(TextCorpus::from_lines(text.lines(), dictionaries)?)
        }
    }
}

/// Renders every stream of `table` and writes it out. Factored output goes to
/// `<output>.lemmas`, `<output>.factors` and `<output>.joined`.
///
/// Returns the files written, in stream order, for scoring.
fn write_outputs(cli: &Cli, renderer: &Renderer<'_>, table: &ResultTable, output: Option<&PathBuf>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (stream, suffix) in cli.streams() {
        let text = renderer.render(table, *stream, cli.nbest, cli.print_scores)?;
        match output {
            Some(path) => {
                let path = if suffix.is_empty() { path.clone() } else { with_suffix(path, suffix) };
                fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
                info!(path = %path.display(), "wrote hypotheses");
                written.push(path);
            }
            None => io::stdout().lock().write_all(text.as_bytes())?,
        }
    }
    Ok(written)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// One trace per source; numbered when several sources are translated.
fn trace_path(path: &Path, index: usize, sources: usize) -> PathBuf {
    if sources > 1 {
        with_suffix(path, &index.to_string())
    } else {
        path.to_path_buf()
    }
}
