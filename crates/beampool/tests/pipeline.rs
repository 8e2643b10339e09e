#![cfg(feature = "builtin-models")]

use std::fs;
use std::path::{Path, PathBuf};

use beampool::communication::Response;
use beampool::data::TextCorpus;
use beampool::model::ModelRegistry;
use beampool::output::{
    FilterChain, OutputStream, ReferenceSets, Renderer, ScorerRegistry, TraceMetadata, export_trace, render,
};
use beampool::{DecodeError, ResultTable, TranslationSettings, Translator};
use serde_json::json;
use tempfile::TempDir;

const VOCAB: &str = r#"{"eos": 0, "<unk>": 1, "the": 2, "cat": 3, "sat": 4, "on": 5, "mat": 6}"#;
const FACTORS: &str = r#"{"eos": 0, "<unk>": 1, "DET": 2, "NN": 3, "VB": 4, "IN": 5}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vocab.json"), VOCAB).unwrap();
        fs::write(dir.path().join("factors.json"), FACTORS).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, text).unwrap();
        path
    }

    /// Writes `<name>.json` options for a copy model and returns the model path.
    fn model(&self, name: &str, target_vocab_size: usize) -> PathBuf {
        let options = json!({
            "model_type": "copy",
            "source_vocab_sizes": [7],
            "target_vocab_size": target_vocab_size,
            "dictionaries": ["vocab.json", "vocab.json"],
        });
        self.write(&format!("{name}.json"), &options.to_string());
        self.path(name)
    }

    fn factored_model(&self, name: &str) -> PathBuf {
        let options = json!({
            "model_type": "copy",
            "source_vocab_sizes": [7],
            "target_vocab_size": 7,
            "target_factor_vocab_size": 6,
            "target_factors": 2,
            "dictionaries": ["vocab.json", "vocab.json", "factors.json"],
        });
        self.write(&format!("{name}.json"), &options.to_string());
        self.path(name)
    }
}

async fn translate(translator: &Translator, source: &Path) -> (ResultTable, TextCorpus) {
    let mut corpus = TextCorpus::load(source, translator.source_dictionaries()).unwrap();
    let (table, _) = translator.run(&mut corpus).await.unwrap();
    (table, corpus)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ensemble_translation_keeps_input_order() {
    let fixture = Fixture::new();
    let lines = ["the cat sat", "on the mat", "cat", "the dog sat", "", "mat on mat"];
    let source = fixture.write("source.txt", &lines.join("\n"));
    let settings = TranslationSettings {
        models: vec![fixture.model("a.npz", 7), fixture.model("b.npz", 7)],
        n_jobs: 3,
        beam_size: 4,
        ..Default::default()
    };
    let translator = Translator::prepare(settings, &ModelRegistry::with_builtin()).unwrap();
    assert_eq!(translator.model_names(), ["a.npz", "b.npz"]);

    let (table, _) = translate(&translator, &source).await;
    let text = render(&table, translator.target_dictionary(), &FilterChain::new(), 1, false).unwrap();

    assert_eq!(text, "the cat sat\non the mat\ncat\nthe <unk> sat\n\nmat on mat\n");
}

#[tokio::test]
async fn test_nbest_output_is_ranked_by_normalized_score() {
    let fixture = Fixture::new();
    let source = fixture.write("source.txt", "the cat\n");
    let settings = TranslationSettings {
        models: vec![fixture.model("a.npz", 7)],
        n_jobs: 2,
        beam_size: 2,
        nbest: 2,
        ..Default::default()
    };
    let translator = Translator::prepare(settings, &ModelRegistry::with_builtin()).unwrap();

    let (table, _) = translate(&translator, &source).await;
    let text = render(&table, translator.target_dictionary(), &FilterChain::new(), 2, false).unwrap();

    assert_eq!(text, "0 ||| the cat ||| 1.000000\n0 ||| the ||| 2.000000\n");
}

#[tokio::test]
async fn test_mismatched_ensemble_fails_before_decoding() {
    let fixture = Fixture::new();
    let settings = TranslationSettings {
        models: vec![fixture.model("a.npz", 7), fixture.model("b.npz", 9)],
        ..Default::default()
    };

    let result = Translator::prepare(settings, &ModelRegistry::with_builtin());
    assert!(matches!(
        result,
        Err(DecodeError::ConfigurationMismatch { field: "target_vocab_size", expected: 7, found: 9, .. })
    ));
}

#[tokio::test]
async fn test_unknown_model_type_is_rejected() {
    let fixture = Fixture::new();
    let model = fixture.model("a.npz", 7);
    let settings = TranslationSettings { models: vec![model], ..Default::default() };

    let result = Translator::prepare(settings, &ModelRegistry::new());
    assert!(matches!(result, Err(DecodeError::UnknownModelType(kind)) if kind == "copy"));
}

#[tokio::test]
async fn test_factored_output_respects_constraints() {
    let fixture = Fixture::new();
    let source = fixture.write("source.txt", "the cat sat\non the mat\n");
    let constraints = fixture.write("constraints.txt", "# lemma factors\nthe DET\ncat NN VB\nsat VB\nmat NN\n");
    let settings = TranslationSettings {
        models: vec![fixture.factored_model("f.npz")],
        n_jobs: 2,
        beam_size: 3,
        factored: true,
        constraint_file: Some(constraints),
        ..Default::default()
    };
    let translator = Translator::prepare(settings, &ModelRegistry::with_builtin()).unwrap();
    assert!(translator.constraints().is_constrained(3));

    let (table, _) = translate(&translator, &source).await;
    let filters = FilterChain::new();
    let renderer = Renderer::new(translator.target_dictionary(), translator.target_factor_dictionary(), &filters);

    assert_eq!(
        renderer.render(&table, OutputStream::Lemmas, 1, false).unwrap(),
        "the cat sat\non the mat\n"
    );
    // "on" has no constraint line and takes the first real factor id, <unk>.
    assert_eq!(
        renderer.render(&table, OutputStream::Factors, 1, false).unwrap(),
        "DET NN VB\n<unk> DET NN\n"
    );
    assert_eq!(
        renderer.render(&table, OutputStream::Joined, 1, false).unwrap(),
        "the|DET cat|NN sat|VB\non|<unk> the|DET mat|NN\n"
    );
}

#[tokio::test]
async fn test_missing_constraint_file_decodes_unconstrained() {
    let fixture = Fixture::new();
    let settings = TranslationSettings {
        models: vec![fixture.factored_model("f.npz")],
        factored: true,
        constraint_file: Some(fixture.path("missing.txt")),
        ..Default::default()
    };

    let translator = Translator::prepare(settings, &ModelRegistry::with_builtin()).unwrap();
    assert!(translator.constraints().is_empty());
}

#[tokio::test]
async fn test_trace_and_scoring_end_to_end() {
    let fixture = Fixture::new();
    let source = fixture.write("source.txt", "the cat\nsat\n");
    let reference = fixture.write("reference.txt", "the cat\nsat down\n");
    let settings = TranslationSettings {
        models: vec![fixture.model("a.npz", 7)],
        n_jobs: 2,
        beam_size: 2,
        get_alignment: true,
        ..Default::default()
    };
    let translator = Translator::prepare(settings, &ModelRegistry::with_builtin()).unwrap();
    let (table, corpus) = translate(&translator, &source).await;

    let hypothesis = fixture.write(
        "hypothesis.txt",
        &render(&table, translator.target_dictionary(), &FilterChain::new(), 1, false).unwrap(),
    );
    let scorer = ScorerRegistry::with_builtin().get("exact").unwrap();
    assert_eq!(scorer.compute(&reference, &hypothesis).unwrap().score(), 50.0);

    let references = ReferenceSets::load(&[vec![reference]]).unwrap();
    let trace = export_trace(
        &table,
        corpus.source_tokens(),
        &references,
        0,
        translator.target_dictionary(),
        None,
        TraceMetadata { models: translator.model_names(), beam_size: translator.settings().beam_size },
    );
    let json = serde_json::to_value(&trace).unwrap();

    assert_eq!(json["metadata"], json!({"models": ["a.npz"], "beam_size": 2}));
    assert_eq!(json["data"][1]["src"], json!(["sat"]));
    assert_eq!(json["data"][1]["trg"], json!(["sat"]));
    assert_eq!(json["data"][1]["ref"], json!(["sat down"]));
    assert_eq!(json["data"][0]["att"], json!([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]));
}

#[test]
fn test_response_is_reexported_for_custom_decoders() {
    let response = Response {
        index: 0,
        hypotheses: vec![vec![0]],
        scores: vec![0.0],
        alignments: None,
        factor_hypotheses: vec![],
    };
    let mut table = ResultTable::new(1);
    table.insert(response).unwrap();
    assert!(table.is_complete());
}
