//! A model type that "translates" by copying the source sentence.
//!
//! It loads no parameters and assumes source and target share one vocabulary.
//! The beam holds the full copy plus progressively shorter prefixes, scored so
//! that the full copy always wins after length normalization. Useful for
//! exercising the pool end to end without a neural backend.

use std::path::Path;
use std::sync::Arc;

use super::{Decoder, EOS, Ensemble, Model, ModelOptions, RawBeam, SearchParams, UNK};
use crate::communication::{Alignment, Payload};
use crate::constraint::ConstraintTable;
use crate::error::{DecodeError, Result};

pub const MODEL_TYPE: &str = "copy";

pub struct CopyModel {
    name: String,
    options: ModelOptions,
}

impl CopyModel {
    pub fn new(name: impl Into<String>, options: ModelOptions) -> Self {
        Self { name: name.into(), options }
    }

    pub fn load(options: ModelOptions, path: &Path) -> Result<Arc<dyn Model>> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Arc::new(Self::new(name, options)))
    }
}

impl Model for CopyModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &ModelOptions {
        &self.options
    }
}

pub struct CopyDecoder;

impl CopyDecoder {
    fn factors_for(lemmas: &[u32], constraints: &ConstraintTable) -> Vec<u32> {
        lemmas
            .iter()
            .map(|lemma| match *lemma {
                EOS => EOS,
                lemma => constraints
                    .lookup(lemma)
                    .iter()
                    .copied()
                    .find(|factor| *factor != EOS)
                    .unwrap_or(UNK),
            })
            .collect()
    }

    fn alignment(target_len: usize, source_len: usize) -> Alignment {
        (0..target_len)
            .map(|t| {
                let mut row = vec![0.0; source_len];
                if source_len > 0 {
                    row[t.min(source_len - 1)] = 1.0;
                }
                row
            })
            .collect()
    }
}

impl Decoder for CopyDecoder {
    fn beam_search(
        &self,
        payload: &Payload,
        ensemble: &Ensemble,
        params: &SearchParams,
        constraints: &ConstraintTable,
    ) -> Result<RawBeam> {
        let source = payload
            .get("x")
            .and_then(|x| x.values.first())
            .ok_or_else(|| DecodeError::Search("payload has no source input \"x\"".into()))?;
        let factored = ensemble.models().iter().any(|model| model.options().is_factored());

        let words: Vec<u32> = source
            .iter()
            .copied()
            .take_while(|id| *id != EOS)
            .filter(|id| !(params.suppress_unk && *id == UNK))
            .collect();

        let width = params.beam_size.min(words.len() + 1);
        let mut beam = RawBeam {
            alignments: params.return_alignment.then(Vec::new),
            ..RawBeam::default()
        };

        for k in 0..width {
            let mut hypothesis = words[..words.len() - k].to_vec();
            hypothesis.push(EOS);

            beam.scores.push((k + 1) as f32 * hypothesis.len() as f32);
            if factored {
                beam.factor_hypotheses.push(Self::factors_for(&hypothesis, constraints));
            }
            if let Some(alignments) = beam.alignments.as_mut() {
                alignments.push(Self::alignment(hypothesis.len(), source.len()));
            }
            beam.hypotheses.push(hypothesis);
        }
        Ok(beam)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn options(target_factors: usize) -> ModelOptions {
        ModelOptions {
            model_type: MODEL_TYPE.into(),
            source_vocab_sizes: vec![10],
            target_vocab_size: 10,
            target_factor_vocab_size: 4,
            dictionaries: vec![PathBuf::from("d.json"); 3],
            factors: 1,
            target_factors,
        }
    }

    fn ensemble(target_factors: usize) -> Ensemble {
        Ensemble::new(vec![CopyModel::load(options(target_factors), Path::new("dir/copy.npz")).unwrap()])
    }

    fn params(beam_size: usize) -> SearchParams {
        SearchParams { beam_size, nbest: 1, suppress_unk: false, return_alignment: false }
    }

    #[test]
    fn test_beam_starts_with_full_copy() {
        let payload = Payload::new().with("x", vec![vec![4, 5, 6, EOS]]);
        let beam = CopyDecoder
            .beam_search(&payload, &ensemble(1), &params(3), &ConstraintTable::unconstrained(0))
            .unwrap();

        assert_eq!(beam.hypotheses, vec![vec![4, 5, 6, EOS], vec![4, 5, EOS], vec![4, EOS]]);
        assert_eq!(beam.scores, vec![4.0, 6.0, 6.0]);
        assert!(beam.factor_hypotheses.is_empty());
        assert!(beam.alignments.is_none());
    }

    #[test]
    fn test_beam_is_capped_by_sentence_length() {
        let payload = Payload::new().with("x", vec![vec![4, EOS]]);
        let beam = CopyDecoder
            .beam_search(&payload, &ensemble(1), &params(5), &ConstraintTable::unconstrained(0))
            .unwrap();

        assert_eq!(beam.hypotheses, vec![vec![4, EOS], vec![EOS]]);
    }

    #[test]
    fn test_suppress_unk_drops_unknown_tokens() {
        let payload = Payload::new().with("x", vec![vec![4, UNK, 5, EOS]]);
        let search = SearchParams { suppress_unk: true, ..params(1) };
        let beam = CopyDecoder
            .beam_search(&payload, &ensemble(1), &search, &ConstraintTable::unconstrained(0))
            .unwrap();

        assert_eq!(beam.hypotheses, vec![vec![4, 5, EOS]]);
    }

    #[test]
    fn test_factors_follow_constraints() {
        let table = ConstraintTable::from_entries(4, HashMap::from([(5, vec![3])]));
        let payload = Payload::new().with("x", vec![vec![4, 5, EOS]]);
        let search = SearchParams { return_alignment: true, ..params(1) };
        let beam = CopyDecoder.beam_search(&payload, &ensemble(2), &search, &table).unwrap();

        // 4 is unconstrained and gets the first non-EOS factor, 5 only allows factor 3
        assert_eq!(beam.factor_hypotheses, vec![vec![1, 3, EOS]]);
        let alignments = beam.alignments.unwrap();
        assert_eq!(alignments[0].len(), 3);
        assert_eq!(alignments[0][1], vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_source_is_a_search_error() {
        let payload = Payload::new();
        let result = CopyDecoder
            .beam_search(&payload, &ensemble(1), &params(1), &ConstraintTable::unconstrained(0));
        assert!(matches!(result, Err(DecodeError::Search(_))));
    }
}
