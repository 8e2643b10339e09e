//! Startup configuration for a decode run.
//!
//! Everything the pool needs is passed in explicitly through [`TranslationSettings`];
//! no part of the crate reads environment variables or process-wide state.

use std::path::PathBuf;

use crate::error::{DecodeError, Result};
use crate::model::SearchParams;

#[derive(Debug, Clone)]
pub struct TranslationSettings {
    /// Model files forming the ensemble. Options are read from `<model>.json`.
    pub models: Vec<PathBuf>,

    /// Number of workers. `0` = one per available CPU core.
    pub n_jobs: usize,

    /// Beam width handed to the search collaborator.
    pub beam_size: usize,

    /// Candidates kept per sentence after length normalization.
    pub nbest: usize,

    /// Exponent applied to hypothesis length when normalizing scores.
    /// `1.0` divides by the length, `0.0` leaves raw scores untouched.
    pub normalization_alpha: f32,

    pub suppress_unk: bool,

    /// Ask the decoder for attention matrices.
    pub get_alignment: bool,

    /// Decode lemma and factor streams.
    pub factored: bool,

    /// Optional `lemma factor...` file restricting target factors.
    pub constraint_file: Option<PathBuf>,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            n_jobs: 0,
            beam_size: 5,
            nbest: 1,
            normalization_alpha: 1.0,
            suppress_unk: false,
            get_alignment: false,
            factored: false,
            constraint_file: None,
        }
    }
}

impl TranslationSettings {
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(DecodeError::InvalidSettings("at least one model is required".into()));
        }
        if self.beam_size == 0 {
            return Err(DecodeError::InvalidSettings("beam size must be positive".into()));
        }
        if self.nbest == 0 {
            return Err(DecodeError::InvalidSettings("nbest must be positive".into()));
        }
        if self.nbest > self.beam_size {
            return Err(DecodeError::InvalidSettings(format!(
                "nbest ({}) cannot exceed beam size ({})",
                self.nbest, self.beam_size
            )));
        }
        if !self.normalization_alpha.is_finite() || self.normalization_alpha < 0.0 {
            return Err(DecodeError::InvalidSettings(format!(
                "normalization alpha must be a non-negative number, got {}",
                self.normalization_alpha
            )));
        }
        Ok(())
    }

    /// Worker count with `0` resolved against the host's cores.
    pub fn resolved_jobs(&self) -> usize {
        if self.n_jobs == 0 {
            num_cpus::get().max(1)
        } else {
            self.n_jobs
        }
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            beam_size: self.beam_size,
            nbest: self.nbest,
            suppress_unk: self.suppress_unk,
            return_alignment: self.get_alignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_model() -> TranslationSettings {
        TranslationSettings {
            models: vec![PathBuf::from("model.npz")],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_validate_once_a_model_is_given() {
        assert!(TranslationSettings::default().validate().is_err());
        let settings = with_model();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.beam_size, 5);
        assert_eq!(settings.nbest, 1);
    }

    #[test]
    fn test_rejects_nbest_wider_than_beam() {
        let settings = TranslationSettings { beam_size: 2, nbest: 3, ..with_model() };
        assert!(matches!(settings.validate(), Err(DecodeError::InvalidSettings(_))));
    }

    #[test]
    fn test_rejects_zero_nbest_and_beam() {
        let settings = TranslationSettings { nbest: 0, ..with_model() };
        assert!(settings.validate().is_err());
        let settings = TranslationSettings { beam_size: 0, ..with_model() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_jobs_resolves_to_core_count() {
        let settings = with_model();
        assert!(settings.resolved_jobs() >= 1);
        let settings = TranslationSettings { n_jobs: 3, ..with_model() };
        assert_eq!(settings.resolved_jobs(), 3);
    }

    #[test]
    fn test_search_params_follow_nbest() {
        let settings = TranslationSettings { nbest: 2, get_alignment: true, ..with_model() };
        let params = settings.search_params();
        assert_eq!(params.nbest, 2);
        assert!(params.return_alignment);
        assert_eq!(params.beam_size, 5);
    }
}
