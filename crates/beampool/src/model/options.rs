use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DecodeError, Result};

fn one() -> usize {
    1
}

/// Architecture options stored next to each model as `<model>.json`.
///
/// `dictionaries` lists the source dictionaries (one per source factor), then
/// the target dictionary, then the target factor dictionary when
/// `target_factors > 1`. Relative paths resolve against the options file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelOptions {
    pub model_type: String,
    #[serde(default)]
    pub source_vocab_sizes: Vec<usize>,
    pub target_vocab_size: usize,
    #[serde(default)]
    pub target_factor_vocab_size: usize,
    pub dictionaries: Vec<PathBuf>,
    #[serde(default = "one")]
    pub factors: usize,
    #[serde(default = "one")]
    pub target_factors: usize,
}

impl ModelOptions {
    /// Path of the options file belonging to `model`.
    pub fn path_for(model: &Path) -> PathBuf {
        let mut path = model.as_os_str().to_owned();
        path.push(".json");
        PathBuf::from(path)
    }

    /// Reads `<model>.json`.
    pub fn for_model(model: &Path) -> Result<Self> {
        Self::load(&Self::path_for(model))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DecodeError::io(path, e))?;
        let mut options: ModelOptions =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| DecodeError::json(path, e))?;

        if let Some(base) = path.parent() {
            for dictionary in options.dictionaries.iter_mut() {
                if dictionary.is_relative() {
                    *dictionary = base.join(&*dictionary);
                }
            }
        }
        options.check_dictionaries(path)?;
        Ok(options)
    }

    fn check_dictionaries(&self, path: &Path) -> Result<()> {
        let expected = self.factors + if self.is_factored() { 2 } else { 1 };
        if self.dictionaries.len() < expected {
            return Err(DecodeError::InvalidSettings(format!(
                "{} lists {} dictionaries, expected {}",
                path.display(),
                self.dictionaries.len(),
                expected
            )));
        }
        Ok(())
    }

    pub fn is_factored(&self) -> bool {
        self.target_factors > 1
    }

    pub fn source_dictionaries(&self) -> &[PathBuf] {
        &self.dictionaries[..self.factors.min(self.dictionaries.len())]
    }

    pub fn target_dictionary(&self) -> Option<&Path> {
        self.dictionaries.get(self.factors).map(PathBuf::as_path)
    }

    pub fn target_factor_dictionary(&self) -> Option<&Path> {
        if self.is_factored() {
            self.dictionaries.get(self.factors + 1).map(PathBuf::as_path)
        } else {
            None
        }
    }
}

/// Checks that every ensemble member shares the first model's output space.
///
/// Only target and target-factor vocabulary sizes are compared.
pub fn check_ensemble(models: &[(String, ModelOptions)]) -> Result<()> {
    let Some((_, first)) = models.first() else {
        return Ok(());
    };

    for (name, options) in &models[1..] {
        if options.target_vocab_size != first.target_vocab_size {
            return Err(DecodeError::ConfigurationMismatch {
                model: name.clone(),
                field: "target_vocab_size",
                expected: first.target_vocab_size,
                found: options.target_vocab_size,
            });
        }
        if options.target_factor_vocab_size != first.target_factor_vocab_size {
            return Err(DecodeError::ConfigurationMismatch {
                model: name.clone(),
                field: "target_factor_vocab_size",
                expected: first.target_factor_vocab_size,
                found: options.target_factor_vocab_size,
            });
        }
    }
    Ok(())
}
