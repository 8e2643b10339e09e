use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{Decoder, Model, ModelOptions};
use crate::error::{DecodeError, Result};

/// Builds a model from its options and parameter file.
pub type ModelConstructor = fn(ModelOptions, &Path) -> Result<Arc<dyn Model>>;

/// Everything needed to load and decode one model type.
#[derive(Clone)]
pub struct ModelKind {
    pub construct: ModelConstructor,
    pub decoder: Arc<dyn Decoder>,
}

/// Maps `model_type` identifiers from [`ModelOptions`] to their [`ModelKind`].
#[derive(Clone, Default)]
pub struct ModelRegistry {
    kinds: HashMap<String, ModelKind>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the model types shipped in this crate.
    pub fn with_builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "builtin-models")]
        registry.register(
            super::copy::MODEL_TYPE,
            super::copy::CopyModel::load,
            Arc::new(super::copy::CopyDecoder),
        );
        registry
    }

    /// Registers (or replaces) a model type.
    pub fn register(&mut self, model_type: impl Into<String>, construct: ModelConstructor, decoder: Arc<dyn Decoder>) {
        self.kinds.insert(model_type.into(), ModelKind { construct, decoder });
    }

    pub fn resolve(&self, model_type: &str) -> Result<&ModelKind> {
        self.kinds
            .get(model_type)
            .ok_or_else(|| DecodeError::UnknownModelType(model_type.to_string()))
    }

    pub fn model_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
