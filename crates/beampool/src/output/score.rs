use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DecodeError, Result};

/// Reference files factored scoring pairs with the lemma, factor and joined streams.
pub const FACTORED_REFERENCES: usize = 3;

/// A computed metric value.
pub trait Score: Display + Send {
    fn score(&self) -> f64;
}

/// Compares a hypothesis file against a reference file.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    fn compute(&self, reference: &Path, hypothesis: &Path) -> Result<Box<dyn Score>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExactMatchScore {
    pub matched: usize,
    pub total: usize,
}

impl Score for ExactMatchScore {
    /// Matching sentences in percent, `0.0` for an empty reference.
    fn score(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.matched as f64 / self.total as f64
    }
}

impl Display for ExactMatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXACT = {:.2} ({}/{})", self.score(), self.matched, self.total)
    }
}

/// Sentence level exact match after trimming surrounding whitespace.
/// Missing hypothesis lines count as mismatches.
pub struct ExactMatch;

impl Scorer for ExactMatch {
    fn name(&self) -> &str {
        "exact"
    }

    fn compute(&self, reference: &Path, hypothesis: &Path) -> Result<Box<dyn Score>> {
        let reference_text = fs::read_to_string(reference).map_err(|e| DecodeError::io(reference, e))?;
        let hypothesis_text = fs::read_to_string(hypothesis).map_err(|e| DecodeError::io(hypothesis, e))?;

        let references: Vec<&str> = reference_text.lines().collect();
        let mut hypotheses = hypothesis_text.lines();
        let matched = references
            .iter()
            .filter(|expected| hypotheses.next().is_some_and(|line| line.trim() == expected.trim()))
            .count();

        Ok(Box::new(ExactMatchScore { matched, total: references.len() }))
    }
}

/// Scorers keyed by metric name.
#[derive(Default, Clone)]
pub struct ScorerRegistry {
    scorers: HashMap<String, Arc<dyn Scorer>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ExactMatch);
        registry
    }

    pub fn register(&mut self, scorer: impl Scorer + 'static) {
        self.scorers.insert(scorer.name().to_string(), Arc::new(scorer));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Scorer>> {
        self.scorers
            .get(name)
            .cloned()
            .ok_or_else(|| DecodeError::UnknownMetric(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scorers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Factored output is scored stream by stream, so it needs one reference
/// per stream.
pub fn check_reference_count(factored: bool, found: usize) -> Result<()> {
    if factored && found < FACTORED_REFERENCES {
        return Err(DecodeError::ReferenceCountMismatch { required: FACTORED_REFERENCES, found });
    }
    Ok(())
}
