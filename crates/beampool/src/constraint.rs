//! Lexicon constraints: which target factors a lemma may be generated with.
//!
//! The file format is one lemma per line followed by its permitted factors,
//! whitespace separated:
//!
//! ```text
//! # lemma factors...
//! cat noun+singular noun+plural
//! run verb+present
//! ```
//!
//! Lemmas missing from the target dictionary are skipped, unknown factor
//! tokens map to the factor dictionary's `<unk>` id. Any lemma without a line
//! may take every factor.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{DecodeError, Result};
use crate::model::Dictionary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintTable {
    allowed: HashMap<u32, Vec<u32>>,
    universe: Vec<u32>,
}

impl ConstraintTable {
    /// Every lemma may take any factor id in `0..factor_vocab_size`.
    pub fn unconstrained(factor_vocab_size: u32) -> Self {
        Self::from_entries(factor_vocab_size, HashMap::new())
    }

    pub fn from_entries(factor_vocab_size: u32, entries: HashMap<u32, Vec<u32>>) -> Self {
        let allowed = entries
            .into_iter()
            .map(|(lemma, factors)| {
                let set: BTreeSet<u32> = factors.into_iter().collect();
                (lemma, set.into_iter().collect())
            })
            .collect();
        Self {
            allowed,
            universe: (0..factor_vocab_size).collect(),
        }
    }

    /// Builds the table from an optional constraint file.
    ///
    /// An unreadable file is not fatal: it is logged and the unconstrained
    /// table is returned instead. A factor dictionary whose ids overflow the
    /// factor range is.
    pub fn build(path: Option<&Path>, target: &Dictionary, factors: &Dictionary) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::unconstrained(factors.id_range()?));
        };
        match Self::load(path, target, factors) {
            Err(err @ DecodeError::ConstraintFileMissing { .. }) => {
                warn!(error = %err, "decoding without lexicon constraints");
                Ok(Self::unconstrained(factors.id_range()?))
            }
            result => result,
        }
    }

    /// Strict variant of [`build`](Self::build).
    pub fn load(path: &Path, target: &Dictionary, factors: &Dictionary) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| DecodeError::ConstraintFileMissing {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text, target, factors)?;
        debug!(path = %path.display(), lemmas = table.len(), "loaded lexicon constraints");
        Ok(table)
    }

    pub fn parse(text: &str, target: &Dictionary, factors: &Dictionary) -> Result<Self> {
        let mut entries: HashMap<u32, Vec<u32>> = HashMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let Some(lemma) = tokens.next() else { continue };
            let Some(lemma_id) = target.get(lemma) else {
                continue;
            };
            entries
                .entry(lemma_id)
                .or_default()
                .extend(tokens.map(|factor| factors.id_or_unk(factor)));
        }
        Ok(Self::from_entries(factors.id_range()?, entries))
    }

    /// Factor ids permitted for `lemma`; the full factor range when the lemma
    /// has no entry.
    pub fn lookup(&self, lemma: u32) -> &[u32] {
        self.allowed.get(&lemma).map_or(self.universe.as_slice(), Vec::as_slice)
    }

    pub fn is_constrained(&self, lemma: u32) -> bool {
        self.allowed.contains_key(&lemma)
    }

    pub fn universe(&self) -> &[u32] {
        &self.universe
    }

    /// Number of lemmas with an explicit entry.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNK_TOKEN;
    use std::io::Write;

    fn target() -> Dictionary {
        Dictionary::from_tokens(["eos", UNK_TOKEN, "cat", "dog", "run"])
    }

    fn factors() -> Dictionary {
        Dictionary::from_tokens(["eos", UNK_TOKEN, "noun+singular", "noun+plural", "verb+present"])
    }

    #[test]
    fn test_absent_lemma_gets_full_factor_vocabulary() {
        let table = ConstraintTable::parse("cat noun+singular\n", &target(), &factors()).unwrap();

        let dog = target().get("dog").unwrap();
        assert_eq!(table.lookup(dog), [0, 1, 2, 3, 4]);
        assert!(!table.is_constrained(dog));
    }

    #[test]
    fn test_present_lemma_gets_listed_factors() {
        let table = ConstraintTable::parse("cat noun+plural noun+singular\nrun verb+present", &target(), &factors()).unwrap();

        assert_eq!(table.lookup(2), [2, 3]);
        assert_eq!(table.lookup(4), [4]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unknown_factor_maps_to_unk_and_unknown_lemma_is_skipped() {
        let table = ConstraintTable::parse("cat adjective\nbird noun+singular\n", &target(), &factors()).unwrap();

        assert_eq!(table.lookup(2), [1]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_comments_and_blank_lines_are_ignored() {
        let table = ConstraintTable::parse("# cat verb+present\n\n   \ncat noun+singular\n", &target(), &factors()).unwrap();

        assert_eq!(table.lookup(2), [2]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lemma_without_factors_allows_nothing() {
        let table = ConstraintTable::parse("cat\n", &target(), &factors()).unwrap();
        assert!(table.lookup(2).is_empty());
    }

    #[test]
    fn test_build_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cat noun+singular").unwrap();

        let table = ConstraintTable::build(Some(file.path()), &target(), &factors()).unwrap();
        assert_eq!(table.lookup(2), [2]);
        assert_eq!(table.lookup(3), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_file_falls_back_to_unconstrained() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("constraints.txt");

        assert!(matches!(
            ConstraintTable::load(&missing, &target(), &factors()),
            Err(DecodeError::ConstraintFileMissing { .. })
        ));

        let table = ConstraintTable::build(Some(&missing), &target(), &factors()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.lookup(2), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_no_file_means_unconstrained() {
        let table = ConstraintTable::build(None, &target(), &factors()).unwrap();
        assert_eq!(table, ConstraintTable::unconstrained(5));
    }

    #[test]
    fn test_overflowing_factor_ids_are_rejected() {
        let factors = Dictionary::from_ids(HashMap::from([("eos".to_string(), 0), ("last".to_string(), u32::MAX)]));

        assert!(matches!(
            ConstraintTable::build(None, &target(), &factors),
            Err(DecodeError::InvalidSettings(_))
        ));
        assert!(matches!(
            ConstraintTable::parse("cat last\n", &target(), &factors),
            Err(DecodeError::InvalidSettings(_))
        ));
    }
}
