//! JSON trace of a run for visualization tools.
//!
//! ```json
//! {"metadata": {"models": ["model.npz"], "beam_size": 5},
//!  "data": [{"src": ["das", "haus"], "trg": ["the", "house"], "ref": ["the house"], "att": null}]}
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::communication::Alignment;
use crate::error::{DecodeError, Result};
use crate::model::Dictionary;
use crate::result_table::ResultTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMetadata {
    pub models: Vec<String>,
    pub beam_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub src: Vec<String>,
    pub trg: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trgfact: Option<Vec<String>>,
    #[serde(rename = "ref")]
    pub references: Vec<String>,
    pub att: Option<Alignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub metadata: TraceMetadata,
    pub data: Vec<TraceRecord>,
}

/// The lines of one reference file.
pub type ReferenceFile = Vec<String>;

/// Reference sets, each holding every reference file for one source.
///
/// When there are fewer sets than source files, source `i` uses set
/// `i % len`, so several sources can share one set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSets {
    sets: Vec<Vec<ReferenceFile>>,
}

impl ReferenceSets {
    pub fn new(sets: Vec<Vec<ReferenceFile>>) -> Self {
        Self { sets }
    }

    /// Reads every file of every set.
    pub fn load<P: AsRef<Path>>(sets: &[Vec<P>]) -> Result<Self> {
        let sets = sets
            .iter()
            .map(|files| {
                files
                    .iter()
                    .map(|path| {
                        let path = path.as_ref();
                        fs::read_to_string(path)
                            .map(|text| text.lines().map(str::to_string).collect())
                            .map_err(|e| DecodeError::io(path, e))
                    })
                    .collect::<Result<Vec<ReferenceFile>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sets })
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn for_source(&self, source_index: usize) -> Option<&[ReferenceFile]> {
        if self.sets.is_empty() {
            return None;
        }
        self.sets.get(source_index % self.sets.len()).map(Vec::as_slice)
    }

    /// Line `sentence` of every file in the set used by `source_index`.
    pub fn references(&self, source_index: usize, sentence: usize) -> Vec<String> {
        self.for_source(source_index)
            .unwrap_or_default()
            .iter()
            .filter_map(|file| file.get(sentence).cloned())
            .collect()
    }
}

/// Builds the trace for one translated source file.
pub fn export_trace(
    table: &ResultTable,
    source_tokens: &[Vec<String>],
    references: &ReferenceSets,
    source_index: usize,
    target: &Dictionary,
    factors: Option<&Dictionary>,
    metadata: TraceMetadata,
) -> Trace {
    let data = table
        .iter()
        .map(|(sentence, translation)| TraceRecord {
            src: source_tokens.get(sentence).cloned().unwrap_or_default(),
            trg: translation.best().map(|ids| target.tokens_until_eos(ids)).unwrap_or_default(),
            trgfact: factors.and_then(|dictionary| {
                translation.best_factors().map(|ids| dictionary.tokens_until_eos(ids))
            }),
            references: references.references(source_index, sentence),
            att: translation.best_alignment().cloned(),
        })
        .collect();

    Trace { metadata, data }
}

pub fn write_trace<W: Write>(trace: &Trace, writer: W) -> serde_json::Result<()> {
    serde_json::to_writer(writer, trace)
}
