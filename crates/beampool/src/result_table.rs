use crate::communication::{Alignment, Response};
use crate::error::{DecodeError, Result};

/// The selected candidates of one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub hypotheses: Vec<Vec<u32>>,
    pub scores: Vec<f32>,
    pub alignments: Option<Vec<Alignment>>,
    pub factor_hypotheses: Vec<Vec<u32>>,
}

impl Translation {
    pub fn best(&self) -> Option<&[u32]> {
        self.hypotheses.first().map(Vec::as_slice)
    }

    pub fn best_factors(&self) -> Option<&[u32]> {
        self.factor_hypotheses.first().map(Vec::as_slice)
    }

    pub fn best_alignment(&self) -> Option<&Alignment> {
        self.alignments.as_ref().and_then(|alignments| alignments.first())
    }
}

impl From<Response> for Translation {
    fn from(response: Response) -> Self {
        Self {
            hypotheses: response.hypotheses,
            scores: response.scores,
            alignments: response.alignments,
            factor_hypotheses: response.factor_hypotheses,
        }
    }
}

/// Translations keyed by original sentence index.
///
/// Responses are placed by their index, so the table's contents do not depend
/// on which worker answered or in which order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    slots: Vec<Option<Translation>>,
}

impl ResultTable {
    pub fn new(len: usize) -> Self {
        Self { slots: vec![None; len] }
    }

    pub fn insert(&mut self, response: Response) -> Result<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(response.index)
            .ok_or(DecodeError::UnexpectedIndex { index: response.index, len })?;
        if slot.is_some() {
            return Err(DecodeError::DuplicateResponse(response.index));
        }
        *slot = Some(response.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn get(&self, index: usize) -> Option<&Translation> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Errors with the first empty index, if any.
    pub fn ensure_complete(&self) -> Result<()> {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => Err(DecodeError::MissingResponse(index)),
            None => Ok(()),
        }
    }

    /// Filled entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Translation)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|translation| (index, translation)))
    }

    pub fn best_hypotheses(&self) -> Vec<&[u32]> {
        self.iter().filter_map(|(_, translation)| translation.best()).collect()
    }
}
