use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{DecodeError, Result};

/// End of sentence.
pub const EOS: u32 = 0;
/// Unknown token.
pub const UNK: u32 = 1;
pub const UNK_TOKEN: &str = "<unk>";

/// A token vocabulary with its inverted (id to token) view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    ids: HashMap<String, u32>,
    tokens: HashMap<u32, String>,
}

impl Dictionary {
    /// Load a `{"token": id}` JSON vocabulary.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DecodeError::io(path, e))?;
        let ids: HashMap<String, u32> =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| DecodeError::json(path, e))?;
        Ok(Self::from_ids(ids))
    }

    pub fn from_ids(ids: HashMap<String, u32>) -> Self {
        let tokens = ids.iter().map(|(token, id)| (*id, token.clone())).collect();
        Self { ids, tokens }
    }

    /// Builds a vocabulary numbering `tokens` from `0` in order.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = tokens
            .into_iter()
            .enumerate()
            .map(|(id, token)| (token.into(), id as u32))
            .collect();
        Self::from_ids(ids)
    }

    pub fn get(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Id of `token`, falling back to the `<unk>` entry (or [`UNK`] when absent).
    pub fn id_or_unk(&self, token: &str) -> u32 {
        self.get(token)
            .or_else(|| self.get(UNK_TOKEN))
            .unwrap_or(UNK)
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// One past the largest id, i.e. the size of the id range.
    ///
    /// Fails when the largest id is `u32::MAX`, whose range does not fit in a `u32`.
    pub fn id_range(&self) -> Result<u32> {
        match self.tokens.keys().max() {
            None => Ok(0),
            Some(max) => max.checked_add(1).ok_or_else(|| {
                DecodeError::InvalidSettings(format!("dictionary id {max} leaves no room for an id range"))
            }),
        }
    }

    /// Tokens of `ids` up to (not including) the first [`EOS`].
    pub fn tokens_until_eos(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .take_while(|id| **id != EOS)
            .map(|id| self.token(*id).unwrap_or("UNK").to_string())
            .collect()
    }

    /// Space-joined [`tokens_until_eos`](Self::tokens_until_eos).
    pub fn seq2words(&self, ids: &[u32]) -> String {
        self.tokens_until_eos(ids).join(" ")
    }
}
