//! Sentence sources feeding the dispatch queue.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::communication::Payload;
use crate::error::{DecodeError, Result};
use crate::model::{Dictionary, EOS};

/// Separates factors inside one source token, e.g. `house|NN`.
pub const FACTOR_SEPARATOR: char = '|';

/// Yields one payload per sentence, with a known total and a rewind.
pub trait SampleSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restart iteration from the first sentence.
    fn rewind(&mut self);

    fn next_sample(&mut self) -> Option<Payload>;
}

/// In-memory payloads.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuffer {
    payloads: Vec<Payload>,
    position: usize,
}

impl PayloadBuffer {
    pub fn new(payloads: Vec<Payload>) -> Self {
        Self { payloads, position: 0 }
    }
}

impl SampleSource for PayloadBuffer {
    fn len(&self) -> usize {
        self.payloads.len()
    }

    fn rewind(&mut self) {
        self.position = 0;
    }

    fn next_sample(&mut self) -> Option<Payload> {
        let payload = self.payloads.get(self.position).cloned()?;
        self.position += 1;
        Some(payload)
    }
}

/// A tokenized source text mapped through the source dictionaries.
///
/// Each line is one sentence; tokens are whitespace separated and may carry
/// one factor per source dictionary joined with [`FACTOR_SEPARATOR`]. The
/// payload holds a single input `"x"` of shape `factors x (tokens + 1)`,
/// terminated by [`EOS`].
#[derive(Debug, Clone)]
pub struct TextCorpus {
    tokens: Vec<Vec<String>>,
    samples: PayloadBuffer,
}

impl TextCorpus {
    pub fn load(path: &Path, dictionaries: &[Arc<Dictionary>]) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DecodeError::io(path, e))?;
        Self::from_lines(text.lines(), dictionaries)
    }

    pub fn from_lines<'a, I>(lines: I, dictionaries: &[Arc<Dictionary>]) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if dictionaries.is_empty() {
            return Err(DecodeError::InvalidSettings("at least one source dictionary is required".into()));
        }

        let mut tokens = Vec::new();
        let mut payloads = Vec::new();
        for line in lines {
            let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            payloads.push(Self::encode(&words, dictionaries));
            tokens.push(words);
        }

        Ok(Self {
            tokens,
            samples: PayloadBuffer::new(payloads),
        })
    }

    fn encode(words: &[String], dictionaries: &[Arc<Dictionary>]) -> Payload {
        let mut rows: Vec<Vec<u32>> = vec![Vec::with_capacity(words.len() + 1); dictionaries.len()];
        for word in words {
            let mut factors = word.split(FACTOR_SEPARATOR);
            for (row, dictionary) in rows.iter_mut().zip(dictionaries) {
                let id = factors.next().map_or(crate::model::UNK, |factor| dictionary.id_or_unk(factor));
                row.push(id);
            }
        }
        for row in rows.iter_mut() {
            row.push(EOS);
        }
        Payload::new().with("x", rows)
    }

    /// Raw source tokens per sentence, in input order.
    pub fn source_tokens(&self) -> &[Vec<String>] {
        &self.tokens
    }
}

impl SampleSource for TextCorpus {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn rewind(&mut self) {
        self.samples.rewind();
    }

    fn next_sample(&mut self) -> Option<Payload> {
        self.samples.next_sample()
    }
}
