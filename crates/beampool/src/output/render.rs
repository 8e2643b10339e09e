use std::fmt::Write;

use super::filter::FilterChain;
use crate::error::{DecodeError, Result};
use crate::model::Dictionary;
use crate::result_table::{ResultTable, Translation};

/// Separator between fields of a scored output line.
pub const FIELD_SEPARATOR: &str = " ||| ";

/// Which text a hypothesis renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Target words, or lemmas for factored models
    Lemmas,
    /// Target factors only
    Factors,
    /// `lemma|factor` per token
    Joined,
}

/// Turns a [`ResultTable`] into hypothesis text.
pub struct Renderer<'a> {
    target: &'a Dictionary,
    factors: Option<&'a Dictionary>,
    filters: &'a FilterChain,
}

impl<'a> Renderer<'a> {
    pub fn new(target: &'a Dictionary, factors: Option<&'a Dictionary>, filters: &'a FilterChain) -> Self {
        Self { target, factors, filters }
    }

    fn factor_tokens(&self, translation: &Translation, candidate: usize) -> Result<Vec<String>> {
        let (Some(dictionary), Some(ids)) = (self.factors, translation.factor_hypotheses.get(candidate)) else {
            return Err(DecodeError::InvalidSettings("no factor hypotheses to render".into()));
        };
        Ok(dictionary.tokens_until_eos(ids))
    }

    fn candidate_text(&self, translation: &Translation, candidate: usize, stream: OutputStream) -> Result<String> {
        let lemmas = &translation.hypotheses[candidate];
        let text = match stream {
            OutputStream::Lemmas => self.target.seq2words(lemmas),
            OutputStream::Factors => self.factor_tokens(translation, candidate)?.join(" "),
            OutputStream::Joined => {
                let factors = self.factor_tokens(translation, candidate)?;
                self.target
                    .tokens_until_eos(lemmas)
                    .iter()
                    .zip(factors)
                    .map(|(lemma, factor)| format!("{lemma}|{factor}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        };
        Ok(self.filters.apply(&text))
    }

    /// Renders one line per sentence, or per `(sentence, candidate)` with
    /// `index ||| text ||| score` when scores are requested or `nbest > 1`.
    /// Every line ends in a newline.
    pub fn render(&self, table: &ResultTable, stream: OutputStream, nbest: usize, include_scores: bool) -> Result<String> {
        let scored = include_scores || nbest > 1;
        let mut out = String::new();

        for (index, translation) in table.iter() {
            if !scored {
                let text = self.candidate_text(translation, 0, stream)?;
                out.push_str(&text);
                out.push('\n');
                continue;
            }
            let candidates = nbest.min(translation.hypotheses.len());
            for candidate in 0..candidates {
                let text = self.candidate_text(translation, candidate, stream)?;
                let score = translation.scores[candidate];
                // Writing to a String cannot fail.
                let _ = writeln!(out, "{index}{FIELD_SEPARATOR}{text}{FIELD_SEPARATOR}{score:.6}");
            }
        }
        Ok(out)
    }
}

/// Renders the target word stream of `table`.
pub fn render(
    table: &ResultTable,
    target: &Dictionary,
    filters: &FilterChain,
    nbest: usize,
    include_scores: bool,
) -> Result<String> {
    Renderer::new(target, None, filters).render(table, OutputStream::Lemmas, nbest, include_scores)
}
