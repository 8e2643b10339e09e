use crate::communication::Response;
use crate::error::{DecodeError, Result};
use crate::model::RawBeam;

/// `raw / len^alpha` per candidate. Empty hypotheses count as length 1.
pub fn length_normalize(raw_scores: &[f32], hypotheses: &[Vec<u32>], alpha: f32) -> Vec<f32> {
    raw_scores
        .iter()
        .zip(hypotheses)
        .map(|(score, hypothesis)| {
            let length = hypothesis.len().max(1) as f32;
            if alpha == 1.0 {
                score / length
            } else {
                score / length.powf(alpha)
            }
        })
        .collect()
}

/// Indices of the `nbest` lowest scores, ascending. Ties keep candidate order.
pub fn nbest_order(scores: &[f32], nbest: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));
    order.truncate(nbest);
    order
}

/// Moves the elements at `order` out of `items`, in that order. Indices past
/// the end are skipped, so an empty field stays empty.
fn reorder<T>(items: Vec<T>, order: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|idx| slots.get_mut(*idx).and_then(Option::take))
        .collect()
}

fn check_parallel(what: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(DecodeError::Search(format!(
            "beam returned {len} {what} for {expected} hypotheses"
        )));
    }
    Ok(())
}

/// Normalizes, selects and reorders a raw beam into the response for `index`.
pub fn select(index: usize, beam: RawBeam, nbest: usize, alpha: f32) -> Result<Response> {
    let candidates = beam.hypotheses.len();
    check_parallel("scores", beam.scores.len(), candidates)?;
    if !beam.factor_hypotheses.is_empty() {
        check_parallel("factor hypotheses", beam.factor_hypotheses.len(), candidates)?;
    }
    if let Some(alignments) = &beam.alignments {
        check_parallel("alignments", alignments.len(), candidates)?;
    }
    if candidates == 0 {
        return Err(DecodeError::Search(format!("beam for sentence {index} is empty")));
    }

    let normalized = length_normalize(&beam.scores, &beam.hypotheses, alpha);
    let order = nbest_order(&normalized, nbest);

    Ok(Response {
        index,
        scores: order.iter().map(|idx| normalized[*idx]).collect(),
        hypotheses: reorder(beam.hypotheses, &order),
        alignments: beam.alignments.map(|alignments| reorder(alignments, &order)),
        factor_hypotheses: reorder(beam.factor_hypotheses, &order),
    })
}
