/// Attention weights of one candidate, `target positions x source positions`.
pub type Alignment = Vec<Vec<f32>>;

/// The post-processed decode of one [`Request`](super::Request).
///
/// Candidates are already length-normalized, cut to n-best and sorted by score,
/// and `alignments` / `factor_hypotheses` follow the same order as `hypotheses`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub index: usize,
    pub hypotheses: Vec<Vec<u32>>,
    pub scores: Vec<f32>,
    pub alignments: Option<Vec<Alignment>>,
    /// Empty unless the model predicts target factors.
    pub factor_hypotheses: Vec<Vec<u32>>,
}

/// What a worker writes into the result queue.
///
/// `Failed` does not say which request broke; the collector treats any
/// failure as fatal for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResult<T> {
    Ok(T),
    Failed(String),
}
