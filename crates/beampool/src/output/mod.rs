//! Output assembly: hypothesis text, scoring and the JSON trace.

pub mod filter;
pub mod render;
pub mod score;
pub mod trace;

pub use filter::{BpeMerge, FilterChain, TextFilter};
pub use render::{FIELD_SEPARATOR, OutputStream, Renderer, render};
pub use score::{ExactMatch, Score, Scorer, ScorerRegistry, check_reference_count};
pub use trace::{ReferenceSets, Trace, TraceMetadata, TraceRecord, export_trace, write_trace};
