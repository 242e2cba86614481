//! Tree Comparison and Scoring
//!
//! Annotation, Zhang–Shasha edit distance, label costs, and the scores
//! built on top of them.

pub mod annotate;
pub mod distance;
pub mod cost;
pub mod metric;
pub mod batch;

pub use annotate::{AnnotatedTree, Labeled, SimpleTree, Tree};
pub use batch::{read_records, run_batch, BatchError, BatchSummary};
pub use cost::{default_table, str_local_dist, temp_local_dist, LabelCostPolicy, MatchMode, SubstitutionTable};
pub use distance::{distance, tree_distance, CostPolicy, CustomCost, UnitCost};
pub use metric::{
    cms, command_match_score, compute_metric, corpus_bleu_score, flag_score, get_content_tokens,
    min_dist, one_match, sentence_bleu_score, string_match, template_match, utility_match_score,
    utility_score, BatchRecord, ScoreRecord, Scorer,
};
