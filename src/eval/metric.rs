//! Command Similarity Scorer
//!
//! Turns tree distances and token statistics into the per-prediction
//! scores used for evaluation: minimum tree distance to a reference set,
//! exact template/string matches, the command match score (CMS), smoothed
//! BLEU and the composite utility/flag metric.
//!
//! Predictions that fail to parse are never an error here. They are
//! replaced by the fallback tree so one bad sample cannot abort a batch.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ast::types::KIND_PREFIX;
use crate::ast::{ast2template, ast2tokens, CommandTree, NodeId, NodeKind, TokenOptions};
use crate::config::ScoreConfig;
use crate::error::Result;
use crate::parser::{CommandParser, Normalizer, ParseException};

use super::cost::{LabelCostPolicy, MatchMode, SubstitutionTable};
use super::distance::{tree_distance, CostPolicy};

/// One line of the evaluation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub min_tree_distance: f64,
    pub one_match: bool,
    pub template_match: bool,
    pub string_match: bool,
    pub cms: f64,
    pub bleu: f64,
    pub composite_score: f64,
}

/// Ground truths and ranked predictions for a single description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchRecord {
    pub ground_truths: Vec<String>,
    pub predictions: Vec<String>,
    /// Per-prediction confidence; missing entries count as 1.0
    pub confidences: Vec<f64>,
}

pub struct Scorer<P = Normalizer> {
    config: ScoreConfig,
    parser: P,
    fallback: CommandTree,
    table: SubstitutionTable,
}

impl Scorer<Normalizer> {
    pub fn new(config: ScoreConfig) -> Result<Self> {
        Self::with_parser(config, Normalizer::new())
    }
}

impl<P: CommandParser> Scorer<P> {
    pub fn with_parser(config: ScoreConfig, parser: P) -> Result<Self> {
        config.validate()?;
        let fallback = parser.parse(&config.fallback_command)?;
        let table = config.substitution_table();
        Ok(Self {
            config,
            parser,
            fallback,
            table,
        })
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn table(&self) -> &SubstitutionTable {
        &self.table
    }

    pub fn fallback(&self) -> &CommandTree {
        &self.fallback
    }

    pub fn parse(&self, cmd: &str) -> std::result::Result<CommandTree, ParseException> {
        self.parser.parse(cmd)
    }

    /// Parse a prediction, substituting the fallback tree on failure
    pub fn parse_or_fallback(&self, cmd: Option<&str>) -> Cow<'_, CommandTree> {
        let Some(cmd) = cmd else {
            warn!("missing prediction, using fallback `{}`", self.config.fallback_command);
            return Cow::Borrowed(&self.fallback);
        };
        match self.parser.parse(cmd) {
            Ok(tree) => Cow::Owned(tree),
            Err(e) => {
                warn!(command = cmd, error = %e, "unparseable prediction, using fallback");
                Cow::Borrowed(&self.fallback)
            }
        }
    }

    pub fn policy(&self, mode: MatchMode) -> LabelCostPolicy<'_> {
        LabelCostPolicy::new(&self.table, mode)
    }

    fn default_mode(&self) -> MatchMode {
        MatchMode::from_ignore_arg_value(self.config.ignore_arg_value)
    }

    /// Minimum distance from the prediction (or the fallback) to any reference
    pub fn min_dist(&self, references: &[CommandTree], predicted: Option<&CommandTree>, mode: MatchMode) -> f64 {
        let predicted = predicted.unwrap_or(&self.fallback);
        min_dist(references, predicted, &self.policy(mode))
    }

    /// Composite metric of one prediction against one ground truth.
    ///
    /// An unparseable ground truth scores 0.
    pub fn compute_metric(&self, predicted: &str, confidence: f64, ground_truth: &str) -> f64 {
        let truth = match self.parser.parse(ground_truth) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(command = ground_truth, error = %e, "unparseable ground truth");
                return 0.0;
            }
        };
        let predicted = self.parse_or_fallback(Some(predicted));
        compute_metric(
            &predicted,
            confidence,
            &truth,
            self.config.utility_weight,
            self.config.flag_weight,
        )
    }

    /// Score one prediction against a set of ground truths
    pub fn score(&self, ground_truths: &[String], prediction: &str, confidence: f64) -> ScoreRecord {
        let references = self.parse_references(ground_truths);
        let predicted = self.parse_or_fallback(Some(prediction));
        let mode = self.default_mode();

        let min_tree_distance = min_dist(&references, &predicted, &self.policy(mode));
        let composite_score = references
            .iter()
            .map(|truth| {
                compute_metric(
                    &predicted,
                    confidence,
                    truth,
                    self.config.utility_weight,
                    self.config.flag_weight,
                )
            })
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
            .unwrap_or(0.0);

        let record = ScoreRecord {
            min_tree_distance,
            one_match: one_match(&references, &predicted, mode == MatchMode::Loose),
            template_match: references.iter().any(|r| template_match(r, &predicted)),
            string_match: references.iter().any(|r| string_match(r, &predicted)),
            cms: command_match_score(&references, &predicted),
            bleu: sentence_bleu_score(&references, &predicted),
            composite_score,
        };
        debug!(prediction, ?record, "scored prediction");
        record
    }

    /// Best composite score among a record's predictions.
    ///
    /// Each prediction takes its best score over the ground truths. A
    /// record without predictions is scored as the fallback command.
    pub fn score_record(&self, record: &BatchRecord) -> f64 {
        let references = self.parse_references(&record.ground_truths);
        if references.is_empty() {
            return 0.0;
        }

        let predictions: Vec<Cow<'_, CommandTree>> = if record.predictions.is_empty() {
            vec![self.parse_or_fallback(None)]
        } else {
            record
                .predictions
                .iter()
                .map(|p| self.parse_or_fallback(Some(p)))
                .collect()
        };

        predictions
            .iter()
            .enumerate()
            .map(|(i, predicted)| {
                let confidence = record.confidences.get(i).copied().unwrap_or(1.0);
                references
                    .iter()
                    .map(|truth| {
                        compute_metric(
                            predicted,
                            confidence,
                            truth,
                            self.config.utility_weight,
                            self.config.flag_weight,
                        )
                    })
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn parse_references(&self, ground_truths: &[String]) -> Vec<CommandTree> {
        ground_truths
            .iter()
            .filter_map(|gt| match self.parser.parse(gt) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    warn!(command = gt.as_str(), error = %e, "skipping unparseable ground truth");
                    None
                }
            })
            .collect()
    }
}

/// Minimum policy distance from `predicted` to any of `references`.
///
/// With no references this is the cost of building `predicted` from
/// nothing.
pub fn min_dist(references: &[CommandTree], predicted: &CommandTree, policy: &LabelCostPolicy<'_>) -> f64 {
    if references.is_empty() {
        return predicted
            .preorder()
            .into_iter()
            .map(|id| policy.insert_cost(predicted.get(id)))
            .sum();
    }
    references
        .iter()
        .map(|reference| {
            let d = tree_distance(reference, predicted, policy);
            debug!(distance = d, mode = ?policy.mode(), "tree distance");
            d
        })
        .fold(f64::INFINITY, f64::min)
}

/// Whether any reference serializes like the prediction
pub fn one_match(references: &[CommandTree], predicted: &CommandTree, ignore_arg_value: bool) -> bool {
    let options = TokenOptions::loose().arg_type_only(ignore_arg_value);
    let target = ast2template(predicted, &options);
    references.iter().any(|r| ast2template(r, &options) == target)
}

/// Equality with literal arguments replaced by their types
pub fn template_match(a: &CommandTree, b: &CommandTree) -> bool {
    let options = TokenOptions::loose().arg_type_only(true);
    ast2template(a, &options) == ast2template(b, &options)
}

/// Equality of the full literal serializations
pub fn string_match(a: &CommandTree, b: &CommandTree) -> bool {
    let options = TokenOptions::loose();
    ast2template(a, &options) == ast2template(b, &options)
}

/// Counts of utility and flag tokens, flags carrying their argument types
pub fn get_content_tokens(tree: &CommandTree) -> IndexMap<String, usize> {
    let options = TokenOptions {
        loose_constraints: true,
        arg_type_only: true,
        with_prefix: true,
        with_flag_argtype: true,
        ..TokenOptions::default()
    };
    let utility = NodeKind::Utility.upper();
    let flag = NodeKind::Flag.upper();

    let mut counts = IndexMap::new();
    for token in ast2tokens(tree, &options) {
        if let Some((kind, content)) = token.split_once(KIND_PREFIX) {
            if kind == utility || kind == flag {
                *counts.entry(content.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Cosine similarity of the content-token counts of two trees
pub fn cms(a: &CommandTree, b: &CommandTree) -> f64 {
    let ta = get_content_tokens(a);
    let tb = get_content_tokens(b);
    let overlap: usize = tb
        .iter()
        .filter_map(|(t, &n)| ta.get(t).map(|&m| m * n))
        .sum();
    let norm = |counts: &IndexMap<String, usize>| -> f64 {
        (counts.values().map(|&n| n * n).sum::<usize>() as f64).sqrt()
    };
    let (na, nb) = (norm(&ta), norm(&tb));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    overlap as f64 / na / nb
}

/// Best CMS of the prediction against any reference
pub fn command_match_score(references: &[CommandTree], predicted: &CommandTree) -> f64 {
    references
        .iter()
        .map(|r| cms(predicted, r))
        .fold(0.0, f64::max)
}

/// Highest n-gram order BLEU looks at
const BLEU_MAX_ORDER: usize = 4;
/// Stand-in count for an order with no matching n-grams
const BLEU_EPSILON: f64 = 0.1;

fn bleu_reference_tokens(tree: &CommandTree) -> Vec<String> {
    let options = TokenOptions {
        ignore_flag_order: true,
        ..TokenOptions::default()
    };
    ast2tokens(tree, &options)
}

fn bleu_hypothesis_tokens(tree: &CommandTree) -> Vec<String> {
    let options = TokenOptions {
        ignore_flag_order: true,
        ..TokenOptions::loose()
    };
    ast2tokens(tree, &options)
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Clipped n-gram matches and lengths accumulated over a corpus
#[derive(Debug, Default)]
struct BleuStats {
    matched: [usize; BLEU_MAX_ORDER],
    total: [usize; BLEU_MAX_ORDER],
    hypothesis_len: usize,
    reference_len: usize,
}

impl BleuStats {
    fn add(&mut self, references: &[Vec<String>], hypothesis: &[String]) {
        for n in 1..=BLEU_MAX_ORDER {
            let counts = ngram_counts(hypothesis, n);
            let mut max_ref: HashMap<&[String], usize> = HashMap::new();
            for reference in references {
                for (gram, count) in ngram_counts(reference, n) {
                    let best = max_ref.entry(gram).or_insert(0);
                    *best = (*best).max(count);
                }
            }
            let clipped: usize = counts
                .iter()
                .map(|(gram, &count)| count.min(max_ref.get(gram).copied().unwrap_or(0)))
                .sum();
            self.matched[n - 1] += clipped;
            self.total[n - 1] += counts.values().sum::<usize>().max(1);
        }

        let len = hypothesis.len();
        self.hypothesis_len += len;
        // closest reference length, the shorter one on a tie
        self.reference_len += references
            .iter()
            .map(Vec::len)
            .min_by_key(|&r| (r.abs_diff(len), r))
            .unwrap_or(0);
    }

    fn score(&self) -> f64 {
        if self.hypothesis_len == 0 || self.matched[0] == 0 {
            return 0.0;
        }
        // short hypotheses are scored on the orders they can contain
        let orders = self.hypothesis_len.min(BLEU_MAX_ORDER);
        let weight = 1.0 / orders as f64;
        let log_precision: f64 = (0..orders)
            .map(|i| {
                let matched = if self.matched[i] == 0 {
                    BLEU_EPSILON
                } else {
                    self.matched[i] as f64
                };
                weight * (matched / self.total[i] as f64).ln()
            })
            .sum();

        let brevity = if self.hypothesis_len > self.reference_len {
            1.0
        } else {
            (1.0 - self.reference_len as f64 / self.hypothesis_len as f64).exp()
        };
        brevity * log_precision.exp()
    }
}

/// Smoothed BLEU of one prediction against its references, over the
/// flag-order-independent token sequences of the trees
pub fn sentence_bleu_score(references: &[CommandTree], predicted: &CommandTree) -> f64 {
    let references: Vec<Vec<String>> = references.iter().map(bleu_reference_tokens).collect();
    let mut stats = BleuStats::default();
    stats.add(&references, &bleu_hypothesis_tokens(predicted));
    stats.score()
}

/// Corpus BLEU: n-gram statistics are pooled over every
/// (references, prediction) pair before the score is taken
pub fn corpus_bleu_score(references: &[Vec<CommandTree>], predictions: &[CommandTree]) -> f64 {
    if references.len() != predictions.len() {
        warn!(
            references = references.len(),
            predictions = predictions.len(),
            "corpus sizes differ, scoring the common prefix"
        );
    }
    let mut stats = BleuStats::default();
    for (group, predicted) in references.iter().zip(predictions) {
        let group: Vec<Vec<String>> = group.iter().map(bleu_reference_tokens).collect();
        stats.add(&group, &bleu_hypothesis_tokens(predicted));
    }
    stats.score()
}

/// `(2|P ∩ T| - |P ∪ T|) / max(1, |P|, |T|)` over two multisets of names
fn overlap_score(predicted: &IndexMap<String, usize>, truth: &IndexMap<String, usize>) -> f64 {
    let mut intersection = 0;
    let mut union = 0;
    for (name, &p) in predicted {
        let t = truth.get(name).copied().unwrap_or(0);
        intersection += p.min(t);
        union += p.max(t);
    }
    union += truth
        .iter()
        .filter(|(name, _)| !predicted.contains_key(*name))
        .map(|(_, &t)| t)
        .sum::<usize>();

    let size = |m: &IndexMap<String, usize>| m.values().sum::<usize>();
    let z = 1.max(size(predicted)).max(size(truth));
    (2.0 * intersection as f64 - union as f64) / z as f64
}

fn utility_counts(tree: &CommandTree) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for id in tree.utility_nodes() {
        *counts.entry(tree.get(id).value.clone()).or_insert(0) += 1;
    }
    counts
}

/// Overlap of the utility multisets of two trees; 0 when both have none
pub fn utility_match_score(predicted: &CommandTree, truth: &CommandTree) -> f64 {
    let p = utility_counts(predicted);
    let t = utility_counts(truth);
    if p.is_empty() && t.is_empty() {
        return 0.0;
    }
    overlap_score(&p, &t)
}

/// 1.0 when both utilities exist and share a (case-insensitive) name
pub fn utility_score(truth: Option<(&CommandTree, NodeId)>, predicted: Option<(&CommandTree, NodeId)>) -> f64 {
    match (truth, predicted) {
        (Some((tt, t)), Some((pt, p))) => {
            let same = tt.get(t).value.to_lowercase() == pt.get(p).value.to_lowercase();
            if same {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn flag_names(utility: Option<(&CommandTree, NodeId)>) -> BTreeSet<String> {
    match utility {
        Some((tree, id)) => tree
            .flags_of(id)
            .into_iter()
            .map(|f| tree.get(f).value.clone())
            .collect(),
        None => BTreeSet::new(),
    }
}

/// Overlap of the flag names under two utilities; 1.0 if neither has flags
pub fn flag_score(truth: Option<(&CommandTree, NodeId)>, predicted: Option<(&CommandTree, NodeId)>) -> f64 {
    let t = flag_names(truth);
    let p = flag_names(predicted);
    if t.is_empty() && p.is_empty() {
        return 1.0;
    }
    let intersection = p.intersection(&t).count() as f64;
    let union = p.union(&t).count() as f64;
    let z = 1.max(p.len()).max(t.len()) as f64;
    (2.0 * intersection - union) / z
}

/// Composite utility/flag score of a prediction.
///
/// Utilities are aligned by position, the shorter list padded with
/// nothing. Each pair scores `conf * (u * f - (1 - u))` where `u` is the
/// utility score and `f` the flag score normalized by the two weights.
/// A NaN confidence counts as 1.0.
pub fn compute_metric(
    predicted: &CommandTree,
    confidence: f64,
    truth: &CommandTree,
    utility_weight: f64,
    flag_weight: f64,
) -> f64 {
    let confidence = if confidence.is_nan() { 1.0 } else { confidence };
    let predicted_utilities = predicted.utility_nodes();
    let truth_utilities = truth.utility_nodes();
    let n = predicted_utilities.len().max(truth_utilities.len());
    if n == 0 {
        return 0.0;
    }

    let total: f64 = (0..n)
        .map(|i| {
            let t = truth_utilities.get(i).map(|&id| (truth, id));
            let p = predicted_utilities.get(i).map(|&id| (predicted, id));
            let u = utility_score(t, p);
            let f = flag_score(t, p);
            let normed = (utility_weight + flag_weight * f) / (utility_weight + flag_weight);
            confidence * (u * normed - (1.0 - u))
        })
        .sum();
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::bash_parser;

    fn parse(cmd: &str) -> CommandTree {
        bash_parser(cmd).unwrap()
    }

    fn scorer() -> Scorer {
        Scorer::new(ScoreConfig::default()).unwrap()
    }

    #[test]
    fn test_min_dist_modes() {
        let s = scorer();
        let references = vec![parse("find . -name '*.txt'")];
        let predicted = parse("find . -name '*.log'");
        assert_eq!(s.min_dist(&references, Some(&predicted), MatchMode::Strict), 1.0);
        assert_eq!(s.min_dist(&references, Some(&predicted), MatchMode::Loose), 0.0);
    }

    #[test]
    fn test_min_dist_takes_closest_reference() {
        let s = scorer();
        let references = vec![parse("ls -l -a /tmp"), parse("find . -name '*.log'")];
        let predicted = parse("find . -name '*.log'");
        assert_eq!(s.min_dist(&references, Some(&predicted), MatchMode::Strict), 0.0);
    }

    #[test]
    fn test_min_dist_fallback_for_missing_prediction() {
        let s = scorer();
        let references = vec![parse("find . -name x")];
        let d = s.min_dist(&references, None, MatchMode::Strict);
        assert!(d.is_finite());
        // `find .` plus one flag and its argument
        assert_eq!(d, 2.0);
    }

    #[test]
    fn test_min_dist_without_references() {
        let s = scorer();
        let predicted = parse("ls");
        let policy = s.policy(MatchMode::Strict);
        assert_eq!(min_dist(&[], &predicted, &policy), predicted.len() as f64);
    }

    #[test]
    fn test_unparseable_prediction_uses_fallback() {
        let s = scorer();
        let tree = s.parse_or_fallback(Some("echo 'unterminated"));
        assert!(matches!(tree, Cow::Borrowed(_)));
        assert_eq!(tree.get_utilities().into_iter().collect::<Vec<_>>(), vec!["find"]);
    }

    #[test]
    fn test_template_and_string_match() {
        let a = parse("find . -name '*.txt'");
        let b = parse("find . -name '*.log'");
        assert!(template_match(&a, &b));
        assert!(!string_match(&a, &b));
        assert!(string_match(&a, &a.clone()));
        assert!(one_match(&[b.clone()], &a, true));
        assert!(!one_match(&[b], &a, false));
    }

    #[test]
    fn test_content_tokens_skip_arguments() {
        let tokens = get_content_tokens(&parse("grep -r foo ."));
        assert_eq!(tokens.get("grep"), Some(&1));
        assert!(tokens.keys().any(|t| t.starts_with("-r")));
        assert!(!tokens.keys().any(|t| t.contains("foo")));
    }

    #[test]
    fn test_cms() {
        let a = parse("ls -l /tmp");
        assert!((cms(&a, &parse("ls -l /var")) - 1.0).abs() < 1e-9);
        assert_eq!(cms(&a, &parse("find .")), 0.0);
        let partial = cms(&a, &parse("ls -a /tmp"));
        assert!(partial > 0.0 && partial < 1.0);
    }

    #[test]
    fn test_cms_empty_side_is_zero() {
        let empty = CommandTree::new();
        assert_eq!(cms(&empty, &parse("ls")), 0.0);
        assert_eq!(command_match_score(&[], &parse("ls")), 0.0);
    }

    #[test]
    fn test_sentence_bleu_identical() {
        let truth = parse("find . -name '*.txt' -type f");
        assert_eq!(sentence_bleu_score(&[truth.clone()], &truth), 1.0);
        // flag order does not matter
        let swapped = parse("find . -type f -name '*.txt'");
        assert_eq!(sentence_bleu_score(&[truth], &swapped), 1.0);
        // a one-token hypothesis is scored on unigrams alone
        assert_eq!(sentence_bleu_score(&[parse("pwd")], &parse("pwd")), 1.0);
    }

    #[test]
    fn test_sentence_bleu_smoothing() {
        // [ls -l /tmp] vs [ls -a /tmp]: p1 = 2/3, no bigram or trigram matches
        let score = sentence_bleu_score(&[parse("ls -l /tmp")], &parse("ls -a /tmp"));
        let expected = (2.0 / 3.0 * 0.05 * 0.1_f64).powf(1.0 / 3.0);
        assert!((score - expected).abs() < 1e-9, "{} != {}", score, expected);
    }

    #[test]
    fn test_sentence_bleu_brevity_and_disjoint() {
        let references = vec![parse("find . -name '*.txt' -type f")];
        let short = sentence_bleu_score(&references, &parse("find . -name '*.txt'"));
        assert!(short > 0.0 && short < 1.0);

        assert_eq!(sentence_bleu_score(&[parse("ls -l")], &parse("pwd")), 0.0);
        assert_eq!(sentence_bleu_score(&[parse("ls")], &CommandTree::new()), 0.0);
        assert_eq!(sentence_bleu_score(&[], &parse("ls")), 0.0);
    }

    #[test]
    fn test_sentence_bleu_takes_best_reference_counts() {
        let references = vec![parse("pwd"), parse("ls -l /tmp")];
        assert_eq!(sentence_bleu_score(&references, &parse("ls -l /tmp")), 1.0);
    }

    #[test]
    fn test_corpus_bleu_pools_counts() {
        let references = vec![vec![parse("ls -l /tmp")], vec![parse("pwd")]];
        let predictions = vec![parse("ls -a /tmp"), parse("pwd")];
        let score = corpus_bleu_score(&references, &predictions);
        // 4 hypothesis tokens in total, so all four orders count
        let p1: f64 = 3.0 / 4.0;
        let p2 = 0.1 / 3.0;
        let p3 = 0.1 / 2.0;
        let p4 = 0.1 / 2.0;
        let expected = (p1 * p2 * p3 * p4).powf(0.25);
        assert!((score - expected).abs() < 1e-9, "{} != {}", score, expected);

        assert_eq!(corpus_bleu_score(&[], &[]), 0.0);
        let same = vec![vec![parse("ls -l -a /tmp")], vec![parse("find . -type f")]];
        let predicted = vec![parse("ls -a -l /tmp"), parse("find . -type f")];
        assert_eq!(corpus_bleu_score(&same, &predicted), 1.0);

        // a three-token pair adds an empty 4-gram slot to the pool
        let short = vec![vec![parse("ls -l /tmp")], vec![parse("find . -type f")]];
        let predicted = vec![parse("ls -l /tmp"), parse("find . -type f")];
        let score = corpus_bleu_score(&short, &predicted);
        assert!((score - 0.5_f64.powf(0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_flag_score() {
        let truth = parse("ls -l -a");
        let t = Some((&truth, truth.utility_nodes()[0]));

        let exact = parse("ls -a -l");
        assert_eq!(flag_score(t, Some((&exact, exact.utility_nodes()[0]))), 1.0);

        let partial = parse("ls -l");
        assert_eq!(flag_score(t, Some((&partial, partial.utility_nodes()[0]))), 0.0);

        let bare = parse("ls");
        let b = Some((&bare, bare.utility_nodes()[0]));
        assert_eq!(flag_score(b, b), 1.0);
        assert_eq!(flag_score(None, None), 1.0);
    }

    #[test]
    fn test_utility_scores() {
        let a = parse("ls");
        let b = parse("LS");
        let ua = Some((&a, a.utility_nodes()[0]));
        let ub = Some((&b, b.utility_nodes()[0]));
        assert_eq!(utility_score(ua, ub), 1.0);
        assert_eq!(utility_score(ua, None), 0.0);

        assert_eq!(utility_match_score(&a, &a), 1.0);
        assert_eq!(utility_match_score(&a, &parse("find .")), -2.0);
    }

    #[test]
    fn test_compute_metric() {
        let s = scorer();
        assert_eq!(s.compute_metric("ls -l", 1.0, "ls -l"), 1.0);
        assert_eq!(s.compute_metric("ls -l", 0.5, "ls -l"), 0.5);
        assert_eq!(s.compute_metric("find .", 1.0, "ls"), -1.0);
        assert_eq!(s.compute_metric("ls -l", f64::NAN, "ls -l"), 1.0);
        // flag score 0 halves the utility credit
        assert_eq!(s.compute_metric("ls -l", 1.0, "ls -l -a"), 0.5);
    }

    #[test]
    fn test_compute_metric_pads_utilities() {
        let predicted = parse("ls -l");
        let truth = parse("ls -l | sort");
        // (1 + -1) / 2
        assert_eq!(compute_metric(&predicted, 1.0, &truth, 1.0, 1.0), 0.0);
        assert_eq!(compute_metric(&CommandTree::new(), 1.0, &CommandTree::new(), 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_score_record_fields() {
        let s = scorer();
        let truths = vec!["find . -name '*.txt'".to_string()];
        let record = s.score(&truths, "find . -name '*.txt'", 1.0);
        assert_eq!(record.min_tree_distance, 0.0);
        assert!(record.one_match && record.template_match && record.string_match);
        assert!((record.cms - 1.0).abs() < 1e-9);
        assert_eq!(record.bleu, 1.0);
        assert_eq!(record.composite_score, 1.0);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("composite_score").is_some());
    }

    #[test]
    fn test_score_batch_record() {
        let s = scorer();
        let record = BatchRecord {
            ground_truths: vec!["ls -l".to_string(), "ls -l -a".to_string()],
            predictions: vec!["find .".to_string(), "ls -l".to_string()],
            confidences: vec![1.0],
        };
        assert_eq!(s.score_record(&record), 1.0);

        let empty = BatchRecord {
            ground_truths: vec!["find .".to_string()],
            ..BatchRecord::default()
        };
        assert_eq!(s.score_record(&empty), 1.0);
    }

    #[test]
    fn test_custom_parser() {
        let parser = |cmd: &str| -> std::result::Result<CommandTree, ParseException> {
            if cmd == "find" {
                bash_parser(cmd)
            } else {
                Err(ParseException::new("rejected", 0))
            }
        };
        let s = Scorer::with_parser(ScoreConfig::default(), parser).unwrap();
        let tree = s.parse_or_fallback(Some("ls"));
        assert!(matches!(tree, Cow::Borrowed(_)));
    }

    #[test]
    fn test_bad_fallback_is_an_error() {
        let config = ScoreConfig {
            fallback_command: "echo 'open".to_string(),
            ..ScoreConfig::default()
        };
        assert!(Scorer::new(config).is_err());
    }
}
