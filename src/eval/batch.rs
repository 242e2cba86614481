//! Batch Evaluation
//!
//! Scores a JSON-lines file of records on the blocking thread pool. Each
//! record's wall-clock budget runs from the moment it is spawned. A record
//! that overruns it scores 0 and is counted as timed out; the rest of the
//! batch carries on.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::parser::CommandParser;

use super::metric::{BatchRecord, Scorer};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub status: String,
    /// Mean record score
    pub score: f64,
    pub records: usize,
    pub timed_out: usize,
}

/// Parse JSON-lines input, skipping blank lines
pub fn read_records(input: &str) -> Result<Vec<BatchRecord>, BatchError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| BatchError::Json { line: i + 1, source })
        })
        .collect()
}

pub async fn run_batch<P>(
    scorer: Arc<Scorer<P>>,
    records: Vec<BatchRecord>,
    budget: Option<Duration>,
) -> BatchSummary
where
    P: CommandParser + Send + Sync + 'static,
{
    let total = records.len();
    let mut handles = Vec::with_capacity(total);
    for record in records {
        let scorer = Arc::clone(&scorer);
        let deadline = budget.map(|limit| Instant::now() + limit);
        let handle = tokio::task::spawn_blocking(move || scorer.score_record(&record));
        handles.push((handle, deadline));
    }

    let mut sum = 0.0;
    let mut timed_out = 0;
    for (i, (handle, deadline)) in handles.into_iter().enumerate() {
        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, handle).await {
                Ok(joined) => Some(joined),
                Err(_) => None,
            },
            None => Some(handle.await),
        };
        match outcome {
            Some(Ok(score)) => sum += score,
            Some(Err(e)) => warn!(record = i, error = %e, "scoring task failed"),
            None => {
                warn!(record = i, "record exceeded its time budget");
                timed_out += 1;
            }
        }
    }

    let score = if total == 0 { 0.0 } else { sum / total as f64 };
    info!(records = total, timed_out, score, "batch finished");
    BatchSummary {
        status: if timed_out == 0 { "success" } else { "partial" }.to_string(),
        score,
        records: total,
        timed_out,
    }
}
