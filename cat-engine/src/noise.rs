// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Noise isolation over test replications: warm-up and replicated execution
//! with a coefficient-of-variation flag and a robust (median) representative
//! result.

use crate::backend::{ExecutionBackend, TestResult};
use crate::item::{Item, ItemInput};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Replications per item when noise isolation is enabled.
    pub replications: usize,
    /// Warm-up requests sent before measurement begins.
    pub warmup_count: usize,
    pub cv_threshold: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            replications: 3,
            warmup_count: 3,
            cv_threshold: 0.15,
        }
    }
}

/// One execution's score/pass/duration triple, retained for observability
/// even when only the representative result feeds the estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replication {
    pub score: f64,
    pub passed: bool,
    pub duration_ms: u64,
}

/// Outcome of a (possibly replicated) execution: the chosen representative
/// result plus the noise statistics computed across all replications.
#[derive(Debug, Clone)]
pub struct NoiseIsolatedResult {
    pub result: TestResult,
    pub coefficient_of_variation: f64,
    pub noise_flag: bool,
    pub replications: Vec<Replication>,
}

/// Send a fixed reference input `warmup_count` times through the adapter via
/// the backend, discarding results, to prime caches/JITs/connection pools
/// before measurement begins. Warm-up failures are non-fatal: logged and
/// ignored.
pub async fn warm_up(
    backend: &dyn ExecutionBackend,
    reference_item: &Item,
    config: &NoiseConfig,
) {
    for attempt in 0..config.warmup_count {
        if let Err(err) = backend.execute(reference_item).await {
            tracing::warn!(attempt, error = %err, "warm-up execution failed, continuing");
        }
    }
}

/// Execute `item` against `backend`, replicating `n` times when
/// `config.replications > 1`. The representative is the result at the
/// upper-median index after sorting by score; `cv` and `flag` are computed
/// over the score field across all replications.
pub async fn execute_replicated(
    backend: &dyn ExecutionBackend,
    item: &Item,
    config: &NoiseConfig,
) -> Result<NoiseIsolatedResult, crate::error::EngineError> {
    let n = config.replications.max(1);

    if n <= 1 {
        let result = backend.execute(item).await?;
        return Ok(NoiseIsolatedResult {
            replications: vec![Replication {
                score: result.score,
                passed: result.passed,
                duration_ms: result.duration_ms,
            }],
            result,
            coefficient_of_variation: 0.0,
            noise_flag: false,
        });
    }

    let mut results = Vec::with_capacity(n);
    for _ in 0..n {
        results.push(backend.execute(item).await?);
    }

    let replications: Vec<Replication> = results
        .iter()
        .map(|r| Replication {
            score: r.score,
            passed: r.passed,
            duration_ms: r.duration_ms,
        })
        .collect();

    let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
    let (cv, _mean) = coefficient_of_variation(&scores);
    let noise_flag = cv > config.cv_threshold;

    let representative_index = median_index(&scores, n);
    let mut result = results.swap_remove(representative_index);
    result
        .metadata
        .insert("noise_flag".to_string(), serde_json::json!(noise_flag));
    result.metadata.insert(
        "coefficient_of_variation".to_string(),
        serde_json::json!(cv),
    );
    result.metadata.insert(
        "replications".to_string(),
        serde_json::to_value(&replications).unwrap_or(serde_json::Value::Null),
    );

    Ok(NoiseIsolatedResult {
        result,
        coefficient_of_variation: cv,
        noise_flag,
        replications,
    })
}

/// Population (not sample) mean and coefficient of variation of `scores`.
/// `cv = stdev / mean` when `mean > 0`, else 0.
fn coefficient_of_variation(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    let stdev = variance.sqrt();
    let cv = if mean > 0.0 { stdev / mean } else { 0.0 };
    (cv, mean)
}

/// Index (into the original, unsorted `scores`/`results` vectors) of the
/// upper-median result after sorting by score. For odd `n` this is the
/// exact middle; for even `n`, index `n/2` of the sorted order.
fn median_index(scores: &[f64], n: usize) -> usize {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order[n / 2]
}

/// Reference input used for warm-up: not administered as a scored item.
pub fn reference_warmup_item(from_input: &ItemInput) -> Item {
    Item::new(
        "__warmup__",
        crate::item::Dimension::Functional,
        1.0,
        0.0,
        0.0,
        true,
        from_input.clone(),
        vec![],
    )
}
