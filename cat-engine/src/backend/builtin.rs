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

//! The built-in execution backend: calls the target through an `Adapter`
//! and evaluates the reply against an item's declared evaluator predicates.
//!
//! Evaluators are a closed sum type (`crate::item::Evaluator`); dispatch is
//! a single exhaustive `match`, not runtime reflection.

use super::{BackendCapabilities, ExecutionBackend, HealthStatus, TestResult};
use crate::adapter::Adapter;
use crate::error::EngineError;
use crate::item::{Dimension, Evaluator, Item};
use async_trait::async_trait;
use regex::RegexBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub const BUILTIN_BACKEND_ID: &str = "built-in";

/// Minimum reply length (characters) the `llm-judge` heuristic treats as a
/// pass. This is a documented placeholder: the real contract is a future
/// backend-driven judge, not a change to `ExecutionBackend` itself.
const LLM_JUDGE_MIN_LENGTH: usize = 40;

/// Calls the target via an `Adapter` and applies each evaluator in order.
pub struct BuiltinBackend {
    adapter: Option<Arc<Mutex<Box<dyn Adapter>>>>,
}

impl BuiltinBackend {
    /// A backend with no adapter attached — useful for tests that only
    /// exercise evaluator dispatch against canned text via `evaluate_text`.
    pub fn new() -> Self {
        Self { adapter: None }
    }

    pub fn with_adapter(adapter: Arc<Mutex<Box<dyn Adapter>>>) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }

    /// Apply every evaluator in `item.evaluators` to `text`, returning the
    /// per-evaluator verdicts in declaration order.
    pub fn evaluate_text(item: &Item, text: &str) -> Vec<bool> {
        item.evaluators
            .iter()
            .map(|evaluator| apply_evaluator(evaluator, text))
            .collect()
    }
}

impl Default for BuiltinBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip surrounding triple-backtick code fences before regex matching, per
/// §4.6.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_lang = rest.trim_start_matches(|c: char| c.is_alphanumeric());
        let without_lang = without_lang.strip_prefix('\n').unwrap_or(without_lang);
        if let Some(inner) = without_lang.strip_suffix("```") {
            return inner.trim().to_string();
        }
        return without_lang.trim().to_string();
    }
    trimmed.to_string()
}

fn apply_evaluator(evaluator: &Evaluator, text: &str) -> bool {
    match evaluator {
        Evaluator::Contains { value } => text.to_lowercase().contains(&value.to_lowercase()),
        Evaluator::NotContains { value } => !text.to_lowercase().contains(&value.to_lowercase()),
        Evaluator::Regex { pattern } => {
            let stripped = strip_code_fences(text);
            RegexBuilder::new(pattern)
                .dot_matches_new_line(true)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(&stripped))
                .unwrap_or(false)
        }
        Evaluator::NotRegex { pattern } => {
            let stripped = strip_code_fences(text);
            RegexBuilder::new(pattern)
                .dot_matches_new_line(true)
                .case_insensitive(true)
                .build()
                .map(|re| !re.is_match(&stripped))
                .unwrap_or(true)
        }
        Evaluator::ScoreThreshold { .. } => !text.trim().is_empty(),
        Evaluator::LlmJudge { .. } => text.trim().len() > LLM_JUDGE_MIN_LENGTH,
    }
}

#[async_trait]
impl ExecutionBackend for BuiltinBackend {
    fn id(&self) -> &str {
        BUILTIN_BACKEND_ID
    }

    fn name(&self) -> &str {
        "Built-in evaluator backend"
    }

    fn supported_categories(&self) -> &[Dimension] {
        &Dimension::ALL
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_replications: true,
            supports_streaming: false,
            supports_multimodal: false,
            supports_multi_turn: true,
        }
    }

    async fn healthcheck(&self) -> HealthStatus {
        match &self.adapter {
            Some(adapter) => {
                let inspection = adapter.lock().await.inspect().await;
                HealthStatus {
                    available: inspection.reachable,
                    version: None,
                    error_message: None,
                }
            }
            None => HealthStatus {
                available: true,
                version: None,
                error_message: None,
            },
        }
    }

    async fn execute(&self, item: &Item) -> Result<TestResult, EngineError> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| EngineError::Configuration("built-in backend has no adapter".into()))?;

        let start = Instant::now();
        let response = adapter.lock().await.send(item.input.clone()).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if item.evaluators.is_empty() {
            return Ok(TestResult {
                item_id: item.id.clone(),
                backend_id: BUILTIN_BACKEND_ID.to_string(),
                passed: false,
                score: 0.0,
                metrics: HashMap::new(),
                raw_output: response.content,
                duration_ms,
                metadata: HashMap::new(),
            });
        }

        let verdicts = Self::evaluate_text(item, &response.content);
        let passed_count = verdicts.iter().filter(|&&v| v).count();
        let score = passed_count as f64 / verdicts.len() as f64;
        let passed = verdicts.iter().all(|&v| v);

        let mut metrics = HashMap::new();
        metrics.insert("evaluators_passed".to_string(), passed_count as f64);
        metrics.insert("evaluators_total".to_string(), verdicts.len() as f64);
        metrics.insert("latency_ms".to_string(), response.latency_ms as f64);

        Ok(TestResult {
            item_id: item.id.clone(),
            backend_id: BUILTIN_BACKEND_ID.to_string(),
            passed,
            score,
            metrics,
            raw_output: response.content,
            duration_ms,
            metadata: HashMap::new(),
        })
    }
}
