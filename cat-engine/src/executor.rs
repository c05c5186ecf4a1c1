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

//! The adaptive executor: mediates between the selector, the noise
//! isolator, the backend(s), the estimator, and the convergence controller
//! to run a plan's items to convergence, one dimension at a time.

use crate::backend::{select_backend, BuiltinBackend, ExecutionBackend, TestResult};
use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};
use crate::irt::normalized_score;
use crate::item::{Dimension, Item};
use crate::noise::{execute_replicated, warm_up};
use crate::session::CatSession;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Items plus the dimensions they belong to, handed to the executor as a
/// unit of work.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub items: Vec<Item>,
}

impl ExecutionPlan {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Dimensions present in the plan, in first-seen order.
    fn ordered_dimensions(&self) -> Vec<Dimension> {
        let mut seen = Vec::new();
        for item in &self.items {
            if !seen.contains(&item.dimension) {
                seen.push(item.dimension);
            }
        }
        seen
    }

    fn items_for(&self, dimension: Dimension) -> Vec<Item> {
        self.items
            .iter()
            .filter(|i| i.dimension == dimension)
            .cloned()
            .collect()
    }
}

/// Per-dimension summary produced when a CAT session stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: Dimension,
    pub theta: f64,
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub n_tests: usize,
    pub normalized_score: f64,
    pub converged_at_index: Option<usize>,
}

impl DimensionResult {
    fn from_session(session: &CatSession) -> Self {
        let theta = session.theta();
        let se = session.se();
        let (ci_lower, ci_upper) = if se.is_finite() {
            (theta - 1.96 * se, theta + 1.96 * se)
        } else {
            (f64::NEG_INFINITY, f64::INFINITY)
        };
        Self {
            dimension: session.dimension(),
            theta,
            se,
            ci_lower,
            ci_upper,
            n_tests: session.responses().len(),
            normalized_score: normalized_score(theta),
            converged_at_index: session.converged_at_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub strategy: String,
    pub backends_used: Vec<String>,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResults {
    pub evaluation_id: String,
    pub test_results: Vec<TestResult>,
    pub irt_estimates: Vec<DimensionResult>,
    pub execution_metadata: ExecutionMetadata,
}

/// Cooperative cancellation: checked at the top of each dimension-loop
/// iteration. There is no inter-item cancellation primitive per §5.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn new_evaluation_id() -> String {
    format!("eval-{:016x}", rand::random::<u64>())
}

/// Orchestrates the per-dimension CAT loop (adaptive mode) or a single pass
/// over every item followed by a one-shot per-dimension fit (exhaustive
/// mode).
pub struct AdaptiveExecutor {
    backends: Vec<Box<dyn ExecutionBackend>>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl AdaptiveExecutor {
    pub fn new(backends: Vec<Box<dyn ExecutionBackend>>, config: EngineConfig) -> Self {
        Self {
            backends,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Health-check every configured backend, keeping those reporting
    /// available. Fatal (Configuration error) if none are available or if
    /// no backends were configured at all.
    async fn available_backends(&self) -> Result<Vec<&dyn ExecutionBackend>, crate::error::EngineError> {
        if self.backends.is_empty() {
            return Err(crate::error::EngineError::Configuration(
                "no backends configured".into(),
            ));
        }

        let mut available = Vec::new();
        for backend in &self.backends {
            let status = backend.healthcheck().await;
            if status.available {
                available.push(backend.as_ref());
            } else {
                tracing::warn!(backend_id = backend.id(), "backend reported unavailable");
            }
        }

        if available.is_empty() {
            return Err(crate::error::EngineError::Configuration(
                "no backends are available".into(),
            ));
        }

        Ok(available)
    }

    /// Run the plan adaptively: one CAT session per dimension, stopping as
    /// soon as the convergence controller fires or the selector is
    /// exhausted.
    pub async fn run_adaptive(
        &self,
        plan: &ExecutionPlan,
        bus: &mut EventBus,
    ) -> Result<ExecutionResults, crate::error::EngineError> {
        bus.emit(EngineEvent::ExecutorStarted {
            item_count: plan.items.len(),
        });

        let available = self.available_backends().await?;

        if let Some(first_item) = plan.items.first() {
            let warmup_item = crate::noise::reference_warmup_item(&first_item.input);
            let warmup_backend = select_backend(&warmup_item, &available)
                .unwrap_or(available[0]);
            for current in 0..self.config.noise.warmup_count {
                bus.emit(EngineEvent::WarmupProgress {
                    current,
                    total: self.config.noise.warmup_count,
                });
            }
            warm_up(warmup_backend, &warmup_item, &self.config.noise).await;
        }

        let mut test_results = Vec::new();
        let mut irt_estimates = Vec::new();
        let mut backends_used = std::collections::HashSet::new();

        for dimension in plan.ordered_dimensions() {
            if self.cancel.is_cancelled() {
                break;
            }

            let dimension_items = plan.items_for(dimension);
            let mut session = CatSession::new(dimension, now_us());

            loop {
                if self.cancel.is_cancelled() {
                    break;
                }

                let decision = session.check_convergence(&self.config.convergence, now_us());
                if decision.converged {
                    bus.emit(EngineEvent::DimensionConverged {
                        dimension,
                        theta: session.theta(),
                        se: session.se(),
                        reason: decision.reason.unwrap_or_default(),
                    });
                    break;
                }

                let next_item = match crate::selector::select_next(
                    session.theta(),
                    &dimension_items,
                    session.administered(),
                    dimension,
                ) {
                    Some(item) => item.clone(),
                    None => break,
                };

                bus.emit(EngineEvent::TestStarted {
                    item_id: next_item.id.clone(),
                    dimension,
                });

                let picked_backend = select_backend(&next_item, &available);

                let (response, mut result) = match picked_backend {
                    None => {
                        let err = crate::error::EngineError::BackendUnavailable {
                            item_id: next_item.id.clone(),
                        };
                        (0u8, TestResult::failed(&next_item.id, "none", &err))
                    }
                    Some(backend) => {
                        backends_used.insert(backend.id().to_string());
                        match execute_replicated(backend, &next_item, &self.config.noise).await {
                            Ok(noise_result) => {
                                let response = if noise_result.result.passed { 1 } else { 0 };
                                (response, noise_result.result)
                            }
                            Err(err) => {
                                tracing::warn!(
                                    item_id = %next_item.id,
                                    error = %err,
                                    "backend execution failed, recording as failed response"
                                );
                                (0u8, TestResult::failed(&next_item.id, backend.id(), &err))
                            }
                        }
                    }
                };

                let (theta_after, se_after) = {
                    let estimate = session.record_response(
                        next_item.id.clone(),
                        next_item.alpha,
                        next_item.beta,
                        next_item.gamma,
                        response,
                        now_us(),
                    );
                    (estimate.theta, estimate.se)
                };

                bus.emit(EngineEvent::TestCompleted {
                    item_id: next_item.id.clone(),
                    passed: response == 1,
                    theta: theta_after,
                    se: se_after,
                    dimension,
                });
                bus.emit(EngineEvent::IrtUpdated {
                    dimension,
                    theta: session.theta(),
                    se: session.se(),
                    n_tests: session.responses().len(),
                });

                result
                    .metadata
                    .insert("dimension".to_string(), serde_json::json!(dimension));
                test_results.push(result);
            }

            irt_estimates.push(DimensionResult::from_session(&session));
        }

        let results = ExecutionResults {
            evaluation_id: new_evaluation_id(),
            test_results,
            irt_estimates,
            execution_metadata: ExecutionMetadata {
                strategy: "adaptive".to_string(),
                backends_used: backends_used.into_iter().collect(),
            },
        };

        bus.emit(EngineEvent::ExecutorCompleted {
            results: results.clone(),
        });

        Ok(results)
    }

    /// Run every item in the plan exactly once, then fit one CAT session
    /// per dimension by replaying its responses in administration order.
    /// No convergence checks gate execution.
    pub async fn run_exhaustive(
        &self,
        plan: &ExecutionPlan,
        bus: &mut EventBus,
    ) -> Result<ExecutionResults, crate::error::EngineError> {
        bus.emit(EngineEvent::ExecutorStarted {
            item_count: plan.items.len(),
        });

        let available = self.available_backends().await?;

        let mut test_results = Vec::new();
        let mut responses_by_dimension: HashMap<Dimension, Vec<(Item, u8)>> = HashMap::new();
        let mut backends_used = std::collections::HashSet::new();

        for item in &plan.items {
            if self.cancel.is_cancelled() {
                break;
            }

            bus.emit(EngineEvent::TestStarted {
                item_id: item.id.clone(),
                dimension: item.dimension,
            });

            let picked_backend = select_backend(item, &available);
            let (response, result) = match picked_backend {
                None => {
                    let err = crate::error::EngineError::BackendUnavailable {
                        item_id: item.id.clone(),
                    };
                    (0u8, TestResult::failed(&item.id, "none", &err))
                }
                Some(backend) => {
                    backends_used.insert(backend.id().to_string());
                    match execute_replicated(backend, item, &self.config.noise).await {
                        Ok(noise_result) => {
                            let response = if noise_result.result.passed { 1 } else { 0 };
                            (response, noise_result.result)
                        }
                        Err(err) => {
                            tracing::warn!(
                                item_id = %item.id,
                                error = %err,
                                "backend execution failed, recording as failed response"
                            );
                            (0u8, TestResult::failed(&item.id, backend.id(), &err))
                        }
                    }
                }
            };

            bus.emit(EngineEvent::TestCompleted {
                item_id: item.id.clone(),
                passed: response == 1,
                theta: 0.0,
                se: 0.0,
                dimension: item.dimension,
            });

            responses_by_dimension
                .entry(item.dimension)
                .or_default()
                .push((item.clone(), response));
            test_results.push(result);
        }

        let mut irt_estimates = Vec::new();
        for dimension in plan.ordered_dimensions() {
            let mut session = CatSession::new(dimension, now_us());
            if let Some(administered) = responses_by_dimension.get(&dimension) {
                for (item, response) in administered {
                    session.record_response(
                        item.id.clone(),
                        item.alpha,
                        item.beta,
                        item.gamma,
                        *response,
                        now_us(),
                    );
                }
            }
            irt_estimates.push(DimensionResult::from_session(&session));
        }

        let results = ExecutionResults {
            evaluation_id: new_evaluation_id(),
            test_results,
            irt_estimates,
            execution_metadata: ExecutionMetadata {
                strategy: "exhaustive".to_string(),
                backends_used: backends_used.into_iter().collect(),
            },
        };

        bus.emit(EngineEvent::ExecutorCompleted {
            results: results.clone(),
        });

        Ok(results)
    }
}

/// Convenience constructor for an executor backed only by the built-in
/// backend wired to `adapter`.
pub fn single_backend_executor(
    adapter: std::sync::Arc<tokio::sync::Mutex<Box<dyn crate::adapter::Adapter>>>,
    config: EngineConfig,
) -> AdaptiveExecutor {
    let backend: Box<dyn ExecutionBackend> = Box::new(BuiltinBackend::with_adapter(adapter));
    AdaptiveExecutor::new(vec![backend], config)
}
