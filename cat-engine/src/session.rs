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

//! Per-dimension CAT session state. A session owns its mutable state and a
//! borrowed view of the (read-only) item pool; it is never shared across
//! threads and is mutated only through `record_response`.

use crate::convergence::{is_converged, ConvergenceConfig, ConvergenceDecision, ConvergenceInput};
use crate::estimator::{estimate, AbilityEstimate};
use crate::item::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One administered item's response, with the ability/SE snapshot taken
/// immediately after it was recorded, for traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub item_id: String,
    pub response: u8,
    pub timestamp_us: u64,
    pub theta_after: f64,
    pub se_after: f64,
}

/// Mutable per-dimension session state.
#[derive(Debug, Clone)]
pub struct CatSession {
    dimension: Dimension,
    theta: f64,
    se: f64,
    responses: Vec<Response>,
    administered: HashSet<String>,
    start_time_us: u64,
    converged_at_index: Option<usize>,
    /// Parallel `(alpha, beta, gamma)` tuples for administered items, kept
    /// in administration order so the estimator can be re-run in full.
    item_params: Vec<(f64, f64, f64)>,
    last_estimate: Option<AbilityEstimate>,
}

impl CatSession {
    pub fn new(dimension: Dimension, start_time_us: u64) -> Self {
        Self {
            dimension,
            theta: 0.0,
            se: f64::INFINITY,
            responses: Vec::new(),
            administered: HashSet::new(),
            start_time_us,
            converged_at_index: None,
            item_params: Vec::new(),
            last_estimate: None,
        }
    }

    /// The method/converged/iterations metadata from the most recent
    /// `record_response` call, if any.
    pub fn last_estimate(&self) -> Option<&AbilityEstimate> {
        self.last_estimate.as_ref()
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn se(&self) -> f64 {
        self.se
    }

    pub fn administered(&self) -> &HashSet<String> {
        &self.administered
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn converged_at_index(&self) -> Option<usize> {
        self.converged_at_index
    }

    /// Record a binary response to `item_id` with IRT parameters
    /// `(alpha, beta, gamma)`, re-estimating ability/SE from the full
    /// administered history. Invariant: `responses.len() == administered.size`
    /// after this call.
    pub fn record_response(
        &mut self,
        item_id: impl Into<String>,
        alpha: f64,
        beta: f64,
        gamma: f64,
        response: u8,
        timestamp_us: u64,
    ) -> &AbilityEstimate {
        let item_id = item_id.into();
        self.administered.insert(item_id.clone());
        self.item_params.push((alpha, beta, gamma));

        let responses: Vec<u8> = self
            .responses
            .iter()
            .map(|r| r.response)
            .chain(std::iter::once(response))
            .collect();

        let estimate = estimate(&self.item_params, &responses);
        self.theta = estimate.theta;
        self.se = estimate.se;

        self.responses.push(Response {
            item_id,
            response,
            timestamp_us,
            theta_after: self.theta,
            se_after: self.se,
        });

        // Reuse the last computed estimate without recomputing: stash it so
        // callers (executor) can read method/converged/iterations without a
        // second call.
        self.last_estimate.insert(estimate)
    }

    /// Evaluate the convergence controller against this session's current
    /// state and wall clock, marking `converged_at_index` the first time it
    /// fires. Once set, `converged_at_index` is never unset.
    pub fn check_convergence(
        &mut self,
        config: &ConvergenceConfig,
        now_us: u64,
    ) -> ConvergenceDecision {
        let theta_history: Vec<f64> = self.responses.iter().map(|r| r.theta_after).collect();
        let elapsed_ms = now_us.saturating_sub(self.start_time_us) / 1000;

        let input = ConvergenceInput {
            se: self.se,
            response_count: self.responses.len(),
            wall_clock_elapsed_ms: elapsed_ms,
            theta_history: &theta_history,
        };

        let decision = is_converged(&input, config);
        if decision.converged && self.converged_at_index.is_none() {
            self.converged_at_index = Some(self.responses.len());
        }
        decision
    }

    /// A read-only snapshot suitable for emitting as an event or for
    /// producing the per-dimension result.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            dimension: self.dimension,
            theta: self.theta,
            se: self.se,
            n_tests: self.responses.len(),
            converged_at_index: self.converged_at_index,
        }
    }
}

/// A point-in-time, read-only view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub dimension: Dimension,
    pub theta: f64,
    pub se: f64,
    pub n_tests: usize,
    pub converged_at_index: Option<usize>,
}
