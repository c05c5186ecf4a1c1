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

//! Pure, deterministic stopping rule for a CAT session. Checks four criteria
//! in priority order and stops at the first match.

use serde::{Deserialize, Serialize};

/// Tunables for the convergence controller. All defaults match §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    pub se_threshold: f64,
    pub max_tests: usize,
    pub timeout_ms: u64,
    pub stable_window: usize,
    pub stable_delta: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            se_threshold: 0.3,
            max_tests: 100,
            timeout_ms: 30 * 60 * 1000,
            stable_window: 5,
            stable_delta: 0.1,
        }
    }
}

/// Minimal view over session state the controller needs. Kept separate from
/// `session::CatSession` so the controller can be proptested without pulling
/// in the full session machinery.
pub struct ConvergenceInput<'a> {
    pub se: f64,
    pub response_count: usize,
    pub wall_clock_elapsed_ms: u64,
    /// Theta snapshots in administration order, oldest first.
    pub theta_history: &'a [f64],
}

/// Outcome of a convergence check: whether to stop, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceDecision {
    pub converged: bool,
    pub reason: Option<String>,
}

impl ConvergenceDecision {
    fn not_converged() -> Self {
        Self {
            converged: false,
            reason: None,
        }
    }

    fn stop(reason: impl Into<String>) -> Self {
        Self {
            converged: true,
            reason: Some(reason.into()),
        }
    }
}

/// Check the four stopping criteria in priority order. Pure: no side
/// effects, deterministic given `input` and `config`.
pub fn is_converged(input: &ConvergenceInput<'_>, config: &ConvergenceConfig) -> ConvergenceDecision {
    if input.response_count == 0 {
        return ConvergenceDecision::not_converged();
    }

    if input.se < config.se_threshold {
        return ConvergenceDecision::stop(format!(
            "SE {:.4} below threshold {:.4}",
            input.se, config.se_threshold
        ));
    }

    if input.response_count >= config.max_tests {
        return ConvergenceDecision::stop(format!(
            "reached max_tests ({} >= {})",
            input.response_count, config.max_tests
        ));
    }

    if input.wall_clock_elapsed_ms >= config.timeout_ms {
        return ConvergenceDecision::stop(format!(
            "Timeout: elapsed {}ms >= budget {}ms",
            input.wall_clock_elapsed_ms, config.timeout_ms
        ));
    }

    if is_stable(input.theta_history, config.stable_window, config.stable_delta) {
        return ConvergenceDecision::stop(format!(
            "stable over last {} theta deltas (< {})",
            config.stable_window, config.stable_delta
        ));
    }

    ConvergenceDecision::not_converged()
}

fn is_stable(theta_history: &[f64], stable_window: usize, stable_delta: f64) -> bool {
    if stable_window == 0 || theta_history.len() < stable_window + 1 {
        return false;
    }

    let deltas: Vec<f64> = theta_history
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .collect();

    if deltas.len() < stable_window {
        return false;
    }

    deltas[deltas.len() - stable_window..]
        .iter()
        .all(|&d| d < stable_delta)
}
