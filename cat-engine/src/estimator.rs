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

//! Ability estimation: Newton-Raphson MLE with step-halving, falling back to
//! a 41-point EAP quadrature under a standard-normal prior. Never panics;
//! numerical pathologies fall back to the prior (θ=0, se=1).

use crate::irt::{clamp_probability, fisher_information, icc, total_information};
use serde::{Deserialize, Serialize};

pub const THETA_MIN: f64 = -4.0;
pub const THETA_MAX: f64 = 4.0;

const MLE_TOLERANCE: f64 = 1e-3;
const MLE_MAX_ITERATIONS: u32 = 100;
const MLE_LL_TOLERANCE: f64 = -1e-10;
const MLE_MAX_HALVINGS: u32 = 9;
const EAP_GRID_POINTS: usize = 41;

/// Which branch actually produced an ability estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Mle,
    Eap,
}

/// Result of estimating ability from a set of administered items and
/// binary responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityEstimate {
    pub theta: f64,
    pub se: f64,
    pub method: EstimationMethod,
    pub converged: bool,
    /// Outer Newton-Raphson iterations actually taken (0 for EAP). Metadata
    /// only; never consulted by the convergence controller.
    pub iterations: u32,
}

fn clamp_theta(theta: f64) -> f64 {
    theta.clamp(THETA_MIN, THETA_MAX)
}

/// Estimate ability from parallel `items` (alpha, beta, gamma) and
/// `responses` (0/1), following the selection rule in §4.2:
/// 1. fewer than 3 responses -> EAP
/// 2. all responses identical -> EAP
/// 3. otherwise try MLE, falling back to EAP if it does not converge.
pub fn estimate(items: &[(f64, f64, f64)], responses: &[u8]) -> AbilityEstimate {
    debug_assert_eq!(items.len(), responses.len());

    if responses.len() < 3 || all_same(responses) {
        return eap_estimate(items, responses);
    }

    if let Some(mle) = mle_estimate(items, responses) {
        if mle.converged {
            return mle;
        }
    }
    eap_estimate(items, responses)
}

fn all_same(responses: &[u8]) -> bool {
    match responses.first() {
        None => true,
        Some(&first) => responses.iter().all(|&r| r == first),
    }
}

/// Newton-Raphson MLE with step-halving damping. Returns `None` only if the
/// response/item vectors are empty (callers should not reach this branch in
/// practice because of the selection rule, but it must not panic).
fn mle_estimate(items: &[(f64, f64, f64)], responses: &[u8]) -> Option<AbilityEstimate> {
    if items.is_empty() {
        return None;
    }

    let mut theta = 0.0f64;
    let mut converged = false;
    let mut iterations = 0u32;

    for _ in 0..MLE_MAX_ITERATIONS {
        iterations += 1;

        let mut gradient = 0.0f64;
        let mut observed_information = 0.0f64;
        for (&(alpha, beta, gamma), &r) in items.iter().zip(responses.iter()) {
            let p = icc(theta, alpha, beta, gamma);
            let p_clamped = clamp_probability(p);
            let p_star = (p_clamped - gamma) / (1.0 - gamma).max(f64::EPSILON);
            gradient += alpha * (p_star / p_clamped) * (r as f64 - p_clamped);
            observed_information -= fisher_information(theta, alpha, beta, gamma);
        }

        if observed_information.abs() < 1e-10 {
            // No usable curvature at this theta; cannot take a Newton step.
            continue;
        }

        let delta = -gradient / observed_information;
        let current_ll = log_likelihood_at(theta, items, responses);

        let mut accepted_step = None;
        let mut fraction = 1.0f64;
        for _ in 0..=MLE_MAX_HALVINGS {
            let candidate_theta = clamp_theta(theta + fraction * delta);
            let candidate_ll = log_likelihood_at(candidate_theta, items, responses);
            if candidate_ll - current_ll >= MLE_LL_TOLERANCE {
                accepted_step = Some(candidate_theta);
                break;
            }
            fraction /= 2.0;
        }

        // If no halved step improved the log-likelihood, take the last
        // (smallest) halved step anyway to make progress, per spec.
        let new_theta = accepted_step.unwrap_or_else(|| clamp_theta(theta + fraction * delta));
        let step_magnitude = (new_theta - theta).abs();
        theta = new_theta;

        if step_magnitude < MLE_TOLERANCE {
            converged = true;
            break;
        }
    }

    let total_info = total_information(theta, items.iter().copied());
    let se = crate::irt::standard_error(total_info);

    Some(AbilityEstimate {
        theta,
        se,
        method: EstimationMethod::Mle,
        converged,
        iterations,
    })
}

fn log_likelihood_at(theta: f64, items: &[(f64, f64, f64)], responses: &[u8]) -> f64 {
    crate::irt::log_likelihood(theta, items, responses)
}

/// 41-point EAP quadrature over [-4, 4] under a standard-normal prior.
/// Always reports `converged = true`.
fn eap_estimate(items: &[(f64, f64, f64)], responses: &[u8]) -> AbilityEstimate {
    if items.is_empty() {
        return AbilityEstimate {
            theta: 0.0,
            se: 1.0,
            method: EstimationMethod::Eap,
            converged: true,
            iterations: 0,
        };
    }

    let grid_step = (THETA_MAX - THETA_MIN) / (EAP_GRID_POINTS as f64 - 1.0);
    let mut weighted_theta_sum = 0.0f64;
    let mut weight_sum = 0.0f64;
    let mut grid_weights = Vec::with_capacity(EAP_GRID_POINTS);
    let mut grid_thetas = Vec::with_capacity(EAP_GRID_POINTS);

    for i in 0..EAP_GRID_POINTS {
        let grid_theta = THETA_MIN + i as f64 * grid_step;
        let likelihood = items
            .iter()
            .zip(responses.iter())
            .map(|(&(alpha, beta, gamma), &r)| {
                let p = clamp_probability(icc(grid_theta, alpha, beta, gamma));
                if r == 1 {
                    p
                } else {
                    1.0 - p
                }
            })
            .product::<f64>();
        let prior = standard_normal_density(grid_theta);
        let weight = likelihood * prior * grid_step;

        weighted_theta_sum += grid_theta * weight;
        weight_sum += weight;
        grid_weights.push(weight);
        grid_thetas.push(grid_theta);
    }

    if weight_sum <= 0.0 {
        // Degenerate likelihood surface (e.g. all probabilities pinned to a
        // boundary): fall back to the prior itself.
        return AbilityEstimate {
            theta: 0.0,
            se: 1.0,
            method: EstimationMethod::Eap,
            converged: true,
            iterations: 0,
        };
    }

    let posterior_mean = weighted_theta_sum / weight_sum;
    let posterior_variance = grid_thetas
        .iter()
        .zip(grid_weights.iter())
        .map(|(&t, &w)| w * (t - posterior_mean).powi(2))
        .sum::<f64>()
        / weight_sum;

    AbilityEstimate {
        theta: clamp_theta(posterior_mean),
        se: posterior_variance.max(0.0).sqrt(),
        method: EstimationMethod::Eap,
        converged: true,
        iterations: 0,
    }
}

fn standard_normal_density(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.3989422804014327;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}
