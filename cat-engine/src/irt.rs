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

//! Pure three-parameter logistic (3PL) IRT math kernels: item characteristic
//! curve, Fisher information, total information, standard error, the
//! normalized 0-100 score mapping, and clamped log-likelihood. No state, no
//! I/O — safe to call from any thread and to benchmark in isolation.

/// Exponent clamp so `exp()` never overflows/underflows for pathological
/// α·(θ−β) products.
const EXP_CLAMP: f64 = 500.0;

/// Clamp applied before any `ln()` call so log-likelihoods never see 0 or 1.
const PROB_EPSILON: f64 = 1e-10;

/// Conventional IRT constant aligning the logistic scale with the normal-ogive
/// scale used by `normalized_score`. Do not change.
const NORMAL_OGIVE_CONSTANT: f64 = 1.7;

fn logistic(x: f64) -> f64 {
    let clamped = x.clamp(-EXP_CLAMP, EXP_CLAMP);
    1.0 / (1.0 + (-clamped).exp())
}

/// Item characteristic curve: `P(θ) = γ + (1-γ)·σ(α·(θ-β))`.
///
/// Guaranteed to return a value in `[γ, 1]` for all finite `theta`, `alpha`,
/// `beta`, `gamma`.
pub fn icc(theta: f64, alpha: f64, beta: f64, gamma: f64) -> f64 {
    let p = gamma + (1.0 - gamma) * logistic(alpha * (theta - beta));
    p.clamp(gamma, 1.0)
}

/// Expected Fisher information for the 3PL model at `theta`.
///
/// `I(θ) = α²·(P*²/P)·(1-P)` where `P* = (P-γ)/(1-γ)`. Defined to be 0 when
/// `P` is at or beyond its numerical boundary (`P <= γ` or `P >= 1`), since a
/// guessing floor or a ceiling carries no information about θ.
pub fn fisher_information(theta: f64, alpha: f64, beta: f64, gamma: f64) -> f64 {
    let p = icc(theta, alpha, beta, gamma);
    if p <= gamma || p >= 1.0 {
        return 0.0;
    }
    let p_star = (p - gamma) / (1.0 - gamma);
    alpha.powi(2) * (p_star.powi(2) / p) * (1.0 - p)
}

/// Sum of per-item Fisher information over a set of `(alpha, beta, gamma)`
/// triples at a fixed `theta`. Monotone non-decreasing as items are added.
pub fn total_information(theta: f64, items: impl IntoIterator<Item = (f64, f64, f64)>) -> f64 {
    items
        .into_iter()
        .map(|(alpha, beta, gamma)| fisher_information(theta, alpha, beta, gamma))
        .sum()
}

/// Standard error of the ability estimate given total information.
/// `+∞` when total information is 0 (no administered items carry signal).
pub fn standard_error(total_information: f64) -> f64 {
    if total_information <= 0.0 {
        f64::INFINITY
    } else {
        1.0 / total_information.sqrt()
    }
}

/// Monotone mapping of ability onto a 0-100 display scale:
/// `N(θ) = 100 / (1 + exp(-1.7·θ))`. `N(0) = 50`; saturates at 0 and 100.
pub fn normalized_score(theta: f64) -> f64 {
    let clamped_exponent = (-NORMAL_OGIVE_CONSTANT * theta).clamp(-EXP_CLAMP, EXP_CLAMP);
    (100.0 / (1.0 + clamped_exponent.exp())).clamp(0.0, 100.0)
}

/// Clamp a probability into `[1e-10, 1-1e-10]` before taking a logarithm.
pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON)
}

/// Log-likelihood of a single binary response `r ∈ {0,1}` under probability
/// `p`, with `p` clamped away from the boundary first.
pub fn log_likelihood_term(response: u8, p: f64) -> f64 {
    let p = clamp_probability(p);
    if response == 1 {
        p.ln()
    } else {
        (1.0 - p).ln()
    }
}

/// Total log-likelihood of a response vector given matching `(alpha, beta,
/// gamma)` item parameters, at a fixed `theta`.
pub fn log_likelihood(
    theta: f64,
    items: &[(f64, f64, f64)],
    responses: &[u8],
) -> f64 {
    items
        .iter()
        .zip(responses.iter())
        .map(|(&(alpha, beta, gamma), &r)| log_likelihood_term(r, icc(theta, alpha, beta, gamma)))
        .sum()
}
