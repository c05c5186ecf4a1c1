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

//! The item data model: an immutable, calibrated test definition plus the
//! closed set of evaluator predicates the built-in backend dispatches over.

use serde::{Deserialize, Serialize};

/// The closed set of quality axes a target can be evaluated along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Functional,
    Robustness,
    Security,
    Fairness,
    Performance,
    Compliance,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Functional,
        Dimension::Robustness,
        Dimension::Security,
        Dimension::Fairness,
        Dimension::Performance,
        Dimension::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Functional => "functional",
            Dimension::Robustness => "robustness",
            Dimension::Security => "security",
            Dimension::Fairness => "fairness",
            Dimension::Performance => "performance",
            Dimension::Compliance => "compliance",
        }
    }
}

/// A tagged variant describing a single evaluator predicate declared by an
/// item. Matched exhaustively by the built-in backend; no runtime reflection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaluator {
    /// Case-insensitive substring match.
    Contains { value: String },
    /// Logical negation of `Contains`.
    NotContains { value: String },
    /// Regex match (dotall + case-insensitive) against text with surrounding
    /// triple-backtick code fences stripped.
    Regex { pattern: String },
    /// Negation of `Regex`.
    NotRegex { pattern: String },
    /// Passes if the target's reply text is non-empty.
    ScoreThreshold { threshold: f64 },
    /// Heuristic fallback: passes if reply length exceeds a small threshold.
    /// Reserved extension point for a future LLM-judging backend.
    LlmJudge { prompt: String },
}

/// One prior conversational turn supplied alongside an item's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

/// The payload handed to the target through the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInput {
    pub text: String,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub prior_turns: Vec<Turn>,
}

impl ItemInput {
    pub fn simple(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            system_prompt: None,
            prior_turns: Vec::new(),
        }
    }
}

/// An immutable, pre-calibrated (or preliminary) test item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub dimension: Dimension,
    pub category: Dimension,
    /// Discrimination, α > 0.
    pub alpha: f64,
    /// Difficulty, β ∈ ℝ.
    pub beta: f64,
    /// Guessing probability, γ ∈ [0, 1).
    pub gamma: f64,
    /// Whether α/β/γ are not yet calibrated from field data.
    pub is_preliminary: bool,
    pub input: ItemInput,
    pub expected_behavior: String,
    pub evaluators: Vec<Evaluator>,
    #[serde(default)]
    pub preferred_backends: Vec<String>,
}

impl Item {
    /// Construct a calibrated item; panics are never appropriate here per
    /// the engine's "never panic" policy, so out-of-range parameters are
    /// simply clamped to the nearest valid value.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        dimension: Dimension,
        alpha: f64,
        beta: f64,
        gamma: f64,
        is_preliminary: bool,
        input: ItemInput,
        evaluators: Vec<Evaluator>,
    ) -> Self {
        Self {
            id: id.into(),
            dimension,
            category: dimension,
            alpha: alpha.max(f64::EPSILON),
            beta,
            gamma: gamma.clamp(0.0, 1.0 - f64::EPSILON),
            is_preliminary,
            input,
            expected_behavior: String::new(),
            evaluators,
            preferred_backends: Vec::new(),
        }
    }
}
