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

//! Error taxonomy for the adaptive evaluation engine.
//!
//! Grouped by cause, not by the layer that raised it, per the error handling
//! design: transport/timeout/protocol failures are recoverable at the item
//! level and never abort a run; only missing backends and bad configuration
//! are run-fatal.

use thiserror::Error;

/// Top-level error type returned by the engine's public entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Adapter could not reach the target (connection refused, DNS, transient 5xx/429).
    /// Recoverable: the caller should record a failed response and continue.
    #[error("transport error: {0}")]
    Transport(String),

    /// A single request exceeded its budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Malformed response from the target, or a non-429 4xx.
    /// Fatal for the item, not for the run.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No backend could service an item and no fallback exists.
    #[error("no backend available for item {item_id}")]
    BackendUnavailable { item_id: String },

    /// Missing or invalid inputs to the executor (empty backend list, null adapter).
    /// Surfaced before any work begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A numerical pathology the estimator could not route around even with
    /// its EAP/prior fallbacks. Should not happen in practice.
    #[error("internal numerical error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this error represents a run-fatal condition (no forward
    /// progress possible) as opposed to an item-level failure that the
    /// executor tolerates and continues past.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::BackendUnavailable { .. } | EngineError::Configuration(_)
        )
    }
}

/// Errors surfaced by the `Adapter` contract (§6). The engine maps these
/// onto item-level failures without caring about transport specifics.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to parse target response: {0}")]
    Parse(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl From<AdapterError> for EngineError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::Connection(msg) | AdapterError::Transport(msg) => {
                EngineError::Transport(msg)
            }
            AdapterError::Timeout { elapsed_ms } => {
                EngineError::Timeout(format!("elapsed {elapsed_ms}ms"))
            }
            AdapterError::Parse(msg) => EngineError::Protocol(msg),
            AdapterError::Auth(msg) => EngineError::Protocol(format!("auth: {msg}")),
        }
    }
}
