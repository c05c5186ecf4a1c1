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

//! The pluggable execution backend contract plus the built-in variant.

pub mod builtin;

use crate::adapter::Adapter;
use crate::error::EngineError;
use crate::item::{Dimension, Item};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use builtin::BuiltinBackend;

/// Capability flags a backend declares about itself. The executor uses
/// these only for filtering; the engine never negotiates capabilities with
/// the target itself.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BackendCapabilities {
    pub supports_replications: bool,
    pub supports_streaming: bool,
    pub supports_multimodal: bool,
    pub supports_multi_turn: bool,
}

/// Outcome of a backend health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub available: bool,
    pub version: Option<String>,
    pub error_message: Option<String>,
}

/// Result of running one item against a target through a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub item_id: String,
    pub backend_id: String,
    pub passed: bool,
    /// Fraction of evaluators that passed, in `[0, 1]`.
    pub score: f64,
    pub metrics: HashMap<String, f64>,
    pub raw_output: String,
    pub duration_ms: u64,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TestResult {
    /// A synthetic failed result used when a backend call raises
    /// (transport/timeout/protocol error) — the item is recorded as a
    /// response-0 and the dimension loop proceeds.
    pub fn failed(item_id: impl Into<String>, backend_id: impl Into<String>, error: &EngineError) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), serde_json::json!(true));
        metadata.insert(
            "error_message".to_string(),
            serde_json::json!(error.to_string()),
        );
        Self {
            item_id: item_id.into(),
            backend_id: backend_id.into(),
            passed: false,
            score: 0.0,
            metrics: HashMap::new(),
            raw_output: String::new(),
            duration_ms: 0,
            metadata,
        }
    }
}

/// An abstract execution backend: given a test item and a handle to the
/// target (via the adapter), produce a `TestResult`.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn supported_categories(&self) -> &[Dimension];
    fn capabilities(&self) -> BackendCapabilities;

    async fn healthcheck(&self) -> HealthStatus;

    async fn execute(&self, item: &Item) -> Result<TestResult, EngineError>;
}

/// Pick a backend for `item` from `available_backends`, per §4.7:
/// 1. the item's first listed preferred backend that is available;
/// 2. the built-in backend id, if available;
/// 3. any available backend;
/// 4. `None` if no backend is available at all.
pub fn select_backend<'a>(
    item: &Item,
    available_backends: &'a [&'a dyn ExecutionBackend],
) -> Option<&'a dyn ExecutionBackend> {
    for preferred_id in &item.preferred_backends {
        if let Some(backend) = available_backends.iter().find(|b| b.id() == preferred_id) {
            return Some(*backend);
        }
    }

    if let Some(backend) = available_backends
        .iter()
        .find(|b| b.id() == builtin::BUILTIN_BACKEND_ID)
    {
        return Some(*backend);
    }

    available_backends.first().copied()
}

/// Marker trait bound used by callers that need both an adapter and a set
/// of backends (kept separate so backends don't have to know about adapters
/// except through the `execute` call signature's implicit use of one).
pub type BoxedAdapter = Box<dyn Adapter>;
