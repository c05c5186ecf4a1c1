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

//! The adapter contract (§6a): the engine's only window onto the target
//! system under test. Implementations (HTTP clients, retry/backoff,
//! env-var expansion) are an external collaborator; this module defines
//! only the shape the engine depends on.

use crate::error::AdapterError;
use crate::item::ItemInput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    Json,
    Markdown,
}

/// What the target returned for one `send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterResponse {
    pub content: String,
    pub format: ResponseFormat,
    pub latency_ms: u64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Result of probing the target without sending a scored item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inspection {
    pub reachable: bool,
    pub response_format: Option<ResponseFormat>,
    pub detected_provider: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

/// Opaque configuration handed to `connect`. The engine never inspects its
/// fields; target connection details are entirely an adapter concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// The contract every target-connection implementation must satisfy. The
/// engine calls `send` once per administered item and never retries
/// internally — retries are concentrated in the adapter per §9.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn connect(&mut self, config: &TargetConfig) -> Result<(), AdapterError>;

    async fn send(&mut self, input: ItemInput) -> Result<AdapterResponse, AdapterError>;

    async fn inspect(&mut self) -> Inspection;

    async fn disconnect(&mut self);
}
