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

//! Shared test fixtures: adapters and backends that stand in for a real
//! target connection or a real pluggable backend. None of these ship in the
//! library itself.

use async_trait::async_trait;
use cat_engine::irt::icc;
use cat_engine::{
    Adapter, AdapterError, AdapterResponse, BackendCapabilities, Dimension, EngineError,
    ExecutionBackend, HealthStatus, Inspection, ItemInput, ResponseFormat, TargetConfig, Item,
    TestResult,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Echoes the prompt text straight back as the reply. Evaluators that key
/// off literal substrings (`Contains { value: "PASS" }`) turn this into a
/// fully deterministic, scriptable "system under test".
#[derive(Default)]
pub struct EchoAdapter;

#[async_trait]
impl Adapter for EchoAdapter {
    async fn connect(&mut self, _config: &TargetConfig) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn send(&mut self, input: ItemInput) -> Result<AdapterResponse, AdapterError> {
        Ok(AdapterResponse {
            content: input.text,
            format: ResponseFormat::Text,
            latency_ms: 1,
            metadata: HashMap::new(),
        })
    }

    async fn inspect(&mut self) -> Inspection {
        Inspection {
            reachable: true,
            ..Default::default()
        }
    }

    async fn disconnect(&mut self) {}
}

/// Returns a scripted sequence of replies, one per call, holding the last
/// entry once the script is exhausted. Used to force coefficient-of-variation
/// across replications of the same item.
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl ScriptedAdapter {
    pub fn new(script: Vec<&str>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(|s| s.to_string()).collect()),
            last: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    async fn connect(&mut self, _config: &TargetConfig) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn send(&mut self, _input: ItemInput) -> Result<AdapterResponse, AdapterError> {
        let mut script = self.script.lock().unwrap();
        let content = match script.pop_front() {
            Some(next) => {
                *self.last.lock().unwrap() = next.clone();
                next
            }
            None => self.last.lock().unwrap().clone(),
        };
        Ok(AdapterResponse {
            content,
            format: ResponseFormat::Text,
            latency_ms: 1,
            metadata: HashMap::new(),
        })
    }

    async fn inspect(&mut self) -> Inspection {
        Inspection {
            reachable: true,
            ..Default::default()
        }
    }

    async fn disconnect(&mut self) {}
}

/// Encodes `(alpha, beta, gamma)` into an item's prompt text so a
/// [`SimulatedAdapter`] can recover them without the adapter knowing
/// anything about IRT.
pub fn probe_prompt(alpha: f64, beta: f64, gamma: f64) -> String {
    format!("probe:{alpha}:{beta}:{gamma}")
}

fn parse_probe(text: &str) -> Option<(f64, f64, f64)> {
    let rest = text.strip_prefix("probe:")?;
    let mut parts = rest.split(':');
    let alpha: f64 = parts.next()?.parse().ok()?;
    let beta: f64 = parts.next()?.parse().ok()?;
    let gamma: f64 = parts.next()?.parse().ok()?;
    Some((alpha, beta, gamma))
}

/// Simulates a target system with a fixed true ability `theta_true`: for a
/// [`probe_prompt`]-encoded item it draws one Bernoulli trial at the item's
/// characteristic-curve probability and answers `"PASS"` or `"FAIL"`.
pub struct SimulatedAdapter {
    theta_true: f64,
    rng_state: Mutex<u64>,
}

impl SimulatedAdapter {
    pub fn new(theta_true: f64, seed: u64) -> Self {
        Self {
            theta_true,
            rng_state: Mutex::new(seed.max(1)),
        }
    }

    /// A tiny, dependency-free xorshift draw in `[0, 1)`. Deterministic given
    /// the adapter's seed, which is all a simulation test needs.
    fn next_uniform(&self) -> f64 {
        let mut state = self.rng_state.lock().unwrap();
        let mut x = *state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        *state = x;
        (x % 1_000_000) as f64 / 1_000_000.0
    }
}

#[async_trait]
impl Adapter for SimulatedAdapter {
    async fn connect(&mut self, _config: &TargetConfig) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn send(&mut self, input: ItemInput) -> Result<AdapterResponse, AdapterError> {
        let content = match parse_probe(&input.text) {
            Some((alpha, beta, gamma)) => {
                let p = icc(self.theta_true, alpha, beta, gamma);
                if self.next_uniform() < p {
                    "PASS".to_string()
                } else {
                    "FAIL".to_string()
                }
            }
            None => "FAIL".to_string(),
        };
        Ok(AdapterResponse {
            content,
            format: ResponseFormat::Text,
            latency_ms: 1,
            metadata: HashMap::new(),
        })
    }

    async fn inspect(&mut self) -> Inspection {
        Inspection {
            reachable: true,
            ..Default::default()
        }
    }

    async fn disconnect(&mut self) {}
}

/// A backend that always reports itself unavailable, used to exercise the
/// executor's fallback-to-built-in path.
pub struct UnavailableBackend {
    id: String,
}

impl UnavailableBackend {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl ExecutionBackend for UnavailableBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "unavailable test backend"
    }

    fn supported_categories(&self) -> &[Dimension] {
        &Dimension::ALL
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }

    async fn healthcheck(&self) -> HealthStatus {
        HealthStatus {
            available: false,
            version: None,
            error_message: Some("simulated outage".to_string()),
        }
    }

    async fn execute(&self, item: &Item) -> Result<TestResult, EngineError> {
        Err(EngineError::Transport(format!(
            "{} should never be called for item {}",
            self.id, item.id
        )))
    }
}

/// A convenience constructor for an `Item` whose input is a [`probe_prompt`]
/// and whose sole evaluator checks for the `"PASS"` marker a
/// [`SimulatedAdapter`] or scripted adapter emits.
pub fn pass_fail_item(
    id: &str,
    dimension: Dimension,
    alpha: f64,
    beta: f64,
    gamma: f64,
    preliminary: bool,
) -> Item {
    use cat_engine::Evaluator;
    Item::new(
        id,
        dimension,
        alpha,
        beta,
        gamma,
        preliminary,
        ItemInput::simple(probe_prompt(alpha, beta, gamma)),
        vec![Evaluator::Contains {
            value: "PASS".to_string(),
        }],
    )
}
