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

//! A single-threaded, synchronous typed event bus. Informational only: the
//! engine never consumes its own events, and subscribers must not call back
//! into the engine from inside a handler.

use crate::executor::ExecutionResults;
use crate::item::Dimension;
use serde::{Deserialize, Serialize};

/// The full set of events the executor can emit, in the order described by
/// §6 and §5's ordering guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ExecutorStarted {
        item_count: usize,
    },
    WarmupProgress {
        current: usize,
        total: usize,
    },
    TestStarted {
        item_id: String,
        dimension: Dimension,
    },
    TestCompleted {
        item_id: String,
        passed: bool,
        theta: f64,
        se: f64,
        dimension: Dimension,
    },
    IrtUpdated {
        dimension: Dimension,
        theta: f64,
        se: f64,
        n_tests: usize,
    },
    DimensionConverged {
        dimension: Dimension,
        theta: f64,
        se: f64,
        reason: String,
    },
    ExecutorCompleted {
        results: ExecutionResults,
    },
}

type Subscriber = Box<dyn Fn(&EngineEvent) + Send + Sync>;

/// Single-threaded pub/sub. Typed subscribers (registered via `subscribe`)
/// fire in registration order; a wildcard subscriber, if any, fires last.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    wildcard: Option<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber that receives every event, after all
    /// previously-registered subscribers. Only one wildcard subscriber may
    /// be registered; a later call replaces the former.
    pub fn subscribe(&mut self, handler: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(handler));
    }

    pub fn subscribe_wildcard(&mut self, handler: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        self.wildcard = Some(Box::new(handler));
    }

    /// Invoke every subscriber synchronously, in registration order, with
    /// the wildcard subscriber (if any) invoked last.
    pub fn emit(&self, event: EngineEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
        if let Some(wildcard) = &self.wildcard {
            wildcard(&event);
        }
    }
}
