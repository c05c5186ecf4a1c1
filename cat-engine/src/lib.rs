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

//! An adaptive evaluation engine for opaque text-generating services.
//!
//! Given a pool of calibrated (or preliminary) test items and a target
//! reachable through an [`adapter::Adapter`], [`executor::AdaptiveExecutor`]
//! runs a per-dimension computerized adaptive test: at each step it asks
//! [`selector`] for the most informative remaining item, dispatches it
//! through an [`backend::ExecutionBackend`] (optionally replicated and
//! de-noised via [`noise`]), folds the response into an ability estimate via
//! [`estimator`], and asks [`convergence`] whether to stop.
//!
//! Everything downstream of "the target said X" — connecting to it,
//! detecting what kind of system it is, loading a test library, mapping
//! results onto a compliance framework, or persisting and reporting them —
//! is out of scope here and lives in other crates.

pub mod adapter;
pub mod backend;
pub mod config;
pub mod convergence;
pub mod error;
pub mod estimator;
pub mod events;
pub mod executor;
pub mod irt;
pub mod item;
pub mod noise;
pub mod selector;
pub mod session;

pub use adapter::{Adapter, AdapterResponse, Inspection, ResponseFormat, TargetConfig};
pub use backend::{BackendCapabilities, BuiltinBackend, ExecutionBackend, HealthStatus, TestResult};
pub use config::EngineConfig;
pub use convergence::{ConvergenceConfig, ConvergenceDecision};
pub use error::{AdapterError, EngineError};
pub use estimator::{AbilityEstimate, EstimationMethod};
pub use events::{EngineEvent, EventBus};
pub use executor::{AdaptiveExecutor, CancellationToken, DimensionResult, ExecutionPlan, ExecutionResults};
pub use item::{Dimension, Evaluator, Item, ItemInput, Turn};
pub use session::{CatSession, Response, SessionSnapshot};
