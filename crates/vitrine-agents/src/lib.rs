// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Vitrine Agents
//!
//! The orchestrators. The [`PipelineAgent`] sequences the codec lanes over a
//! background [`JobRunner`] and writes stage statuses and derived records
//! back to the asset store. The [`ManifestAgent`] reads those records to
//! answer viewer requests with a render manifest.

pub mod config;
pub mod error;
pub mod job_runner;
pub mod manifest_agent;
pub mod pipeline_agent;

pub use config::{VitrineConfig, CONFIG_FILE};
pub use error::{ConfigError, ManifestError, PipelineError};
pub use job_runner::{Job, JobKind, JobOptions, JobPayload, JobRunner, RetryPolicy, RunnerStats};
pub use manifest_agent::{DeviceClass, ManifestAgent, ManifestRequest, ManifestVersion, RenderManifest};
pub use pipeline_agent::{Adapters, OptimizationReport, PipelineAgent, ValidationReport};
