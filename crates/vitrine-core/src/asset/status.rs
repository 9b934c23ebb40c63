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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall lifecycle status of an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// Created, no stage has run yet.
    #[default]
    Draft,
    /// The orchestrator is working on it.
    Processing,
    /// The full sequence completed.
    Ready,
    /// Validation failed, or every derivative stage failed.
    Failed,
}

/// Lifecycle of a single pipeline stage.
///
/// A stage moves `Pending -> Processing -> {Ready | Failed}` once per job attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Scheduled, waiting for a worker.
    Pending,
    /// A worker picked it up.
    Processing,
    /// Finished successfully.
    Ready,
    /// Finished with an error.
    Failed,
}

impl StageStatus {
    /// Whether the stage will not move again without a new job.
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Ready | StageStatus::Failed)
    }
}

/// The named steps of the transcoding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Size, magic bytes and structural parse of the master container.
    Validation,
    /// Cleanup transforms and size report.
    Optimization,
    /// Level-of-detail generation.
    LodGeneration,
    /// Mesh payload compression.
    GeometryCompression,
    /// Embedded texture transcoding.
    TextureCompression,
}

impl ProcessingStage {
    /// Every stage, in pipeline order.
    pub const ALL: [ProcessingStage; 5] = [
        ProcessingStage::Validation,
        ProcessingStage::Optimization,
        ProcessingStage::LodGeneration,
        ProcessingStage::GeometryCompression,
        ProcessingStage::TextureCompression,
    ];

    /// The stages that produce derived artifacts and run on the job runner.
    pub const DERIVATIVES: [ProcessingStage; 3] = [
        ProcessingStage::LodGeneration,
        ProcessingStage::GeometryCompression,
        ProcessingStage::TextureCompression,
    ];

    /// The stable snake_case name used as the status map key.
    pub fn name(self) -> &'static str {
        match self {
            ProcessingStage::Validation => "validation",
            ProcessingStage::Optimization => "optimization",
            ProcessingStage::LodGeneration => "lod_generation",
            ProcessingStage::GeometryCompression => "geometry_compression",
            ProcessingStage::TextureCompression => "texture_compression",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
