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

use std::fmt;
use vitrine_core::{AssetId, ProcessingStage};
use vitrine_lanes::{GeometryOptions, LodConfig, TextureOptions};

/// Kinds of work the runner knows how to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Validation followed by optimization.
    Validate,
    /// Level-of-detail generation.
    LodGeneration,
    /// Geometry compression.
    GeometryCompression,
    /// Texture transcoding.
    TextureCompression,
}

impl JobKind {
    /// Every kind.
    pub const ALL: [JobKind; 4] = [
        JobKind::Validate,
        JobKind::LodGeneration,
        JobKind::GeometryCompression,
        JobKind::TextureCompression,
    ];

    /// The asset stage a job of this kind drives.
    pub fn stage(self) -> ProcessingStage {
        match self {
            JobKind::Validate => ProcessingStage::Validation,
            JobKind::LodGeneration => ProcessingStage::LodGeneration,
            JobKind::GeometryCompression => ProcessingStage::GeometryCompression,
            JobKind::TextureCompression => ProcessingStage::TextureCompression,
        }
    }

    /// The kind that drives a derivative stage.
    pub fn for_stage(stage: ProcessingStage) -> Option<JobKind> {
        match stage {
            ProcessingStage::LodGeneration => Some(JobKind::LodGeneration),
            ProcessingStage::GeometryCompression => Some(JobKind::GeometryCompression),
            ProcessingStage::TextureCompression => Some(JobKind::TextureCompression),
            ProcessingStage::Validation | ProcessingStage::Optimization => None,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::Validate => "validate",
            JobKind::LodGeneration => "lod",
            JobKind::GeometryCompression => "geometry",
            JobKind::TextureCompression => "texture",
        })
    }
}

/// Per-job overrides of the configured stage options.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum JobOptions {
    /// Use the configured defaults.
    #[default]
    None,
    /// Levels to generate.
    Lod(Vec<LodConfig>),
    /// Texture transcoding options.
    Texture(TextureOptions),
    /// Geometry compression options.
    Geometry(GeometryOptions),
}

/// What a job works on.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPayload {
    /// Asset whose records the job updates.
    pub asset_id: AssetId,
    /// Container the job reads.
    pub container_url: String,
    /// Stage options.
    pub options: JobOptions,
}

/// A unit of work. A retry is a new `Job` with the same payload and the
/// next attempt number.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Runner-assigned identifier, kept across retries.
    pub id: u32,
    /// Kind, selecting the handler.
    pub kind: JobKind,
    /// 1 for the first run.
    pub attempt: u32,
    /// Input.
    pub payload: JobPayload,
}
