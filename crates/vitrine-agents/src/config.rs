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

//! Pipeline configuration, read from `vitrine.toml`.
//!
//! Every section and every key is optional; missing values take the
//! defaults below.

use crate::error::ConfigError;
use crate::job_runner::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vitrine_io::ScratchSpace;
use vitrine_lanes::{GeometryOptions, LodConfig, PathLocator, TextureOptions};

/// Default file name looked up by [`VitrineConfig::load_or_default`].
pub const CONFIG_FILE: &str = "vitrine.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitrineConfig {
    /// Orchestration limits and worker pool sizes.
    pub pipeline: PipelineConfig,
    /// External tool locations.
    pub tools: ToolsConfig,
    /// Detail levels to generate.
    pub lod: LodSection,
    /// Texture transcoding defaults.
    pub texture: TextureOptions,
    /// Geometry compression defaults.
    pub geometry: GeometryOptions,
    /// URL rewriting for the manifest resolver.
    pub cdn: CdnSection,
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest container accepted by validation, in bytes.
    pub max_file_size: u64,
    /// A stage whose job outlives this is marked failed once it returns.
    pub stage_timeout_secs: u64,
    /// Texture compression workers.
    pub texture_concurrency: usize,
    /// LOD generation workers.
    pub lod_concurrency: usize,
    /// Geometry compression workers.
    pub geometry_concurrency: usize,
    /// Validation workers.
    pub validate_concurrency: usize,
    /// Attempts per job, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base_ms: u64,
    /// Schedule geometry compression after validation.
    pub enable_geometry_compression: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024,
            stage_timeout_secs: 600,
            texture_concurrency: 3,
            lod_concurrency: 1,
            geometry_concurrency: 1,
            validate_concurrency: 2,
            max_attempts: 3,
            backoff_base_ms: 1000,
            enable_geometry_compression: false,
        }
    }
}

impl PipelineConfig {
    /// Retry policy handed to the job runner.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    /// Per-stage deadline.
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

/// `[tools]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// `gltf-transform` location, searched on `PATH` when unset.
    pub gltf_transform: Option<PathBuf>,
    /// `toktx` location, searched on `PATH` when unset.
    pub toktx: Option<PathBuf>,
    /// `gltfpack` location, searched on `PATH` when unset.
    pub gltfpack: Option<PathBuf>,
    /// Parent directory of per-call scratch directories. Defaults to the
    /// system temporary directory.
    pub scratch_root: Option<PathBuf>,
}

impl ToolsConfig {
    /// A locator honouring the configured locations.
    pub fn locator(&self) -> PathLocator {
        let mut locator = PathLocator::new();
        for (program, path) in [
            ("gltf-transform", &self.gltf_transform),
            ("toktx", &self.toktx),
            ("gltfpack", &self.gltfpack),
        ] {
            if let Some(path) = path {
                locator = locator.with_override(program, path.clone());
            }
        }
        locator
    }

    /// The scratch space under `scratch_root`.
    pub fn scratch(&self) -> std::io::Result<ScratchSpace> {
        match &self.scratch_root {
            Some(root) => ScratchSpace::new(root.clone()),
            None => ScratchSpace::system(),
        }
    }
}

/// `[lod]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSection {
    /// Levels to generate, in any order.
    pub levels: Vec<LodConfig>,
}

impl Default for LodSection {
    fn default() -> Self {
        Self {
            levels: LodConfig::defaults(),
        }
    }
}

/// `[cdn]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnSection {
    /// URL prefix served by the CDN, e.g. `https://storage.example.com/`.
    pub origin: Option<String>,
    /// Prefix that replaces `origin`, e.g. `https://cdn.example.com/`.
    pub base_url: Option<String>,
}

impl VitrineConfig {
    /// Parses a configuration document.
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "VitrineConfig: no '{}' found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        log::info!("VitrineConfig: loading '{}'", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }
}
