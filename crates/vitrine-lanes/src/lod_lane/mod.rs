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

//! LOD Lane
//!
//! Builds the detail levels of a master container. Every level starts from
//! the cleaned master (welded, deduplicated, pruned); levels below full
//! detail are then simplified by `gltfpack`, a registered
//! [`SimplifierLibrary`], or not at all when neither is usable.

mod config;
#[cfg(feature = "meshopt")]
mod simplifier;

pub use config::LodConfig;
#[cfg(feature = "meshopt")]
pub use simplifier::MeshoptSimplifier;

use crate::error::CodecError;
use crate::geometry_lane::STALE_SCRATCH_AGE;
use crate::tool::{args, tiers, Method, ToolLocator, ToolSlot};
use serde::Serialize;
use std::sync::Arc;
use vitrine_core::{AssetId, LodLevel, ObjectStorage};
use vitrine_io::glb::has_glb_magic;
use vitrine_io::urls::lod_url;
use vitrine_io::{cleanup, CleanupOptions, Mode, SceneModel, ScratchSpace, Semantic};

/// Name of the command-line simplifier.
pub const GLTFPACK: &str = "gltfpack";

/// An in-process mesh simplifier.
pub trait SimplifierLibrary: Send + Sync {
    /// Library name used in logs and errors.
    fn name(&self) -> &str;

    /// Simplifies one indexed triangle list.
    ///
    /// `positions` holds packed xyz triples. Returns a new index list over
    /// the same vertices with at most about `target_index_count` entries.
    fn simplify(
        &self,
        indices: &[u32],
        positions: &[f32],
        target_index_count: usize,
        target_error: f32,
    ) -> Result<Vec<u32>, CodecError>;
}

impl std::fmt::Debug for dyn SimplifierLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimplifierLibrary({})", self.name())
    }
}

/// Outcome of [`LodAdapter::generate_levels`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LodSet {
    /// Asset the levels belong to.
    pub asset_id: AssetId,
    /// Produced levels, sorted by level index.
    pub levels: Vec<LodLevel>,
    /// How much smaller the reduced levels are than full detail, on average.
    pub total_size_reduction_percent: f64,
    /// Degradations worth surfacing (missing simplifier, clamped levels).
    pub warnings: Vec<String>,
}

/// `100 × (1 − Σ sizes of levels after the first / (size of first × (n − 1)))`.
fn size_reduction_percent(levels: &[LodLevel]) -> f64 {
    let Some((first, rest)) = levels.split_first() else {
        return 0.0;
    };
    if rest.is_empty() || first.file_size == 0 {
        return 0.0;
    }
    let reduced: u64 = rest.iter().map(|l| l.file_size).sum();
    100.0 * (1.0 - reduced as f64 / (first.file_size as f64 * rest.len() as f64))
}

/// A level built in memory, before it is stored.
struct BuiltLevel {
    glb: Vec<u8>,
    vertex_count: u64,
    method: Method,
}

/// LOD generation with CLI → library → cleanup-only fallback.
pub struct LodAdapter {
    tool: ToolSlot,
    library: Option<Arc<dyn SimplifierLibrary>>,
    scratch: ScratchSpace,
    storage: Arc<dyn ObjectStorage>,
}

impl std::fmt::Debug for LodAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LodAdapter")
            .field("tool", &self.tool)
            .field("library", &self.library)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

impl LodAdapter {
    /// Creates an adapter and sweeps scratch directories left by killed runs.
    pub fn new(
        locator: Arc<dyn ToolLocator>,
        scratch: ScratchSpace,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        if let Err(e) = scratch.sweep_stale(STALE_SCRATCH_AGE) {
            log::warn!("LodAdapter: scratch sweep failed: {}", e);
        }
        Self {
            tool: ToolSlot::new(GLTFPACK, locator),
            library: None,
            scratch,
            storage,
        }
    }

    /// Registers the in-process tier.
    pub fn with_library(mut self, library: Arc<dyn SimplifierLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Builds and stores every configured level of the container at `url`.
    ///
    /// Configurations are sorted by level and checked before anything is
    /// fetched. Level `N` is stored at the source URL with `.lodN` inserted
    /// before the extension. Vertex counts never grow from one level to the
    /// next: a level that comes out larger than its predecessor is replaced
    /// by the predecessor's container and a warning is recorded.
    pub fn generate_levels(
        &self,
        asset_id: &AssetId,
        url: &str,
        configs: &[LodConfig],
    ) -> Result<LodSet, CodecError> {
        let configs = config::checked_levels(configs)?;
        let master = self.cleaned_master(url)?;
        let master_glb = master.to_glb()?;

        let mut warnings = Vec::new();
        let mut levels = Vec::with_capacity(configs.len());
        let mut previous: Option<BuiltLevel> = None;
        for config in &configs {
            let mut built = self.build_level(&master, &master_glb, config, &mut warnings)?;
            if let Some(prev) = &previous {
                if built.vertex_count > prev.vertex_count {
                    let warning = format!(
                        "level {} came out with {} vertices, more than the {} of the level before; reusing that level",
                        config.level, built.vertex_count, prev.vertex_count
                    );
                    log::warn!("LodAdapter: {}", warning);
                    warnings.push(warning);
                    built = BuiltLevel {
                        glb: prev.glb.clone(),
                        vertex_count: prev.vertex_count,
                        method: prev.method,
                    };
                }
            }

            let stored = self.storage.store(&lod_url(url, config.level), &built.glb)?;
            log::info!(
                "LodAdapter: level {} of {} has {} vertices, {} bytes, via {}",
                config.level,
                asset_id,
                built.vertex_count,
                built.glb.len(),
                built.method
            );
            levels.push(LodLevel::new(
                config.level,
                stored,
                built.vertex_count,
                built.glb.len() as u64,
                config.distance,
            ));
            previous = Some(built);
        }

        Ok(LodSet {
            asset_id: asset_id.clone(),
            total_size_reduction_percent: size_reduction_percent(&levels),
            levels,
            warnings,
        })
    }

    /// Builds and stores a single level of the container at `url`.
    pub fn generate_level(&self, url: &str, config: &LodConfig) -> Result<LodLevel, CodecError> {
        let config = config::checked_levels(std::slice::from_ref(config))?
            .into_iter()
            .next()
            .ok_or_else(|| CodecError::InvalidLevels("no levels configured".into()))?;
        let master = self.cleaned_master(url)?;
        let master_glb = master.to_glb()?;

        let mut warnings = Vec::new();
        let built = self.build_level(&master, &master_glb, &config, &mut warnings)?;
        let stored = self.storage.store(&lod_url(url, config.level), &built.glb)?;
        Ok(LodLevel::new(
            config.level,
            stored,
            built.vertex_count,
            built.glb.len() as u64,
            config.distance,
        ))
    }

    fn cleaned_master(&self, url: &str) -> Result<SceneModel, CodecError> {
        let bytes = self.storage.fetch(url)?;
        let mut master = SceneModel::from_glb(&bytes)?;
        let report = cleanup(&mut master, &CleanupOptions::default());
        log::debug!(
            "LodAdapter: cleanup of {} took {} vertices to {}",
            url,
            report.vertices_before,
            report.vertices_after
        );
        Ok(master)
    }

    fn build_level(
        &self,
        master: &SceneModel,
        master_glb: &[u8],
        config: &LodConfig,
        warnings: &mut Vec<String>,
    ) -> Result<BuiltLevel, CodecError> {
        if !config.simplifies() {
            return Ok(BuiltLevel {
                glb: master_glb.to_vec(),
                vertex_count: master.vertex_count(),
                method: Method::Simulated,
            });
        }

        for method in tiers(self.tool.path().is_some(), self.library.is_some()) {
            let attempt = match method {
                Method::Cli => self.simplify_with_cli(master_glb, config),
                Method::Library => self.simplify_with_library(master, config),
                _ => break,
            };
            match attempt.and_then(|glb| counted(glb, method)) {
                Ok(built) => return Ok(built),
                Err(e) => log::warn!(
                    "LodAdapter: {} tier failed for level {} ({}), degrading",
                    method,
                    config.level,
                    e
                ),
            }
        }

        let warning = format!(
            "level {}: no simplifier available, level is cleanup-only",
            config.level
        );
        log::warn!("LodAdapter: {}", warning);
        warnings.push(warning);
        Ok(BuiltLevel {
            glb: master_glb.to_vec(),
            vertex_count: master.vertex_count(),
            method: Method::Simulated,
        })
    }

    fn simplify_with_cli(&self, master_glb: &[u8], config: &LodConfig) -> Result<Vec<u8>, CodecError> {
        let session = self.scratch.session()?;
        let input = session.path().join("input.glb");
        let output = session.path().join("output.glb");
        std::fs::write(&input, master_glb)?;

        let mut command = args(["-i"]);
        command.push(input.into_os_string());
        command.extend(args(["-o"]));
        command.push(output.clone().into_os_string());
        command.extend(args([
            "-si".to_string(),
            config.ratio.to_string(),
            "-se".to_string(),
            config.error.to_string(),
            "-noq".to_string(),
        ]));
        self.tool.run(&command)?;
        Ok(std::fs::read(&output)?)
    }

    fn simplify_with_library(&self, master: &SceneModel, config: &LodConfig) -> Result<Vec<u8>, CodecError> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| CodecError::InvalidOutput("no library registered".into()))?;

        let mut level = master.clone();
        for primitive in level.primitives_mut() {
            if primitive.mode != Mode::Triangles {
                continue;
            }
            let Some(positions) = primitive.attributes.get(&Semantic::Positions) else {
                continue;
            };
            let indices = primitive.resolved_indices();
            let target = ((indices.len() as f32 * config.ratio) as usize / 3 * 3).max(3);
            let simplified = library.simplify(&indices, &positions.values, target, config.error)?;

            let vertex_count = primitive.vertex_count();
            if simplified.len() % 3 != 0 || simplified.iter().any(|&i| i as usize >= vertex_count) {
                return Err(CodecError::Library {
                    library: library.name().to_owned(),
                    message: "returned an index list that is not a triangle list over the input vertices"
                        .into(),
                });
            }
            primitive.indices = Some(simplified);
            primitive.drop_unreferenced_vertices();
        }
        Ok(level.to_glb()?)
    }
}

/// Checks a simplifier's output and counts its vertices.
fn counted(glb: Vec<u8>, method: Method) -> Result<BuiltLevel, CodecError> {
    if !has_glb_magic(&glb) {
        return Err(CodecError::InvalidOutput("output is not a GLB container".into()));
    }
    let vertex_count = SceneModel::from_glb(&glb)?.vertex_count();
    Ok(BuiltLevel {
        glb,
        vertex_count,
        method,
    })
}
