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

//! Asset records owned by the external store.
//!
//! The pipeline never creates or deletes an [`Asset`]; it only appends derived
//! records ([`TextureFormat`], [`LodLevel`]) and moves stage statuses forward
//! through an [`AssetPatch`].

mod id;
mod patch;
mod records;
mod status;

pub use id::*;
pub use patch::*;
pub use records::*;
pub use status::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One uploaded 3D model and everything the pipeline derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Stable identifier assigned by the store.
    pub id: AssetId,
    /// URL of the canonical uploaded container. Never rewritten by the pipeline.
    pub master_url: String,
    /// Overall lifecycle status.
    #[serde(default)]
    pub status: AssetStatus,
    /// Per-stage status, keyed by stage.
    #[serde(default)]
    pub processing_status: BTreeMap<ProcessingStage, StageStatus>,
    /// Texture format records, in the order they were produced.
    #[serde(default)]
    pub texture_formats: Vec<TextureFormat>,
    /// Level-of-detail records, ordered by level index.
    #[serde(default)]
    pub lods: Vec<LodLevel>,
}

impl Asset {
    /// Creates a draft asset pointing at its master container.
    pub fn new(id: impl Into<AssetId>, master_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            master_url: master_url.into(),
            status: AssetStatus::Draft,
            processing_status: BTreeMap::new(),
            texture_formats: Vec::new(),
            lods: Vec::new(),
        }
    }

    /// Returns the status of a single stage, if it was ever scheduled.
    pub fn stage_status(&self, stage: ProcessingStage) -> Option<StageStatus> {
        self.processing_status.get(&stage).copied()
    }

    /// Returns the most recent compressed texture record, if any.
    pub fn compressed_textures(&self) -> Option<&TextureFormat> {
        self.texture_formats
            .iter()
            .rev()
            .find(|record| record.format.is_compressed())
    }

    /// Whether the asset carries at least one derived LOD container.
    pub fn has_lods(&self) -> bool {
        !self.lods.is_empty()
    }

    /// Applies a patch in place, following the merge rules of [`AssetPatch`].
    pub fn apply(&mut self, patch: AssetPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.processing_status.extend(patch.processing_status);
        self.texture_formats.extend(patch.append_texture_formats);
        if let Some(mut lods) = patch.replace_lods {
            lods.sort_by_key(|lod| lod.level);
            self.lods = lods;
        }
    }

    /// The container format, derived from the master URL extension.
    pub fn container_format(&self) -> &'static str {
        container_format_of(&self.master_url)
    }
}

/// Returns `"gltf"` for `.gltf` URLs and `"glb"` for everything else.
pub fn container_format_of(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.to_ascii_lowercase().ends_with(".gltf") {
        "gltf"
    } else {
        "glb"
    }
}
