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

use super::{AssetStatus, LodLevel, ProcessingStage, StageStatus, TextureFormat};
use std::collections::BTreeMap;

/// A partial update of an [`Asset`](super::Asset).
///
/// Merge rules, honoured by every [`AssetStore`](crate::AssetStore):
/// - `status`: replaced when present.
/// - `processing_status`: merged key by key; stages absent from the patch keep their value.
/// - `append_texture_formats`: appended after the existing records.
/// - `replace_lods`: replaces the whole LOD list when present, since levels
///   only make sense as a set.
///
/// Fields not named here are never touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPatch {
    /// New overall status.
    pub status: Option<AssetStatus>,
    /// Stage statuses to merge.
    pub processing_status: BTreeMap<ProcessingStage, StageStatus>,
    /// Texture records to append.
    pub append_texture_formats: Vec<TextureFormat>,
    /// Replacement LOD list.
    pub replace_lods: Option<Vec<LodLevel>>,
}

impl AssetPatch {
    /// A patch that only sets the overall status.
    pub fn status(status: AssetStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// A patch that only moves one stage.
    pub fn stage(stage: ProcessingStage, status: StageStatus) -> Self {
        Self::default().with_stage(stage, status)
    }

    /// Adds a stage transition to the patch.
    pub fn with_stage(mut self, stage: ProcessingStage, status: StageStatus) -> Self {
        self.processing_status.insert(stage, status);
        self
    }

    /// Sets the overall status.
    pub fn with_status(mut self, status: AssetStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Appends a texture format record.
    pub fn with_texture_format(mut self, record: TextureFormat) -> Self {
        self.append_texture_formats.push(record);
        self
    }

    /// Replaces the LOD list.
    pub fn with_lods(mut self, lods: Vec<LodLevel>) -> Self {
        self.replace_lods = Some(lods);
        self
    }
}

/// Selection criteria for [`AssetStore::list_assets`](crate::AssetStore::list_assets).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetFilter {
    /// Only assets with this overall status.
    pub status: Option<AssetStatus>,
    /// Only assets where this stage currently has this status.
    pub stage: Option<(ProcessingStage, StageStatus)>,
}

impl AssetFilter {
    /// Whether `asset` satisfies every criterion of the filter.
    pub fn matches(&self, asset: &super::Asset) -> bool {
        if let Some(status) = self.status {
            if asset.status != status {
                return false;
            }
        }
        if let Some((stage, status)) = self.stage {
            if asset.stage_status(stage) != Some(status) {
                return false;
            }
        }
        true
    }
}
