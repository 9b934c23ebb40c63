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

//! Contracts of the record stores the pipeline reads from and writes to.

use crate::asset::{Asset, AssetFilter, AssetId, AssetPatch};
use crate::preset::{LightingPreset, MaterialVariant, RenderPreset};
use thiserror::Error;

/// Errors reported by an [`AssetStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No asset with this id exists.
    #[error("asset '{0}' not found")]
    NotFound(AssetId),
    /// The backing store failed.
    #[error("asset store backend failure: {0}")]
    Backend(String),
}

/// Read/write access to asset records.
///
/// Implementations must be safe to share between worker threads.
pub trait AssetStore: Send + Sync {
    /// Returns a snapshot of the asset, or `None` if it does not exist.
    fn get_asset(&self, id: &AssetId) -> Result<Option<Asset>, StoreError>;

    /// Applies `patch` following the merge rules documented on [`AssetPatch`]
    /// and returns the updated record.
    fn update_asset(&self, id: &AssetId, patch: AssetPatch) -> Result<Asset, StoreError>;

    /// Lists every asset matching `filter`.
    fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError>;
}

/// Read-only access to presets and material variants.
///
/// Lookups return `None` on a miss and never fail.
pub trait PresetStore: Send + Sync {
    /// Looks up a lighting preset.
    fn get_lighting_preset(&self, id: &str) -> Option<LightingPreset>;

    /// Looks up a render preset.
    fn get_render_preset(&self, id: &str) -> Option<RenderPreset>;

    /// Looks up a material variant.
    fn get_material_variant(&self, id: &str) -> Option<MaterialVariant>;
}
