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

use super::Fixtures;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use vitrine_core::{
    Asset, AssetFilter, AssetId, AssetPatch, AssetStore, LightingPreset, MaterialVariant,
    PresetStore, RenderPreset, StoreError,
};

/// An [`AssetStore`] held in memory and shared between threads.
///
/// Updates are applied under a write lock, so concurrent patches to the
/// same asset never lose each other's stage statuses.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    assets: RwLock<HashMap<AssetId, Asset>>,
}

impl InMemoryAssetStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `assets`.
    pub fn with_assets(assets: impl IntoIterator<Item = Asset>) -> Self {
        let store = Self::new();
        for asset in assets {
            store.insert(asset);
        }
        store
    }

    /// Inserts or replaces an asset.
    pub fn insert(&self, asset: Asset) {
        self.write().insert(asset.id.clone(), asset);
    }

    /// Number of stored assets.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<AssetId, Asset>> {
        self.assets.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<AssetId, Asset>> {
        self.assets.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl AssetStore for InMemoryAssetStore {
    fn get_asset(&self, id: &AssetId) -> Result<Option<Asset>, StoreError> {
        Ok(self.read().get(id).cloned())
    }

    fn update_asset(&self, id: &AssetId, patch: AssetPatch) -> Result<Asset, StoreError> {
        let mut assets = self.write();
        let asset = assets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        asset.apply(patch);
        Ok(asset.clone())
    }

    fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let mut assets: Vec<Asset> = self
            .read()
            .values()
            .filter(|asset| filter.matches(asset))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(assets)
    }
}

/// A [`PresetStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPresetStore {
    lighting: RwLock<HashMap<String, LightingPreset>>,
    render: RwLock<HashMap<String, RenderPreset>>,
    variants: RwLock<HashMap<String, MaterialVariant>>,
}

impl InMemoryPresetStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a lighting preset.
    pub fn insert_lighting(&self, preset: LightingPreset) {
        write(&self.lighting).insert(preset.id.clone(), preset);
    }

    /// Inserts or replaces a render preset.
    pub fn insert_render(&self, preset: RenderPreset) {
        write(&self.render).insert(preset.id.clone(), preset);
    }

    /// Inserts or replaces a material variant.
    pub fn insert_variant(&self, variant: MaterialVariant) {
        write(&self.variants).insert(variant.id.clone(), variant);
    }

    /// Removes a lighting preset, returning it if it existed.
    pub fn remove_lighting(&self, id: &str) -> Option<LightingPreset> {
        write(&self.lighting).remove(id)
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

fn lookup<T: Clone>(lock: &RwLock<HashMap<String, T>>, id: &str) -> Option<T> {
    lock.read()
        .unwrap_or_else(|p| p.into_inner())
        .get(id)
        .cloned()
}

impl PresetStore for InMemoryPresetStore {
    fn get_lighting_preset(&self, id: &str) -> Option<LightingPreset> {
        lookup(&self.lighting, id)
    }

    fn get_render_preset(&self, id: &str) -> Option<RenderPreset> {
        lookup(&self.render, id)
    }

    fn get_material_variant(&self, id: &str) -> Option<MaterialVariant> {
        lookup(&self.variants, id)
    }
}

impl Fixtures {
    /// Splits the fixtures into an asset store and a preset store.
    pub fn into_stores(self) -> (InMemoryAssetStore, InMemoryPresetStore) {
        let presets = InMemoryPresetStore::new();
        for preset in self.lighting_presets {
            presets.insert_lighting(preset);
        }
        for preset in self.render_presets {
            presets.insert_render(preset);
        }
        for variant in self.material_variants {
            presets.insert_variant(variant);
        }
        (InMemoryAssetStore::with_assets(self.assets), presets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{AssetStatus, ProcessingStage, StageStatus};

    #[test]
    fn update_merges_patches_and_reports_missing_assets() {
        let store = InMemoryAssetStore::with_assets([Asset::new("A1", "http://x/a.glb")]);
        let id = AssetId::new("A1");

        store
            .update_asset(&id, AssetPatch::stage(ProcessingStage::Validation, StageStatus::Ready))
            .unwrap();
        let asset = store
            .update_asset(&id, AssetPatch::status(AssetStatus::Processing))
            .unwrap();

        assert_eq!(asset.status, AssetStatus::Processing);
        assert_eq!(
            asset.stage_status(ProcessingStage::Validation),
            Some(StageStatus::Ready)
        );
        assert!(matches!(
            store.update_asset(&AssetId::new("nope"), AssetPatch::default()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_applies_the_filter_in_id_order() {
        let mut ready = Asset::new("B", "http://x/b.glb");
        ready.status = AssetStatus::Ready;
        let store = InMemoryAssetStore::with_assets([
            Asset::new("C", "http://x/c.glb"),
            ready,
            Asset::new("A", "http://x/a.glb"),
        ]);

        let all = store.list_assets(&AssetFilter::default()).unwrap();
        let only_ready = store
            .list_assets(&AssetFilter {
                status: Some(AssetStatus::Ready),
                ..Default::default()
            })
            .unwrap();

        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(only_ready.len(), 1);
        assert_eq!(only_ready[0].id.as_str(), "B");
    }

    #[test]
    fn preset_misses_are_none() {
        let store = InMemoryPresetStore::new();
        assert!(store.get_lighting_preset("studio").is_none());
        assert!(store.get_render_preset("front").is_none());
        assert!(store.get_material_variant("oak").is_none());
    }
}
