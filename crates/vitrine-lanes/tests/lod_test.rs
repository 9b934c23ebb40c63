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

mod common;

use anyhow::Result;
use common::{exploded_grid, Workspace};
use std::sync::Arc;
use vitrine_core::{lods_are_monotonic, AssetId};
use vitrine_io::SceneModel;
use vitrine_lanes::{CodecError, LodAdapter, LodConfig, NoTools, SimplifierLibrary};

/// Keeps the leading triangles up to the target count.
struct Truncate;

impl SimplifierLibrary for Truncate {
    fn name(&self) -> &str {
        "truncate"
    }

    fn simplify(
        &self,
        indices: &[u32],
        _positions: &[f32],
        target_index_count: usize,
        _target_error: f32,
    ) -> Result<Vec<u32>, CodecError> {
        Ok(indices[..target_index_count.min(indices.len())].to_vec())
    }
}

/// Returns indices past the end of the vertex list.
struct OutOfRange;

impl SimplifierLibrary for OutOfRange {
    fn name(&self) -> &str {
        "out-of-range"
    }

    fn simplify(&self, _: &[u32], _: &[f32], _: usize, _: f32) -> Result<Vec<u32>, CodecError> {
        Ok(vec![0, 1, 100_000])
    }
}

fn adapter(workspace: &Workspace) -> LodAdapter {
    LodAdapter::new(Arc::new(NoTools), workspace.scratch(), workspace.storage.clone())
}

#[test]
fn without_a_simplifier_every_level_is_the_cleaned_master() -> Result<()> {
    // --- ARRANGE ---
    let workspace = Workspace::new();
    let url = workspace.put("chair.glb", &exploded_grid(4));
    let id = AssetId::from("chair");

    // --- ACT ---
    let set = adapter(&workspace).generate_levels(&id, &url, &LodConfig::defaults())?;

    // --- ASSERT ---
    assert_eq!(set.asset_id, id);
    assert_eq!(set.levels.len(), 3);
    assert_eq!(set.warnings.len(), 2);
    for (index, level) in set.levels.iter().enumerate() {
        assert_eq!(level.level, index as u32);
        assert_eq!(level.vertex_count, 25);
        assert_eq!(level.url, workspace.path(&format!("chair.lod{index}.glb")));
        assert_eq!(std::fs::metadata(&level.url)?.len(), level.file_size);
    }
    assert_eq!(set.levels[1].distance, 10.0);
    assert!(lods_are_monotonic(&set.levels));
    assert!(set.total_size_reduction_percent.abs() < 1e-9);
    Ok(())
}

#[test]
fn simplified_levels_shrink_monotonically() -> Result<()> {
    // --- ARRANGE ---
    let workspace = Workspace::new();
    let url = workspace.put("table.glb", &exploded_grid(4));
    let adapter = adapter(&workspace).with_library(Arc::new(Truncate));

    // --- ACT ---
    let set = adapter.generate_levels(&AssetId::from("table"), &url, &LodConfig::defaults())?;

    // --- ASSERT ---
    assert!(set.warnings.is_empty(), "{:?}", set.warnings);
    assert_eq!(set.levels[0].vertex_count, 25);
    assert!(set.levels[1].vertex_count < 25);
    assert!(set.levels[2].vertex_count < set.levels[1].vertex_count);
    assert!(lods_are_monotonic(&set.levels));
    assert!(set.total_size_reduction_percent > 0.0);

    let half = SceneModel::from_glb(&std::fs::read(&set.levels[1].url)?)?;
    assert_eq!(half.triangle_count(), 16);
    Ok(())
}

#[cfg(feature = "meshopt")]
#[test]
fn meshopt_reduces_a_flat_grid() -> Result<()> {
    use vitrine_lanes::MeshoptSimplifier;

    // --- ARRANGE ---
    let workspace = Workspace::new();
    let url = workspace.put("floor.glb", &exploded_grid(8));
    let adapter = adapter(&workspace).with_library(Arc::new(MeshoptSimplifier::new()));

    // --- ACT ---
    let set = adapter.generate_levels(&AssetId::from("floor"), &url, &LodConfig::defaults())?;

    // --- ASSERT ---
    assert_eq!(set.levels[0].vertex_count, 81);
    assert!(set.levels[1].vertex_count < 81);
    assert!(lods_are_monotonic(&set.levels));
    let half = SceneModel::from_glb(&std::fs::read(&set.levels[1].url)?)?;
    assert!(half.triangle_count() < 128);
    Ok(())
}

#[test]
fn a_misbehaving_simplifier_degrades_to_cleanup_only() -> Result<()> {
    let workspace = Workspace::new();
    let url = workspace.put("lamp.glb", &exploded_grid(2));
    let adapter = adapter(&workspace).with_library(Arc::new(OutOfRange));

    let set = adapter.generate_levels(&AssetId::from("lamp"), &url, &LodConfig::defaults())?;

    assert_eq!(set.warnings.len(), 2);
    assert!(set.levels.iter().all(|level| level.vertex_count == 9));
    Ok(())
}

#[test]
fn levels_are_checked_before_the_container_is_fetched() {
    let workspace = Workspace::new();
    let configs = [LodConfig::new(0, 1.0, 20.0, 0.0), LodConfig::new(1, 0.5, 5.0, 0.01)];

    let err = adapter(&workspace)
        .generate_levels(&AssetId::from("sofa"), &workspace.path("missing.glb"), &configs)
        .unwrap_err();

    assert!(matches!(err, CodecError::InvalidLevels(_)), "{err}");
}

#[test]
fn a_single_level_is_stored_under_its_own_name() -> Result<()> {
    let workspace = Workspace::new();
    let url = workspace.put("vase.glb", &exploded_grid(4));
    let adapter = adapter(&workspace).with_library(Arc::new(Truncate));

    let level = adapter.generate_level(&url, &LodConfig::new(3, 0.25, 80.0, 0.05))?;

    assert_eq!(level.level, 3);
    assert_eq!(level.url, workspace.path("vase.lod3.glb"));
    assert!(level.vertex_count < 25);
    assert_eq!(level.distance, 80.0);
    Ok(())
}
