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

use anyhow::Result;
use std::io::Write;
use vitrine_core::{AssetId, AssetStore, PresetStore, ProcessingStage, StageStatus};
use vitrine_infra::{Fixtures, InfraError};

const FIXTURES: &str = r#"{
  "assets": [
    {
      "id": "A1",
      "masterUrl": "http://x/a.glb",
      "status": "ready",
      "processingStatus": { "validation": "ready", "lod_generation": "failed" },
      "lods": [
        { "level": 0, "url": "http://x/a.lod0.glb", "vertexCount": 100, "fileSize": 2048, "distance": 0.0 }
      ]
    }
  ],
  "lightingPresets": [
    { "id": "L1", "name": "Sunset", "hdriUrl": "http://x/sunset.hdr", "exposure": 1.2, "intensity": 0.8 }
  ],
  "renderPresets": [
    {
      "id": "RP1", "assetId": "A1", "name": "Front", "lightingPresetId": "L1",
      "camera": { "fov": 35.0, "position": [0.0, 1.0, 4.0], "target": [0.0, 0.5, 0.0] }
    }
  ],
  "materialVariants": [
    { "id": "MV1", "assetId": "A1", "name": "Oak", "roughness": 0.7 }
  ]
}"#;

#[test]
fn fixture_file_populates_both_stores() -> Result<()> {
    // --- ARRANGE ---
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(FIXTURES.as_bytes())?;

    // --- ACT ---
    let (assets, presets) = Fixtures::load(file.path())?.into_stores();

    // --- ASSERT ---
    let asset = assets.get_asset(&AssetId::new("A1"))?.expect("A1 is loaded");
    assert_eq!(asset.lods.len(), 1);
    assert_eq!(
        asset.stage_status(ProcessingStage::LodGeneration),
        Some(StageStatus::Failed)
    );
    assert_eq!(presets.get_lighting_preset("L1").map(|l| l.exposure), Some(1.2));
    assert_eq!(
        presets.get_render_preset("RP1").map(|r| r.camera.fov),
        Some(35.0)
    );
    assert_eq!(
        presets.get_material_variant("MV1").and_then(|v| v.roughness),
        Some(0.7)
    );
    Ok(())
}

#[test]
fn missing_fixture_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Fixtures::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, InfraError::Io { .. }));
}
