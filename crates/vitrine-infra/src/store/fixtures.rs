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

use crate::error::InfraError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vitrine_core::{Asset, LightingPreset, MaterialVariant, RenderPreset};

/// Store contents as read from a JSON document:
///
/// ```json
/// { "assets": [...], "lightingPresets": [...],
///   "renderPresets": [...], "materialVariants": [...] }
/// ```
///
/// Every list is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Fixtures {
    /// Asset records.
    pub assets: Vec<Asset>,
    /// Lighting presets.
    pub lighting_presets: Vec<LightingPreset>,
    /// Render presets.
    pub render_presets: Vec<RenderPreset>,
    /// Material variants.
    pub material_variants: Vec<MaterialVariant>,
}

impl Fixtures {
    /// Parses a fixture document. `origin` names it in errors.
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InfraError> {
        serde_json::from_str(text).map_err(|source| InfraError::Parse {
            path: origin.to_owned(),
            source,
        })
    }

    /// Reads a fixture file.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        log::info!("Fixtures: loading '{}'", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| InfraError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::AssetStatus;

    #[test]
    fn missing_lists_and_asset_fields_take_defaults() {
        let fixtures = Fixtures::from_json(
            r#"{ "assets": [{ "id": "A1", "masterUrl": "http://x/a.glb" }] }"#,
            "inline",
        )
        .unwrap();

        assert_eq!(fixtures.assets.len(), 1);
        assert_eq!(fixtures.assets[0].status, AssetStatus::Draft);
        assert!(fixtures.assets[0].lods.is_empty());
        assert!(fixtures.lighting_presets.is_empty());
    }

    #[test]
    fn parse_errors_name_the_source() {
        let err = Fixtures::from_json("{ \"assets\": 3 }", "fixtures.json").unwrap_err();
        assert!(err.to_string().contains("fixtures.json"));
    }
}
