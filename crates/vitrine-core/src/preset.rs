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

//! Preset and material-variant records, read-only to the pipeline.

use crate::asset::AssetId;
use serde::{Deserialize, Serialize};

/// A named image-based lighting setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingPreset {
    /// Preset identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// URL of the HDR environment map.
    pub hdri_url: String,
    /// Exposure multiplier applied by the tone mapper.
    pub exposure: f32,
    /// Environment light intensity.
    pub intensity: f32,
}

/// Camera placement used by a render preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Eye position in world space.
    pub position: [f32; 3],
    /// Look-at target in world space.
    pub target: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 45.0,
            position: [3.0, 3.0, 3.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// A saved viewpoint for one asset, pinning a camera and a lighting preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPreset {
    /// Preset identifier.
    pub id: String,
    /// The asset this preset was authored for.
    pub asset_id: AssetId,
    /// Human-readable name.
    pub name: String,
    /// The lighting preset it references.
    pub lighting_preset_id: String,
    /// The pinned camera.
    pub camera: CameraSettings,
}

/// An alternative PBR material set for one asset.
///
/// Every field except the identifiers is optional; absent fields leave the
/// container's own material untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialVariant {
    /// Variant identifier.
    pub id: String,
    /// The asset this variant belongs to.
    pub asset_id: AssetId,
    /// Human-readable name.
    pub name: String,
    /// Base color (albedo) map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albedo_map_url: Option<String>,
    /// Tangent-space normal map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_map_url: Option<String>,
    /// Metallic map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_map_url: Option<String>,
    /// Roughness map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness_map_url: Option<String>,
    /// Ambient occlusion map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ao_map_url: Option<String>,
    /// Emissive map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_map_url: Option<String>,
    /// Scalar metallic factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic: Option<f32>,
    /// Scalar roughness factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f32>,
    /// Linear RGBA base color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color: Option<[f32; 4]>,
}
