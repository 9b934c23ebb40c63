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

//! The JSON document served to viewers.
//!
//! Field order is fixed by the struct layout, so serializing the same
//! document twice yields the same bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vitrine_core::{CameraSettings, LightingPreset, MaterialVariant};

/// Schema version of a [`RenderManifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ManifestVersion {
    /// Asset, material, lighting, camera and quality only.
    #[serde(rename = "1.0")]
    V1,
    /// Adds `asset.formats` and `capabilities`.
    #[serde(rename = "2.0")]
    V2,
}

/// Class of device the manifest is tuned for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Full quality.
    #[default]
    Desktop,
    /// Reduced quality for phones and tablets.
    Mobile,
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(DeviceClass::Desktop),
            "mobile" => Ok(DeviceClass::Mobile),
            other => Err(format!("unknown device class '{other}'")),
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
        })
    }
}

/// Rendering quality settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    /// Shadow maps enabled.
    pub shadows: bool,
    /// `"fxaa"` or `"none"`.
    pub antialiasing: &'static str,
    /// `"aces"` or `"linear"`.
    pub tone_mapping: &'static str,
}

impl QualityProfile {
    /// The fixed profile of a device class.
    pub fn for_device(device: DeviceClass) -> Self {
        match device {
            DeviceClass::Desktop => Self {
                shadows: true,
                antialiasing: "fxaa",
                tone_mapping: "aces",
            },
            DeviceClass::Mobile => Self {
                shadows: false,
                antialiasing: "none",
                tone_mapping: "linear",
            },
        }
    }
}

/// The `lighting` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLighting {
    /// Preset id, `"default"` for the built-in studio lighting.
    pub id: String,
    /// Preset name.
    pub name: String,
    /// Environment map URL.
    pub hdri: String,
    /// Exposure multiplier.
    pub exposure: f32,
    /// Environment intensity.
    pub intensity: f32,
}

impl ManifestLighting {
    /// Lighting used when the request names no preset.
    pub fn studio() -> Self {
        Self {
            id: "default".into(),
            name: "Studio".into(),
            hdri: "/environments/studio.hdr".into(),
            exposure: 1.0,
            intensity: 1.0,
        }
    }
}

impl From<LightingPreset> for ManifestLighting {
    fn from(preset: LightingPreset) -> Self {
        Self {
            id: preset.id,
            name: preset.name,
            hdri: preset.hdri_url,
            exposure: preset.exposure,
            intensity: preset.intensity,
        }
    }
}

/// The `material` block: the PBR fields a variant sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialOverlay {
    /// Variant id.
    pub id: String,
    /// Variant name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albedo_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ao_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color: Option<[f32; 4]>,
}

impl From<MaterialVariant> for MaterialOverlay {
    fn from(variant: MaterialVariant) -> Self {
        Self {
            id: variant.id,
            name: variant.name,
            albedo_map: variant.albedo_map_url,
            normal_map: variant.normal_map_url,
            metallic_map: variant.metallic_map_url,
            roughness_map: variant.roughness_map_url,
            ao_map: variant.ao_map_url,
            emissive_map: variant.emissive_map_url,
            metallic: variant.metallic,
            roughness: variant.roughness,
            base_color: variant.base_color,
        }
    }
}

/// One entry of `asset.formats.lods`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLod {
    /// Detail level.
    pub level: u32,
    /// Container URL, CDN-rewritten.
    pub url: String,
    /// Switch distance in meters.
    pub distance: f32,
    /// Vertex count.
    pub vertex_count: u64,
    /// Container size in bytes.
    pub file_size: u64,
}

/// The v2 `asset.formats` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFormats {
    /// Master container URL.
    pub primary: String,
    /// Container carrying KTX2 textures, when the client asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_textures: Option<String>,
    /// Detail levels up to the requested ceiling, in level order.
    pub lods: Vec<ManifestLod>,
}

/// The `asset` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestAsset {
    /// Asset id.
    pub id: String,
    /// Master container URL.
    pub url: String,
    /// `"glb"` or `"gltf"`.
    pub format: &'static str,
    /// Derived containers, v2 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<ManifestFormats>,
}

/// The v2 `capabilities` block. Reports what the asset has, whatever the
/// request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestCapabilities {
    /// The asset has a KTX2 texture container.
    pub compressed_textures: bool,
    /// The asset has detail levels.
    pub lods: bool,
    /// Number of detail levels.
    pub lod_count: usize,
}

/// The `manifest` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBody {
    pub asset: ManifestAsset,
    /// Absent entirely when no variant was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialOverlay>,
    pub lighting: ManifestLighting,
    pub camera: CameraSettings,
    pub quality: QualityProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ManifestCapabilities>,
}

/// A resolved render manifest, `{ "version": ..., "manifest": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderManifest {
    pub version: ManifestVersion,
    pub manifest: ManifestBody,
}

impl RenderManifest {
    /// Compact JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_table_has_two_entries() {
        let desktop = QualityProfile::for_device(DeviceClass::default());
        let mobile = QualityProfile::for_device(DeviceClass::Mobile);

        assert!(desktop.shadows);
        assert_eq!(desktop.antialiasing, "fxaa");
        assert_eq!(mobile.tone_mapping, "linear");
        assert!(!mobile.shadows);
    }

    #[test]
    fn variant_fields_that_are_unset_are_omitted() {
        let overlay = MaterialOverlay::from(MaterialVariant {
            id: "MV1".into(),
            name: "Walnut".into(),
            roughness: Some(0.5),
            ..Default::default()
        });
        let json = serde_json::to_value(&overlay).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "id": "MV1", "name": "Walnut", "roughness": 0.5 })
        );
    }

    #[test]
    fn device_class_parses_its_display_form() {
        for device in [DeviceClass::Desktop, DeviceClass::Mobile] {
            assert_eq!(device.to_string().parse::<DeviceClass>(), Ok(device));
        }
        assert!("tablet".parse::<DeviceClass>().is_err());
    }
}
