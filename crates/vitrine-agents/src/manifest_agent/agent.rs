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

//! The ManifestAgent resolves viewer requests into render manifests.
//!
//! It only reads: the asset record, then at most one render preset, one
//! lighting preset and one material variant. Concurrent calls are safe and
//! identical calls against unchanged records produce identical documents.

use super::document::{
    DeviceClass, ManifestAsset, ManifestBody, ManifestCapabilities, ManifestFormats,
    ManifestLighting, ManifestLod, ManifestVersion, MaterialOverlay, QualityProfile,
    RenderManifest,
};
use crate::error::ManifestError;
use std::sync::Arc;
use vitrine_core::{
    Asset, AssetId, AssetKind, AssetStore, CameraSettings, CdnTransformer, PresetStore,
    TextureFormatTag,
};
use vitrine_lanes::detect_device_capabilities;

/// What a viewer asks for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestRequest {
    /// Asset to render.
    pub asset_id: AssetId,
    /// Saved viewpoint; its lighting and camera win over `lighting_preset_id`.
    pub render_preset_id: Option<String>,
    /// Lighting to use with the default camera.
    pub lighting_preset_id: Option<String>,
    /// Material overlay.
    pub material_variant_id: Option<String>,
    /// Quality class.
    pub device: DeviceClass,
    /// Texture encoding the client wants.
    pub texture_format: Option<TextureFormatTag>,
    /// Highest detail level index to list.
    pub max_lod: Option<u32>,
    /// The client would rather have compressed textures.
    pub prefer_compressed: bool,
}

impl ManifestRequest {
    /// A request with every option left at its default.
    pub fn new(asset_id: impl Into<AssetId>) -> Self {
        Self {
            asset_id: asset_id.into(),
            ..Self::default()
        }
    }

    /// A request tuned to the client behind `user_agent`: mobile quality on
    /// phones and tablets, compressed textures when it can transcode them.
    pub fn for_user_agent(asset_id: impl Into<AssetId>, user_agent: &str) -> Self {
        let capabilities = detect_device_capabilities(user_agent);
        Self {
            device: if capabilities.mobile {
                DeviceClass::Mobile
            } else {
                DeviceClass::Desktop
            },
            prefer_compressed: capabilities.supports_basis_transcode,
            ..Self::new(asset_id)
        }
    }

    fn wants_compressed_textures(&self) -> bool {
        self.prefer_compressed || self.texture_format.is_some_and(TextureFormatTag::is_compressed)
    }

    fn asks_for_v2(&self) -> bool {
        self.texture_format.is_some() || self.max_lod.is_some() || self.prefer_compressed
    }
}

/// Builds render manifests from store records.
#[derive(Clone)]
pub struct ManifestAgent {
    assets: Arc<dyn AssetStore>,
    presets: Arc<dyn PresetStore>,
    cdn: Option<Arc<dyn CdnTransformer>>,
}

impl std::fmt::Debug for ManifestAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestAgent")
            .field("cdn", &self.cdn.is_some())
            .finish_non_exhaustive()
    }
}

impl ManifestAgent {
    /// Creates an agent serving origin URLs.
    pub fn new(assets: Arc<dyn AssetStore>, presets: Arc<dyn PresetStore>) -> Self {
        Self {
            assets,
            presets,
            cdn: None,
        }
    }

    /// Rewrites every URL of the produced manifests through `cdn`.
    pub fn with_cdn(mut self, cdn: Arc<dyn CdnTransformer>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    /// Resolves a request.
    pub fn generate(&self, request: &ManifestRequest) -> Result<RenderManifest, ManifestError> {
        let asset = self
            .assets
            .get_asset(&request.asset_id)?
            .ok_or_else(|| ManifestError::AssetNotFound(request.asset_id.clone()))?;

        let (lighting, camera) = self.resolve_scene(request)?;
        let material = self.resolve_material(request)?;

        let version = if request.asks_for_v2()
            || asset.compressed_textures().is_some()
            || asset.has_lods()
        {
            ManifestVersion::V2
        } else {
            ManifestVersion::V1
        };

        let url = self.rewrite(&asset.master_url, AssetKind::Model);
        let (formats, capabilities) = match version {
            ManifestVersion::V1 => (None, None),
            ManifestVersion::V2 => (
                Some(self.formats(&asset, request, url.clone())),
                Some(ManifestCapabilities {
                    compressed_textures: asset.compressed_textures().is_some(),
                    lods: asset.has_lods(),
                    lod_count: asset.lods.len(),
                }),
            ),
        };

        log::debug!(
            "ManifestAgent: {} resolved as {:?} for {}",
            asset.id,
            version,
            request.device
        );
        Ok(RenderManifest {
            version,
            manifest: ManifestBody {
                asset: ManifestAsset {
                    id: asset.id.to_string(),
                    url,
                    format: asset.container_format(),
                    formats,
                },
                material,
                lighting,
                camera,
                quality: QualityProfile::for_device(request.device),
                capabilities,
            },
        })
    }

    /// Resolves a request carrying only the asset and the device class.
    pub fn generate_default(
        &self,
        asset_id: &AssetId,
        device: DeviceClass,
    ) -> Result<RenderManifest, ManifestError> {
        self.generate(&ManifestRequest {
            device,
            ..ManifestRequest::new(asset_id.clone())
        })
    }

    /// Cache headers for responses serving `kind`, empty without a CDN.
    pub fn cache_headers(&self, kind: AssetKind) -> Vec<(String, String)> {
        self.cdn
            .as_ref()
            .map(|cdn| cdn.cache_headers(kind))
            .unwrap_or_default()
    }

    fn rewrite(&self, url: &str, kind: AssetKind) -> String {
        match &self.cdn {
            Some(cdn) => cdn.transform_url(url, kind),
            None => url.to_owned(),
        }
    }

    /// Render preset first, then lighting preset with the default camera,
    /// then the built-in studio setup.
    fn resolve_scene(
        &self,
        request: &ManifestRequest,
    ) -> Result<(ManifestLighting, CameraSettings), ManifestError> {
        if let Some(preset_id) = &request.render_preset_id {
            let preset = self
                .presets
                .get_render_preset(preset_id)
                .ok_or_else(|| ManifestError::RenderPresetNotFound(preset_id.clone()))?;
            if preset.asset_id != request.asset_id {
                return Err(ManifestError::InvalidRenderPreset {
                    preset: preset.id,
                    asset: request.asset_id.clone(),
                });
            }
            let lighting = self.lighting(&preset.lighting_preset_id)?;
            return Ok((lighting, preset.camera));
        }

        let lighting = match &request.lighting_preset_id {
            Some(id) => self.lighting(id)?,
            None => self.studio_lighting(),
        };
        Ok((lighting, CameraSettings::default()))
    }

    fn lighting(&self, id: &str) -> Result<ManifestLighting, ManifestError> {
        let mut lighting: ManifestLighting = self
            .presets
            .get_lighting_preset(id)
            .ok_or_else(|| ManifestError::LightingPresetNotFound(id.to_owned()))?
            .into();
        lighting.hdri = self.rewrite(&lighting.hdri, AssetKind::Environment);
        Ok(lighting)
    }

    fn studio_lighting(&self) -> ManifestLighting {
        let mut lighting = ManifestLighting::studio();
        lighting.hdri = self.rewrite(&lighting.hdri, AssetKind::Environment);
        lighting
    }

    fn resolve_material(
        &self,
        request: &ManifestRequest,
    ) -> Result<Option<MaterialOverlay>, ManifestError> {
        let Some(variant_id) = &request.material_variant_id else {
            return Ok(None);
        };
        let variant = self
            .presets
            .get_material_variant(variant_id)
            .ok_or_else(|| ManifestError::MaterialVariantNotFound(variant_id.clone()))?;
        if variant.asset_id != request.asset_id {
            return Err(ManifestError::InvalidMaterialVariant {
                variant: variant.id,
                asset: request.asset_id.clone(),
            });
        }
        Ok(Some(variant.into()))
    }

    fn formats(&self, asset: &Asset, request: &ManifestRequest, primary: String) -> ManifestFormats {
        let compressed_textures = asset
            .compressed_textures()
            .filter(|_| request.wants_compressed_textures())
            .map(|record| self.rewrite(&record.url, AssetKind::Texture));

        let lods = asset
            .lods
            .iter()
            .filter(|lod| request.max_lod.map_or(true, |max| lod.level <= max))
            .map(|lod| ManifestLod {
                level: lod.level,
                url: self.rewrite(&lod.url, AssetKind::Lod),
                distance: lod.distance,
                vertex_count: lod.vertex_count,
                file_size: lod.file_size,
            })
            .collect();

        ManifestFormats {
            primary,
            compressed_textures,
            lods,
        }
    }
}
