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

//! Structural inspection of a container without building a [`SceneModel`].

use crate::error::ContainerError;
use crate::glb::{check_header, has_glb_magic};
use crate::model::{SceneModel, COMPRESSION_EXTENSIONS};

/// Extensions the pipeline can carry through its transforms.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "KHR_materials_emissive_strength",
    "KHR_materials_ior",
    "KHR_materials_specular",
    "KHR_materials_transmission",
    "KHR_materials_unlit",
    "KHR_materials_variants",
    "KHR_mesh_quantization",
    "KHR_texture_basisu",
    "KHR_texture_transform",
    "KHR_draco_mesh_compression",
    "EXT_meshopt_compression",
    "EXT_texture_webp",
];

/// What a structural parse found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// `asset.version` of the document.
    pub version: String,
    /// Whether the document names a default scene.
    pub has_default_scene: bool,
    /// Number of meshes.
    pub mesh_count: usize,
    /// Number of embedded or referenced images.
    pub image_count: usize,
    /// Required extensions outside [`SUPPORTED_EXTENSIONS`].
    pub unsupported_required: Vec<String>,
    /// Whether the geometry uses a compression extension.
    pub compressed: bool,
}

/// Parses the container framing and its document, then decodes every
/// accessor so out-of-range references are caught.
pub fn inspect(bytes: &[u8]) -> Result<ContainerSummary, ContainerError> {
    check_header(bytes)?;
    let gltf = gltf::Gltf::from_slice_without_validation(bytes)?;
    let document = &gltf.document;
    let compressed = declares_any(document, &COMPRESSION_EXTENSIONS);

    if !compressed {
        SceneModel::from_glb(bytes)?;
    }

    Ok(ContainerSummary {
        version: document.as_json().asset.version.clone(),
        has_default_scene: document.default_scene().is_some(),
        mesh_count: document.meshes().len(),
        image_count: document.images().len(),
        unsupported_required: document
            .extensions_required()
            .filter(|name| !SUPPORTED_EXTENSIONS.contains(name))
            .map(str::to_owned)
            .collect(),
        compressed,
    })
}

fn declares_any(document: &gltf::Document, names: &[&str]) -> bool {
    let root = document.as_json();
    root.extensions_used
        .iter()
        .chain(&root.extensions_required)
        .any(|name| names.contains(&name.as_str()))
}

/// Whether the container declares `KHR_draco_mesh_compression`.
///
/// Looks only at the framing and the JSON chunk and never fails: any
/// malformed input is reported as not encoded.
pub fn is_draco_encoded(bytes: &[u8]) -> bool {
    if !has_glb_magic(bytes) || check_header(bytes).is_err() {
        return false;
    }
    gltf::Gltf::from_slice_without_validation(bytes)
        .is_ok_and(|gltf| declares_any(&gltf.document, &["KHR_draco_mesh_compression"]))
}

/// Whether the container declares any geometry compression extension,
/// Draco or meshopt. Never fails, like [`is_draco_encoded`].
pub fn is_compressed(bytes: &[u8]) -> bool {
    if !has_glb_magic(bytes) || check_header(bytes).is_err() {
        return false;
    }
    gltf::Gltf::from_slice_without_validation(bytes)
        .is_ok_and(|gltf| declares_any(&gltf.document, &COMPRESSION_EXTENSIONS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glb::assemble;

    #[test]
    fn short_or_foreign_buffers_are_not_encoded() {
        assert!(!is_draco_encoded(b""));
        assert!(!is_draco_encoded(b"glT"));
        assert!(!is_draco_encoded(b"XXXX KHR_draco_mesh_compression"));
    }

    #[test]
    fn draco_marker_is_found_in_the_json_chunk() {
        let json = br#"{"asset":{"version":"2.0"},"extensionsUsed":["KHR_draco_mesh_compression"]}"#;
        let bytes = assemble(json.to_vec(), None).unwrap();
        assert!(is_draco_encoded(&bytes));
    }

    #[test]
    fn meshopt_marker_counts_as_compressed_but_not_as_draco() {
        let json = br#"{"asset":{"version":"2.0"},"extensionsUsed":["EXT_meshopt_compression"]}"#;
        let bytes = assemble(json.to_vec(), None).unwrap();
        assert!(is_compressed(&bytes));
        assert!(!is_draco_encoded(&bytes));
    }

    #[test]
    fn mismatched_attribute_counts_are_reported_not_panicked_on() {
        // POSITION describes three vertices, NORMAL only one.
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 54}],
            "bufferViews": [{"buffer": 0, "byteLength": 54}],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0, 0, 0], "max": [1, 1, 0]},
                {"bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3"},
                {"bufferView": 0, "byteOffset": 48, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "NORMAL": 1}, "indices": 2}]}]
        }"#;
        let mut bin = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u16, 1, 2] {
            bin.extend_from_slice(&index.to_le_bytes());
        }
        let bytes = assemble(json.to_vec(), Some(bin)).unwrap();

        let error = inspect(&bytes).unwrap_err();

        assert!(
            matches!(error, ContainerError::Primitive { mesh: 0, primitive: 0, .. }),
            "{error}"
        );
    }
}
