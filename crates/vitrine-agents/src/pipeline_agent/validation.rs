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

//! Validation and optimization of master containers.

use serde::Serialize;
use vitrine_core::AssetId;
use vitrine_io::glb::has_glb_magic;
use vitrine_io::{cleanup, inspect, CleanupOptions, ContainerError, SceneModel};

/// Outcome of container validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// No errors were found. Warnings do not affect this.
    pub valid: bool,
    /// Problems that stop the pipeline.
    pub errors: Vec<String>,
    /// Problems worth reporting that the pipeline tolerates.
    pub warnings: Vec<String>,
    /// Container size in bytes.
    pub size: u64,
    /// glTF version declared by the container, when it could be read.
    pub version: Option<String>,
}

impl ValidationReport {
    pub(crate) fn rejected(size: u64, error: String) -> Self {
        Self {
            valid: false,
            errors: vec![error],
            warnings: Vec::new(),
            size,
            version: None,
        }
    }
}

/// Checks the size ceiling, the magic bytes and the full structure, in that
/// order. Each check only runs when the previous one passed.
pub fn validate_bytes(bytes: &[u8], max_file_size: u64) -> ValidationReport {
    let size = bytes.len() as u64;
    if size > max_file_size {
        return ValidationReport::rejected(
            size,
            format!("container is {size} bytes, limit is {max_file_size}"),
        );
    }
    if !has_glb_magic(bytes) {
        return ValidationReport::rejected(size, "not a binary glTF container".into());
    }

    let summary = match inspect(bytes) {
        Ok(summary) => summary,
        Err(e) => return ValidationReport::rejected(size, e.to_string()),
    };

    let mut warnings = Vec::new();
    if !summary.has_default_scene {
        warnings.push("no default scene".to_owned());
    }
    if summary.mesh_count == 0 {
        warnings.push("no meshes".to_owned());
    }
    for extension in &summary.unsupported_required {
        warnings.push(format!("unsupported required extension '{extension}'"));
    }

    ValidationReport {
        valid: true,
        errors: Vec::new(),
        warnings,
        size,
        version: Some(summary.version),
    }
}

/// Outcome of the optimization stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    /// Asset the container belongs to.
    pub asset_id: AssetId,
    /// Always the input URL: the cleaned container is measured, not stored.
    pub optimized_url: String,
    /// Master size in bytes.
    pub original_size: u64,
    /// Size the cleaned container would have.
    pub optimized_size: u64,
    /// `100 × (1 − optimized / original)`.
    pub savings_percent: f64,
    /// Vertices before cleanup.
    pub vertices_before: u64,
    /// Vertices after cleanup.
    pub vertices_after: u64,
}

/// Runs the cleanup transforms on `bytes` and measures the result.
/// Containers with compressed geometry cannot be edited and report no savings.
pub fn optimize_bytes(
    asset_id: &AssetId,
    url: &str,
    bytes: &[u8],
) -> Result<OptimizationReport, ContainerError> {
    let original_size = bytes.len() as u64;
    let (optimized_size, vertices_before, vertices_after) = match SceneModel::from_glb(bytes) {
        Ok(mut model) => {
            let report = cleanup(&mut model, &CleanupOptions::default());
            (
                model.to_glb()?.len() as u64,
                report.vertices_before,
                report.vertices_after,
            )
        }
        Err(ContainerError::Compressed(extension)) => {
            log::info!(
                "PipelineAgent: {} uses {}, nothing to optimize",
                asset_id,
                extension
            );
            (original_size, 0, 0)
        }
        Err(e) => return Err(e),
    };

    let savings_percent = if original_size == 0 {
        0.0
    } else {
        100.0 * (1.0 - optimized_size as f64 / original_size as f64)
    };
    Ok(OptimizationReport {
        asset_id: asset_id.clone(),
        optimized_url: url.to_owned(),
        original_size,
        optimized_size,
        savings_percent,
        vertices_before,
        vertices_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_input_is_rejected_before_parsing() {
        let report = validate_bytes(&[0u8; 64], 32);
        assert!(!report.valid);
        assert_eq!(report.size, 64);
        assert!(report.errors[0].contains("limit is 32"));
    }

    #[test]
    fn foreign_bytes_fail_the_magic_check() {
        let report = validate_bytes(b"PK\x03\x04 zip archive", 1024);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["not a binary glTF container".to_string()]);
        assert_eq!(report.version, None);
    }

    #[test]
    fn empty_scene_is_valid_with_warnings() {
        let bytes = SceneModel::default().to_glb().unwrap();
        let report = validate_bytes(&bytes, 1024 * 1024);
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.version.as_deref(), Some("2.0"));
        assert!(report.warnings.contains(&"no default scene".to_string()));
        assert!(report.warnings.contains(&"no meshes".to_string()));
    }

    /// One triangle whose `NORMAL` accessor describes a single vertex.
    fn mismatched_counts_glb() -> Vec<u8> {
        let mut bin = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u16, 1, 2] {
            bin.extend_from_slice(&index.to_le_bytes());
        }
        let json = serde_json::json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3" },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }] }]
        });
        vitrine_io::glb::assemble(serde_json::to_vec(&json).unwrap(), Some(bin)).unwrap()
    }

    #[test]
    fn mismatched_attribute_counts_fail_validation_and_optimization() {
        // --- ARRANGE ---
        let bytes = mismatched_counts_glb();
        let asset_id = AssetId::generate();

        // --- ACT ---
        let report = validate_bytes(&bytes, 1024 * 1024);
        let optimized = optimize_bytes(&asset_id, "file:///mismatched.glb", &bytes);

        // --- ASSERT ---
        assert!(!report.valid);
        assert!(report.errors[0].contains("NORMAL"), "{:?}", report.errors);
        assert!(matches!(optimized, Err(ContainerError::Primitive { .. })));
    }
}
