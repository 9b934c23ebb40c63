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
use common::{grid_model, png, typed, unwelded, with_base_color};
use gltf::json::accessor::Type;
use serde_json::{json, Value};
use vitrine_io::glb::{assemble, has_glb_magic, split};
use vitrine_io::model::OpaqueAccessor;
use vitrine_io::transforms::quantize;
use vitrine_io::{
    cleanup, inspect, CleanupOptions, ComponentType, ContainerError, QuantizeOptions, SceneModel,
    Semantic,
};

/// The JSON chunk of a container, untyped.
fn document_json(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(&split(bytes)?.json)?)
}

/// A one-triangle container with a `NORMAL` accessor of `normal_count`
/// elements and the given indices.
fn triangle_glb(normal_count: usize, indices: [u16; 3]) -> Result<Vec<u8>> {
    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for value in [0.0f32, 0.0, 1.0].repeat(3) {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in indices {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    let document = json!({
        "asset": { "version": "2.0" },
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteLength": 72, "target": 34962 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 6, "target": 34963 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 0, "byteOffset": 36, "componentType": 5126, "count": normal_count, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }] }],
        "nodes": [{ "mesh": 0 }],
        "scenes": [{ "nodes": [0] }],
        "scene": 0
    });
    Ok(assemble(serde_json::to_vec(&document)?, Some(bin))?)
}

#[test]
fn written_container_reads_back_identically() -> Result<()> {
    // --- ARRANGE ---
    let mut model = grid_model(4);
    with_base_color(&mut model, png(8, 8, 3));

    // --- ACT ---
    let bytes = model.to_glb()?;
    let decoded = SceneModel::from_glb(&bytes)?;

    // --- ASSERT ---
    assert!(has_glb_magic(&bytes));
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(decoded.vertex_count(), 25);
    assert_eq!(decoded.triangle_count(), 32);
    assert_eq!(
        decoded.meshes[0].primitives[0].attributes[&Semantic::Positions],
        model.meshes[0].primitives[0].attributes[&Semantic::Positions]
    );
    assert_eq!(decoded.meshes[0].primitives[0].indices, model.meshes[0].primitives[0].indices);
    assert_eq!(decoded.images, model.images);
    assert_eq!(
        serde_json::to_value(&decoded.document.materials)?,
        serde_json::to_value(&model.document.materials)?
    );
    assert!(decoded.document.accessors.is_empty());
    Ok(())
}

#[test]
fn small_index_ranges_are_stored_as_u16_with_position_bounds() -> Result<()> {
    let bytes = grid_model(2).to_glb()?;
    let document = document_json(&bytes)?;
    let primitive = &document["meshes"][0]["primitives"][0];
    let indices = &document["accessors"][primitive["indices"].as_u64().unwrap() as usize];
    assert_eq!(indices["componentType"], 5123);

    let position = &document["accessors"][primitive["attributes"]["POSITION"].as_u64().unwrap() as usize];
    assert_eq!(position["min"], json!([0.0, 0.0, 0.0]));
    assert_eq!(position["max"], json!([2.0, 0.0, 2.0]));
    Ok(())
}

#[test]
fn inspection_reports_structure_and_warnings() -> Result<()> {
    let mut model = grid_model(1);
    with_base_color(&mut model, png(4, 4, 1));
    let summary = inspect(&model.to_glb()?)?;
    assert_eq!(summary.version, "2.0");
    assert!(summary.has_default_scene);
    assert_eq!(summary.mesh_count, 1);
    assert_eq!(summary.image_count, 1);
    assert!(summary.unsupported_required.is_empty());

    let mut bare = SceneModel::default();
    bare.declare_extension("EXT_made_up", true);
    let summary = inspect(&bare.to_glb()?)?;
    assert!(!summary.has_default_scene);
    assert_eq!(summary.mesh_count, 0);
    assert_eq!(summary.unsupported_required, vec!["EXT_made_up".to_string()]);
    Ok(())
}

#[test]
fn cleanup_welds_an_exploded_grid_back_together() -> Result<()> {
    // --- ARRANGE ---
    let bytes = unwelded(grid_model(3)).to_glb()?;
    let mut model = SceneModel::from_glb(&bytes)?;
    assert_eq!(model.vertex_count(), 54);

    // --- ACT ---
    let report = cleanup(&mut model, &CleanupOptions::default());

    // --- ASSERT ---
    assert_eq!(report.vertices_before, 54);
    assert_eq!(report.vertices_after, 16);
    assert_eq!(report.welded, 38);
    assert_eq!(model.triangle_count(), 18);
    assert!(model.to_glb()?.len() < bytes.len());
    Ok(())
}

#[test]
fn quantized_normals_declare_mesh_quantization() -> Result<()> {
    let mut model = grid_model(2);
    assert!(quantize(&mut model, &QuantizeOptions::default()) >= 2);

    let bytes = model.to_glb()?;
    assert_eq!(document_json(&bytes)?["extensionsRequired"], json!(["KHR_mesh_quantization"]));

    let decoded = SceneModel::from_glb(&bytes)?;
    let normal = &decoded.meshes[0].primitives[0].attributes[&Semantic::Normals];
    assert_eq!(normal.format.component_type, ComponentType::I16);
    assert!(normal.values.chunks(3).all(|n| (n[1] - 1.0).abs() < 1e-3));
    Ok(())
}

#[test]
fn skin_accessors_survive_a_rewrite() -> Result<()> {
    let mut model = grid_model(1);
    let matrix: Vec<u8> = [1.0f32, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    model
        .opaque_accessors
        .push(OpaqueAccessor::new(ComponentType::F32, Type::Mat4, 1, matrix.clone()));
    model
        .document
        .skins
        .push(typed(json!({ "joints": [0], "inverseBindMatrices": 0 })));

    let bytes = model.to_glb()?;
    let written = document_json(&bytes)?;
    let decoded = SceneModel::from_glb(&bytes)?;

    assert_ne!(written["skins"][0]["inverseBindMatrices"], 0);
    let matrices = decoded.document.skins[0].inverse_bind_matrices;
    assert_eq!(matrices.map(|index| index.value()), Some(0));
    assert_eq!(decoded.opaque_accessors[0].bytes, matrix);
    Ok(())
}

#[test]
fn compressed_geometry_is_refused_for_editing() -> Result<()> {
    let document = json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "extensionsRequired": ["KHR_draco_mesh_compression"]
    });
    let bytes = assemble(serde_json::to_vec(&document)?, None)?;
    assert!(matches!(
        SceneModel::from_glb(&bytes),
        Err(ContainerError::Compressed(_))
    ));
    assert!(inspect(&bytes)?.compressed);
    Ok(())
}

#[test]
fn attribute_count_mismatch_is_refused_before_any_transform() -> Result<()> {
    // --- ARRANGE ---
    let bytes = triangle_glb(1, [0, 1, 2])?;

    // --- ACT ---
    let decoded = SceneModel::from_glb(&bytes);

    // --- ASSERT ---
    match decoded {
        Err(ContainerError::Primitive { mesh, primitive, reason }) => {
            assert_eq!((mesh, primitive), (0, 0));
            assert!(reason.contains("NORMAL"), "{reason}");
        }
        other => panic!("expected a primitive error, got {other:?}"),
    }
    assert!(inspect(&bytes).is_err());
    Ok(())
}

#[test]
fn out_of_range_index_is_refused() -> Result<()> {
    // --- ARRANGE ---
    let bytes = triangle_glb(3, [0, 1, 7])?;

    // --- ACT ---
    let decoded = SceneModel::from_glb(&bytes);

    // --- ASSERT ---
    assert!(
        matches!(&decoded, Err(ContainerError::Primitive { reason, .. }) if reason.contains("index 7")),
        "{decoded:?}"
    );
    Ok(())
}

#[test]
fn consistent_triangle_decodes_and_welds() -> Result<()> {
    let mut model = SceneModel::from_glb(&triangle_glb(3, [0, 1, 2])?)?;
    assert_eq!(model.vertex_count(), 3);
    let report = cleanup(&mut model, &CleanupOptions::default());
    assert_eq!(report.vertices_after, 3);
    Ok(())
}

#[test]
fn accessor_running_past_its_view_is_refused() -> Result<()> {
    // --- ARRANGE ---
    // Four normals starting at byte 36 need 48 bytes; the view holds 72.
    let bytes = triangle_glb(4, [0, 1, 2])?;

    // --- ACT ---
    let decoded = SceneModel::from_glb(&bytes);

    // --- ASSERT ---
    assert!(
        matches!(decoded, Err(ContainerError::Accessor { index: 1, .. })),
        "{decoded:?}"
    );
    Ok(())
}

#[test]
fn absurd_accessor_count_is_refused_without_overflow() -> Result<()> {
    let bytes = triangle_glb(3, [0, 1, 2])?;
    let mut document = document_json(&bytes)?;
    document["accessors"][1]["count"] = json!(u64::MAX / 2);
    let bin = split(&bytes)?.bin.map(|bin| bin.into_owned());
    let bytes = assemble(serde_json::to_vec(&document)?, bin)?;

    assert!(matches!(
        SceneModel::from_glb(&bytes),
        Err(ContainerError::Accessor { index: 1, .. })
    ));
    Ok(())
}
