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

#![allow(dead_code)]

use gltf::json::Index;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Cursor;
use vitrine_io::{
    ImageSource, MeshData, ModelImage, Primitive, SceneModel, Semantic, VertexAttribute,
};

/// Builds a typed document object from a JSON literal.
pub fn typed<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("valid glTF object")
}

/// A flat `cells` x `cells` grid of unit quads in the XZ plane, indexed,
/// with normals and texture coordinates, one node and one material.
pub fn grid_model(cells: usize) -> SceneModel {
    let side = cells + 1;
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    for row in 0..side {
        for col in 0..side {
            positions.extend([col as f32, 0.0, row as f32]);
            normals.extend([0.0, 1.0, 0.0]);
            uvs.extend([col as f32 / cells as f32, row as f32 / cells as f32]);
        }
    }
    let mut indices = Vec::new();
    for row in 0..cells {
        for col in 0..cells {
            let a = (row * side + col) as u32;
            let b = a + 1;
            let c = a + side as u32;
            let d = c + 1;
            indices.extend([a, c, b, b, c, d]);
        }
    }
    let mut attributes = BTreeMap::new();
    attributes.insert(Semantic::Positions, VertexAttribute::float(3, positions));
    attributes.insert(Semantic::Normals, VertexAttribute::float(3, normals));
    attributes.insert(Semantic::TexCoords(0), VertexAttribute::float(2, uvs));
    let mut primitive = Primitive::triangles(attributes, Some(indices));
    primitive.material = Some(0);

    let mut model = SceneModel {
        meshes: vec![MeshData {
            name: Some("grid".into()),
            primitives: vec![primitive],
            ..MeshData::default()
        }],
        ..SceneModel::default()
    };
    let document = &mut model.document;
    document.scene = Some(Index::new(0));
    document.scenes = vec![typed(json!({ "nodes": [0] }))];
    document.nodes = vec![typed(json!({ "name": "grid", "mesh": 0 }))];
    document.materials = vec![typed(json!({
        "name": "surface",
        "pbrMetallicRoughness": { "metallicFactor": 0.0, "roughnessFactor": 0.8 }
    }))];
    model
}

/// Expands every indexed primitive into a triangle soup, duplicating shared
/// vertices the way naive exporters do.
pub fn unwelded(mut model: SceneModel) -> SceneModel {
    for primitive in model.primitives_mut() {
        let indices = primitive.indices.take().unwrap_or_default();
        for attribute in primitive.attributes.values_mut() {
            let mut values = Vec::new();
            for &index in &indices {
                values.extend_from_slice(attribute.vertex(index as usize));
            }
            attribute.values = values;
        }
    }
    model
}

/// A small PNG with a deterministic gradient.
pub fn png(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([x as u8 ^ seed, y as u8, seed, 255])
    });
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png encoding");
    bytes.into_inner()
}

/// Embeds `bytes` as a new image and makes it material 0's base color.
pub fn with_base_color(model: &mut SceneModel, bytes: Vec<u8>) {
    model.images.push(ModelImage {
        name: Some("albedo".into()),
        mime_type: "image/png".into(),
        source: ImageSource::Embedded(bytes),
    });
    let document = &mut model.document;
    document
        .textures
        .push(typed(json!({ "source": model.images.len() - 1 })));
    document.materials[0].pbr_metallic_roughness.base_color_texture =
        Some(typed(json!({ "index": document.textures.len() - 1 })));
}
