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

use serde_json::json;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use vitrine_core::ObjectStorage;
use vitrine_io::{
    ImageSource, MeshData, ModelImage, Primitive, SceneModel, ScratchSpace, Semantic, UrlStorage,
    VertexAttribute,
};

/// Builds a typed document object from a JSON literal.
pub fn typed<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).expect("valid glTF object")
}

/// A temporary directory holding input containers and a scratch root.
pub struct Workspace {
    pub dir: TempDir,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            storage: Arc::new(UrlStorage::new()),
        }
    }

    pub fn scratch(&self) -> ScratchSpace {
        ScratchSpace::new(self.dir.path().join("scratch")).expect("scratch root")
    }

    /// Writes `model` as `name` and returns its path as a URL string.
    pub fn put(&self, name: &str, model: &SceneModel) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, model.to_glb().expect("encodable model")).expect("write input");
        path_url(&path)
    }

    pub fn path(&self, name: &str) -> String {
        path_url(&self.dir.path().join(name))
    }
}

fn path_url(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A flat grid of `cells` x `cells` quads as an exporter without vertex
/// sharing would write it: every triangle has its own three vertices.
pub fn exploded_grid(cells: usize) -> SceneModel {
    let corner = |row: usize, col: usize| [col as f32, 0.0, row as f32];
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    for row in 0..cells {
        for col in 0..cells {
            let quad = [
                (row, col),
                (row + 1, col),
                (row, col + 1),
                (row, col + 1),
                (row + 1, col),
                (row + 1, col + 1),
            ];
            for (r, c) in quad {
                positions.extend(corner(r, c));
                normals.extend([0.0, 1.0, 0.0]);
                uvs.extend([c as f32 / cells as f32, r as f32 / cells as f32]);
            }
        }
    }
    let mut attributes = BTreeMap::new();
    attributes.insert(Semantic::Positions, VertexAttribute::float(3, positions));
    attributes.insert(Semantic::Normals, VertexAttribute::float(3, normals));
    attributes.insert(Semantic::TexCoords(0), VertexAttribute::float(2, uvs));
    let mut primitive = Primitive::triangles(attributes, None);
    primitive.material = Some(0);

    let mut model = SceneModel {
        meshes: vec![MeshData {
            name: Some("floor".into()),
            primitives: vec![primitive],
            ..MeshData::default()
        }],
        ..SceneModel::default()
    };
    let document = &mut model.document;
    document.scene = Some(typed(json!(0)));
    document.scenes = vec![typed(json!({ "nodes": [0] }))];
    document.nodes = vec![typed(json!({ "name": "floor", "mesh": 0 }))];
    document.materials = vec![typed(json!({ "name": "tiles" }))];
    model
}

/// A PNG filled with a checker pattern.
pub fn checker_png(size: u32, seed: u8) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(size, size, |x, y| {
        let on = (x / 4 + y / 4) % 2 == 0;
        image::Rgba(if on { [seed, 200, 40, 255] } else { [10, seed, 90, 255] })
    });
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png encoding");
    bytes.into_inner()
}

/// Adds an embedded PNG used as a base color texture by a new material.
pub fn add_texture(model: &mut SceneModel, name: &str, png: Vec<u8>) {
    model.images.push(ModelImage {
        name: Some(name.into()),
        mime_type: "image/png".into(),
        source: ImageSource::Embedded(png),
    });
    let document = &mut model.document;
    document
        .textures
        .push(typed(json!({ "source": model.images.len() - 1 })));
    document.materials.push(typed(json!({
        "name": name,
        "pbrMetallicRoughness": { "baseColorTexture": { "index": document.textures.len() - 1 } }
    })));
}
