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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vitrine_agents::{Adapters, PipelineAgent, VitrineConfig};
use vitrine_core::{Asset, AssetStore, ObjectStorage, StorageError};
use vitrine_infra::InMemoryAssetStore;
use vitrine_io::{
    ImageSource, MeshData, ModelImage, Primitive, SceneModel, ScratchSpace, Semantic, UrlStorage,
    VertexAttribute,
};
use vitrine_lanes::NoTools;

pub const IDLE: Duration = Duration::from_secs(30);

/// A pipeline wired to in-memory records and containers in a temporary
/// directory, with no external tool available.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<InMemoryAssetStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub agent: PipelineAgent,
}

impl Harness {
    pub fn new(config: VitrineConfig) -> Self {
        Self::with_storage(config, Arc::new(UrlStorage::new()))
    }

    pub fn with_storage(config: VitrineConfig, storage: Arc<dyn ObjectStorage>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let scratch = ScratchSpace::new(dir.path().join("scratch")).expect("scratch root");
        let store = Arc::new(InMemoryAssetStore::new());
        let adapters = Adapters::new(Arc::new(NoTools), scratch, Arc::clone(&storage));
        let agent = PipelineAgent::new(
            config,
            Arc::clone(&store) as Arc<dyn AssetStore>,
            Arc::clone(&storage),
            adapters,
        );
        Self {
            dir,
            store,
            storage,
            agent,
        }
    }

    /// Writes `bytes` as `name` and registers a draft asset `id` for it.
    pub fn upload(&self, id: &str, name: &str, bytes: &[u8]) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("write master");
        let url = path.to_string_lossy().into_owned();
        self.store.insert(Asset::new(id, url.clone()));
        url
    }

    pub fn asset(&self, id: &str) -> Asset {
        self.store
            .get_asset(&id.into())
            .expect("store")
            .expect("asset exists")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.agent.shutdown();
    }
}

/// Configuration with quick retries.
pub fn fast_config() -> VitrineConfig {
    let mut config = VitrineConfig::default();
    config.pipeline.backoff_base_ms = 10;
    config
}

/// Fails the first `failures` fetches with a network error.
pub struct FlakyStorage {
    pub inner: UrlStorage,
    pub failures: usize,
    pub fetches: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: UrlStorage::new(),
            failures,
            fetches: AtomicUsize::new(0),
        }
    }
}

impl ObjectStorage for FlakyStorage {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(StorageError::Network {
                url: url.to_owned(),
                message: "connection reset by peer".into(),
            });
        }
        self.inner.fetch(url)
    }

    fn store(&self, url: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.inner.store(url, bytes)
    }
}

/// A textured `cells` x `cells` grid written without vertex sharing.
pub fn textured_grid(cells: usize) -> Vec<u8> {
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    for row in 0..cells {
        for col in 0..cells {
            for (r, c) in [
                (row, col),
                (row + 1, col),
                (row, col + 1),
                (row, col + 1),
                (row + 1, col),
                (row + 1, col + 1),
            ] {
                positions.extend([c as f32, 0.0, r as f32]);
                uvs.extend([c as f32 / cells as f32, r as f32 / cells as f32]);
            }
        }
    }
    let mut attributes = BTreeMap::new();
    attributes.insert(Semantic::Positions, VertexAttribute::float(3, positions));
    attributes.insert(Semantic::TexCoords(0), VertexAttribute::float(2, uvs));
    let mut primitive = Primitive::triangles(attributes, None);
    primitive.material = Some(0);

    let mut model = SceneModel {
        meshes: vec![MeshData {
            name: Some("panel".into()),
            primitives: vec![primitive],
            ..MeshData::default()
        }],
        images: vec![ModelImage {
            name: Some("paint".into()),
            mime_type: "image/png".into(),
            source: ImageSource::Embedded(png(16)),
        }],
        ..SceneModel::default()
    };
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "panel", "mesh": 0 }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
        }],
        "textures": [{ "source": 0 }]
    });
    model.document = serde_json::from_value(document).expect("valid glTF document");
    model.to_glb().expect("encodable model")
}

/// One triangle whose `NORMAL` accessor describes a single vertex while
/// `POSITION` describes three.
pub fn mismatched_counts_glb() -> Vec<u8> {
    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    let document = json!({
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
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }] }],
        "nodes": [{ "mesh": 0 }],
        "scenes": [{ "nodes": [0] }],
        "scene": 0
    });
    let json = serde_json::to_vec(&document).expect("serializable document");
    vitrine_io::glb::assemble(json, Some(bin)).expect("framed container")
}

fn png(size: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(size, size, |x, y| {
        image::Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255])
    });
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png encoding");
    bytes.into_inner()
}
