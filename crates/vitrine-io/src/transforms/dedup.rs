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

use super::{compaction, for_each_image_ref, for_each_texture_ref, remap_index, retain_mapped};
use crate::model::{ImageSource, SceneModel};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Counts of what [`dedup`] collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// Images with identical bytes.
    pub images: usize,
    /// Textures with identical source and sampler.
    pub textures: usize,
    /// Materials with identical properties (names ignored).
    pub materials: usize,
}

/// Maps every item to the first item with the same key. Returns the
/// old-to-new index map and which items survive.
fn collapse<K: Hash + Eq>(keys: impl IntoIterator<Item = K>) -> (Vec<Option<usize>>, Vec<bool>) {
    let mut first: HashMap<K, usize> = HashMap::new();
    let canonical: Vec<usize> = keys
        .into_iter()
        .enumerate()
        .map(|(index, key)| *first.entry(key).or_insert(index))
        .collect();
    let keep: Vec<bool> = canonical
        .iter()
        .enumerate()
        .map(|(index, &c)| c == index)
        .collect();
    let compacted = compaction(&keep);
    let remap = canonical.iter().map(|&c| compacted[c]).collect();
    (remap, keep)
}

/// Identity of a document object: its JSON form. An object that cannot be
/// serialized only matches itself.
fn content_key(index: usize, object: &impl Serialize) -> String {
    serde_json::to_string(object).unwrap_or_else(|_| format!("#{index}"))
}

fn dedup_images(model: &mut SceneModel) -> usize {
    let keys = model.images.iter().map(|image| match &image.source {
        ImageSource::Embedded(bytes) => {
            let mut hasher = blake3::Hasher::new();
            hasher.update(image.mime_type.as_bytes());
            hasher.update(bytes);
            hasher.finalize().to_hex().to_string()
        }
        ImageSource::Uri(uri) => format!("uri:{uri}"),
    });
    let (map, keep) = collapse(keys);
    for texture in &mut model.document.textures {
        for_each_image_ref(texture, &mut |index| remap_index(index, &map));
    }
    let before = model.images.len();
    retain_mapped(&mut model.images, &compaction(&keep));
    before - model.images.len()
}

fn dedup_textures(model: &mut SceneModel) -> usize {
    let document = &mut model.document;
    let keys = document
        .textures
        .iter()
        .enumerate()
        .map(|(index, texture)| content_key(index, texture));
    let (map, keep) = collapse(keys);
    for material in &mut document.materials {
        for_each_texture_ref(material, &mut |index| remap_index(index, &map));
    }
    let before = document.textures.len();
    retain_mapped(&mut document.textures, &compaction(&keep));
    before - document.textures.len()
}

fn dedup_materials(model: &mut SceneModel) -> usize {
    let keys = model.document.materials.iter().enumerate().map(|(index, material)| {
        let mut material = material.clone();
        material.name = None;
        content_key(index, &material)
    });
    let (map, keep) = collapse(keys);
    for primitive in model.primitives_mut() {
        primitive.material = primitive
            .material
            .map(|m| map.get(m).copied().flatten().unwrap_or(m));
    }
    let materials = &mut model.document.materials;
    let before = materials.len();
    retain_mapped(materials, &compaction(&keep));
    before - materials.len()
}

/// Collapses identical images (by content hash), then textures, then
/// materials, rewriting every reference to point at the survivor.
///
/// Identical accessors need no pass of their own: the writer stores each
/// distinct accessor payload once.
pub fn dedup(model: &mut SceneModel) -> DedupReport {
    DedupReport {
        images: dedup_images(model),
        textures: dedup_textures(model),
        materials: dedup_materials(model),
    }
}
