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

//! Scene transforms applied before derivative generation.
//!
//! The cleanup family ([`weld`], [`dedup`], [`prune`]) never changes how a
//! model looks; [`center`] and [`quantize`] are the optional geometry
//! preprocessing steps.

mod center;
mod dedup;
mod prune;
mod quantize;
mod weld;

pub use center::center;
pub use dedup::{dedup, DedupReport};
pub use prune::{prune, PruneReport};
pub use quantize::{quantize, QuantizeOptions};
pub use weld::weld;

use crate::model::{texture_source, SceneModel};
use gltf::json;
use serde_json::Value;

/// Default weld tolerance, relative to the model's bounding-box diagonal for
/// positions and absolute for the other attributes.
pub const DEFAULT_WELD_TOLERANCE: f32 = 1e-4;

/// Which cleanup transforms run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupOptions {
    /// Merge vertices that are equal within `weld_tolerance`.
    pub weld: bool,
    /// Tolerance used by the weld.
    pub weld_tolerance: f32,
    /// Collapse identical images, textures and materials.
    pub dedup: bool,
    /// Drop unreferenced vertices, meshes, materials, textures, samplers and
    /// images.
    pub prune: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            weld: true,
            weld_tolerance: DEFAULT_WELD_TOLERANCE,
            dedup: true,
            prune: true,
        }
    }
}

/// What a cleanup pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Vertex count before the pass.
    pub vertices_before: u64,
    /// Vertex count after the pass.
    pub vertices_after: u64,
    /// Vertices merged by the weld.
    pub welded: usize,
    /// Duplicates collapsed.
    pub deduplicated: DedupReport,
    /// Resources dropped.
    pub pruned: PruneReport,
}

/// Runs weld, dedup and prune, in that order.
pub fn cleanup(model: &mut SceneModel, options: &CleanupOptions) -> CleanupReport {
    let vertices_before = model.vertex_count();
    let welded = if options.weld {
        weld(model, options.weld_tolerance)
    } else {
        0
    };
    let deduplicated = if options.dedup {
        dedup(model)
    } else {
        DedupReport::default()
    };
    let pruned = if options.prune {
        prune(model)
    } else {
        PruneReport::default()
    };
    let report = CleanupReport {
        vertices_before,
        vertices_after: model.vertex_count(),
        welded,
        deduplicated,
        pruned,
    };
    log::debug!(
        "Cleanup: {} -> {} vertices ({} welded)",
        report.vertices_before,
        report.vertices_after,
        report.welded
    );
    report
}

fn remapped<T>(index: json::Index<T>, f: &mut impl FnMut(usize) -> usize) -> json::Index<T> {
    json::Index::new(f(index.value()) as u32)
}

fn remap_value(value: &mut Value, f: &mut impl FnMut(usize) -> usize) {
    if let Some(old) = value.as_u64() {
        *value = Value::from(f(old as usize));
    }
}

/// Texture references inside extension objects: every `*Texture` key
/// holding an `index`.
fn for_each_extension_texture_ref(value: &mut Value, f: &mut impl FnMut(usize) -> usize) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key.ends_with("Texture") {
                    if let Some(index) = child.get_mut("index") {
                        remap_value(index, f);
                    }
                }
                for_each_extension_texture_ref(child, f);
            }
        }
        Value::Array(list) => list
            .iter_mut()
            .for_each(|v| for_each_extension_texture_ref(v, f)),
        _ => {}
    }
}

/// Passes every texture index a material refers to through `f` and stores
/// the result back, including the texture slots of material extensions.
pub(crate) fn for_each_texture_ref(material: &mut json::Material, f: &mut impl FnMut(usize) -> usize) {
    let pbr = &mut material.pbr_metallic_roughness;
    for info in [
        &mut pbr.base_color_texture,
        &mut pbr.metallic_roughness_texture,
        &mut material.emissive_texture,
    ]
    .into_iter()
    .flatten()
    {
        info.index = remapped(info.index, f);
    }
    if let Some(normal) = &mut material.normal_texture {
        normal.index = remapped(normal.index, f);
    }
    if let Some(occlusion) = &mut material.occlusion_texture {
        occlusion.index = remapped(occlusion.index, f);
    }
    if let Some(extensions) = &mut material.extensions {
        for value in extensions.others.values_mut() {
            for_each_extension_texture_ref(value, f);
        }
    }
}

/// Passes every image index a texture refers to through `f`, including the
/// `source` of image-format extensions such as `KHR_texture_basisu`.
pub(crate) fn for_each_image_ref(texture: &mut json::Texture, f: &mut impl FnMut(usize) -> usize) {
    if let Some(source) = texture_source(texture) {
        texture.source = json::Index::new(f(source) as u32);
    }
    if let Some(extensions) = &mut texture.extensions {
        for extension in extensions.others.values_mut() {
            if let Some(source) = extension.get_mut("source") {
                remap_value(source, f);
            }
        }
    }
}

/// Marks `index` as used and hands it back unchanged.
pub(crate) fn mark_used(used: &mut [bool], index: usize) -> usize {
    if let Some(flag) = used.get_mut(index) {
        *flag = true;
    }
    index
}

/// Looks `old` up in `map`, leaving unknown indices alone.
pub(crate) fn remap_index(old: usize, map: &[Option<usize>]) -> usize {
    map.get(old).copied().flatten().unwrap_or(old)
}

/// Given which items survive, returns the old-to-new index map.
pub(crate) fn compaction(keep: &[bool]) -> Vec<Option<usize>> {
    let mut next = 0;
    keep.iter()
        .map(|&kept| {
            kept.then(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// Drops the items of `items` whose entry in `map` is `None`.
pub(crate) fn retain_mapped<T>(items: &mut Vec<T>, map: &[Option<usize>]) {
    let mut index = 0;
    items.retain(|_| {
        let kept = map.get(index).is_some_and(Option::is_some);
        index += 1;
        kept
    });
}

/// Builds a typed document object from a JSON literal.
#[cfg(test)]
pub(crate) fn typed<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("valid glTF object")
}
