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

use super::{compaction, for_each_image_ref, for_each_texture_ref, mark_used, remap_index, retain_mapped};
use crate::model::SceneModel;
use gltf::json;

/// Counts of what [`prune`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Vertices no index referred to.
    pub vertices: usize,
    /// Meshes no node instantiated.
    pub meshes: usize,
    /// Materials no primitive used.
    pub materials: usize,
    /// Textures no material sampled.
    pub textures: usize,
    /// Samplers no texture used.
    pub samplers: usize,
    /// Images no texture used.
    pub images: usize,
}

fn prune_meshes(model: &mut SceneModel) -> usize {
    let document = &mut model.document;
    // A container without nodes only carries meshes; keep them all.
    if document.nodes.is_empty() {
        return 0;
    }
    let mut used = vec![false; model.meshes.len()];
    for mesh in document.nodes.iter().filter_map(|node| node.mesh) {
        mark_used(&mut used, mesh.value());
    }
    let map = compaction(&used);
    for node in &mut document.nodes {
        node.mesh = node
            .mesh
            .map(|mesh| json::Index::new(remap_index(mesh.value(), &map) as u32));
    }
    let before = model.meshes.len();
    retain_mapped(&mut model.meshes, &map);
    before - model.meshes.len()
}

fn prune_materials(model: &mut SceneModel) -> usize {
    // Variant mappings refer to materials from primitive extensions.
    let has_variants = model.primitives().any(|p| {
        p.extensions
            .as_ref()
            .is_some_and(|e| e.others.contains_key("KHR_materials_variants"))
    });
    if has_variants {
        return 0;
    }
    let mut used = vec![false; model.document.materials.len()];
    for primitive in model.primitives() {
        if let Some(material) = primitive.material {
            mark_used(&mut used, material);
        }
    }
    let map = compaction(&used);
    for primitive in model.primitives_mut() {
        primitive.material = primitive.material.and_then(|m| map.get(m).copied().flatten());
    }
    let materials = &mut model.document.materials;
    let before = materials.len();
    retain_mapped(materials, &map);
    before - materials.len()
}

fn prune_textures(document: &mut json::Root) -> usize {
    let mut used = vec![false; document.textures.len()];
    for material in &mut document.materials {
        for_each_texture_ref(material, &mut |index| mark_used(&mut used, index));
    }
    let map = compaction(&used);
    for material in &mut document.materials {
        for_each_texture_ref(material, &mut |index| remap_index(index, &map));
    }
    let before = document.textures.len();
    retain_mapped(&mut document.textures, &map);
    before - document.textures.len()
}

fn prune_images(model: &mut SceneModel) -> usize {
    let mut used = vec![false; model.images.len()];
    for texture in &mut model.document.textures {
        for_each_image_ref(texture, &mut |index| mark_used(&mut used, index));
    }
    let map = compaction(&used);
    for texture in &mut model.document.textures {
        for_each_image_ref(texture, &mut |index| remap_index(index, &map));
    }
    let before = model.images.len();
    retain_mapped(&mut model.images, &map);
    before - model.images.len()
}

fn prune_samplers(document: &mut json::Root) -> usize {
    let mut used = vec![false; document.samplers.len()];
    for sampler in document.textures.iter().filter_map(|texture| texture.sampler) {
        mark_used(&mut used, sampler.value());
    }
    let map = compaction(&used);
    for texture in &mut document.textures {
        texture.sampler = texture
            .sampler
            .map(|sampler| json::Index::new(remap_index(sampler.value(), &map) as u32));
    }
    let before = document.samplers.len();
    retain_mapped(&mut document.samplers, &map);
    before - document.samplers.len()
}

/// Drops everything nothing refers to, walking the reference chain
/// node → mesh → material → texture → image/sampler so that a resource
/// orphaned by an earlier step is dropped too.
pub fn prune(model: &mut SceneModel) -> PruneReport {
    let mut vertices = 0;
    for primitive in model.primitives_mut() {
        if primitive.indices.is_some() {
            let before = primitive.vertex_count();
            primitive.drop_unreferenced_vertices();
            vertices += before - primitive.vertex_count();
        }
    }
    let meshes = prune_meshes(model);
    let materials = prune_materials(model);
    let textures = prune_textures(&mut model.document);
    let images = prune_images(model);
    let samplers = prune_samplers(&mut model.document);
    PruneReport {
        vertices,
        meshes,
        materials,
        textures,
        samplers,
        images,
    }
}
