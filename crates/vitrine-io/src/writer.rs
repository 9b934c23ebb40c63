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

//! Encodes a [`SceneModel`] into a GLB container.
//!
//! Buffers, buffer views and accessors are always rebuilt from scratch into a
//! single binary chunk. Identical accessor payloads are written once.

use crate::error::ContainerError;
use crate::glb;
use crate::model::{
    accessor_description, AttributeFormat, ComponentType, ImageSource, MeshData, Primitive,
    SceneModel, Semantic, VertexAttribute,
};
use gltf::json;
use gltf::json::accessor::Type;
use gltf::json::buffer::Target;
use gltf::json::validation::{Checked, USize64};
use std::collections::{BTreeMap, HashMap};

/// Extension that allows integer storage for positions, normals, tangents
/// and texture coordinates.
pub const MESH_QUANTIZATION: &str = "KHR_mesh_quantization";

#[derive(Default)]
struct BinBuilder {
    bin: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
    written: HashMap<blake3::Hash, json::Index<json::Accessor>>,
}

impl BinBuilder {
    fn push_view(
        &mut self,
        bytes: &[u8],
        target: Option<Target>,
        stride: Option<usize>,
    ) -> json::Index<json::buffer::View> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(self.bin.len())),
            byte_stride: stride.map(json::buffer::Stride),
            name: None,
            target: target.map(Checked::Valid),
            extensions: None,
            extras: None,
        });
        self.bin.extend_from_slice(bytes);
        json::Index::new((self.views.len() - 1) as u32)
    }

    fn push_accessor(
        &mut self,
        mut accessor: json::Accessor,
        bytes: &[u8],
        target: Option<Target>,
        stride: Option<usize>,
    ) -> json::Index<json::Accessor> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(format!("{accessor:?}").as_bytes());
        hasher.update(&[target.is_some() as u8]);
        hasher.update(&stride.unwrap_or(0).to_le_bytes());
        hasher.update(bytes);
        let key = hasher.finalize();
        if let Some(&index) = self.written.get(&key) {
            return index;
        }
        accessor.buffer_view = Some(self.push_view(bytes, target, stride));
        self.accessors.push(accessor);
        let index = json::Index::new((self.accessors.len() - 1) as u32);
        self.written.insert(key, index);
        index
    }
}

fn dimensions(components: usize) -> Type {
    match components {
        1 => Type::Scalar,
        2 => Type::Vec2,
        3 => Type::Vec3,
        9 => Type::Mat3,
        16 => Type::Mat4,
        _ => Type::Vec4,
    }
}

/// Whether storing `semantic` with `format` needs `KHR_mesh_quantization`.
pub(crate) fn needs_quantization_extension(semantic: &Semantic, format: AttributeFormat) -> bool {
    if !format.is_quantized() {
        return false;
    }
    match semantic {
        // Core glTF already allows unsigned normalized texture coordinates.
        Semantic::TexCoords(_) => !(format.normalized
            && matches!(format.component_type, ComponentType::U8 | ComponentType::U16)),
        Semantic::Positions | Semantic::Normals | Semantic::Tangents => true,
        _ => false,
    }
}

fn write_attribute(
    builder: &mut BinBuilder,
    semantic: &Semantic,
    attribute: &VertexAttribute,
) -> json::Index<json::Accessor> {
    let format = attribute.format;
    let element = attribute.components * format.component_type.size();
    let padded = element.div_ceil(4) * 4;
    let count = attribute.count();

    let mut bytes = Vec::with_capacity(padded * count);
    for vertex in 0..count {
        for &value in attribute.vertex(vertex) {
            format.encode_component(value, &mut bytes);
        }
        bytes.resize(bytes.len() + (padded - element), 0);
    }

    let mut accessor = accessor_description(
        format.component_type,
        dimensions(attribute.components),
        count,
        format.normalized,
    );
    if *semantic == Semantic::Positions && count > 0 {
        let mut min = vec![f32::INFINITY; attribute.components];
        let mut max = vec![f32::NEG_INFINITY; attribute.components];
        for vertex in 0..count {
            for (axis, &value) in attribute.vertex(vertex).iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }
        accessor.min = Some(serde_json::json!(min));
        accessor.max = Some(serde_json::json!(max));
    }

    let stride = (padded != element).then_some(padded);
    builder.push_accessor(accessor, &bytes, Some(Target::ArrayBuffer), stride)
}

fn write_indices(builder: &mut BinBuilder, indices: &[u32]) -> json::Index<json::Accessor> {
    let max = indices.iter().copied().max().unwrap_or(0);
    let (component_type, bytes) = if max < u16::MAX as u32 {
        let bytes = indices
            .iter()
            .flat_map(|&i| (i as u16).to_le_bytes())
            .collect::<Vec<u8>>();
        (ComponentType::U16, bytes)
    } else {
        let bytes = indices
            .iter()
            .flat_map(|&i| i.to_le_bytes())
            .collect::<Vec<u8>>();
        (ComponentType::U32, bytes)
    };
    let accessor = accessor_description(component_type, Type::Scalar, indices.len(), false);
    builder.push_accessor(accessor, &bytes, Some(Target::ElementArrayBuffer), None)
}

fn write_primitive(
    builder: &mut BinBuilder,
    primitive: &Primitive,
    quantized: &mut bool,
) -> json::mesh::Primitive {
    let mut attributes = BTreeMap::new();
    for (semantic, attribute) in &primitive.attributes {
        *quantized |= needs_quantization_extension(semantic, attribute.format);
        let index = write_attribute(builder, semantic, attribute);
        attributes.insert(Checked::Valid(semantic.clone()), index);
    }
    json::mesh::Primitive {
        attributes,
        extensions: primitive.extensions.clone(),
        extras: primitive.extras.clone(),
        indices: primitive
            .indices
            .as_deref()
            .map(|indices| write_indices(builder, indices)),
        material: primitive.material.map(|m| json::Index::new(m as u32)),
        mode: Checked::Valid(primitive.mode),
        targets: None,
    }
}

fn write_mesh(builder: &mut BinBuilder, mesh: &MeshData, quantized: &mut bool) -> json::Mesh {
    json::Mesh {
        extensions: mesh.extensions.clone(),
        extras: mesh.extras.clone(),
        name: mesh.name.clone(),
        primitives: mesh
            .primitives
            .iter()
            .map(|p| write_primitive(builder, p, quantized))
            .collect(),
        weights: mesh.weights.clone(),
    }
}

pub(crate) fn write_glb(model: &SceneModel) -> Result<Vec<u8>, ContainerError> {
    let mut builder = BinBuilder::default();
    let mut quantized = false;
    let mut root = model.document.clone();

    root.meshes = model
        .meshes
        .iter()
        .map(|mesh| write_mesh(&mut builder, mesh, &mut quantized))
        .collect();

    // Opaque accessors are appended after mesh accessors; remember where.
    let opaque: Vec<json::Index<json::Accessor>> = model
        .opaque_accessors
        .iter()
        .map(|opaque| builder.push_accessor(opaque.accessor.clone(), &opaque.bytes, None, None))
        .collect();
    let remap = |index: json::Index<json::Accessor>| {
        opaque.get(index.value()).copied().unwrap_or(index)
    };
    for skin in &mut root.skins {
        skin.inverse_bind_matrices = skin.inverse_bind_matrices.map(remap);
    }
    for animation in &mut root.animations {
        for sampler in &mut animation.samplers {
            sampler.input = remap(sampler.input);
            sampler.output = remap(sampler.output);
        }
    }

    root.images = model
        .images
        .iter()
        .map(|image| {
            let (buffer_view, mime_type, uri) = match &image.source {
                ImageSource::Embedded(bytes) => (
                    Some(builder.push_view(bytes, None, None)),
                    Some(json::image::MimeType(image.mime_type.clone())),
                    None,
                ),
                ImageSource::Uri(uri) => (None, None, Some(uri.clone())),
            };
            json::Image {
                buffer_view,
                mime_type,
                name: image.name.clone(),
                uri,
                extensions: None,
                extras: None,
            }
        })
        .collect();

    if quantized {
        for list in [&mut root.extensions_used, &mut root.extensions_required] {
            if !list.iter().any(|e| e == MESH_QUANTIZATION) {
                list.push(MESH_QUANTIZATION.to_owned());
            }
        }
    }

    let BinBuilder {
        bin,
        views,
        accessors,
        ..
    } = builder;
    root.accessors = accessors;
    root.buffer_views = views;
    root.buffers = if bin.is_empty() {
        Vec::new()
    } else {
        vec![json::Buffer {
            byte_length: USize64::from(bin.len()),
            name: None,
            uri: None,
            extensions: None,
            extras: None,
        }]
    };

    let json = root.to_vec()?;
    glb::assemble(json, (!bin.is_empty()).then_some(bin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_core_incompatible_formats_need_the_quantization_extension() {
        assert!(!needs_quantization_extension(&Semantic::Positions, AttributeFormat::FLOAT));
        assert!(needs_quantization_extension(&Semantic::Positions, AttributeFormat::snorm(16)));
        assert!(!needs_quantization_extension(&Semantic::TexCoords(0), AttributeFormat::unorm(16)));
        assert!(needs_quantization_extension(&Semantic::TexCoords(0), AttributeFormat::snorm(16)));
        assert!(!needs_quantization_extension(&Semantic::Colors(0), AttributeFormat::unorm(8)));
    }

    #[test]
    fn identical_payloads_share_one_accessor() {
        let mut builder = BinBuilder::default();
        let first = write_indices(&mut builder, &[0, 1, 2]);
        let second = write_indices(&mut builder, &[0, 1, 2]);
        let third = write_indices(&mut builder, &[2, 1, 0]);
        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(builder.accessors.len(), 2);
    }
}
