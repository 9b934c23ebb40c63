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

//! A decoded, editable view of a GLB container.
//!
//! [`SceneModel`] keeps mesh geometry decoded into flat `f32` arrays so the
//! transforms can rewrite it, and keeps the rest of the document (nodes,
//! materials, textures, samplers, cameras, extensions) as typed
//! [`gltf::json`] objects. The writer rebuilds buffers, buffer views and
//! accessors from scratch.

use crate::decode::{self, Buffers};
use crate::error::ContainerError;
use base64::Engine;
use gltf::json;
use gltf::json::validation::Validate;
use std::collections::{BTreeMap, HashMap};

pub use gltf::json::accessor::ComponentType;
pub use gltf::mesh::{Mode, Semantic};

/// Extensions whose geometry cannot be decoded in-process.
pub const COMPRESSION_EXTENSIONS: [&str; 3] = [
    "KHR_draco_mesh_compression",
    "EXT_meshopt_compression",
    "KHR_meshopt_compression",
];

fn max_value(ty: ComponentType) -> f32 {
    match ty {
        ComponentType::I8 => 127.0,
        ComponentType::U8 => 255.0,
        ComponentType::I16 => 32767.0,
        ComponentType::U16 => 65535.0,
        ComponentType::U32 => u32::MAX as f32,
        ComponentType::F32 => 1.0,
    }
}

fn is_signed(ty: ComponentType) -> bool {
    matches!(ty, ComponentType::I8 | ComponentType::I16 | ComponentType::F32)
}

/// Maps a stored normalized integer back to `[-1, 1]` or `[0, 1]`.
pub(crate) fn denormalize(ty: ComponentType, raw: f32) -> f32 {
    let value = raw / max_value(ty);
    if is_signed(ty) {
        value.max(-1.0)
    } else {
        value
    }
}

/// How one attribute is stored in the written container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFormat {
    /// Storage type of each component.
    pub component_type: ComponentType,
    /// Whether integers are normalized to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
}

impl AttributeFormat {
    /// Plain 32-bit floats.
    pub const FLOAT: AttributeFormat = AttributeFormat {
        component_type: ComponentType::F32,
        normalized: false,
    };

    /// Normalized signed integers of `bits` bits (8 or 16).
    pub fn snorm(bits: u8) -> Self {
        Self {
            component_type: if bits <= 8 {
                ComponentType::I8
            } else {
                ComponentType::I16
            },
            normalized: true,
        }
    }

    /// Normalized unsigned integers of `bits` bits (8 or 16).
    pub fn unorm(bits: u8) -> Self {
        Self {
            component_type: if bits <= 8 {
                ComponentType::U8
            } else {
                ComponentType::U16
            },
            normalized: true,
        }
    }

    /// Whether the format is anything other than plain floats.
    pub fn is_quantized(self) -> bool {
        self != Self::FLOAT
    }

    /// Appends the little-endian encoding of one component.
    pub(crate) fn encode_component(self, value: f32, out: &mut Vec<u8>) {
        let ty = self.component_type;
        let stored = if self.normalized && ty != ComponentType::F32 {
            let clamped = if is_signed(ty) {
                value.clamp(-1.0, 1.0)
            } else {
                value.clamp(0.0, 1.0)
            };
            (clamped * max_value(ty)).round()
        } else {
            value
        };
        match ty {
            ComponentType::I8 => out.push(stored as i8 as u8),
            ComponentType::U8 => out.push(stored as u8),
            ComponentType::I16 => out.extend_from_slice(&(stored as i16).to_le_bytes()),
            ComponentType::U16 => out.extend_from_slice(&(stored as u16).to_le_bytes()),
            ComponentType::U32 => out.extend_from_slice(&(stored as u32).to_le_bytes()),
            ComponentType::F32 => out.extend_from_slice(&stored.to_le_bytes()),
        }
    }
}

/// One vertex attribute of a primitive, decoded to floats.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    /// Components per vertex (3 for `VEC3`).
    pub components: usize,
    /// Flattened component values.
    pub values: Vec<f32>,
    /// Storage format used when writing.
    pub format: AttributeFormat,
}

impl VertexAttribute {
    /// A float attribute from flattened values.
    pub fn float(components: usize, values: Vec<f32>) -> Self {
        Self {
            components,
            values,
            format: AttributeFormat::FLOAT,
        }
    }

    /// Number of vertices described.
    pub fn count(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }

    /// Returns the components of one vertex.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`VertexAttribute::count`]. Primitives
    /// decoded by [`SceneModel::from_glb`] have passed [`Primitive::check`].
    pub fn vertex(&self, index: usize) -> &[f32] {
        &self.values[index * self.components..(index + 1) * self.components]
    }
}

/// One draw call of a mesh.
#[derive(Debug, Clone)]
pub struct Primitive {
    /// Attributes keyed by semantic.
    pub attributes: BTreeMap<Semantic, VertexAttribute>,
    /// Index list, if the primitive is indexed.
    pub indices: Option<Vec<u32>>,
    /// Material index into the document's materials.
    pub material: Option<usize>,
    /// Topology.
    pub mode: Mode,
    /// Extensions of the primitive, copied verbatim.
    pub extensions: Option<json::extensions::mesh::Primitive>,
    /// Extras of the primitive, copied verbatim.
    pub extras: json::Extras,
}

impl Primitive {
    /// A triangle list primitive with the given attributes.
    pub fn triangles(attributes: BTreeMap<Semantic, VertexAttribute>, indices: Option<Vec<u32>>) -> Self {
        Self {
            attributes,
            indices,
            material: None,
            mode: Mode::Triangles,
            extensions: None,
            extras: None,
        }
    }

    /// Number of vertices, taken from `POSITION`.
    pub fn vertex_count(&self) -> usize {
        self.attributes
            .get(&Semantic::Positions)
            .or_else(|| self.attributes.values().next())
            .map_or(0, VertexAttribute::count)
    }

    /// Number of triangles drawn (0 for point and line modes).
    pub fn triangle_count(&self) -> usize {
        let elements = self
            .indices
            .as_ref()
            .map_or(self.vertex_count(), Vec::len);
        match self.mode {
            Mode::Triangles => elements / 3,
            Mode::TriangleStrip | Mode::TriangleFan => elements.saturating_sub(2),
            _ => 0,
        }
    }

    /// Checks that every attribute describes the same number of vertices and
    /// that every index names one of them.
    pub fn check(&self) -> Result<(), String> {
        let count = self.vertex_count();
        for (semantic, attribute) in &self.attributes {
            if attribute.components == 0 || attribute.values.len() % attribute.components != 0 {
                return Err(format!(
                    "{} holds {} values, not a multiple of {} components",
                    semantic.to_string(),
                    attribute.values.len(),
                    attribute.components
                ));
            }
            if attribute.count() != count {
                return Err(format!(
                    "{} has {} vertices but POSITION has {count}",
                    semantic.to_string(),
                    attribute.count()
                ));
            }
        }
        if let Some(bad) = self
            .indices
            .iter()
            .flatten()
            .find(|&&index| index as usize >= count)
        {
            return Err(format!("index {bad} is out of range for {count} vertices"));
        }
        Ok(())
    }

    /// Returns the index list, synthesizing `0..n` for non-indexed primitives.
    pub fn resolved_indices(&self) -> Vec<u32> {
        match &self.indices {
            Some(indices) => indices.clone(),
            None => (0..self.vertex_count() as u32).collect(),
        }
    }

    /// Rebuilds every attribute from the old vertex indices in `order` and
    /// installs `indices`, which must already refer to the new positions.
    pub(crate) fn compact(&mut self, order: &[usize], indices: Vec<u32>) {
        for attribute in self.attributes.values_mut() {
            let mut values = Vec::with_capacity(order.len() * attribute.components);
            for &old in order {
                values.extend_from_slice(attribute.vertex(old));
            }
            attribute.values = values;
        }
        self.indices = Some(indices);
    }

    /// Drops vertices no index refers to, keeping first-use order.
    pub fn drop_unreferenced_vertices(&mut self) {
        let indices = self.resolved_indices();
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut order = Vec::new();
        let rewritten = indices
            .iter()
            .map(|&old| {
                *remap.entry(old).or_insert_with(|| {
                    order.push(old as usize);
                    (order.len() - 1) as u32
                })
            })
            .collect();
        if order.len() != self.vertex_count() || self.indices.is_none() {
            self.compact(&order, rewritten);
        }
    }
}

/// A mesh: a named list of primitives.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Optional mesh name.
    pub name: Option<String>,
    /// The draw calls.
    pub primitives: Vec<Primitive>,
    /// Default morph weights.
    pub weights: Option<Vec<f32>>,
    /// Extensions of the mesh, copied verbatim.
    pub extensions: Option<json::extensions::mesh::Mesh>,
    /// Extras of the mesh, copied verbatim.
    pub extras: json::Extras,
}

/// Where an image's bytes live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Bytes carried inside the container.
    Embedded(Vec<u8>),
    /// A URI outside the container, left untouched.
    Uri(String),
}

/// An image of the container.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelImage {
    /// Optional image name.
    pub name: Option<String>,
    /// MIME type (`image/png`, `image/jpeg`, `image/ktx2`...).
    pub mime_type: String,
    /// Image bytes or external URI.
    pub source: ImageSource,
}

impl ModelImage {
    /// Returns the embedded bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.source {
            ImageSource::Embedded(bytes) => Some(bytes),
            ImageSource::Uri(_) => None,
        }
    }
}

/// Describes a dense accessor; the writer fills in its buffer view.
pub(crate) fn accessor_description(
    component_type: ComponentType,
    dimensions: json::accessor::Type,
    count: usize,
    normalized: bool,
) -> json::Accessor {
    json::Accessor {
        buffer_view: None,
        byte_offset: None,
        count: json::validation::USize64::from(count),
        component_type: json::validation::Checked::Valid(json::accessor::GenericComponentType(
            component_type,
        )),
        extensions: None,
        extras: None,
        type_: json::validation::Checked::Valid(dimensions),
        min: None,
        max: None,
        name: None,
        normalized,
        sparse: None,
    }
}

/// An accessor the pipeline carries through without interpreting it
/// (skin matrices, animation keyframes).
#[derive(Debug, Clone)]
pub struct OpaqueAccessor {
    /// Accessor description without `bufferView`, `byteOffset` and `sparse`.
    pub accessor: json::Accessor,
    /// Tightly packed element bytes.
    pub bytes: Vec<u8>,
}

impl OpaqueAccessor {
    /// A dense accessor of `count` elements stored in `bytes`.
    pub fn new(
        component_type: ComponentType,
        dimensions: json::accessor::Type,
        count: usize,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            accessor: accessor_description(component_type, dimensions, count, false),
            bytes,
        }
    }
}

/// An editable container.
#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    /// The document without its geometry payload: `accessors`,
    /// `bufferViews`, `buffers`, `meshes` and `images` stay empty and are
    /// rebuilt by the writer. Skins and animations index
    /// [`SceneModel::opaque_accessors`].
    pub document: json::Root,
    /// Decoded meshes, indexed like the document's meshes.
    pub meshes: Vec<MeshData>,
    /// Images, indexed like the document's images.
    pub images: Vec<ModelImage>,
    /// Accessors referenced by skins and animations.
    pub opaque_accessors: Vec<OpaqueAccessor>,
}

/// Guesses an image MIME type from its leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(&[0xAB, b'K', b'T', b'X', b' ', b'2', b'0', 0xBB]) {
        Some("image/ktx2")
    } else {
        None
    }
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

/// Image a texture samples through its core `source`, if it names one.
///
/// `gltf` marks a texture without a core source with `u32::MAX`.
pub fn texture_source(texture: &json::Texture) -> Option<usize> {
    let source = texture.source.value();
    (source != u32::MAX as usize).then_some(source)
}

/// Detaches a texture from its core `source`, leaving extension sources.
pub fn clear_texture_source(texture: &mut json::Texture) {
    texture.source = json::Index::new(u32::MAX);
}

/// Runs the `gltf` document checks. Required extensions unknown to `gltf`
/// are left to [`crate::inspect`], which reports them as warnings.
fn validate(root: &json::Root) -> Result<(), ContainerError> {
    let mut problems = Vec::new();
    root.validate(root, json::Path::new, &mut |path, error| {
        let path = path();
        let unsupported = matches!(error, json::validation::Error::Unsupported);
        if !(unsupported && path.as_str().starts_with("extensionsRequired")) {
            problems.push(format!("{}: {error}", path.as_str()));
        }
    });
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ContainerError::Document(problems.join("; ")))
    }
}

fn load_buffers(document: &gltf::Document, mut blob: Option<Vec<u8>>) -> Result<Vec<Vec<u8>>, ContainerError> {
    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => blob.take().ok_or_else(|| {
                ContainerError::Document("buffer refers to a missing BIN chunk".into())
            })?,
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => decode_data_uri(uri)
                .ok_or_else(|| ContainerError::Document("undecodable buffer data URI".into()))?,
            gltf::buffer::Source::Uri(uri) => {
                return Err(ContainerError::ExternalBuffer(uri.to_owned()))
            }
        };
        if data.len() < buffer.length() {
            return Err(ContainerError::Document(format!(
                "buffer {} holds {} bytes but declares {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }
    Ok(buffers)
}

fn decode_primitive(
    primitive: &gltf::Primitive<'_>,
    json: &json::mesh::Primitive,
    buffers: &Buffers,
) -> Result<Primitive, ContainerError> {
    let get = |buffer: gltf::Buffer<'_>| buffers.get(buffer.index()).map(Vec::as_slice);
    let reader = primitive.reader(get);
    let unavailable = |index: usize| ContainerError::accessor(index, "buffer data is unavailable");

    let mut attributes = BTreeMap::new();
    for (semantic, accessor) in primitive.attributes() {
        decode::check_accessor(&accessor, buffers)?;
        let format = decode::attribute_format(&semantic, &accessor)?;
        let unsigned_normalized = format.normalized
            && matches!(format.component_type, ComponentType::U8 | ComponentType::U16);
        let values: Option<Vec<f32>> = match &semantic {
            Semantic::Positions if !format.is_quantized() => {
                reader.read_positions().map(|it| it.flatten().collect())
            }
            Semantic::Normals if !format.is_quantized() => {
                reader.read_normals().map(|it| it.flatten().collect())
            }
            Semantic::Tangents if !format.is_quantized() => {
                reader.read_tangents().map(|it| it.flatten().collect())
            }
            Semantic::TexCoords(set) if !format.is_quantized() || unsigned_normalized => reader
                .read_tex_coords(*set)
                .map(|it| it.into_f32().flatten().collect()),
            _ => decode::read_values(&accessor, get),
        };
        let values = values.ok_or_else(|| unavailable(accessor.index()))?;
        attributes.insert(
            semantic,
            VertexAttribute {
                components: accessor.dimensions().multiplicity(),
                values,
                format,
            },
        );
    }

    let indices = match primitive.indices() {
        Some(accessor) => {
            decode::check_accessor(&accessor, buffers)?;
            decode::check_index_accessor(&accessor)?;
            let indices = reader
                .read_indices()
                .map(|it| it.into_u32().collect::<Vec<u32>>())
                .ok_or_else(|| unavailable(accessor.index()))?;
            Some(indices)
        }
        None => None,
    };

    Ok(Primitive {
        attributes,
        indices,
        material: primitive.material().index(),
        mode: primitive.mode(),
        extensions: json.extensions.clone(),
        extras: json.extras.clone(),
    })
}

fn decode_meshes(document: &gltf::Document, buffers: &Buffers) -> Result<Vec<MeshData>, ContainerError> {
    let mut meshes = Vec::new();
    for (mesh, json) in document.meshes().zip(&document.as_json().meshes) {
        let mut primitives = Vec::new();
        for (primitive, primitive_json) in mesh.primitives().zip(&json.primitives) {
            if primitive.morph_targets().next().is_some() {
                log::warn!(
                    "SceneModel: mesh {} carries morph targets, they are not preserved",
                    mesh.index()
                );
            }
            let decoded = decode_primitive(&primitive, primitive_json, buffers)?;
            decoded.check().map_err(|reason| ContainerError::Primitive {
                mesh: mesh.index(),
                primitive: primitive.index(),
                reason,
            })?;
            primitives.push(decoded);
        }
        meshes.push(MeshData {
            name: json.name.clone(),
            primitives,
            weights: json.weights.clone(),
            extensions: json.extensions.clone(),
            extras: json.extras.clone(),
        });
    }
    Ok(meshes)
}

fn decode_images(document: &gltf::Document, buffers: &Buffers) -> Result<Vec<ModelImage>, ContainerError> {
    let mut images = Vec::new();
    for image in document.images() {
        let (source, declared) = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| {
                        let end = view.offset().checked_add(view.length())?;
                        buffer.get(view.offset()..end)
                    })
                    .ok_or_else(|| {
                        ContainerError::Document(format!(
                            "image {} overruns buffer view {}",
                            image.index(),
                            view.index()
                        ))
                    })?;
                (ImageSource::Embedded(bytes.to_vec()), Some(mime_type))
            }
            gltf::image::Source::Uri { uri, mime_type } => match decode_data_uri(uri) {
                Some(bytes) => (ImageSource::Embedded(bytes), mime_type),
                None => (ImageSource::Uri(uri.to_owned()), mime_type),
            },
        };
        let mime_type = declared
            .map(str::to_owned)
            .or_else(|| match &source {
                ImageSource::Embedded(bytes) => sniff_mime(bytes).map(str::to_owned),
                ImageSource::Uri(_) => None,
            })
            .unwrap_or_else(|| "application/octet-stream".to_owned());
        images.push(ModelImage {
            name: image.name().map(str::to_owned),
            mime_type,
            source,
        });
    }
    Ok(images)
}

/// Copies the accessors skins and animations use into packed
/// [`OpaqueAccessor`]s and points `skins` and `animations` at them.
fn rebind_opaque(
    document: &gltf::Document,
    skins: &mut [json::Skin],
    animations: &mut [json::Animation],
    buffers: &Buffers,
) -> Result<Vec<OpaqueAccessor>, ContainerError> {
    type AccessorIndex = json::Index<json::Accessor>;
    let mut opaque = Vec::new();
    let mut remap: HashMap<usize, AccessorIndex> = HashMap::new();
    let mut take = |original: AccessorIndex| -> Result<AccessorIndex, ContainerError> {
        if let Some(&mapped) = remap.get(&original.value()) {
            return Ok(mapped);
        }
        let missing = || ContainerError::accessor(original.value(), "accessor does not exist");
        let accessor = document.accessors().nth(original.value()).ok_or_else(missing)?;
        let mut description = document
            .as_json()
            .accessors
            .get(original.value())
            .cloned()
            .ok_or_else(missing)?;
        let bytes = decode::packed_bytes(&accessor, buffers)?;
        description.buffer_view = None;
        description.byte_offset = None;
        description.sparse = None;
        opaque.push(OpaqueAccessor {
            accessor: description,
            bytes,
        });
        let mapped = json::Index::new((opaque.len() - 1) as u32);
        remap.insert(original.value(), mapped);
        Ok(mapped)
    };

    for skin in skins.iter_mut() {
        if let Some(matrices) = skin.inverse_bind_matrices {
            skin.inverse_bind_matrices = Some(take(matrices)?);
        }
    }
    for animation in animations.iter_mut() {
        for sampler in &mut animation.samplers {
            sampler.input = take(sampler.input)?;
            sampler.output = take(sampler.output)?;
        }
    }
    Ok(opaque)
}

impl SceneModel {
    /// Decodes a GLB container.
    ///
    /// Fails with [`ContainerError::Compressed`] when the geometry uses a
    /// compression extension, since those meshes cannot be edited here, and
    /// with [`ContainerError::Primitive`] when a primitive's attributes
    /// disagree on the vertex count or an index is out of range.
    pub fn from_glb(bytes: &[u8]) -> Result<Self, ContainerError> {
        crate::glb::check_header(bytes)?;
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(bytes)?;

        let root = document.as_json();
        if let Some(extension) = root
            .extensions_used
            .iter()
            .chain(&root.extensions_required)
            .find(|name| COMPRESSION_EXTENSIONS.contains(&name.as_str()))
        {
            return Err(ContainerError::Compressed(extension.clone()));
        }
        validate(root)?;

        let buffers = load_buffers(&document, blob)?;
        let meshes = decode_meshes(&document, &buffers)?;
        let images = decode_images(&document, &buffers)?;
        let mut skins = root.skins.clone();
        let mut animations = root.animations.clone();
        let opaque_accessors = rebind_opaque(&document, &mut skins, &mut animations, &buffers)?;

        let mut document = document.into_json();
        document.skins = skins;
        document.animations = animations;
        document.accessors.clear();
        document.buffer_views.clear();
        document.buffers.clear();
        document.meshes.clear();
        document.images.clear();

        Ok(Self {
            document,
            meshes,
            images,
            opaque_accessors,
        })
    }

    /// Encodes the model as a GLB container.
    pub fn to_glb(&self) -> Result<Vec<u8>, ContainerError> {
        crate::writer::write_glb(self)
    }

    /// Total vertex count over every primitive.
    pub fn vertex_count(&self) -> u64 {
        self.primitives().map(|p| p.vertex_count() as u64).sum()
    }

    /// Total triangle count over every primitive.
    pub fn triangle_count(&self) -> u64 {
        self.primitives().map(|p| p.triangle_count() as u64).sum()
    }

    /// Iterates every primitive of every mesh.
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.meshes.iter().flat_map(|mesh| mesh.primitives.iter())
    }

    /// Mutable iteration over every primitive of every mesh.
    pub fn primitives_mut(&mut self) -> impl Iterator<Item = &mut Primitive> {
        self.meshes
            .iter_mut()
            .flat_map(|mesh| mesh.primitives.iter_mut())
    }

    /// Adds an extension name to `extensionsUsed` (and `extensionsRequired`).
    pub fn declare_extension(&mut self, name: &str, required: bool) {
        let document = &mut self.document;
        if !document.extensions_used.iter().any(|e| e == name) {
            document.extensions_used.push(name.to_owned());
        }
        if required && !document.extensions_required.iter().any(|e| e == name) {
            document.extensions_required.push(name.to_owned());
        }
    }

    /// Total embedded image bytes.
    pub fn embedded_image_bytes(&self) -> u64 {
        self.images
            .iter()
            .filter_map(ModelImage::bytes)
            .map(|b| b.len() as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_components_round_trip_within_precision() {
        let format = AttributeFormat::snorm(16);
        let mut out = Vec::new();
        format.encode_component(-0.5, &mut out);
        let raw = i16::from_le_bytes([out[0], out[1]]) as f32;
        assert!((denormalize(ComponentType::I16, raw) + 0.5).abs() < 1e-4);
    }

    #[test]
    fn triangle_count_depends_on_mode() {
        let mut attributes = BTreeMap::new();
        attributes.insert(Semantic::Positions, VertexAttribute::float(3, vec![0.0; 3 * 6]));
        let mut primitive = Primitive::triangles(attributes, None);
        assert_eq!(primitive.triangle_count(), 2);
        primitive.mode = Mode::TriangleStrip;
        assert_eq!(primitive.triangle_count(), 4);
        primitive.mode = Mode::Lines;
        assert_eq!(primitive.triangle_count(), 0);
    }

    #[test]
    fn dropping_unreferenced_vertices_compacts_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            Semantic::Positions,
            VertexAttribute::float(3, (0..12).map(|v| v as f32).collect()),
        );
        let mut primitive = Primitive::triangles(attributes, Some(vec![3, 1, 3]));
        primitive.drop_unreferenced_vertices();
        assert_eq!(primitive.vertex_count(), 2);
        assert_eq!(primitive.indices, Some(vec![0, 1, 0]));
        assert_eq!(
            primitive.attributes[&Semantic::Positions].values,
            vec![9.0, 10.0, 11.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn mismatched_attribute_counts_fail_the_check() {
        let mut attributes = BTreeMap::new();
        attributes.insert(Semantic::Positions, VertexAttribute::float(3, vec![0.0; 9]));
        attributes.insert(Semantic::Normals, VertexAttribute::float(3, vec![0.0, 1.0, 0.0]));
        let primitive = Primitive::triangles(attributes, Some(vec![0, 1, 2]));
        let reason = primitive.check().unwrap_err();
        assert!(reason.contains("NORMAL has 1 vertices"), "{reason}");
    }

    #[test]
    fn out_of_range_indices_fail_the_check() {
        let mut attributes = BTreeMap::new();
        attributes.insert(Semantic::Positions, VertexAttribute::float(3, vec![0.0; 9]));
        let primitive = Primitive::triangles(attributes, Some(vec![0, 1, 3]));
        assert!(primitive.check().unwrap_err().contains("index 3"));
    }

    #[test]
    fn empty_texture_source_is_reported_as_none() {
        let mut texture: json::Texture =
            serde_json::from_value(serde_json::json!({ "source": 2 })).unwrap();
        assert_eq!(texture_source(&texture), Some(2));
        clear_texture_source(&mut texture);
        assert_eq!(texture_source(&texture), None);
        assert!(serde_json::to_value(&texture).unwrap().get("source").is_none());
    }

    #[test]
    fn sniffs_common_image_types() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0]), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"nothing"), None);
    }
}
