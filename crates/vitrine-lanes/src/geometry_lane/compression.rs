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

//! Vertex stream compression with meshoptimizer.
//!
//! Writes `EXT_meshopt_compression` containers: every vertex buffer view
//! whose stride the codec accepts is replaced by its encoded stream in the
//! binary chunk, and the original layout moves to a fallback buffer that
//! carries no data. Index views stay as they are.

use super::{GeometryCodecLibrary, GeometryOptions};
use crate::error::CodecError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use vitrine_io::glb::{assemble, split};

/// Extension written by [`MeshoptCompression`].
pub const EXT_MESHOPT_COMPRESSION: &str = "EXT_meshopt_compression";

const ARRAY_BUFFER: u64 = 34962;

/// Layout of one vertex stream selected for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stream {
    stride: usize,
    count: usize,
}

/// [`GeometryCodecLibrary`] backed by the meshopt vertex codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshoptCompression;

impl MeshoptCompression {
    pub fn new() -> Self {
        Self
    }

    fn failure(&self, message: impl ToString) -> CodecError {
        CodecError::Library {
            library: self.name().to_owned(),
            message: message.to_string(),
        }
    }

    fn encode_stream(&self, bytes: &[u8], stride: usize) -> Result<Vec<u8>, CodecError> {
        let encoded = match stride {
            4 => encode_vertices::<4>(bytes),
            8 => encode_vertices::<8>(bytes),
            12 => encode_vertices::<12>(bytes),
            16 => encode_vertices::<16>(bytes),
            _ => return Err(self.failure(format!("unsupported stride {stride}"))),
        };
        encoded.map_err(|e| self.failure(e))
    }
}

fn encode_vertices<const N: usize>(bytes: &[u8]) -> ::meshopt::Result<Vec<u8>> {
    let vertices: Vec<[u8; N]> = bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut vertex = [0u8; N];
            vertex.copy_from_slice(chunk);
            vertex
        })
        .collect();
    ::meshopt::encode_vertex_buffer(&vertices)
}

fn component_size(component_type: u64) -> Option<usize> {
    match component_type {
        5120 | 5121 => Some(1),
        5122 | 5123 => Some(2),
        5125 | 5126 => Some(4),
        _ => None,
    }
}

fn component_count(kind: &str) -> Option<usize> {
    match kind {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" => Some(4),
        _ => None,
    }
}

fn field(object: &Value, name: &str) -> Option<usize> {
    object.get(name)?.as_u64().and_then(|v| usize::try_from(v).ok())
}

/// Finds the vertex views the codec can encode, keyed by view index.
///
/// A view qualifies when it lives in the binary chunk, is a vertex buffer,
/// and every accessor reading it agrees on one 4-byte-aligned stride that
/// divides the view length.
fn vertex_streams(document: &Value) -> BTreeMap<usize, Stream> {
    let empty = Vec::new();
    let views = document["bufferViews"].as_array().unwrap_or(&empty);
    let accessors = document["accessors"].as_array().unwrap_or(&empty);

    let mut strides: BTreeMap<usize, Option<usize>> = BTreeMap::new();
    for accessor in accessors {
        let Some(view_index) = field(accessor, "bufferView") else {
            continue;
        };
        let Some(view) = views.get(view_index) else {
            continue;
        };
        let element = accessor["componentType"]
            .as_u64()
            .and_then(component_size)
            .zip(accessor["type"].as_str().and_then(component_count))
            .map(|(size, count)| size * count);
        let stride = field(view, "byteStride").or(element);
        let entry = strides.entry(view_index).or_insert(stride);
        if *entry != stride {
            *entry = None;
        }
    }

    strides
        .into_iter()
        .filter_map(|(index, stride)| {
            let view = &views[index];
            let stride = stride?;
            let length = field(view, "byteLength")?;
            let in_bin = field(view, "buffer") == Some(0);
            let vertex = view["target"].as_u64() == Some(ARRAY_BUFFER);
            let aligned = matches!(stride, 4 | 8 | 12 | 16) && length % stride == 0;
            (in_bin && vertex && aligned && length > 0).then(|| {
                (
                    index,
                    Stream {
                        stride,
                        count: length / stride,
                    },
                )
            })
        })
        .collect()
}

fn pad(bytes: &mut Vec<u8>) {
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
}

fn declare(document: &mut Value, key: &str) {
    let list = document
        .as_object_mut()
        .map(|root| root.entry(key).or_insert_with(|| json!([])));
    if let Some(Value::Array(names)) = list {
        if !names.iter().any(|name| name == EXT_MESHOPT_COMPRESSION) {
            names.push(json!(EXT_MESHOPT_COMPRESSION));
        }
    }
}

impl GeometryCodecLibrary for MeshoptCompression {
    fn name(&self) -> &str {
        "meshopt"
    }

    fn encode(&self, glb: &[u8], _options: &GeometryOptions) -> Result<Vec<u8>, CodecError> {
        let container = split(glb)?;
        let mut document: Value =
            serde_json::from_slice(&container.json).map_err(|e| self.failure(e))?;
        let bin: &[u8] = container.bin.as_deref().unwrap_or(&[]);
        if !document["buffers"].is_array() {
            return Err(self.failure("document has no buffers"));
        }

        let streams = vertex_streams(&document);
        if streams.is_empty() {
            return Err(self.failure("no vertex stream can be encoded"));
        }
        let fallback_buffer = document["buffers"].as_array().map_or(0, Vec::len);

        let mut packed = Vec::with_capacity(bin.len());
        let mut fallback_length = 0usize;
        let views = document["bufferViews"]
            .as_array_mut()
            .ok_or_else(|| self.failure("document has no buffer views"))?;
        for (index, view) in views.iter_mut().enumerate() {
            if field(view, "buffer") != Some(0) {
                continue;
            }
            let offset = field(view, "byteOffset").unwrap_or(0);
            let length = field(view, "byteLength").unwrap_or(0);
            let bytes = offset
                .checked_add(length)
                .and_then(|end| bin.get(offset..end))
                .ok_or_else(|| self.failure(format!("buffer view {index} runs past the binary chunk")))?;

            pad(&mut packed);
            let Some(stream) = streams.get(&index) else {
                view["byteOffset"] = json!(packed.len());
                packed.extend_from_slice(bytes);
                continue;
            };

            let encoded = self.encode_stream(bytes, stream.stride)?;
            let mut extension = Map::new();
            extension.insert("buffer".into(), json!(0));
            extension.insert("byteOffset".into(), json!(packed.len()));
            extension.insert("byteLength".into(), json!(encoded.len()));
            extension.insert("byteStride".into(), json!(stream.stride));
            extension.insert("count".into(), json!(stream.count));
            extension.insert("mode".into(), json!("ATTRIBUTES"));
            packed.extend_from_slice(&encoded);

            fallback_length = fallback_length.div_ceil(4) * 4;
            view["buffer"] = json!(fallback_buffer);
            view["byteOffset"] = json!(fallback_length);
            view["byteStride"] = json!(stream.stride);
            view["extensions"] = json!({ EXT_MESHOPT_COMPRESSION: extension });
            fallback_length += length;
        }

        if let Some(buffers) = document["buffers"].as_array_mut() {
            if let Some(main) = buffers.first_mut() {
                main["byteLength"] = json!(packed.len());
            }
            buffers.push(json!({
                "byteLength": fallback_length,
                "extensions": { EXT_MESHOPT_COMPRESSION: { "fallback": true } }
            }));
        }
        declare(&mut document, "extensionsUsed");
        declare(&mut document, "extensionsRequired");

        log::debug!(
            "MeshoptCompression: encoded {} vertex streams, binary chunk {} -> {} bytes",
            streams.len(),
            bin.len(),
            packed.len()
        );
        let json = serde_json::to_vec(&document).map_err(|e| self.failure(e))?;
        Ok(assemble(json, Some(packed))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_vertex_views_with_codec_strides_are_selected() {
        let document = json!({
            "bufferViews": [
                {"buffer": 0, "byteLength": 36, "target": 34962},
                {"buffer": 0, "byteLength": 6, "target": 34963},
                {"buffer": 0, "byteLength": 18, "target": 34962},
                {"buffer": 1, "byteLength": 24, "target": 34962}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"},
                {"bufferView": 2, "componentType": 5122, "count": 3, "type": "VEC3"},
                {"bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC2"}
            ]
        });

        let streams = vertex_streams(&document);

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[&0], Stream { stride: 12, count: 3 });
    }

    #[test]
    fn views_read_with_conflicting_strides_are_left_alone() {
        let document = json!({
            "bufferViews": [{"buffer": 0, "byteLength": 48, "target": 34962}],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3"},
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC4"}
            ]
        });
        assert!(vertex_streams(&document).is_empty());
    }
}
