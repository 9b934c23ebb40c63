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

use crate::model::{AttributeFormat, SceneModel, Semantic, VertexAttribute};

/// Bit depths per attribute family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizeOptions {
    /// Grid resolution for positions.
    pub position_bits: u8,
    /// Normals and tangents.
    pub normal_bits: u8,
    /// Texture coordinates.
    pub texcoord_bits: u8,
    /// Vertex colors.
    pub color_bits: u8,
    /// Every other attribute.
    pub generic_bits: u8,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            position_bits: 14,
            normal_bits: 10,
            texcoord_bits: 12,
            color_bits: 8,
            generic_bits: 12,
        }
    }
}

fn in_unit_range(attribute: &VertexAttribute) -> bool {
    attribute.values.iter().all(|v| (0.0..=1.0).contains(v))
}

/// Rounds normalized values to what `bits` of precision can represent.
fn snap_normalized(attribute: &mut VertexAttribute, bits: u8, signed: bool) {
    let bits = bits.clamp(2, 16) as i32;
    let steps = if signed {
        ((1 << (bits - 1)) - 1) as f32
    } else {
        ((1 << bits) - 1) as f32
    };
    for value in &mut attribute.values {
        *value = (*value * steps).round() / steps;
    }
}

/// Snaps positions to a grid of `2^bits` cells spanning their bounding box.
fn snap_positions(attribute: &mut VertexAttribute, bits: u8) {
    let components = attribute.components.max(1);
    let count = attribute.count();
    if count == 0 {
        return;
    }
    let cells = ((1u32 << bits.clamp(1, 24)) - 1) as f32;
    for axis in 0..components {
        let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
        for vertex in 0..count {
            let value = attribute.values[vertex * components + axis];
            min = min.min(value);
            max = max.max(value);
        }
        let step = (max - min) / cells;
        if step <= 0.0 {
            continue;
        }
        for vertex in 0..count {
            let value = &mut attribute.values[vertex * components + axis];
            *value = min + ((*value - min) / step).round() * step;
        }
    }
}

/// Reduces vertex attribute precision. Returns the number of attributes
/// changed.
///
/// Normals and tangents become normalized signed integers and texture
/// coordinates and colors in `[0, 1]` become normalized unsigned integers;
/// the writer declares `KHR_mesh_quantization` where the core format does
/// not allow this. Positions stay floats snapped to a grid so node
/// transforms keep their meaning. Skinning attributes are never touched.
pub fn quantize(model: &mut SceneModel, options: &QuantizeOptions) -> usize {
    let mut changed = 0;
    for primitive in model.primitives_mut() {
        for (semantic, attribute) in primitive.attributes.iter_mut() {
            if attribute.format.is_quantized() {
                continue;
            }
            match semantic {
                Semantic::Positions => snap_positions(attribute, options.position_bits),
                Semantic::Normals | Semantic::Tangents => {
                    snap_normalized(attribute, options.normal_bits, true);
                    attribute.format = AttributeFormat::snorm(options.normal_bits);
                }
                Semantic::TexCoords(_) if in_unit_range(attribute) => {
                    snap_normalized(attribute, options.texcoord_bits, false);
                    attribute.format = AttributeFormat::unorm(options.texcoord_bits);
                }
                Semantic::Colors(_) if in_unit_range(attribute) => {
                    snap_normalized(attribute, options.color_bits, false);
                    attribute.format = AttributeFormat::unorm(options.color_bits);
                }
                Semantic::Extras(_) if in_unit_range(attribute) => {
                    snap_normalized(attribute, options.generic_bits, false);
                    attribute.format = AttributeFormat::unorm(options.generic_bits);
                }
                _ => continue,
            }
            changed += 1;
        }
    }
    changed
}
