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

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use vitrine_io::QuantizeOptions;

const BITS_RANGE: &str = "[8, 16]";
const SPEED_RANGE: &str = "[0, 10]";

/// Quantization bit depth per attribute family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationBits {
    /// Positions.
    pub position: u8,
    /// Normals and tangents.
    pub normal: u8,
    /// Texture coordinates.
    pub texcoord: u8,
    /// Vertex colors.
    pub color: u8,
    /// Every other attribute.
    pub generic: u8,
}

impl Default for QuantizationBits {
    fn default() -> Self {
        Self {
            position: 14,
            normal: 10,
            texcoord: 12,
            color: 8,
            generic: 8,
        }
    }
}

impl QuantizationBits {
    pub(crate) fn to_quantize_options(self) -> QuantizeOptions {
        QuantizeOptions {
            position_bits: self.position,
            normal_bits: self.normal,
            texcoord_bits: self.texcoord,
            color_bits: self.color,
            generic_bits: self.generic,
        }
    }
}

/// Options of a geometry compression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryOptions {
    /// Encoder speed, 0 (best compression) to 10 (fastest).
    pub encode_speed: u8,
    /// Decoder speed, 0 to 10.
    pub decode_speed: u8,
    /// Compression level, 0 (none) to 10 (maximum).
    pub compression_level: u8,
    /// Quantization bit depths.
    pub quantization: QuantizationBits,
    /// Merge duplicate vertices first.
    pub weld: bool,
    /// Drop unused resources first.
    pub prune: bool,
    /// Center the model on the origin first.
    pub center: bool,
    /// Quantize attributes in the container itself.
    pub quantize: bool,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            encode_speed: 5,
            decode_speed: 5,
            compression_level: 7,
            quantization: QuantizationBits::default(),
            weld: true,
            prune: true,
            center: false,
            quantize: false,
        }
    }
}

impl GeometryOptions {
    /// Rejects out-of-range values. Bit depths must lie in `[8, 16]`, speeds
    /// and level in `[0, 10]`.
    pub fn validate(&self) -> Result<(), CodecError> {
        let q = &self.quantization;
        for (name, bits) in [
            ("quantization.position", q.position),
            ("quantization.normal", q.normal),
            ("quantization.texcoord", q.texcoord),
            ("quantization.color", q.color),
            ("quantization.generic", q.generic),
        ] {
            if !(8..=16).contains(&bits) {
                return Err(CodecError::invalid(name, bits, BITS_RANGE));
            }
        }
        for (name, value) in [
            ("encode_speed", self.encode_speed),
            ("decode_speed", self.decode_speed),
            ("compression_level", self.compression_level),
        ] {
            if value > 10 {
                return Err(CodecError::invalid(name, value, SPEED_RANGE));
            }
        }
        Ok(())
    }

    /// Level 0 asks for the sequential encoder, which keeps vertex order;
    /// any other level uses edgebreaker.
    pub(crate) fn draco_method(&self) -> &'static str {
        if self.compression_level == 0 {
            "sequential"
        } else {
            "edgebreaker"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_position_bits(bits: u8) -> GeometryOptions {
        GeometryOptions {
            quantization: QuantizationBits {
                position: bits,
                ..QuantizationBits::default()
            },
            ..GeometryOptions::default()
        }
    }

    #[test]
    fn bit_depth_bounds_are_inclusive() {
        assert!(with_position_bits(8).validate().is_ok());
        assert!(with_position_bits(16).validate().is_ok());
        assert!(matches!(
            with_position_bits(7).validate(),
            Err(CodecError::InvalidOption { name: "quantization.position", .. })
        ));
        assert!(with_position_bits(17).validate().is_err());
    }

    #[test]
    fn speeds_above_ten_are_rejected() {
        let options = GeometryOptions {
            decode_speed: 11,
            ..GeometryOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(GeometryOptions::default().validate().is_ok());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let options: GeometryOptions =
            serde_json::from_str(r#"{ "encode_speed": 2, "quantization": { "normal": 12 } }"#)
                .unwrap();
        assert_eq!(options.encode_speed, 2);
        assert_eq!(options.quantization.normal, 12);
        assert_eq!(options.quantization.position, 14);
        assert!(options.weld);
    }
}
