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

/// Basis Universal encoding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureMode {
    /// Small files, lower quality. Suits color textures.
    #[default]
    Etc1s,
    /// Larger files, near-lossless. Suits normal maps.
    Uastc,
}

/// Options of a texture transcoding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    /// Encoding mode.
    pub mode: TextureMode,
    /// Quality from 1 (smallest) to 10 (best).
    pub quality: u8,
    /// Longest edge allowed; larger images are downsampled first.
    pub max_resolution: Option<u32>,
    /// Generate a mip chain.
    pub mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            mode: TextureMode::Etc1s,
            quality: 8,
            max_resolution: None,
            mipmaps: true,
        }
    }
}

impl TextureOptions {
    /// Rejects out-of-range values.
    pub fn validate(&self) -> Result<(), CodecError> {
        if !(1..=10).contains(&self.quality) {
            return Err(CodecError::invalid("quality", self.quality, "[1, 10]"));
        }
        if let Some(max) = self.max_resolution {
            if !(1..=16384).contains(&max) {
                return Err(CodecError::invalid("max_resolution", max, "[1, 16384]"));
            }
        }
        Ok(())
    }

    /// ETC1S `--qlevel`: `round(quality × 25.5)` clamped to `[1, 255]`.
    pub fn etc1s_qlevel(&self) -> u32 {
        ((self.quality as f32 * 25.5).round() as u32).clamp(1, 255)
    }

    /// UASTC quality level: `quality / 3` clamped to `[0, 4]`.
    pub fn uastc_level(&self) -> u32 {
        (self.quality as u32 / 3).min(4)
    }
}
