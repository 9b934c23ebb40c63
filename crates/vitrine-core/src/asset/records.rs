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

use serde::{Deserialize, Serialize};

/// Distinguishes the container's own textures from transcoded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFormatTag {
    /// Textures as embedded in the uploaded container (PNG/JPEG/WebP).
    Native,
    /// GPU-transcodable KTX2 (Basis Universal) textures.
    Ktx2,
}

impl TextureFormatTag {
    /// Whether this tag denotes a GPU-compressed format.
    pub fn is_compressed(self) -> bool {
        matches!(self, TextureFormatTag::Ktx2)
    }

    /// The tag as it appears in requests and manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            TextureFormatTag::Native => "native",
            TextureFormatTag::Ktx2 => "ktx2",
        }
    }
}

/// A container variant produced by one texture-codec run.
///
/// Records are appended, never mutated; a rerun appends a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureFormat {
    /// Which texture encoding the container at `url` carries.
    pub format: TextureFormatTag,
    /// URL of the container holding the textures.
    pub url: String,
    /// Total size in bytes of the source textures.
    pub original_size: u64,
    /// Total size in bytes after transcoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
}

/// One simplified copy of the master container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LodLevel {
    /// Detail level, 0 being full detail.
    pub level: u32,
    /// URL of the derived container.
    pub url: String,
    /// Vertex count summed over every primitive of the container.
    pub vertex_count: u64,
    /// Size in bytes of the derived container.
    pub file_size: u64,
    /// Camera distance in meters at which the viewer switches to this level.
    pub distance: f32,
}

impl LodLevel {
    /// Convenience constructor.
    pub fn new(
        level: u32,
        url: impl Into<String>,
        vertex_count: u64,
        file_size: u64,
        distance: f32,
    ) -> Self {
        Self {
            level,
            url: url.into(),
            vertex_count,
            file_size,
            distance,
        }
    }
}

/// Checks the LOD ordering invariant: vertex counts never grow and switch
/// distances strictly grow with the level index.
pub fn lods_are_monotonic(lods: &[LodLevel]) -> bool {
    lods.windows(2).all(|pair| {
        pair[0].level < pair[1].level
            && pair[0].vertex_count >= pair[1].vertex_count
            && pair[0].distance < pair[1].distance
    })
}
