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

//! Errors raised while decoding or encoding containers.

use thiserror::Error;

/// Any failure to read or write a GLB container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Fewer bytes than a GLB header.
    #[error("container is {0} bytes, too short for a GLB header")]
    Truncated(usize),
    /// The first four bytes are not `glTF`.
    #[error("bad magic bytes, expected 'glTF'")]
    BadMagic,
    /// GLB version other than 2.
    #[error("unsupported GLB version {0}")]
    UnsupportedVersion(u32),
    /// Header length disagrees with the byte count.
    #[error("header declares {declared} bytes but container has {actual}")]
    LengthMismatch {
        /// Length field of the header.
        declared: usize,
        /// Actual byte count.
        actual: usize,
    },
    /// Framing or JSON rejected by the `gltf` crate.
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    /// The document could not be serialized.
    #[error("cannot serialize document: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON is valid but not a usable glTF document.
    #[error("invalid document: {0}")]
    Document(String),
    /// Geometry uses a compression extension that cannot be decoded in-process.
    #[error("geometry is compressed with '{0}' and cannot be decoded in-process")]
    Compressed(String),
    /// A buffer lives outside the container.
    #[error("external buffer '{0}' is not supported")]
    ExternalBuffer(String),
    /// An accessor points outside its buffer or has an unusable layout.
    #[error("accessor {index}: {reason}")]
    Accessor {
        /// Accessor index in the source document.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
    /// A primitive's attributes or indices disagree with each other.
    #[error("mesh {mesh} primitive {primitive}: {reason}")]
    Primitive {
        /// Mesh index in the source document.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
        /// What is wrong with it.
        reason: String,
    },
}

impl ContainerError {
    pub(crate) fn accessor(index: usize, reason: impl Into<String>) -> Self {
        ContainerError::Accessor {
            index,
            reason: reason.into(),
        }
    }
}
