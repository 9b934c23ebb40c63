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

//! GLB container framing.
//!
//! Chunk splitting and assembly are done by [`gltf::Glb`]. This module adds
//! the header checks `gltf` leaves to its caller, so that a short or lying
//! header is reported as an error before any chunk is read.

use crate::error::ContainerError;
use std::borrow::Cow;

/// The four magic bytes every GLB container starts with.
pub const GLB_MAGIC: &[u8; 4] = b"glTF";
/// Size of the GLB header in bytes.
pub const GLB_HEADER_LEN: usize = 12;

/// Whether `bytes` starts with the GLB magic.
///
/// Returns `false` for anything shorter than the magic itself.
pub fn has_glb_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(GLB_MAGIC)
}

fn header_word(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// Checks magic, version and declared length of the GLB header.
pub fn check_header(bytes: &[u8]) -> Result<(), ContainerError> {
    if bytes.len() < GLB_HEADER_LEN {
        return Err(ContainerError::Truncated(bytes.len()));
    }
    if !has_glb_magic(bytes) {
        return Err(ContainerError::BadMagic);
    }
    let version = header_word(bytes, 4);
    if version != 2 {
        return Err(ContainerError::UnsupportedVersion(version));
    }
    let declared = header_word(bytes, 8) as usize;
    if declared < GLB_HEADER_LEN || declared > bytes.len() {
        return Err(ContainerError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Splits a container into its JSON and binary chunks.
pub fn split(bytes: &[u8]) -> Result<gltf::Glb<'_>, ContainerError> {
    check_header(bytes)?;
    Ok(gltf::Glb::from_slice(bytes)?)
}

/// Frames a JSON document and an optional binary chunk as a GLB container.
///
/// Both chunks are padded to 4-byte boundaries by [`gltf::Glb::to_vec`].
pub fn assemble(json: Vec<u8>, bin: Option<Vec<u8>>) -> Result<Vec<u8>, ContainerError> {
    let glb = gltf::Glb {
        header: gltf::binary::Header {
            magic: *GLB_MAGIC,
            version: 2,
            // Recomputed by the writer.
            length: 0,
        },
        json: Cow::Owned(json),
        bin: bin.map(Cow::Owned),
    };
    Ok(glb.to_vec()?)
}
