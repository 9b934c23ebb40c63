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

//! # Vitrine IO
//!
//! Everything that touches container bytes or storage:
//!
//! - [`glb`]: the binary container framing, on top of [`gltf::Glb`].
//! - [`model`]: a decoded, editable view of a container ([`SceneModel`]),
//!   read through the `gltf` accessor readers and written back as a typed
//!   [`gltf::json::Root`].
//! - [`transforms`]: the cleanup transforms (weld, prune, dedup) and the
//!   geometry preprocessing transforms (center, quantize).
//! - [`storage`]: a URL-addressed [`ObjectStorage`](vitrine_core::ObjectStorage)
//!   for `file://` and `http(s)://` URLs.
//! - [`inspect`]: structural checks and compression detection.
//! - [`scratch`]: self-cleaning working directories for external tools.
//! - [`urls`]: naming of derived artifacts (`a.glb` → `a.lod1.glb`).

pub mod error;
pub mod glb;
pub mod inspect;
pub mod model;
pub mod scratch;
pub mod storage;
pub mod transforms;
pub mod urls;

mod decode;
mod writer;

pub use error::ContainerError;
pub use inspect::{inspect, is_compressed, is_draco_encoded, ContainerSummary};
pub use model::{
    AttributeFormat, ComponentType, ImageSource, MeshData, Mode, ModelImage, OpaqueAccessor,
    Primitive, SceneModel, Semantic, VertexAttribute,
};
pub use scratch::ScratchSpace;
pub use storage::UrlStorage;
pub use transforms::{cleanup, CleanupOptions, CleanupReport, QuantizeOptions};
