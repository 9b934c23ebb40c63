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

//! # Vitrine Lanes
//!
//! The codec adapters. Each lane turns a container into a derived artifact
//! and chooses, once per adapter, how to do it:
//!
//! 1. an external command-line tool, if the host has it;
//! 2. an in-process library, if one was registered on the adapter (the
//!    `meshopt` feature provides one for geometry and for LODs);
//! 3. a simulated fallback that only runs the cleanup transforms.
//!
//! A failing tier degrades to the next one, so an adapter never fails just
//! because a codec is unavailable.

pub mod error;
pub mod geometry_lane;
pub mod lod_lane;
pub mod texture_lane;
pub mod tool;

pub use error::CodecError;
pub use geometry_lane::{GeometryAdapter, GeometryCodecLibrary, GeometryOptions, GeometryResult};
#[cfg(feature = "meshopt")]
pub use geometry_lane::MeshoptCompression;
pub use lod_lane::{LodAdapter, LodConfig, LodSet, SimplifierLibrary};
#[cfg(feature = "meshopt")]
pub use lod_lane::MeshoptSimplifier;
pub use texture_lane::{
    detect_device_capabilities, BrowserFamily, DeviceCapabilities, TextureAdapter,
    TextureCodecLibrary, TextureMode, TextureOptions, TextureResult,
};
pub use tool::{Method, NoTools, PathLocator, ToolLocator};
