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

//! Geometry Lane
//!
//! Shrinks mesh payloads with a geometry codec. The preprocessing transforms
//! (weld, prune, center, quantize) always run first; the encoded result comes
//! from `gltf-transform draco`, a registered [`GeometryCodecLibrary`], or, when
//! neither works, the preprocessed container itself. With the `meshopt`
//! feature the crate ships `MeshoptCompression` as that library.

#[cfg(feature = "meshopt")]
mod compression;
mod options;

#[cfg(feature = "meshopt")]
pub use compression::{MeshoptCompression, EXT_MESHOPT_COMPRESSION};
pub use options::{GeometryOptions, QuantizationBits};

use crate::error::CodecError;
use crate::tool::{args, tiers, Method, ToolLocator, ToolSlot};
use std::sync::Arc;
use std::time::Duration;
use vitrine_io::glb::has_glb_magic;
use vitrine_io::transforms::{center, quantize};
use vitrine_io::{cleanup, inspect, is_compressed, CleanupOptions, SceneModel, ScratchSpace};

/// Name of the command-line encoder.
pub const GLTF_TRANSFORM: &str = "gltf-transform";

/// Scratch directories older than this are considered leftovers.
pub(crate) const STALE_SCRATCH_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// An in-process geometry codec.
pub trait GeometryCodecLibrary: Send + Sync {
    /// Library name used in logs and errors.
    fn name(&self) -> &str;

    /// Encodes a complete GLB container and returns the encoded container.
    fn encode(&self, glb: &[u8], options: &GeometryOptions) -> Result<Vec<u8>, CodecError>;
}

/// Outcome of [`GeometryAdapter::compress`].
#[derive(Debug, Clone)]
pub struct GeometryResult {
    /// The produced container.
    pub output: Vec<u8>,
    /// Size of the input in bytes.
    pub original_size: u64,
    /// Size of the output in bytes.
    pub compressed_size: u64,
    /// `1 - compressed / original`, 0 when the input is empty.
    pub ratio: f64,
    /// Meshes in the container.
    pub mesh_count: usize,
    /// Vertices after preprocessing.
    pub vertex_count: u64,
    /// Triangles after preprocessing.
    pub triangle_count: u64,
    /// Which tier produced `output`.
    pub method: Method,
}

pub(crate) fn savings_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        1.0 - compressed as f64 / original as f64
    }
}

/// Geometry compression with CLI → library → simulated fallback.
#[derive(Debug)]
pub struct GeometryAdapter {
    tool: ToolSlot,
    library: Option<Arc<dyn GeometryCodecLibrary>>,
    scratch: ScratchSpace,
}

impl std::fmt::Debug for dyn GeometryCodecLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GeometryCodecLibrary({})", self.name())
    }
}

impl GeometryAdapter {
    /// Creates an adapter and sweeps scratch directories left by killed runs.
    pub fn new(locator: Arc<dyn ToolLocator>, scratch: ScratchSpace) -> Self {
        if let Err(e) = scratch.sweep_stale(STALE_SCRATCH_AGE) {
            log::warn!("GeometryAdapter: scratch sweep failed: {}", e);
        }
        Self {
            tool: ToolSlot::new(GLTF_TRANSFORM, locator),
            library: None,
            scratch,
        }
    }

    /// Registers the in-process tier.
    pub fn with_library(mut self, library: Arc<dyn GeometryCodecLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Whether `bytes` already carries Draco or meshopt compressed
    /// geometry. Never fails; malformed input is not encoded.
    pub fn is_encoded(bytes: &[u8]) -> bool {
        is_compressed(bytes)
    }

    /// Compresses a container.
    ///
    /// Options are validated before anything runs. Input that is already
    /// encoded is returned untouched with [`Method::Skipped`].
    pub fn compress(
        &self,
        bytes: &[u8],
        options: &GeometryOptions,
    ) -> Result<GeometryResult, CodecError> {
        options.validate()?;
        let original_size = bytes.len() as u64;

        if Self::is_encoded(bytes) {
            let summary = inspect(bytes)?;
            log::info!("GeometryAdapter: input already encoded, skipping");
            return Ok(GeometryResult {
                output: bytes.to_vec(),
                original_size,
                compressed_size: original_size,
                ratio: 0.0,
                mesh_count: summary.mesh_count,
                vertex_count: 0,
                triangle_count: 0,
                method: Method::Skipped,
            });
        }

        let mut model = SceneModel::from_glb(bytes)?;
        self.preprocess(&mut model, options);
        let preprocessed = model.to_glb()?;

        let mut produced = None;
        for method in tiers(self.tool.path().is_some(), self.library.is_some()) {
            let attempt = match method {
                Method::Cli => self.encode_with_cli(&preprocessed, options),
                Method::Library => self.encode_with_library(&preprocessed, options),
                _ => Ok(preprocessed.clone()),
            };
            match attempt {
                Ok(output) if has_glb_magic(&output) => {
                    produced = Some((output, method));
                    break;
                }
                Ok(_) => log::warn!(
                    "GeometryAdapter: {} tier produced an invalid container, degrading",
                    method
                ),
                Err(e) => log::warn!("GeometryAdapter: {} tier failed ({}), degrading", method, e),
            }
        }
        let (output, method) = produced.unwrap_or((preprocessed, Method::Simulated));

        let compressed_size = output.len() as u64;
        log::info!(
            "GeometryAdapter: {} -> {} bytes via {}",
            original_size,
            compressed_size,
            method
        );
        Ok(GeometryResult {
            ratio: savings_ratio(original_size, compressed_size),
            output,
            original_size,
            compressed_size,
            mesh_count: model.meshes.len(),
            vertex_count: model.vertex_count(),
            triangle_count: model.triangle_count(),
            method,
        })
    }

    fn preprocess(&self, model: &mut SceneModel, options: &GeometryOptions) {
        if options.weld || options.prune {
            cleanup(
                model,
                &CleanupOptions {
                    weld: options.weld,
                    dedup: options.prune,
                    prune: options.prune,
                    ..CleanupOptions::default()
                },
            );
        }
        if options.center {
            center(model);
        }
        if options.quantize {
            quantize(model, &options.quantization.to_quantize_options());
        }
    }

    fn encode_with_cli(
        &self,
        preprocessed: &[u8],
        options: &GeometryOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let session = self.scratch.session()?;
        let input = session.path().join("input.glb");
        let output = session.path().join("output.glb");
        std::fs::write(&input, preprocessed)?;

        let q = &options.quantization;
        let mut command = args(["draco"]);
        command.push(input.clone().into_os_string());
        command.push(output.clone().into_os_string());
        command.extend(args([
            "--method".to_string(),
            options.draco_method().to_string(),
            "--encode-speed".to_string(),
            options.encode_speed.to_string(),
            "--decode-speed".to_string(),
            options.decode_speed.to_string(),
            "--quantize-position".to_string(),
            q.position.to_string(),
            "--quantize-normal".to_string(),
            q.normal.to_string(),
            "--quantize-texcoord".to_string(),
            q.texcoord.to_string(),
            "--quantize-color".to_string(),
            q.color.to_string(),
            "--quantize-generic".to_string(),
            q.generic.to_string(),
        ]));
        self.tool.run(&command)?;
        Ok(std::fs::read(&output)?)
    }

    fn encode_with_library(
        &self,
        preprocessed: &[u8],
        options: &GeometryOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| CodecError::InvalidOutput("no library registered".into()))?;
        library.encode(preprocessed, options)
    }
}
