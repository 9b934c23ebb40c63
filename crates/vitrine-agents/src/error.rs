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

//! Errors raised by the orchestrators.

use crate::job_runner::JobKind;
use std::time::Duration;
use thiserror::Error;
use vitrine_core::{AssetId, ProcessingStage, StorageError, StoreError};
use vitrine_io::ContainerError;
use vitrine_lanes::CodecError;

/// Errors that can occur while running the transcoding pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The asset is not in the store.
    #[error("asset '{0}' not found")]
    AssetNotFound(AssetId),
    /// The asset store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The container could not be fetched or a result stored.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The container could not be decoded or encoded.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// A codec adapter failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Validation rejected the container.
    #[error("container '{url}' is invalid: {}", errors.join("; "))]
    InvalidContainer {
        /// Container URL.
        url: String,
        /// Every validation error found.
        errors: Vec<String>,
    },
    /// A stage finished after its deadline; its result was discarded.
    #[error("{stage} took {elapsed:?}, limit is {limit:?}")]
    Timeout {
        /// Stage that overran.
        stage: ProcessingStage,
        /// Time it took.
        elapsed: Duration,
        /// Configured limit.
        limit: Duration,
    },
    /// The job runner was shut down.
    #[error("job runner is stopped")]
    RunnerStopped,
    /// No handler is registered for a job kind.
    #[error("no handler registered for {0} jobs")]
    NoHandler(JobKind),
    /// A stage panicked; the panic was contained to its job.
    #[error("stage panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    /// Whether the job runner should retry the job that raised this error.
    /// Only network-level failures are transient; bad input never is.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Storage(e) => e.is_transient(),
            PipelineError::Codec(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Turns the payload of a caught panic into an error.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        PipelineError::Panicked(message)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::AssetNotFound(_) => "asset_not_found",
            PipelineError::Store(_) => "store_failure",
            PipelineError::Storage(
                StorageError::InvalidUrl(_) | StorageError::UnsupportedScheme { .. },
            ) => "invalid_url",
            PipelineError::Storage(_) => "storage_failure",
            PipelineError::Container(_) | PipelineError::InvalidContainer { .. } => {
                "invalid_container"
            }
            PipelineError::Codec(_) => "codec_failure",
            PipelineError::Timeout { .. } => "stage_timeout",
            PipelineError::RunnerStopped => "runner_stopped",
            PipelineError::NoHandler(_) => "no_handler",
            PipelineError::Panicked(_) => "internal_error",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> u16 {
        match self {
            PipelineError::AssetNotFound(_) => 404,
            PipelineError::Storage(
                StorageError::InvalidUrl(_) | StorageError::UnsupportedScheme { .. },
            ) => 400,
            PipelineError::Container(_) | PipelineError::InvalidContainer { .. } => 422,
            PipelineError::Storage(_) => 502,
            PipelineError::Timeout { .. } => 504,
            PipelineError::RunnerStopped => 503,
            PipelineError::Store(_)
            | PipelineError::Codec(_)
            | PipelineError::NoHandler(_)
            | PipelineError::Panicked(_) => 500,
        }
    }
}

/// Errors raised while resolving a render manifest.
///
/// Each variant has a stable [`code`](ManifestError::code) and an HTTP-style
/// [`status`](ManifestError::status) for the layer serving the document.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The requested asset does not exist.
    #[error("asset '{0}' not found")]
    AssetNotFound(AssetId),
    /// A lighting preset, requested directly or through a render preset,
    /// does not exist.
    #[error("lighting preset '{0}' not found")]
    LightingPresetNotFound(String),
    /// The requested render preset does not exist.
    #[error("render preset '{0}' not found")]
    RenderPresetNotFound(String),
    /// The requested material variant does not exist.
    #[error("material variant '{0}' not found")]
    MaterialVariantNotFound(String),
    /// The material variant belongs to another asset.
    #[error("material variant '{variant}' does not belong to asset '{asset}'")]
    InvalidMaterialVariant {
        /// Variant id.
        variant: String,
        /// Requested asset.
        asset: AssetId,
    },
    /// The render preset belongs to another asset.
    #[error("render preset '{preset}' does not belong to asset '{asset}'")]
    InvalidRenderPreset {
        /// Preset id.
        preset: String,
        /// Requested asset.
        asset: AssetId,
    },
    /// The asset store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ManifestError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ManifestError::AssetNotFound(_) => "asset_not_found",
            ManifestError::LightingPresetNotFound(_) => "lighting_preset_not_found",
            ManifestError::RenderPresetNotFound(_) => "render_preset_not_found",
            ManifestError::MaterialVariantNotFound(_) => "material_variant_not_found",
            ManifestError::InvalidMaterialVariant { .. } => "invalid_material_variant",
            ManifestError::InvalidRenderPreset { .. } => "invalid_render_preset",
            ManifestError::Store(_) => "store_failure",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> u16 {
        match self {
            ManifestError::AssetNotFound(_)
            | ManifestError::LightingPresetNotFound(_)
            | ManifestError::RenderPresetNotFound(_)
            | ManifestError::MaterialVariantNotFound(_) => 404,
            ManifestError::InvalidMaterialVariant { .. }
            | ManifestError::InvalidRenderPreset { .. } => 400,
            ManifestError::Store(_) => 500,
        }
    }
}

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_are_transient() {
        let network = PipelineError::Storage(StorageError::Network {
            url: "http://x/a.glb".into(),
            message: "connection reset".into(),
        });
        let wrapped = PipelineError::Codec(CodecError::Storage(StorageError::HttpStatus {
            url: "http://x/a.glb".into(),
            status: 503,
        }));
        let missing = PipelineError::Storage(StorageError::HttpStatus {
            url: "http://x/a.glb".into(),
            status: 404,
        });
        let invalid = PipelineError::InvalidContainer {
            url: "a.glb".into(),
            errors: vec!["bad magic".into()],
        };

        assert!(network.is_transient());
        assert!(wrapped.is_transient());
        assert!(!missing.is_transient());
        assert!(!invalid.is_transient());
    }

    #[test]
    fn pipeline_errors_map_to_stable_codes() {
        let missing = PipelineError::AssetNotFound(AssetId::new("A1"));
        let bad_url = PipelineError::Storage(StorageError::InvalidUrl("::".into()));
        let upstream = PipelineError::Storage(StorageError::HttpStatus {
            url: "http://x/a.glb".into(),
            status: 503,
        });
        let invalid = PipelineError::InvalidContainer {
            url: "a.glb".into(),
            errors: vec!["bad magic".into()],
        };
        let overran = PipelineError::Timeout {
            stage: ProcessingStage::LodGeneration,
            elapsed: Duration::from_secs(2),
            limit: Duration::from_secs(1),
        };

        assert_eq!((missing.code(), missing.status()), ("asset_not_found", 404));
        assert_eq!((bad_url.code(), bad_url.status()), ("invalid_url", 400));
        assert_eq!((upstream.code(), upstream.status()), ("storage_failure", 502));
        assert_eq!((invalid.code(), invalid.status()), ("invalid_container", 422));
        assert_eq!((overran.code(), overran.status()), ("stage_timeout", 504));
    }

    #[test]
    fn panic_payloads_keep_their_message() {
        let from_str = PipelineError::from_panic(Box::new("index out of range"));
        let from_string = PipelineError::from_panic(Box::new(String::from("boom")));
        let opaque = PipelineError::from_panic(Box::new(7u8));

        assert!(matches!(&from_str, PipelineError::Panicked(m) if m == "index out of range"));
        assert!(matches!(&from_string, PipelineError::Panicked(m) if m == "boom"));
        assert_eq!(opaque.code(), "internal_error");
        assert_eq!(opaque.status(), 500);
        assert!(!opaque.is_transient());
    }

    #[test]
    fn manifest_errors_map_to_stable_codes() {
        let missing = ManifestError::LightingPresetNotFound("gone".into());
        let foreign = ManifestError::InvalidRenderPreset {
            preset: "RP9".into(),
            asset: AssetId::new("A1"),
        };

        assert_eq!(missing.code(), "lighting_preset_not_found");
        assert_eq!(missing.status(), 404);
        assert_eq!(foreign.code(), "invalid_render_preset");
        assert_eq!(foreign.status(), 400);
    }
}
