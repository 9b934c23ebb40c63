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

mod codec;
mod manifest;
mod pipeline;

pub use codec::{compress_geometry, compress_textures, lod, optimize, validate, TextureArgs};
pub use manifest::{capabilities, manifest, ManifestArgs};
pub use pipeline::process;

use anyhow::{Context, Result};
use std::sync::Arc;
use vitrine_agents::{Adapters, VitrineConfig};
use vitrine_core::{AssetId, ObjectStorage};
use vitrine_io::urls::file_name;
use vitrine_io::UrlStorage;

/// Storage and codec adapters built from the configuration.
pub(crate) struct Toolkit {
    pub storage: Arc<dyn ObjectStorage>,
    pub adapters: Adapters,
}

pub(crate) fn toolkit(config: &VitrineConfig) -> Result<Toolkit> {
    let scratch = config
        .tools
        .scratch()
        .context("cannot prepare the scratch directory")?;
    let storage: Arc<dyn ObjectStorage> = Arc::new(UrlStorage::new());
    let adapters = Adapters::new(Arc::new(config.tools.locator()), scratch, Arc::clone(&storage));
    Ok(Toolkit { storage, adapters })
}

/// The file stem of `url`, used as the asset id of standalone runs.
pub(crate) fn asset_id_of(url: &str) -> AssetId {
    let name = file_name(url);
    let stem = name.split('.').next().filter(|s| !s.is_empty()).unwrap_or(name);
    AssetId::new(stem)
}
