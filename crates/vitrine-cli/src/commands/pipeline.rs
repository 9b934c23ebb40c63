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

use super::{asset_id_of, toolkit};
use crate::helpers::*;
use anyhow::Result;
use std::sync::Arc;
use vitrine_agents::{PipelineAgent, VitrineConfig};
use vitrine_core::{Asset, AssetId, AssetStore};
use vitrine_infra::InMemoryAssetStore;

/// Runs every stage inline and prints the resulting asset record.
pub fn process(config: VitrineConfig, file: &str, id: Option<String>) -> Result<()> {
    print_task_start("Processing", PACKAGE, CYAN);
    let id = id.map(AssetId::new).unwrap_or_else(|| asset_id_of(file));
    let store: Arc<dyn AssetStore> =
        Arc::new(InMemoryAssetStore::with_assets([Asset::new(id.clone(), file)]));
    let kit = toolkit(&config)?;

    let agent = PipelineAgent::new(config, store, kit.storage, kit.adapters);
    let outcome = agent.run_full_pipeline(&id, file);
    agent.shutdown();

    let asset = outcome?;
    print_success(&format!(
        "{} is {:?} with {} LODs and {} texture records",
        asset.id,
        asset.status,
        asset.lods.len(),
        asset.texture_formats.len()
    ));
    print_json(&asset)
}
