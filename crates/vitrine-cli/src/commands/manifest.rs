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

use crate::helpers::*;
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use vitrine_agents::{DeviceClass, ManifestAgent, ManifestRequest, VitrineConfig};
use vitrine_core::TextureFormatTag;
use vitrine_infra::{Fixtures, PrefixCdn};
use vitrine_lanes::detect_device_capabilities;

/// Manifest request flags.
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// JSON file with assets, presets and material variants.
    #[arg(long)]
    fixtures: PathBuf,
    /// Asset to render.
    #[arg(long)]
    asset: String,
    #[arg(long)]
    render_preset: Option<String>,
    #[arg(long)]
    lighting_preset: Option<String>,
    #[arg(long)]
    material_variant: Option<String>,
    /// `desktop` or `mobile`.
    #[arg(long)]
    device: Option<DeviceClass>,
    /// Client user agent; picks device class and texture preference.
    #[arg(long)]
    user_agent: Option<String>,
    /// `native` or `ktx2`.
    #[arg(long, value_parser = parse_texture_format)]
    texture_format: Option<TextureFormatTag>,
    /// Highest detail level to list.
    #[arg(long)]
    max_lod: Option<u32>,
    #[arg(long)]
    prefer_compressed: bool,
    /// Origin prefix to rewrite, overriding `[cdn] origin`.
    #[arg(long)]
    cdn_origin: Option<String>,
    /// CDN prefix, overriding `[cdn] base_url`.
    #[arg(long)]
    cdn_base: Option<String>,
}

fn parse_texture_format(s: &str) -> Result<TextureFormatTag, String> {
    match s {
        "native" => Ok(TextureFormatTag::Native),
        "ktx2" => Ok(TextureFormatTag::Ktx2),
        other => Err(format!("unknown texture format '{other}'")),
    }
}

impl ManifestArgs {
    fn request(&self) -> ManifestRequest {
        let mut request = match &self.user_agent {
            Some(user_agent) => ManifestRequest::for_user_agent(self.asset.as_str(), user_agent),
            None => ManifestRequest::new(self.asset.as_str()),
        };
        request.render_preset_id = self.render_preset.clone();
        request.lighting_preset_id = self.lighting_preset.clone();
        request.material_variant_id = self.material_variant.clone();
        if let Some(device) = self.device {
            request.device = device;
        }
        request.texture_format = self.texture_format;
        request.max_lod = self.max_lod;
        request.prefer_compressed |= self.prefer_compressed;
        request
    }
}

pub fn manifest(config: &VitrineConfig, args: ManifestArgs) -> Result<()> {
    print_task_start("Resolving manifest", SCROLL, YELLOW);
    let (assets, presets) = Fixtures::load(&args.fixtures)?.into_stores();
    let mut agent = ManifestAgent::new(Arc::new(assets), Arc::new(presets));

    let origin = args.cdn_origin.clone().or_else(|| config.cdn.origin.clone());
    let base = args.cdn_base.clone().or_else(|| config.cdn.base_url.clone());
    if let (Some(origin), Some(base)) = (origin, base) {
        agent = agent.with_cdn(Arc::new(PrefixCdn::new(origin, base)));
    }

    match agent.generate(&args.request()) {
        Ok(manifest) => {
            print_success(&format!("manifest version {:?}", manifest.version));
            println!("{}", manifest.to_json_pretty()?);
            Ok(())
        }
        Err(e) => bail!("{} [{} {}]", e, e.code(), e.status()),
    }
}

pub fn capabilities(user_agent: &str) -> Result<()> {
    print_json(&detect_device_capabilities(user_agent))
}
