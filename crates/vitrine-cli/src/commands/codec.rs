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
use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;
use std::path::Path;
use vitrine_agents::pipeline_agent::{optimize_bytes, validate_bytes};
use vitrine_agents::VitrineConfig;
use vitrine_core::ObjectStorage;
use vitrine_io::UrlStorage;
use vitrine_lanes::{TextureMode, TextureOptions};

/// Texture flags overriding the `[texture]` section.
#[derive(Args, Debug)]
pub struct TextureArgs {
    /// Quality from 1 (smallest) to 10 (best).
    #[arg(long)]
    quality: Option<u8>,
    /// Downsample images whose longest edge exceeds this.
    #[arg(long)]
    max_resolution: Option<u32>,
    /// `etc1s` or `uastc`.
    #[arg(long, value_parser = parse_mode)]
    mode: Option<TextureMode>,
    /// Skip mip generation.
    #[arg(long)]
    no_mipmaps: bool,
}

impl TextureArgs {
    pub fn apply(&self, options: &mut TextureOptions) {
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        if self.max_resolution.is_some() {
            options.max_resolution = self.max_resolution;
        }
        if let Some(mode) = self.mode {
            options.mode = mode;
        }
        if self.no_mipmaps {
            options.mipmaps = false;
        }
    }
}

fn parse_mode(s: &str) -> Result<TextureMode, String> {
    match s {
        "etc1s" => Ok(TextureMode::Etc1s),
        "uastc" => Ok(TextureMode::Uastc),
        other => Err(format!("unknown texture mode '{other}'")),
    }
}

pub fn validate(config: &VitrineConfig, file: &str) -> Result<()> {
    print_task_start("Validating", MAGNIFIER, CYAN);
    let bytes = UrlStorage::new()
        .fetch(file)
        .with_context(|| format!("cannot read {file}"))?;

    let report = validate_bytes(&bytes, config.pipeline.max_file_size);
    for warning in &report.warnings {
        print_warning(warning);
    }
    print_json(&report)?;
    if !report.valid {
        bail!("{} is invalid: {}", file, report.errors.join("; "));
    }
    print_success(&format!(
        "{} is a valid glTF {} container",
        file,
        report.version.as_deref().unwrap_or("?")
    ));
    Ok(())
}

pub fn optimize(_config: &VitrineConfig, file: &str) -> Result<()> {
    print_task_start("Optimizing", GEAR, BLUE);
    let bytes = UrlStorage::new()
        .fetch(file)
        .with_context(|| format!("cannot read {file}"))?;

    let report = optimize_bytes(&asset_id_of(file), file, &bytes)?;
    print_success(&format!(
        "{} -> {} bytes, {} -> {} vertices ({} saved)",
        report.original_size,
        report.optimized_size,
        report.vertices_before,
        report.vertices_after,
        percent(report.savings_percent / 100.0)
    ));
    print_json(&report)
}

pub fn lod(config: &VitrineConfig, file: &str) -> Result<()> {
    print_task_start("Generating LODs", LADDER, MAGENTA);
    let kit = toolkit(config)?;

    let set = kit
        .adapters
        .lods
        .generate_levels(&asset_id_of(file), file, &config.lod.levels)?;
    for warning in &set.warnings {
        print_warning(warning);
    }
    print_success(&format!(
        "{} levels, {:.1}% smaller on average",
        set.levels.len(),
        set.total_size_reduction_percent
    ));
    print_json(&set)
}

pub fn compress_geometry(config: &VitrineConfig, file: &str, output: &Path) -> Result<()> {
    print_task_start("Compressing geometry", HAMMER, BLUE);
    let kit = toolkit(config)?;
    let bytes = kit
        .storage
        .fetch(file)
        .with_context(|| format!("cannot read {file}"))?;

    let result = kit.adapters.geometry.compress(&bytes, &config.geometry)?;
    std::fs::write(output, &result.output)
        .with_context(|| format!("cannot write {}", output.display()))?;

    print_success(&format!(
        "{} -> {} bytes ({} saved) via {}",
        result.original_size,
        result.compressed_size,
        percent(result.ratio),
        result.method
    ));
    print_json(&json!({
        "output": output.display().to_string(),
        "originalSize": result.original_size,
        "compressedSize": result.compressed_size,
        "ratio": result.ratio,
        "meshCount": result.mesh_count,
        "vertexCount": result.vertex_count,
        "triangleCount": result.triangle_count,
        "method": result.method,
    }))
}

pub fn compress_textures(config: &VitrineConfig, file: &str) -> Result<()> {
    print_task_start("Transcoding textures", BRUSH, MAGENTA);
    let kit = toolkit(config)?;

    let result = kit.adapters.textures.compress_textures(file, &config.texture)?;
    print_success(&format!(
        "{} of {} textures transcoded, {} -> {} bytes ({} saved)",
        result.transcoded_count(),
        result.texture_count,
        result.original_size,
        result.compressed_size,
        percent(result.ratio)
    ));
    print_json(&result)
}
