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

//! `vitrine`: runs the transcoding pipeline stages and the manifest resolver
//! from the command line.
//!
//! Reports are written to stdout as JSON; progress goes to stderr.

mod commands;
mod helpers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{ManifestArgs, TextureArgs};
use helpers::print_error;
use std::path::PathBuf;
use vitrine_agents::{VitrineConfig, CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "vitrine", version, about = "3D asset transcoding pipeline")]
struct Cli {
    /// Configuration file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding per-call scratch directories.
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a container's size, magic bytes and structure
    Validate { file: String },
    /// Measure what the cleanup transforms would save
    Optimize { file: String },
    /// Generate the configured detail levels next to the input
    Lod { file: String },
    /// Compress mesh payloads
    CompressGeometry {
        file: String,
        /// Output container.
        #[arg(short, long)]
        output: PathBuf,
        /// Position quantization bits, 8 to 16.
        #[arg(long)]
        position_bits: Option<u8>,
    },
    /// Transcode embedded textures to KTX2
    CompressTextures {
        file: String,
        #[command(flatten)]
        options: TextureArgs,
    },
    /// Run every stage inline against an in-memory asset record
    Process {
        file: String,
        /// Asset id. Defaults to the file stem.
        #[arg(long)]
        id: Option<String>,
        /// Also run geometry compression.
        #[arg(long)]
        geometry: bool,
    },
    /// Resolve a render manifest from a fixture file
    Manifest(ManifestArgs),
    /// Show what a client can decode, from its user agent
    Capabilities { user_agent: String },
}

fn main() {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = VitrineConfig::load_or_default(&cli.config)?;
    if let Some(scratch) = cli.scratch {
        config.tools.scratch_root = Some(scratch);
    }
    log::debug!("vitrine: {:?}", config);

    match cli.command {
        Command::Validate { file } => commands::validate(&config, &file),
        Command::Optimize { file } => commands::optimize(&config, &file),
        Command::Lod { file } => commands::lod(&config, &file),
        Command::CompressGeometry {
            file,
            output,
            position_bits,
        } => {
            if let Some(bits) = position_bits {
                config.geometry.quantization.position = bits;
            }
            commands::compress_geometry(&config, &file, &output)
        }
        Command::CompressTextures { file, options } => {
            options.apply(&mut config.texture);
            commands::compress_textures(&config, &file)
        }
        Command::Process { file, id, geometry } => {
            config.pipeline.enable_geometry_compression |= geometry;
            commands::process(config, &file, id)
        }
        Command::Manifest(args) => commands::manifest(&config, args),
        Command::Capabilities { user_agent } => commands::capabilities(&user_agent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn texture_flags_parse() {
        let cli = Cli::try_parse_from([
            "vitrine",
            "compress-textures",
            "chair.glb",
            "--quality",
            "5",
            "--mode",
            "uastc",
        ])
        .unwrap();

        let Command::CompressTextures { file, options } = cli.command else {
            panic!("wrong subcommand");
        };
        let mut texture = vitrine_lanes::TextureOptions::default();
        options.apply(&mut texture);
        assert_eq!(file, "chair.glb");
        assert_eq!(texture.quality, 5);
        assert_eq!(texture.mode, vitrine_lanes::TextureMode::Uastc);
        assert!(texture.mipmaps);
    }

    #[test]
    fn manifest_requires_fixtures_and_asset() {
        assert!(Cli::try_parse_from(["vitrine", "manifest", "--asset", "A1"]).is_err());
        assert!(Cli::try_parse_from([
            "vitrine", "manifest", "--fixtures", "f.json", "--asset", "A1", "--device", "mobile"
        ])
        .is_ok());
    }
}
