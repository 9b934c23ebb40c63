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

mod common;

use anyhow::Result;
use common::{exploded_grid, Workspace};
use std::sync::Arc;
use vitrine_io::glb::has_glb_magic;
use vitrine_io::SceneModel;
use vitrine_lanes::{
    CodecError, GeometryAdapter, GeometryCodecLibrary, GeometryOptions, Method, NoTools, PathLocator,
};

struct Passthrough;

impl GeometryCodecLibrary for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn encode(&self, glb: &[u8], _options: &GeometryOptions) -> Result<Vec<u8>, CodecError> {
        Ok(glb.to_vec())
    }
}

struct Garbage;

impl GeometryCodecLibrary for Garbage {
    fn name(&self) -> &str {
        "garbage"
    }

    fn encode(&self, _glb: &[u8], _options: &GeometryOptions) -> Result<Vec<u8>, CodecError> {
        Ok(b"definitely not a container".to_vec())
    }
}

#[test]
fn without_any_codec_the_cleaned_container_is_returned() -> Result<()> {
    // --- ARRANGE ---
    let workspace = Workspace::new();
    let adapter = GeometryAdapter::new(Arc::new(NoTools), workspace.scratch());
    let input = exploded_grid(4).to_glb()?;

    // --- ACT ---
    let result = adapter.compress(&input, &GeometryOptions::default())?;

    // --- ASSERT ---
    assert_eq!(result.method, Method::Simulated);
    assert!(has_glb_magic(&result.output));
    assert_eq!(result.mesh_count, 1);
    assert_eq!(result.vertex_count, 25);
    assert_eq!(result.triangle_count, 32);
    assert_eq!(result.original_size, input.len() as u64);
    assert!(result.compressed_size < result.original_size);
    assert!(result.ratio > 0.0);
    assert_eq!(SceneModel::from_glb(&result.output)?.vertex_count(), 25);
    Ok(())
}

#[test]
fn a_registered_library_is_used_when_no_tool_is_installed() -> Result<()> {
    let workspace = Workspace::new();
    let adapter =
        GeometryAdapter::new(Arc::new(NoTools), workspace.scratch()).with_library(Arc::new(Passthrough));

    let result = adapter.compress(&exploded_grid(2).to_glb()?, &GeometryOptions::default())?;

    assert_eq!(result.method, Method::Library);
    Ok(())
}

#[test]
fn a_library_producing_garbage_degrades_to_the_fallback() -> Result<()> {
    let workspace = Workspace::new();
    let adapter =
        GeometryAdapter::new(Arc::new(NoTools), workspace.scratch()).with_library(Arc::new(Garbage));

    let result = adapter.compress(&exploded_grid(2).to_glb()?, &GeometryOptions::default())?;

    assert_eq!(result.method, Method::Simulated);
    assert!(has_glb_magic(&result.output));
    Ok(())
}

#[test]
fn out_of_range_options_fail_before_any_work() -> Result<()> {
    let workspace = Workspace::new();
    let adapter = GeometryAdapter::new(Arc::new(NoTools), workspace.scratch());
    let mut options = GeometryOptions::default();
    options.quantization.position = 17;

    let err = adapter.compress(b"not even parsed", &options).unwrap_err();

    assert!(matches!(err, CodecError::InvalidOption { name: "quantization.position", .. }), "{err}");
    Ok(())
}

#[test]
fn already_encoded_input_is_skipped() -> Result<()> {
    let workspace = Workspace::new();
    let adapter =
        GeometryAdapter::new(Arc::new(NoTools), workspace.scratch()).with_library(Arc::new(Passthrough));
    let mut model = SceneModel::default();
    model.declare_extension("KHR_draco_mesh_compression", true);
    let input = model.to_glb()?;
    assert!(GeometryAdapter::is_encoded(&input));

    let result = adapter.compress(&input, &GeometryOptions::default())?;

    assert_eq!(result.method, Method::Skipped);
    assert_eq!(result.output, input);
    assert_eq!(result.ratio, 0.0);
    Ok(())
}

#[test]
fn malformed_bytes_are_not_encoded() {
    assert!(!GeometryAdapter::is_encoded(b""));
    assert!(!GeometryAdapter::is_encoded(b"glTF but truncated"));
}

/// Installs a shell script standing in for `gltf-transform`.
#[cfg(unix)]
fn fake_gltf_transform(workspace: &Workspace, script: &str) -> Result<PathLocator> {
    use std::os::unix::fs::PermissionsExt;

    let tool = workspace.dir.path().join("fake-gltf-transform");
    std::fs::write(&tool, script)?;
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755))?;
    Ok(PathLocator::new().with_override("gltf-transform", &tool))
}

#[cfg(unix)]
fn scratch_entries(workspace: &Workspace) -> Result<usize> {
    Ok(std::fs::read_dir(workspace.scratch().root())?.count())
}

#[cfg(unix)]
#[test]
fn an_installed_tool_takes_precedence() -> Result<()> {
    // --- ARRANGE ---
    // Stands in for `gltf-transform draco <in> <out> ...` by copying input to output.
    let workspace = Workspace::new();
    let locator = fake_gltf_transform(&workspace, "#!/bin/sh\ncp \"$2\" \"$3\"\n")?;
    let adapter = GeometryAdapter::new(Arc::new(locator), workspace.scratch()).with_library(Arc::new(Garbage));

    // --- ACT ---
    let result = adapter.compress(&exploded_grid(2).to_glb()?, &GeometryOptions::default())?;

    // --- ASSERT ---
    assert_eq!(result.method, Method::Cli);
    assert_eq!(SceneModel::from_glb(&result.output)?.vertex_count(), 9);
    Ok(())
}

#[cfg(unix)]
#[test]
fn a_successful_tool_run_leaves_the_scratch_root_empty() -> Result<()> {
    // --- ARRANGE ---
    let workspace = Workspace::new();
    let locator = fake_gltf_transform(&workspace, "#!/bin/sh\ncp \"$2\" \"$3\"\n")?;
    let adapter = GeometryAdapter::new(Arc::new(locator), workspace.scratch());

    // --- ACT ---
    let result = adapter.compress(&exploded_grid(2).to_glb()?, &GeometryOptions::default())?;

    // --- ASSERT ---
    assert_eq!(result.method, Method::Cli);
    assert_eq!(scratch_entries(&workspace)?, 0);
    Ok(())
}

#[cfg(unix)]
#[test]
fn a_failing_tool_run_leaves_the_scratch_root_empty() -> Result<()> {
    // --- ARRANGE ---
    // Leaves a partial output behind before failing.
    let workspace = Workspace::new();
    let locator = fake_gltf_transform(
        &workspace,
        "#!/bin/sh\necho partial > \"$3\"\necho 'encoder crashed' >&2\nexit 1\n",
    )?;
    let adapter = GeometryAdapter::new(Arc::new(locator), workspace.scratch());

    // --- ACT ---
    let result = adapter.compress(&exploded_grid(2).to_glb()?, &GeometryOptions::default())?;

    // --- ASSERT ---
    assert_eq!(result.method, Method::Simulated);
    assert_eq!(scratch_entries(&workspace)?, 0);
    Ok(())
}

#[cfg(feature = "meshopt")]
#[test]
fn meshopt_encodes_the_vertex_streams_when_no_tool_is_installed() -> Result<()> {
    use vitrine_lanes::MeshoptCompression;

    // --- ARRANGE ---
    let workspace = Workspace::new();
    let adapter = GeometryAdapter::new(Arc::new(NoTools), workspace.scratch())
        .with_library(Arc::new(MeshoptCompression::new()));
    let input = exploded_grid(8).to_glb()?;

    // --- ACT ---
    let result = adapter.compress(&input, &GeometryOptions::default())?;

    // --- ASSERT ---
    assert_eq!(result.method, Method::Library);
    assert!(GeometryAdapter::is_encoded(&result.output));
    assert!(!vitrine_io::is_draco_encoded(&result.output));
    assert!(result.compressed_size < result.original_size);

    // Encoded output is recognized and passed through untouched.
    let again = adapter.compress(&result.output, &GeometryOptions::default())?;
    assert_eq!(again.method, Method::Skipped);
    Ok(())
}
