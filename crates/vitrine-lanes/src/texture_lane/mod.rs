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

//! Texture Lane
//!
//! Transcodes the images embedded in a container to KTX2 (Basis Universal).
//! Every image is handled on its own: an image the codec chokes on keeps its
//! original bytes and the rest of the batch carries on.

mod capabilities;
mod ktx2;
mod options;

pub use capabilities::{detect_device_capabilities, BrowserFamily, DeviceCapabilities};
pub use ktx2::{is_ktx2, ktx2_dimensions, KTX2_IDENTIFIER};
pub use options::{TextureMode, TextureOptions};

use crate::error::CodecError;
use crate::geometry_lane::{savings_ratio, STALE_SCRATCH_AGE};
use crate::tool::{args, tiers, Method, ToolLocator, ToolSlot};
use image::imageops::FilterType;
use image::ImageFormat;
use serde::Serialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use vitrine_core::ObjectStorage;
use vitrine_io::urls::ktx2_url;
use vitrine_io::model::{clear_texture_source, texture_source};
use vitrine_io::{ImageSource, ModelImage, SceneModel, ScratchSpace};

/// Name of the command-line transcoder.
pub const TOKTX: &str = "toktx";
/// Extension referencing KTX2 images from textures.
pub const KHR_TEXTURE_BASISU: &str = "KHR_texture_basisu";
const KTX2_MIME: &str = "image/ktx2";

/// An in-process texture transcoder.
pub trait TextureCodecLibrary: Send + Sync {
    /// Library name used in logs and errors.
    fn name(&self) -> &str;

    /// Transcodes one PNG or JPEG image to KTX2.
    fn transcode(&self, image: &[u8], options: &TextureOptions) -> Result<Vec<u8>, CodecError>;
}

impl std::fmt::Debug for dyn TextureCodecLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TextureCodecLibrary({})", self.name())
    }
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TextureOutcome {
    /// The image was replaced by a KTX2 file.
    Transcoded {
        /// Tier that produced it.
        method: Method,
    },
    /// The image kept its source encoding (possibly downsampled).
    Kept {
        /// Why it was not transcoded.
        reason: String,
    },
}

/// Statistics of one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureStat {
    /// Image index in the container.
    pub index: usize,
    /// Image name, if any.
    pub name: Option<String>,
    /// Source MIME type.
    pub mime_type: String,
    /// Source pixel size, when decodable.
    pub width: Option<u32>,
    /// Source pixel size, when decodable.
    pub height: Option<u32>,
    /// Source bytes.
    pub original_size: u64,
    /// Bytes after processing.
    pub compressed_size: u64,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: TextureOutcome,
}

/// Outcome of [`TextureAdapter::compress_textures`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureResult {
    /// URL of the produced container, or the input URL when nothing ran.
    pub output_url: String,
    /// Total source image bytes.
    pub original_size: u64,
    /// Total image bytes after processing.
    pub compressed_size: u64,
    /// `1 - compressed / original`, 0 when there were no images.
    pub ratio: f64,
    /// Embedded images considered.
    pub texture_count: usize,
    /// One entry per image, in container order.
    pub per_texture: Vec<TextureStat>,
}

impl TextureResult {
    /// Number of images now stored as KTX2.
    pub fn transcoded_count(&self) -> usize {
        self.per_texture
            .iter()
            .filter(|s| matches!(s.outcome, TextureOutcome::Transcoded { .. }))
            .count()
    }
}

/// Texture transcoding with CLI → library → passthrough fallback.
pub struct TextureAdapter {
    tool: ToolSlot,
    library: Option<Arc<dyn TextureCodecLibrary>>,
    scratch: ScratchSpace,
    storage: Arc<dyn ObjectStorage>,
}

impl std::fmt::Debug for TextureAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureAdapter")
            .field("tool", &self.tool)
            .field("library", &self.library)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

/// Decoded source image, possibly downsampled to fit `max_resolution`.
struct Prepared {
    width: u32,
    height: u32,
    /// Bytes to hand to the codec.
    bytes: Vec<u8>,
    resized: bool,
}

fn prepare(source: &[u8], options: &TextureOptions) -> Result<Prepared, String> {
    let decoded = image::load_from_memory(source).map_err(|e| format!("undecodable: {e}"))?;
    let (width, height) = (decoded.width(), decoded.height());
    let Some(max) = options.max_resolution.filter(|&max| width.max(height) > max) else {
        return Ok(Prepared {
            width,
            height,
            bytes: source.to_vec(),
            resized: false,
        });
    };
    // `resize` keeps the aspect ratio and fits inside the bounds.
    let resized = decoded.resize(max, max, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| format!("re-encoding failed: {e}"))?;
    log::debug!(
        "TextureAdapter: downsampled {}x{} to {}x{}",
        width,
        height,
        resized.width(),
        resized.height()
    );
    Ok(Prepared {
        width,
        height,
        bytes: out.into_inner(),
        resized: true,
    })
}

impl TextureAdapter {
    /// Creates an adapter and sweeps scratch directories left by killed runs.
    pub fn new(
        locator: Arc<dyn ToolLocator>,
        scratch: ScratchSpace,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        if let Err(e) = scratch.sweep_stale(STALE_SCRATCH_AGE) {
            log::warn!("TextureAdapter: scratch sweep failed: {}", e);
        }
        Self {
            tool: ToolSlot::new(TOKTX, locator),
            library: None,
            scratch,
            storage,
        }
    }

    /// Registers the in-process tier.
    pub fn with_library(mut self, library: Arc<dyn TextureCodecLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Transcodes every embedded image of the container at `url` and stores
    /// the result as `<stem>.ktx2.glb` next to it.
    ///
    /// A container without embedded images is a no-op: no tool runs and the
    /// input URL is returned. Only fetching, parsing and storing the
    /// container can fail the call.
    pub fn compress_textures(
        &self,
        url: &str,
        options: &TextureOptions,
    ) -> Result<TextureResult, CodecError> {
        options.validate()?;
        let bytes = self.storage.fetch(url)?;
        let mut model = SceneModel::from_glb(&bytes)?;

        let candidates: Vec<usize> = model
            .images
            .iter()
            .enumerate()
            .filter(|(_, image)| image.bytes().is_some() && image.mime_type != KTX2_MIME)
            .map(|(index, _)| index)
            .collect();
        if candidates.is_empty() {
            log::info!("TextureAdapter: {} has no embedded textures", url);
            return Ok(TextureResult {
                output_url: url.to_owned(),
                original_size: 0,
                compressed_size: 0,
                ratio: 0.0,
                texture_count: 0,
                per_texture: Vec::new(),
            });
        }

        let mut per_texture = Vec::with_capacity(candidates.len());
        for index in candidates {
            let stat = self.process_image(&mut model, index, options);
            if let TextureOutcome::Kept { reason } = &stat.outcome {
                log::warn!("TextureAdapter: image {} kept as-is: {}", index, reason);
            }
            per_texture.push(stat);
        }

        if per_texture
            .iter()
            .any(|s| matches!(s.outcome, TextureOutcome::Transcoded { .. }))
        {
            model.declare_extension(KHR_TEXTURE_BASISU, true);
        }

        let output = model.to_glb()?;
        let output_url = self.storage.store(&ktx2_url(url), &output)?;
        let original_size = per_texture.iter().map(|s| s.original_size).sum();
        let compressed_size = per_texture.iter().map(|s| s.compressed_size).sum();
        let result = TextureResult {
            output_url,
            original_size,
            compressed_size,
            ratio: savings_ratio(original_size, compressed_size),
            texture_count: per_texture.len(),
            per_texture,
        };
        log::info!(
            "TextureAdapter: {} of {} textures transcoded, {} -> {} bytes",
            result.transcoded_count(),
            result.texture_count,
            result.original_size,
            result.compressed_size
        );
        Ok(result)
    }

    fn process_image(&self, model: &mut SceneModel, index: usize, options: &TextureOptions) -> TextureStat {
        let image = &model.images[index];
        let source = image.bytes().unwrap_or_default().to_vec();
        let mut stat = TextureStat {
            index,
            name: image.name.clone(),
            mime_type: image.mime_type.clone(),
            width: None,
            height: None,
            original_size: source.len() as u64,
            compressed_size: source.len() as u64,
            outcome: TextureOutcome::Kept {
                reason: String::new(),
            },
        };

        let prepared = match prepare(&source, options) {
            Ok(prepared) => prepared,
            Err(reason) => {
                stat.outcome = TextureOutcome::Kept { reason };
                return stat;
            }
        };
        stat.width = Some(prepared.width);
        stat.height = Some(prepared.height);

        let mut failures = Vec::new();
        for method in tiers(self.tool.path().is_some(), self.library.is_some()) {
            let attempt = match method {
                Method::Cli => self.transcode_with_cli(&prepared.bytes, options),
                Method::Library => self.transcode_with_library(&prepared.bytes, options),
                _ => break,
            };
            match attempt {
                Ok(ktx) if is_ktx2(&ktx) => {
                    stat.compressed_size = ktx.len() as u64;
                    stat.outcome = TextureOutcome::Transcoded { method };
                    model.images[index] = ModelImage {
                        name: model.images[index].name.clone(),
                        mime_type: KTX2_MIME.to_owned(),
                        source: ImageSource::Embedded(ktx),
                    };
                    reference_through_basisu(model, index);
                    return stat;
                }
                Ok(_) => failures.push(format!("{method}: output is not KTX2")),
                Err(e) => failures.push(format!("{method}: {e}")),
            }
        }

        if prepared.resized {
            stat.compressed_size = prepared.bytes.len() as u64;
            model.images[index] = ModelImage {
                name: model.images[index].name.clone(),
                mime_type: "image/png".to_owned(),
                source: ImageSource::Embedded(prepared.bytes),
            };
        }
        let reason = if failures.is_empty() {
            "no transcoder available".to_owned()
        } else {
            failures.join("; ")
        };
        stat.outcome = TextureOutcome::Kept { reason };
        stat
    }

    fn transcode_with_cli(&self, image: &[u8], options: &TextureOptions) -> Result<Vec<u8>, CodecError> {
        let session = self.scratch.session()?;
        let input = session.path().join("input.png");
        let output = session.path().join("output.ktx2");
        std::fs::write(&input, image)?;

        let mut command = args(["--t2"]);
        match options.mode {
            TextureMode::Etc1s => command.extend(args([
                "--encode".to_string(),
                "etc1s".to_string(),
                "--qlevel".to_string(),
                options.etc1s_qlevel().to_string(),
            ])),
            TextureMode::Uastc => command.extend(args([
                "--encode".to_string(),
                "uastc".to_string(),
                "--uastc_quality".to_string(),
                options.uastc_level().to_string(),
            ])),
        }
        if options.mipmaps {
            command.extend(args(["--genmipmap"]));
        }
        command.push(output.clone().into_os_string());
        command.push(input.into_os_string());
        self.tool.run(&command)?;
        Ok(std::fs::read(&output)?)
    }

    fn transcode_with_library(
        &self,
        image: &[u8],
        options: &TextureOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| CodecError::InvalidOutput("no library registered".into()))?;
        library.transcode(image, options)
    }
}

/// Points every texture sampling image `index` at it through
/// `KHR_texture_basisu`, since core glTF cannot reference KTX2 images.
fn reference_through_basisu(model: &mut SceneModel, index: usize) {
    for texture in &mut model.document.textures {
        if texture_source(texture) != Some(index) {
            continue;
        }
        clear_texture_source(texture);
        texture
            .extensions
            .get_or_insert_with(Default::default)
            .others
            .insert(KHR_TEXTURE_BASISU.to_owned(), json!({ "source": index }));
    }
}
