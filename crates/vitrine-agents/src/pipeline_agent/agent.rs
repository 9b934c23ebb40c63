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

//! The PipelineAgent sequences the processing stages of an asset.
//!
//! Validation and optimization run first, on a `validate` job. When they
//! pass, the derivative stages (LOD generation, geometry compression when
//! enabled, texture compression) are scheduled on their own worker pools.
//! Each stage moves pending → processing → ready | failed once per job
//! attempt; the asset's overall status is settled when every scheduled
//! derivative stage has reached a terminal state.

use super::validation::{optimize_bytes, validate_bytes, OptimizationReport, ValidationReport};
use crate::config::VitrineConfig;
use crate::error::PipelineError;
use crate::job_runner::{Job, JobKind, JobOptions, JobPayload, JobRunner, RunnerStats};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use vitrine_core::{
    Asset, AssetId, AssetPatch, AssetStatus, AssetStore, ObjectStorage, ProcessingStage,
    StageStatus, StorageError, TextureFormat, TextureFormatTag,
};
use vitrine_io::urls::draco_url;
use vitrine_io::ScratchSpace;
use vitrine_lanes::{GeometryAdapter, LodAdapter, Method, TextureAdapter, ToolLocator};

/// The codec adapters the pipeline drives.
#[derive(Debug)]
pub struct Adapters {
    /// Geometry compression.
    pub geometry: GeometryAdapter,
    /// Texture transcoding.
    pub textures: TextureAdapter,
    /// LOD generation.
    pub lods: LodAdapter,
}

impl Adapters {
    /// Adapters sharing one tool locator, scratch root and storage.
    ///
    /// With the `meshopt` feature, meshopt is registered as the in-process
    /// tier of geometry compression and LOD simplification. Textures have
    /// no in-process tier.
    pub fn new(
        locator: Arc<dyn ToolLocator>,
        scratch: ScratchSpace,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let adapters = Self {
            geometry: GeometryAdapter::new(Arc::clone(&locator), scratch.clone()),
            textures: TextureAdapter::new(Arc::clone(&locator), scratch.clone(), Arc::clone(&storage)),
            lods: LodAdapter::new(locator, scratch, storage),
        };
        #[cfg(feature = "meshopt")]
        let adapters = adapters.with_meshopt();
        adapters
    }

    #[cfg(feature = "meshopt")]
    fn with_meshopt(self) -> Self {
        use vitrine_lanes::{MeshoptCompression, MeshoptSimplifier};
        Self {
            geometry: self.geometry.with_library(Arc::new(MeshoptCompression::new())),
            lods: self.lods.with_library(Arc::new(MeshoptSimplifier::new())),
            ..self
        }
    }
}

/// State shared between the agent handle and the runner's workers.
struct Shared {
    config: VitrineConfig,
    store: Arc<dyn AssetStore>,
    storage: Arc<dyn ObjectStorage>,
    adapters: Adapters,
    runner: JobRunner,
}

/// Orchestrates the transcoding pipeline of assets.
///
/// Cloning is cheap and every clone drives the same workers.
#[derive(Clone)]
pub struct PipelineAgent {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PipelineAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAgent")
            .field("adapters", &self.shared.adapters)
            .field("runner", &self.shared.runner)
            .finish_non_exhaustive()
    }
}

impl PipelineAgent {
    /// Creates the agent and starts one worker pool per job kind.
    pub fn new(
        config: VitrineConfig,
        store: Arc<dyn AssetStore>,
        storage: Arc<dyn ObjectStorage>,
        adapters: Adapters,
    ) -> Self {
        let runner = JobRunner::new(config.pipeline.retry_policy());
        let shared = Arc::new(Shared {
            config,
            store,
            storage,
            adapters,
            runner,
        });

        let pipeline = &shared.config.pipeline;
        for kind in JobKind::ALL {
            let concurrency = match kind {
                JobKind::Validate => pipeline.validate_concurrency,
                JobKind::LodGeneration => pipeline.lod_concurrency,
                JobKind::GeometryCompression => pipeline.geometry_concurrency,
                JobKind::TextureCompression => pipeline.texture_concurrency,
            };
            let weak: Weak<Shared> = Arc::downgrade(&shared);
            shared.runner.register(
                kind,
                concurrency,
                Arc::new(move |job: &Job| match weak.upgrade() {
                    Some(shared) => shared.handle(job),
                    None => Err(PipelineError::RunnerStopped),
                }),
            );
        }
        log::info!("PipelineAgent: ready");
        Self { shared }
    }

    /// Starts processing an asset: marks it `processing`, marks validation
    /// pending and queues the validate job. Returns the job id without
    /// waiting for any stage.
    pub fn process_asset(&self, asset_id: &AssetId, container_url: &str) -> Result<u32, PipelineError> {
        let shared = &self.shared;
        shared.require_asset(asset_id)?;
        shared.update(
            asset_id,
            AssetPatch::status(AssetStatus::Processing)
                .with_stage(ProcessingStage::Validation, StageStatus::Pending),
        )?;
        log::info!("PipelineAgent: processing {} from {}", asset_id, container_url);
        shared
            .runner
            .enqueue(JobKind::Validate, payload(asset_id, container_url, JobOptions::None))
    }

    /// Checks the container at `url` against the size ceiling, the magic
    /// bytes and a full structural parse. Only transport failures are
    /// errors; everything wrong with the container itself is in the report.
    pub fn validate_container(&self, url: &str) -> Result<ValidationReport, PipelineError> {
        self.shared.validate_container(url)
    }

    /// Measures what the cleanup transforms would save on the container at
    /// `url`. The returned optimized URL is the input URL.
    pub fn optimize_container(
        &self,
        asset_id: &AssetId,
        url: &str,
    ) -> Result<OptimizationReport, PipelineError> {
        self.shared.optimize_container(asset_id, url)
    }

    /// Marks texture compression pending and queues it. `None` uses the
    /// configured options.
    pub fn enqueue_texture_compression(
        &self,
        asset_id: &AssetId,
        container_url: &str,
        options: Option<vitrine_lanes::TextureOptions>,
    ) -> Result<u32, PipelineError> {
        if let Some(options) = &options {
            options.validate()?;
        }
        let options = options.map_or(JobOptions::None, JobOptions::Texture);
        self.shared
            .schedule(asset_id, container_url, JobKind::TextureCompression, options)
    }

    /// Marks LOD generation pending and queues it. `None` uses the
    /// configured levels.
    pub fn enqueue_lod_generation(
        &self,
        asset_id: &AssetId,
        container_url: &str,
        levels: Option<Vec<vitrine_lanes::LodConfig>>,
    ) -> Result<u32, PipelineError> {
        let options = levels.map_or(JobOptions::None, JobOptions::Lod);
        self.shared
            .schedule(asset_id, container_url, JobKind::LodGeneration, options)
    }

    /// Marks geometry compression pending and queues it. `None` uses the
    /// configured options.
    pub fn enqueue_geometry_compression(
        &self,
        asset_id: &AssetId,
        container_url: &str,
        options: Option<vitrine_lanes::GeometryOptions>,
    ) -> Result<u32, PipelineError> {
        if let Some(options) = &options {
            options.validate()?;
        }
        let options = options.map_or(JobOptions::None, JobOptions::Geometry);
        self.shared
            .schedule(asset_id, container_url, JobKind::GeometryCompression, options)
    }

    /// Runs every stage inline: validation, optimization, then each
    /// derivative stage. The asset ends `ready`, or `failed` with the first
    /// error returned to the caller.
    pub fn run_full_pipeline(&self, asset_id: &AssetId, container_url: &str) -> Result<Asset, PipelineError> {
        let shared = &self.shared;
        shared.require_asset(asset_id)?;
        shared.update(asset_id, AssetPatch::status(AssetStatus::Processing))?;

        match shared.full_sequence(asset_id, container_url) {
            Ok(()) => {
                log::info!("PipelineAgent: {} is ready", asset_id);
                shared.update(asset_id, AssetPatch::status(AssetStatus::Ready))
            }
            Err(e) => {
                log::error!("PipelineAgent: {} failed: {}", asset_id, e);
                shared.mark_asset(asset_id, AssetStatus::Failed);
                Err(e)
            }
        }
    }

    /// Job runner counters.
    pub fn stats(&self) -> RunnerStats {
        self.shared.runner.stats()
    }

    /// Blocks until every queued job has finished, or until `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.runner.wait_idle(timeout)
    }

    /// Drains the queues and stops the workers.
    pub fn shutdown(&self) {
        self.shared.runner.shutdown();
    }
}

fn payload(asset_id: &AssetId, container_url: &str, options: JobOptions) -> JobPayload {
    JobPayload {
        asset_id: asset_id.clone(),
        container_url: container_url.to_owned(),
        options,
    }
}

impl Shared {
    fn require_asset(&self, asset_id: &AssetId) -> Result<Asset, PipelineError> {
        self.store
            .get_asset(asset_id)?
            .ok_or_else(|| PipelineError::AssetNotFound(asset_id.clone()))
    }

    fn update(&self, asset_id: &AssetId, patch: AssetPatch) -> Result<Asset, PipelineError> {
        Ok(self.store.update_asset(asset_id, patch)?)
    }

    fn set_stage(&self, asset_id: &AssetId, stage: ProcessingStage, status: StageStatus) {
        log::info!("PipelineAgent: {} {} -> {:?}", asset_id, stage, status);
        if let Err(e) = self.update(asset_id, AssetPatch::stage(stage, status)) {
            log::error!("PipelineAgent: could not record {} status of {}: {}", stage, asset_id, e);
        }
    }

    fn mark_asset(&self, asset_id: &AssetId, status: AssetStatus) {
        if let Err(e) = self.update(asset_id, AssetPatch::status(status)) {
            log::error!("PipelineAgent: could not mark {} {:?}: {}", asset_id, status, e);
        }
    }

    fn stage_timeout(&self) -> Duration {
        self.config.pipeline.stage_timeout()
    }

    fn validate_container(&self, url: &str) -> Result<ValidationReport, PipelineError> {
        let bytes = match self.storage.fetch(url) {
            Ok(bytes) => bytes,
            Err(StorageError::TooLarge { size, limit, .. }) => {
                return Ok(ValidationReport::rejected(
                    size,
                    format!("container is {size} bytes, limit is {limit}"),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let report = validate_bytes(&bytes, self.config.pipeline.max_file_size);
        for warning in &report.warnings {
            log::warn!("PipelineAgent: {}: {}", url, warning);
        }
        Ok(report)
    }

    fn optimize_container(
        &self,
        asset_id: &AssetId,
        url: &str,
    ) -> Result<OptimizationReport, PipelineError> {
        let bytes = self.storage.fetch(url)?;
        let report = optimize_bytes(asset_id, url, &bytes)?;
        log::info!(
            "PipelineAgent: cleanup of {} would take {} bytes to {} ({:.1}% saved)",
            asset_id,
            report.original_size,
            report.optimized_size,
            report.savings_percent
        );
        Ok(report)
    }

    /// Runs one stage and records its transitions. A failure the runner is
    /// about to retry leaves the stage pending instead of failed.
    fn run_stage(
        &self,
        asset_id: &AssetId,
        stage: ProcessingStage,
        attempt: Option<u32>,
        work: impl FnOnce() -> Result<AssetPatch, PipelineError>,
    ) -> Result<(), PipelineError> {
        self.set_stage(asset_id, stage, StageStatus::Processing);
        let started = Instant::now();
        let limit = self.stage_timeout();
        // A panicking stage fails like any other error instead of taking
        // the worker down with the stage stuck in `processing`.
        let result = panic::catch_unwind(AssertUnwindSafe(work))
            .unwrap_or_else(|payload| Err(PipelineError::from_panic(payload)))
            .and_then(|patch| {
                let elapsed = started.elapsed();
                if elapsed > limit {
                    return Err(PipelineError::Timeout {
                        stage,
                        elapsed,
                        limit,
                    });
                }
                Ok(patch)
            });

        match result {
            Ok(patch) => {
                self.update(asset_id, patch.with_stage(stage, StageStatus::Ready))?;
                log::info!("PipelineAgent: {} {} -> Ready", asset_id, stage);
                Ok(())
            }
            Err(e) => {
                let retrying = attempt.is_some_and(|a| self.runner.policy().will_retry(&e, a));
                if retrying {
                    self.set_stage(asset_id, stage, StageStatus::Pending);
                } else {
                    log::error!("PipelineAgent: {} {} failed: {}", asset_id, stage, e);
                    self.set_stage(asset_id, stage, StageStatus::Failed);
                }
                Err(e)
            }
        }
    }

    fn validate_then_optimize(
        &self,
        asset_id: &AssetId,
        url: &str,
        attempt: Option<u32>,
    ) -> Result<(), PipelineError> {
        self.run_stage(asset_id, ProcessingStage::Validation, attempt, || {
            let report = self.validate_container(url)?;
            if report.valid {
                Ok(AssetPatch::default())
            } else {
                Err(PipelineError::InvalidContainer {
                    url: url.to_owned(),
                    errors: report.errors,
                })
            }
        })?;
        self.run_stage(asset_id, ProcessingStage::Optimization, attempt, || {
            self.optimize_container(asset_id, url)?;
            Ok(AssetPatch::default())
        })
    }

    fn derivative_kinds(&self) -> Vec<JobKind> {
        let mut kinds = vec![JobKind::LodGeneration];
        if self.config.pipeline.enable_geometry_compression {
            kinds.push(JobKind::GeometryCompression);
        }
        kinds.push(JobKind::TextureCompression);
        kinds
    }

    fn full_sequence(&self, asset_id: &AssetId, url: &str) -> Result<(), PipelineError> {
        self.validate_then_optimize(asset_id, url, None)?;
        for kind in self.derivative_kinds() {
            self.run_stage(asset_id, kind.stage(), None, || {
                self.produce(kind, asset_id, url, &JobOptions::None)
            })?;
        }
        Ok(())
    }

    fn schedule(
        &self,
        asset_id: &AssetId,
        url: &str,
        kind: JobKind,
        options: JobOptions,
    ) -> Result<u32, PipelineError> {
        self.update(asset_id, AssetPatch::stage(kind.stage(), StageStatus::Pending))?;
        self.runner.enqueue(kind, payload(asset_id, url, options))
    }

    /// Marks every derivative stage pending in one update, then queues them,
    /// so no stage can settle the asset while another is still unscheduled.
    fn schedule_derivatives(&self, asset_id: &AssetId, url: &str) -> Result<(), PipelineError> {
        let kinds = self.derivative_kinds();
        let patch = kinds.iter().fold(AssetPatch::default(), |patch, kind| {
            patch.with_stage(kind.stage(), StageStatus::Pending)
        });
        self.update(asset_id, patch)?;
        for kind in kinds {
            self.runner
                .enqueue(kind, payload(asset_id, url, JobOptions::None))?;
        }
        Ok(())
    }

    fn handle(&self, job: &Job) -> Result<(), PipelineError> {
        let JobPayload {
            asset_id,
            container_url,
            options,
        } = &job.payload;

        if job.kind == JobKind::Validate {
            let result = self
                .validate_then_optimize(asset_id, container_url, Some(job.attempt))
                .and_then(|()| self.schedule_derivatives(asset_id, container_url));
            if let Err(e) = &result {
                if !self.runner.policy().will_retry(e, job.attempt) {
                    self.mark_asset(asset_id, AssetStatus::Failed);
                }
            }
            return result;
        }

        let result = self.run_stage(asset_id, job.kind.stage(), Some(job.attempt), || {
            self.produce(job.kind, asset_id, container_url, options)
        });
        let settled = match &result {
            Ok(()) => true,
            Err(e) => !self.runner.policy().will_retry(e, job.attempt),
        };
        if settled {
            self.settle_overall_status(asset_id);
        }
        result
    }

    /// Runs one derivative stage and returns the records to persist.
    fn produce(
        &self,
        kind: JobKind,
        asset_id: &AssetId,
        url: &str,
        options: &JobOptions,
    ) -> Result<AssetPatch, PipelineError> {
        match kind {
            JobKind::LodGeneration => {
                let levels = match options {
                    JobOptions::Lod(levels) => levels.as_slice(),
                    _ => self.config.lod.levels.as_slice(),
                };
                let set = self.adapters.lods.generate_levels(asset_id, url, levels)?;
                Ok(AssetPatch::default().with_lods(set.levels))
            }
            JobKind::TextureCompression => {
                let options = match options {
                    JobOptions::Texture(options) => options,
                    _ => &self.config.texture,
                };
                let result = self.adapters.textures.compress_textures(url, options)?;
                let format = if result.transcoded_count() > 0 {
                    TextureFormatTag::Ktx2
                } else {
                    TextureFormatTag::Native
                };
                Ok(AssetPatch::default().with_texture_format(TextureFormat {
                    format,
                    url: result.output_url,
                    original_size: result.original_size,
                    compressed_size: Some(result.compressed_size),
                }))
            }
            JobKind::GeometryCompression => {
                let options = match options {
                    JobOptions::Geometry(options) => options,
                    _ => &self.config.geometry,
                };
                let bytes = self.storage.fetch(url)?;
                let result = self.adapters.geometry.compress(&bytes, options)?;
                if result.method != Method::Skipped {
                    let stored = self.storage.store(&draco_url(url), &result.output)?;
                    log::info!(
                        "PipelineAgent: geometry of {} stored at {} via {}",
                        asset_id,
                        stored,
                        result.method
                    );
                }
                Ok(AssetPatch::default())
            }
            JobKind::Validate => Ok(AssetPatch::default()),
        }
    }

    /// Marks the asset ready when every scheduled derivative stage is
    /// terminal and one of them succeeded, failed when all of them failed.
    fn settle_overall_status(&self, asset_id: &AssetId) {
        let asset = match self.require_asset(asset_id) {
            Ok(asset) => asset,
            Err(e) => {
                log::error!("PipelineAgent: cannot settle {}: {}", asset_id, e);
                return;
            }
        };
        let scheduled: Vec<StageStatus> = ProcessingStage::DERIVATIVES
            .iter()
            .filter_map(|&stage| asset.stage_status(stage))
            .collect();
        if scheduled.is_empty() || !scheduled.iter().all(|status| status.is_terminal()) {
            return;
        }
        let status = if scheduled.contains(&StageStatus::Ready) {
            AssetStatus::Ready
        } else {
            AssetStatus::Failed
        };
        log::info!("PipelineAgent: {} settled as {:?}", asset_id, status);
        self.mark_asset(asset_id, status);
    }
}
