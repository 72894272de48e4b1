//! The calibration job: a single-pass batch pipeline run as one background
//! task, reporting progress to the job store and honoring cooperative
//! cancellation at defined checkpoints.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::analysis;
use crate::correct::calibration::{
    auto_select_bias, dark_scale_factor, match_reference, subtract_bias,
};
use crate::correct::cosmetic;
use crate::error::{Result, VestaError};
use crate::frame::{BadPixelMap, FrameRecord, FrameType, ImageBuffer};
use crate::io::image_io::{decode_image, encode_preview_png, is_image_file};
use crate::io::master::encode_master;
use crate::metadata::{CosmicRayDetector, MetadataProbe};
use crate::quality::{self, MasterFrame};
use crate::stack::{self, StackMethod};
use crate::storage::ObjectStorage;

use super::cancel::CancellationToken;
use super::state::{Diagnostics, JobRecord, JobResult, JobStatus, JobStore, RejectedFrame};
use super::{JobRequest, StackingSettings};

/// Terminal record plus the handle of the deferred raw-master upload.
/// Joining the handle waits for post-success result enrichment.
pub struct JobCompletion {
    pub record: JobRecord,
    pub deferred: Option<thread::JoinHandle<()>>,
}

pub struct CalibrationJob {
    id: String,
    settings: StackingSettings,
    storage: Arc<dyn ObjectStorage>,
    store: Arc<dyn JobStore>,
    probe: Arc<dyn MetadataProbe>,
    detector: Option<Arc<dyn CosmicRayDetector>>,
    token: CancellationToken,
}

impl CalibrationJob {
    /// Register a queued job. Nothing runs until [`run`](Self::run).
    pub fn new(
        id: impl Into<String>,
        settings: StackingSettings,
        storage: Arc<dyn ObjectStorage>,
        store: Arc<dyn JobStore>,
        probe: Arc<dyn MetadataProbe>,
        detector: Option<Arc<dyn CosmicRayDetector>>,
    ) -> Self {
        let id = id.into();
        store.upsert(JobRecord::queued(&id));
        Self {
            id,
            settings,
            storage,
            store,
            probe,
            detector,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Token external callers use to request cancellation.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the job on a dedicated background thread.
    pub fn spawn(self: Arc<Self>, request: JobRequest) -> thread::JoinHandle<JobCompletion> {
        thread::spawn(move || self.run(&request))
    }

    /// Execute the pipeline. Never returns an error: every failure mode is
    /// recorded on the job record as a terminal status with a readable
    /// message.
    pub fn run(&self, request: &JobRequest) -> JobCompletion {
        self.push(JobStatus::Running, 0);
        info!(job = %self.id, inputs = request.inputs.len(), "Calibration job started");

        let mut result = JobResult::default();
        let mut diag = Diagnostics::default();

        let outcome = self.execute(request, &mut result, &mut diag);
        let total = request.inputs.len();

        match outcome {
            Ok(master) => {
                result.used = master.n_frames_used;
                result.rejected = total.saturating_sub(master.n_frames_used);
                let record = JobRecord {
                    id: self.id.clone(),
                    status: JobStatus::Success,
                    progress: 100,
                    error: None,
                    result: Some(result),
                    diagnostics: diag,
                };
                self.store.upsert(record.clone());
                info!(job = %self.id, "Calibration job succeeded");

                let deferred = self.spawn_master_upload(request.bucket.clone(), master);
                JobCompletion {
                    record,
                    deferred: Some(deferred),
                }
            }
            Err(VestaError::Cancelled) => {
                let record = JobRecord {
                    id: self.id.clone(),
                    status: JobStatus::Cancelled,
                    progress: self.current_progress(),
                    error: None,
                    result: None,
                    diagnostics: diag,
                };
                self.store.upsert(record.clone());
                info!(job = %self.id, "Calibration job cancelled");
                JobCompletion {
                    record,
                    deferred: None,
                }
            }
            Err(e) => {
                if result.used == 0 {
                    result.rejected = total;
                }
                let record = JobRecord {
                    id: self.id.clone(),
                    status: JobStatus::Failed,
                    progress: self.current_progress(),
                    error: Some(e.to_string()),
                    result: Some(result),
                    diagnostics: diag,
                };
                self.store.upsert(record.clone());
                warn!(job = %self.id, error = %e, "Calibration job failed");
                JobCompletion {
                    record,
                    deferred: None,
                }
            }
        }
    }

    fn execute(
        &self,
        request: &JobRequest,
        result: &mut JobResult,
        diag: &mut Diagnostics,
    ) -> Result<MasterFrame> {
        let settings = &self.settings;

        // 1. Extension filter and working-set cap.
        let mut paths: Vec<&str> = request
            .inputs
            .iter()
            .map(String::as_str)
            .filter(|p| is_image_file(p))
            .collect();
        let skipped = request.inputs.len() - paths.len();
        if skipped > 0 {
            diag.warnings
                .push(format!("{skipped} inputs skipped: unrecognized extension"));
        }
        if paths.len() > settings.max_frames {
            diag.warnings.push(format!(
                "working set capped at {} of {} frames",
                settings.max_frames,
                paths.len()
            ));
            paths.truncate(settings.max_frames);
        }
        if paths.is_empty() {
            return Err(VestaError::Pipeline(
                "no recognized image files in the input set".to_string(),
            ));
        }
        self.push(JobStatus::Running, 5);

        // 2. Parallel downloads, re-ordered by input index; individual
        // failures drop the file with a warning.
        let downloaded: Vec<(usize, Result<ImageBuffer>)> = paths
            .par_iter()
            .enumerate()
            .map(|(i, path)| {
                let buffer = self
                    .storage
                    .download(&request.bucket, path)
                    .and_then(|bytes| decode_image(&bytes, path));
                (i, buffer)
            })
            .collect();

        let mut records = Vec::with_capacity(paths.len());
        let mut download_failures = Vec::new();
        for (i, outcome) in downloaded {
            let path = paths[i];
            match outcome {
                Ok(buffer) => {
                    let header = self.probe.inspect(Path::new(path), &buffer);
                    records.push(FrameRecord::new(path.into(), header, buffer));
                }
                Err(e) => {
                    warn!(job = %self.id, path, error = %e, "Dropping undownloadable frame");
                    diag.warnings.push(format!("{path}: {e}"));
                    download_failures.push(RejectedFrame {
                        name: path.to_string(),
                        reasons: vec![e.to_string()],
                    });
                }
            }
        }
        if records.is_empty() {
            result.rejected_details = download_failures;
            return Err(VestaError::Pipeline(
                "download yielded zero usable files".to_string(),
            ));
        }
        self.token.checkpoint()?;
        self.push(JobStatus::Running, 25);

        // 3. Aggregate frame type and dark-frame corrections.
        let names: Vec<String> = records.iter().map(|r| r.file_name()).collect();
        let filename_vote = FrameType::aggregate(names.iter().map(String::as_str));
        let frame_type = self.resolve_frame_type(&records, filename_vote);
        diag.frame_type = Some(frame_type.to_string());
        info!(job = %self.id, %frame_type, frames = records.len(), "Frame type inferred");

        if frame_type == FrameType::Dark {
            if settings.bias.enabled {
                records = self.apply_bias_subtraction(request, records)?;
            }
            if (settings.matching.temperature || settings.matching.exposure)
                && !request.reference_lights.is_empty()
            {
                records = self.apply_reference_matching(request, records, diag);
            }
        }
        self.push(JobStatus::Running, 40);

        // 4. Validation gate.
        let token = self.token.clone();
        let partition = crate::validate::partition(records, || token.checkpoint())?;
        result.rejected_details = download_failures;
        for frame in &partition.rejected {
            result.rejected_details.push(RejectedFrame {
                name: frame.file_name(),
                reasons: frame.rejection_reasons.clone(),
            });
        }
        if partition.valid.is_empty() {
            return Err(VestaError::NoValidFrames {
                rejected: request.inputs.len(),
            });
        }
        info!(
            job = %self.id,
            valid = partition.valid.len(),
            rejected = partition.rejected.len(),
            "Validation complete"
        );
        self.push(JobStatus::Running, 55);

        // 5. Optional bad-pixel map (only consumed by cosmetic correction)
        // and superdark bypass.
        let bad_pixel_map = if settings.cosmetic.is_some() {
            self.load_bad_pixel_map(request, diag)
        } else {
            None
        };
        let superdark = self.load_superdark(request, diag);

        let valid_count = partition.valid.len();
        let buffers: Vec<ImageBuffer> =
            partition.valid.into_iter().map(|r| r.buffer).collect();

        // 6. Analyze and stack (or take the superdark directly). The
        // engine itself resolves `adaptive` to a concrete method.
        let (image, method_label, outlier_ratio) = if let Some(superdark) = superdark {
            diag.warnings
                .push("pre-built superdark used, stacking bypassed".to_string());
            (superdark, "superdark".to_string(), 0.0)
        } else {
            let stats = analysis::analyze(&buffers)?;
            let outlier_ratio = stats.outlier_ratio;
            diag.set_stats = Some(stats);

            self.token.checkpoint()?;
            self.push(JobStatus::Running, 60);

            let outcome = stack::combine(&buffers, &settings.method)?;
            if matches!(settings.method, StackMethod::Adaptive { .. }) {
                diag.recommendation = Some(outcome.method.label().to_string());
            }
            diag.warnings.extend(outcome.warnings);
            (outcome.image, outcome.method.label().to_string(), outlier_ratio)
        };
        self.token.checkpoint()?;
        self.push(JobStatus::Running, 80);

        // Cosmetic correction. A missing external detector degrades to a
        // warning rather than failing an otherwise good master.
        let image = match &settings.cosmetic {
            Some(cos) => match cosmetic::correct(
                &image,
                cos.method,
                cos.threshold,
                bad_pixel_map.as_ref(),
                self.detector.as_deref(),
            ) {
                Ok((cleaned, warnings)) => {
                    diag.warnings.extend(warnings);
                    cleaned
                }
                Err(VestaError::ExternalTool(msg)) => {
                    diag.warnings
                        .push(format!("cosmetic correction skipped: {msg}"));
                    image
                }
                Err(e) => return Err(e),
            },
            None => image,
        };

        // 7. Master statistics and quality score.
        let mut master = MasterFrame::new(image, method_label, valid_count, outlier_ratio);
        let score = quality::score(&master.stats, master.n_frames_used, frame_type);
        self.push(JobStatus::Running, 90);

        // 8. Dark scaling.
        if settings.dark_scaling
            && frame_type == FrameType::Dark
            && !request.reference_lights.is_empty()
        {
            let lights = self.load_reference_lights(request, diag);
            let factor = dark_scale_factor(&lights, &buffers);
            if factor != 1.0 {
                master = master.scaled(factor);
            }
            result.dark_scale = Some(factor);
            info!(job = %self.id, factor, "Dark scaling applied");
        }

        result.method = Some(master.method.clone());
        result.n_frames = valid_count;
        result.stats = Some(master.stats.clone());
        result.quality = Some(score);

        // 9. Persist the preview now; the raw master uploads after the job
        // is already marked successful.
        self.token.checkpoint()?;
        self.push(JobStatus::Running, 95);

        let preview = encode_preview_png(&master.image)?;
        let preview_path = format!("masters/{}/preview.png", self.id);
        self.storage
            .upload(&request.bucket, &preview_path, &preview, true)?;
        result.preview_path = Some(preview_path);

        let diagnostics_path = format!("masters/{}/diagnostics.json", self.id);
        let payload = serde_json::json!({ "result": &*result, "diagnostics": &*diag });
        match serde_json::to_vec_pretty(&payload) {
            Ok(json) => {
                if let Err(e) =
                    self.storage
                        .upload(&request.bucket, &diagnostics_path, &json, false)
                {
                    warn!(job = %self.id, error = %e, "Diagnostics upload failed");
                    diag.warnings
                        .push(format!("diagnostics upload failed: {e}"));
                }
            }
            Err(e) => diag.warnings.push(format!("diagnostics serialization failed: {e}")),
        }

        Ok(master)
    }

    /// Prefer header-reported types over the filename vote when present.
    fn resolve_frame_type(&self, records: &[FrameRecord], fallback: FrameType) -> FrameType {
        let mut counts = [0usize; 5];
        let mut any = false;
        for record in records {
            if let Some(t) = record.header.frame_type {
                counts[t as usize] += 1;
                any = true;
            }
        }
        if !any {
            return fallback;
        }
        [
            FrameType::Bias,
            FrameType::Dark,
            FrameType::Flat,
            FrameType::Light,
            FrameType::Unknown,
        ]
        .into_iter()
        .max_by_key(|t| counts[*t as usize])
        .unwrap_or(fallback)
    }

    fn apply_bias_subtraction(
        &self,
        request: &JobRequest,
        records: Vec<FrameRecord>,
    ) -> Result<Vec<FrameRecord>> {
        let bias_path = match &self.settings.bias.master_path {
            Some(path) => path.clone(),
            None => auto_select_bias(self.storage.as_ref(), &request.bucket)?,
        };
        // Master-bias download failure is fatal, unlike per-frame inputs.
        let bytes = self.storage.download(&request.bucket, &bias_path)?;
        let bias = decode_image(&bytes, &bias_path)?;
        info!(job = %self.id, bias = %bias_path, "Subtracting master bias");

        let token = self.token.clone();
        subtract_bias(&records, &bias, || token.checkpoint())
    }

    fn apply_reference_matching(
        &self,
        request: &JobRequest,
        records: Vec<FrameRecord>,
        diag: &mut Diagnostics,
    ) -> Vec<FrameRecord> {
        let first = &request.reference_lights[0];
        let reference = self
            .storage
            .download(&request.bucket, first)
            .and_then(|bytes| decode_image(&bytes, first))
            .map(|buffer| self.probe.inspect(Path::new(first), &buffer));

        match reference {
            Ok(header) => {
                match_reference(records, &header, self.settings.matching, &mut diag.warnings)
            }
            Err(e) => {
                warn!(job = %self.id, error = %e, "Reference light unavailable, skipping matching");
                diag.warnings
                    .push(format!("reference light unavailable, matching skipped: {e}"));
                records
            }
        }
    }

    fn load_bad_pixel_map(
        &self,
        request: &JobRequest,
        diag: &mut Diagnostics,
    ) -> Option<BadPixelMap> {
        let path = self.settings.bad_pixel_map.as_ref()?;
        match self
            .storage
            .download(&request.bucket, path)
            .and_then(|bytes| decode_image(&bytes, path))
        {
            Ok(image) => Some(BadPixelMap::from_image(&image)),
            Err(e) => {
                diag.warnings
                    .push(format!("bad pixel map unavailable: {e}"));
                None
            }
        }
    }

    fn load_superdark(&self, request: &JobRequest, diag: &mut Diagnostics) -> Option<ImageBuffer> {
        let path = self.settings.superdark.as_ref()?;
        match self
            .storage
            .download(&request.bucket, path)
            .and_then(|bytes| decode_image(&bytes, path))
        {
            Ok(image) => Some(image),
            Err(e) => {
                diag.warnings.push(format!("superdark unavailable: {e}"));
                None
            }
        }
    }

    fn load_reference_lights(
        &self,
        request: &JobRequest,
        diag: &mut Diagnostics,
    ) -> Vec<ImageBuffer> {
        let mut lights = Vec::new();
        for path in &request.reference_lights {
            match self
                .storage
                .download(&request.bucket, path)
                .and_then(|bytes| decode_image(&bytes, path))
            {
                Ok(image) => lights.push(image),
                Err(e) => diag
                    .warnings
                    .push(format!("reference light {path} unavailable: {e}")),
            }
        }
        lights
    }

    /// Upload the raw master without blocking job completion, then attach
    /// its path to the already-successful record.
    fn spawn_master_upload(
        &self,
        bucket: String,
        master: MasterFrame,
    ) -> thread::JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        let store = Arc::clone(&self.store);
        let id = self.id.clone();
        thread::spawn(move || {
            let path = format!("masters/{id}/master.f32");
            let bytes = encode_master(&master.image);
            match storage.upload(&bucket, &path, &bytes, false) {
                Ok(_) => {
                    if let Some(mut record) = store.get(&id) {
                        if let Some(result) = record.result.as_mut() {
                            result.master_path = Some(path);
                        }
                        store.upsert(record);
                    }
                }
                Err(e) => warn!(job = %id, error = %e, "Raw master upload failed"),
            }
        })
    }

    fn current_progress(&self) -> u8 {
        self.store.get(&self.id).map(|r| r.progress).unwrap_or(0)
    }

    fn push(&self, status: JobStatus, progress: u8) {
        if let Some(mut record) = self.store.get(&self.id) {
            record.status = status;
            record.progress = progress;
            self.store.upsert(record);
        }
    }
}
