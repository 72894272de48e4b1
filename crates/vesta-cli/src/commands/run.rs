use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use vesta_core::job::{
    CalibrationJob, InMemoryJobStore, JobRequest, JobStatus, JobStore, StackingSettings,
};
use vesta_core::metadata::FilenameProbe;
use vesta_core::storage::FsStorage;

#[derive(Args)]
pub struct RunArgs {
    /// Storage root directory (buckets are subdirectories)
    #[arg(long)]
    pub root: PathBuf,

    /// Bucket name under the storage root
    #[arg(long, default_value = "calibration")]
    pub bucket: String,

    /// Input object paths within the bucket
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Reference light frame paths for matching/dark scaling
    #[arg(long)]
    pub reference: Vec<String>,

    /// Settings file (TOML); defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Job id; also names the output prefix masters/<id>/
    #[arg(long, default_value = "local")]
    pub id: String,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let settings = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<StackingSettings>(&text)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        }
        None => StackingSettings::default(),
    };

    let storage = Arc::new(FsStorage::new(&args.root));
    let store = Arc::new(InMemoryJobStore::new());
    let job = Arc::new(CalibrationJob::new(
        &args.id,
        settings,
        storage,
        store.clone(),
        Arc::new(FilenameProbe),
        None,
    ));

    let request = JobRequest {
        bucket: args.bucket.clone(),
        inputs: args.inputs.clone(),
        reference_lights: args.reference.clone(),
    };

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Job [{bar:40}] {pos}%")?
            .progress_chars("=> "),
    );

    let handle = job.spawn(request);
    while !store
        .get(&args.id)
        .map(|r| r.status.is_terminal())
        .unwrap_or(false)
    {
        if let Some(record) = store.get(&args.id) {
            pb.set_position(record.progress as u64);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    let completion = handle.join().expect("job thread panicked");
    pb.finish_and_clear();

    // Wait for the deferred raw-master upload so the printed paths exist.
    if let Some(deferred) = completion.deferred {
        let _ = deferred.join();
    }
    let record = store.get(&args.id).unwrap_or(completion.record);

    match record.status {
        JobStatus::Success => {
            println!("{} job {}", style("success").green().bold(), record.id);
            if let Some(result) = &record.result {
                println!(
                    "  used {} / rejected {} frames, method {}",
                    result.used,
                    result.rejected,
                    result.method.as_deref().unwrap_or("-")
                );
                if let Some(stats) = &result.stats {
                    println!(
                        "  mean {:.2}  median {:.2}  std {:.2}  min {:.2}  max {:.2}",
                        stats.mean, stats.median, stats.std, stats.min, stats.max
                    );
                }
                if let Some(quality) = &result.quality {
                    println!("  quality score {:.1}/10", quality.score);
                    for rec in &quality.recommendations {
                        println!("    - {rec}");
                    }
                }
                if let Some(path) = &result.preview_path {
                    println!("  preview: {path}");
                }
                if let Some(path) = &result.master_path {
                    println!("  master:  {path}");
                }
            }
            for warning in &record.diagnostics.warnings {
                println!("  {} {warning}", style("warning:").yellow());
            }
            Ok(())
        }
        JobStatus::Cancelled => bail!("job {} was cancelled", record.id),
        _ => bail!(
            "job {} failed: {}",
            record.id,
            record.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
