use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use vesta_core::frame::ImageBuffer;
use vesta_core::io::image_io::{decode_image, encode_preview_png};
use vesta_core::io::master::encode_master;
use vesta_core::stack::{combine, StackMethod};

#[derive(Clone, Copy, ValueEnum)]
pub enum StackMethodArg {
    Mean,
    Median,
    Sigma,
    Winsorized,
    Minmax,
    LinearFit,
    PercentileClip,
    EntropyWeighted,
    Superbias,
    Adaptive,
}

#[derive(Args)]
pub struct StackArgs {
    /// Input frame files (PNG/TIFF/.f32)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Stacking method
    #[arg(long, value_enum, default_value = "sigma")]
    pub method: StackMethodArg,

    /// Sigma threshold for rejection methods, or the kept-window width
    /// for percentile clipping
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output raw master path
    #[arg(short, long, default_value = "master.f32")]
    pub output: PathBuf,

    /// Also write a stretched 8-bit preview PNG here
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

fn resolve_method(args: &StackArgs) -> StackMethod {
    let sigma = args.threshold.unwrap_or(3.0);
    match args.method {
        StackMethodArg::Mean => StackMethod::Mean,
        StackMethodArg::Median => StackMethod::Median,
        StackMethodArg::Sigma => StackMethod::Sigma { sigma },
        StackMethodArg::Winsorized => StackMethod::Winsorized { sigma },
        StackMethodArg::Minmax => StackMethod::Minmax,
        StackMethodArg::LinearFit => StackMethod::LinearFit { sigma },
        StackMethodArg::PercentileClip => StackMethod::PercentileClip {
            threshold: args.threshold,
        },
        StackMethodArg::EntropyWeighted => StackMethod::EntropyWeighted,
        StackMethodArg::Superbias => StackMethod::Superbias,
        StackMethodArg::Adaptive => StackMethod::Adaptive {
            sigma: args.threshold,
        },
    }
}

pub fn run(args: &StackArgs) -> Result<()> {
    let pb = ProgressBar::new(args.files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Loading [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let mut buffers: Vec<ImageBuffer> = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path.to_string_lossy();
        buffers.push(
            decode_image(&bytes, &name)
                .with_context(|| format!("Failed to decode {}", path.display()))?,
        );
        pb.inc(1);
    }
    pb.finish();

    if buffers.is_empty() {
        bail!("no input frames");
    }

    let method = resolve_method(args);
    println!("Stacking {} frames ({})", buffers.len(), method.label());

    let outcome = combine(&buffers, &method)?;
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }

    fs::write(&args.output, encode_master(&outcome.image))
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "Saved {} ({}x{}, method {})",
        args.output.display(),
        outcome.image.width(),
        outcome.image.height(),
        outcome.method.label()
    );

    if let Some(ref preview) = args.preview {
        fs::write(preview, encode_preview_png(&outcome.image)?)
            .with_context(|| format!("Failed to write {}", preview.display()))?;
        println!("Preview saved to {}", preview.display());
    }

    Ok(())
}
