use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use vesta_core::frame::FrameType;
use vesta_core::io::master::decode_master;
use vesta_core::quality::{master_stats, score};

#[derive(Clone, Copy, ValueEnum)]
pub enum FrameTypeArg {
    Bias,
    Dark,
    Flat,
    Light,
    Unknown,
}

impl From<FrameTypeArg> for FrameType {
    fn from(arg: FrameTypeArg) -> Self {
        match arg {
            FrameTypeArg::Bias => FrameType::Bias,
            FrameTypeArg::Dark => FrameType::Dark,
            FrameTypeArg::Flat => FrameType::Flat,
            FrameTypeArg::Light => FrameType::Light,
            FrameTypeArg::Unknown => FrameType::Unknown,
        }
    }
}

#[derive(Args)]
pub struct ScoreArgs {
    /// Raw master file (.f32)
    pub master: PathBuf,

    /// Declared frame type of the master
    #[arg(long, value_enum, default_value = "unknown")]
    pub frame_type: FrameTypeArg,

    /// Number of frames that went into the master
    #[arg(long, default_value = "1")]
    pub frames: usize,
}

pub fn run(args: &ScoreArgs) -> Result<()> {
    let bytes = fs::read(&args.master)
        .with_context(|| format!("Failed to read {}", args.master.display()))?;
    let image = decode_master(&bytes)?;

    let stats = master_stats(&image, 0.0);
    let quality = score(&stats, args.frames, args.frame_type.into());

    println!("{} ({}x{})", args.master.display(), image.width(), image.height());
    println!(
        "  mean {:.2}  median {:.2}  std {:.2}  min {:.2}  max {:.2}",
        stats.mean, stats.median, stats.std, stats.min, stats.max
    );
    println!("  score {:.1}/10", quality.score);
    for rec in &quality.recommendations {
        println!("  - {rec}");
    }
    Ok(())
}
