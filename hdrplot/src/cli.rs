use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::crop::{Crop, Trim};

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Plot the brightness of each frame of a HDR/DV HEVC video file.",
    long_about = None,
    after_help = "Examples:
  hdrplot video.mkv
  hdrplot video.mkv -i my_file -t \"My Custom Title\"
  hdrplot video.mkv --left 240 --right 240 --top 20 --bottom 20
  hdrplot video.mkv --trim-start 100 --trim-end 50"
)]
pub struct Args {
    /// Path to the video file (relative or absolute)
    pub path: String,

    /// Tag for output filenames: lightLevel-<TAG>.json and HDRplot-<TAG>.png
    #[arg(short = 'i', long = "identifier", value_name = "TAG", default_value = "DEFAULT")]
    pub identifier: String,

    /// Custom title for the plot (default: "HDR grade: <PATH>")
    #[arg(short, long)]
    pub title: Option<String>,

    /// Left crop value in pixels (must be even)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub left: i64,

    /// Right crop value in pixels (must be even)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub right: i64,

    /// Top crop value in pixels (must be even)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub top: i64,

    /// Bottom crop value in pixels (must be even)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub bottom: i64,

    /// Number of frames to trim at the start of the plot (to sync plots of different cuts)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub trim_start: i64,

    /// Number of frames to trim at the end of the plot
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub trim_end: i64,

    /// Directory receiving the light level cache and the PNG.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Where per-frame CLL/FALL values come from when no cache exists.
    #[arg(long, value_enum, default_value_t = LightSource::Measure)]
    pub source: LightSource,

    /// Re-measure even if a light level cache exists for the identifier.
    #[arg(long)]
    pub force: bool,

    /// Open the PNG with the system image viewer once written.
    #[arg(long)]
    pub show: bool,

    /// Plot width in pixels.
    #[arg(long, default_value_t = 1800)]
    pub width: u32,

    /// Plot height in pixels.
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Show raw external tool output and keep the work directory.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors and the final result.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn crop(&self) -> Crop {
        Crop {
            left: self.left,
            right: self.right,
            top: self.top,
            bottom: self.bottom,
        }
    }

    pub fn trim(&self) -> Trim {
        Trim {
            start: self.trim_start,
            end: self.trim_end,
        }
    }

    pub fn plot_title(&self) -> String {
        match &self.title {
            Some(t) => t.clone(),
            None => format!("HDR grade: {}", self.path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightSource {
    /// Decode every frame and measure maxRGB (slow, works for any HDR10/DV file).
    Measure,
    /// Use the Dolby Vision L1 max_pq/avg_pq of each RPU (fast, DV only).
    RpuL1,
}

impl std::fmt::Display for LightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LightSource::Measure => write!(f, "measure"),
            LightSource::RpuL1 => write!(f, "rpu-l1"),
        }
    }
}
