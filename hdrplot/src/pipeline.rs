use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache;
use crate::cli::{Args, LightSource};
use crate::error::PlotError;
use crate::external;
use crate::measure::{self, FrameServer, LightLevels};
use crate::metadata::{self, DoviSummary, HdrFormat};
use crate::plot::{self, PlotLabels};
use crate::progress::{self, Spinner};
use crate::stats::LightStats;
use crate::subtitles::Subtitles;

const TOTAL_STEPS: u8 = 4;

/// Run the whole pipeline for one file and return the path of the written PNG.
pub fn run(args: &Args) -> Result<PathBuf> {
    let input = resolve_input(&args.path)?;
    let crop = args.crop();
    crop.validate()?;
    let trim = args.trim();

    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    // --- Metadata ---
    progress::print_step(1, TOTAL_STEPS, "Reading metadata");
    external::check_dependencies(&["mediainfo"])?;
    let track = metadata::probe_video_track(&input)?;
    let format = HdrFormat::detect(track.hdr_format.as_deref().unwrap_or_default())?;
    progress::print_info(&format!("HDR format: {}", format.name()));
    if let Some(compat) = track.hdr_format_compatibility.as_deref() {
        progress::print_info(&format!("Compatibility: {}", compat));
    }
    let mastering = track.mastering_display();

    let work_dir = tempfile::Builder::new()
        .prefix("hdrplot-")
        .keep(progress::is_verbose())
        .tempdir()
        .context("Failed to create work directory")?;
    if progress::is_verbose() {
        progress::print_info(&format!("Work directory: {}", work_dir.path().display()));
    }

    let mut rpu: Option<PathBuf> = None;
    let mut dovi: Option<DoviSummary> = None;
    if format.dolby_vision {
        external::check_dependencies(&["ffmpeg", "dovi_tool"])?;
        let spinner = Spinner::new("Extracting Dolby Vision RPU");
        let extracted = metadata::extract_rpu(&input, work_dir.path())
            .and_then(|path| metadata::dovi_summary(&path).map(|summary| (path, summary)));
        match extracted {
            Ok((path, summary)) => {
                spinner.finish_success();
                rpu = Some(path);
                dovi = Some(summary);
            }
            Err(e) => {
                spinner.finish_error(None);
                return Err(e);
            }
        }
    }
    let subtitles = Subtitles::new(&mastering, dovi.as_ref());
    let dovi_profile = dovi.as_ref().and_then(DoviSummary::profile_number);

    let expected_frames = dovi
        .as_ref()
        .and_then(|d| d.frames)
        .or_else(|| track.frame_count());
    if let Some(frames) = expected_frames {
        progress::print_info(&format!("Frames: {}", frames));
        trim.validate(frames)?;
    }

    // --- Light levels ---
    progress::print_step(2, TOTAL_STEPS, "Light levels");
    let cache_file = cache::cache_path(&args.output_dir, &args.identifier);
    let levels = if cache_file.exists() && !args.force {
        progress::print_info(&format!("Reusing {}", cache_file.display()));
        let levels = cache::load(&cache_file)?;
        if let Some(frames) = expected_frames.filter(|&n| n != levels.len()) {
            progress::print_warn(&format!(
                "Cache holds {} frames but the video has {}; trimming uses the cache length.",
                levels.len(),
                frames
            ));
        }
        levels
    } else {
        let levels = match args.source {
            LightSource::RpuL1 => {
                let rpu = rpu.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("--source rpu-l1 requires a Dolby Vision source")
                })?;
                let spinner = Spinner::new("Reading L1 metadata");
                let levels = measure::rpu_l1_light_levels(rpu);
                match &levels {
                    Ok(_) => spinner.finish_success(),
                    Err(e) => spinner.finish_error(Some(&e.to_string())),
                }
                levels?
            }
            LightSource::Measure => {
                let tonemap = format.needs_tonemap(dovi_profile);
                measure_file(&input, &track, &crop, tonemap, expected_frames, work_dir.path())?
            }
        };
        cache::store(&cache_file, &levels)?;
        progress::print_info(&format!("Saved {}", cache_file.display()));
        levels
    };

    // --- Statistics ---
    progress::print_step(3, TOTAL_STEPS, "Statistics");
    let cll = trim.apply(&levels.cll)?;
    let fall = trim.apply(&levels.fall)?;
    let stats = LightStats::compute(cll, fall)?;
    progress::print_info(&format!(
        "MaxCLL {:.2} nits (absolute {:.2}), avgCLL {:.2} nits",
        stats.practical_max_cll, stats.max_cll, stats.avg_cll
    ));
    progress::print_info(&format!(
        "MaxFALL {:.2} nits (absolute {:.2}), avgFALL {:.2} nits",
        stats.practical_max_fall, stats.max_fall, stats.avg_fall
    ));

    // --- Plot ---
    progress::print_step(4, TOTAL_STEPS, "Rendering plot");
    let png = plot::plot_path(&args.output_dir, &args.identifier);
    let title = args.plot_title();
    let labels = PlotLabels {
        title: &title,
        subtitles: &subtitles,
        stats: &stats,
    };
    plot::render(&png, cll, fall, &labels, (args.width, args.height))?;

    if args.show {
        if let Err(e) = external::open_in_viewer(&png) {
            progress::print_warn(&format!("Could not open the plot: {}", e));
        }
    }

    Ok(png)
}

fn resolve_input(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    if !candidate.is_file() {
        return Err(PlotError::VideoNotFound(path.to_string()).into());
    }
    fs::canonicalize(candidate).with_context(|| format!("Failed to resolve {}", path))
}

fn measure_file(
    input: &Path,
    track: &metadata::VideoTrack,
    crop: &crate::crop::Crop,
    tonemap: bool,
    expected_frames: Option<usize>,
    work_dir: &Path,
) -> Result<LightLevels> {
    external::check_dependencies(&["ffmpeg"])?;
    let (width, height) = track
        .dimensions()
        .context("mediainfo did not report the video dimensions")?;
    let (out_w, out_h) = crop.output_size(width, height)?;
    let server = FrameServer {
        input: input.to_path_buf(),
        width: out_w,
        height: out_h,
        crop_filter: crop.filter(width, height)?,
        tonemap,
    };

    if tonemap {
        progress::print_info("Dolby Vision profile 5: tonemapping to HDR10 before measuring.");
    }
    progress::print_info(&format!(
        "Measuring {}x{} frames, this can take a long time.",
        out_w, out_h
    ));

    measure::measure_light_levels(&server, expected_frames, &work_dir.join("ffmpeg_measure.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_missing_input() {
        let err = resolve_input("definitely/not/here.mkv").unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlotError>().map(|e| e.to_string()),
            Some("Video file definitely/not/here.mkv not found.".to_string())
        );
    }

    #[test]
    fn test_invalid_crop_reported_before_probing() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mkv");
        std::fs::write(&video, b"not really a video").unwrap();
        let args = Args::try_parse_from([
            "hdrplot",
            video.to_str().unwrap(),
            "--left",
            "3",
            "--output-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let err = run(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlotError>(),
            Some(PlotError::InvalidCrop)
        ));
    }
}
