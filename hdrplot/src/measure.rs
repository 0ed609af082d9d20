//! Per-frame content light level measurement.
//!
//! Frames are served by an ffmpeg subprocess which crops, optionally tonemaps
//! Dolby Vision profile 5 to HDR10, and converts to full range 16-bit planar
//! RGB (`gbrp16le`). Each frame is then reduced to its CLL (brightest maxRGB)
//! and FALL (mean linear maxRGB).

use anyhow::{Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use dolby_vision::rpu::extension_metadata::blocks::ExtMetadataBlock;
use dolby_vision::rpu::utils::parse_rpu_file;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::error::PlotError;
use crate::pq::{pq12_to_nits, PqTable};
use crate::progress::Progress;

/// Light level of a single frame, in nits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLight {
    pub cll: f64,
    pub fall: f64,
}

/// Per-frame CLL and FALL series, in nits. Both always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightLevels {
    pub cll: Vec<f64>,
    pub fall: Vec<f64>,
}

impl LightLevels {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            cll: Vec::with_capacity(frames),
            fall: Vec::with_capacity(frames),
        }
    }

    pub fn push(&mut self, frame: FrameLight) {
        self.cll.push(frame.cll);
        self.fall.push(frame.fall);
    }

    pub fn len(&self) -> usize {
        self.cll.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cll.is_empty()
    }
}

/// Everything ffmpeg needs to serve measurement frames.
#[derive(Debug, Clone)]
pub struct FrameServer {
    pub input: PathBuf,
    /// Size of the frames after cropping.
    pub width: u32,
    pub height: u32,
    pub crop_filter: Option<String>,
    pub tonemap: bool,
}

/// Tonemap DV profile 5 to BT.2020 PQ limited range, like an HDR10 base layer.
const DOVI_TONEMAP_FILTER: &str = "libplacebo=apply_dolbyvision=1:colorspace=bt2020nc:\
color_primaries=bt2020:color_trc=smpte2084:range=tv:format=yuv420p10le";

/// PQ stays PQ: only the matrix and range change, giving R'G'B' codes in 0..=65535.
const RGB_FILTER: &str = "scale=in_color_matrix=bt2020:in_range=tv:out_range=pc,format=gbrp16le";

impl FrameServer {
    pub fn filter_chain(&self) -> String {
        let mut filters: Vec<&str> = Vec::with_capacity(3);
        if let Some(crop) = &self.crop_filter {
            filters.push(crop);
        }
        if self.tonemap {
            filters.push(DOVI_TONEMAP_FILTER);
        }
        filters.push(RGB_FILTER);
        filters.join(",")
    }

    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3 * 2
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostats"]);
        if self.tonemap {
            cmd.args(["-init_hw_device", "vulkan"]);
        }
        cmd.arg("-i")
            .arg(&self.input)
            .args(["-map", "0:v:0", "-an", "-sn", "-vf"])
            .arg(self.filter_chain())
            .args(["-f", "rawvideo", "-pix_fmt", "gbrp16le", "-"]);
        cmd
    }

    fn spawn(&self, log_path: &Path) -> Result<(Child, ChildStdout)> {
        let log = File::create(log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log))
            .spawn()
            .context("Failed to execute ffmpeg for measurement")?;
        let stdout = child.stdout.take().context("Failed to capture ffmpeg stdout")?;
        Ok((child, stdout))
    }
}

/// Decode every frame and measure it. `expected_frames` only drives the progress bar.
pub fn measure_light_levels(
    server: &FrameServer,
    expected_frames: Option<usize>,
    log_path: &Path,
) -> Result<LightLevels> {
    let (mut child, stdout) = server.spawn(log_path)?;
    let reader = BufReader::with_capacity(server.frame_size().min(1 << 24), stdout);
    read_light_levels(&mut child, reader, server.width, server.height, expected_frames)
}

/// Measure `width`x`height` frames from `reader` until EOF, then reap `child`.
/// On a read error the child is killed and reaped before returning.
fn read_light_levels<R: Read>(
    child: &mut Child,
    mut reader: R,
    width: u32,
    height: u32,
    expected_frames: Option<usize>,
) -> Result<LightLevels> {
    let mut frame = vec![0u8; width as usize * height as usize * 3 * 2];
    let table = PqTable::new();

    let progress = Progress::new(expected_frames.map(|n| n as u64), "Measuring");
    let mut levels = LightLevels::with_capacity(expected_frames.unwrap_or(0));

    loop {
        match reader.read_exact(&mut frame) {
            Ok(()) => {
                levels.push(measure_frame(&frame, width, height, &table));
                progress.inc();
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                progress.finish();
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow::Error::from(e).context("Failed to read frame data"));
            }
        }
    }
    progress.finish();

    let status = child.wait().context("Failed to wait for ffmpeg")?;
    if !status.success() {
        return Err(PlotError::ToolFailed("ffmpeg").into());
    }
    if levels.is_empty() {
        return Err(PlotError::EmptyMeasurements.into());
    }
    Ok(levels)
}

/// Reduce one `gbrp16le` frame to CLL/FALL. Rows are processed in parallel.
pub fn measure_frame(frame: &[u8], width: u32, height: u32, table: &PqTable) -> FrameLight {
    let row_bytes = width as usize * 2;
    let plane_bytes = row_bytes * height as usize;
    let (g, rest) = frame.split_at(plane_bytes);
    let (b, r) = rest.split_at(plane_bytes);
    let r = &r[..plane_bytes];

    let (max_code, sum_nits) = g
        .par_chunks_exact(row_bytes)
        .zip(b.par_chunks_exact(row_bytes))
        .zip(r.par_chunks_exact(row_bytes))
        .map(|((g_row, b_row), r_row)| {
            let mut row_max = 0u16;
            let mut row_sum = 0.0f64;
            for x in (0..row_bytes).step_by(2) {
                let max_rgb = LittleEndian::read_u16(&g_row[x..])
                    .max(LittleEndian::read_u16(&b_row[x..]))
                    .max(LittleEndian::read_u16(&r_row[x..]));
                row_max = row_max.max(max_rgb);
                row_sum += table.nits(max_rgb);
            }
            (row_max, row_sum)
        })
        .reduce(|| (0u16, 0.0f64), |a, b| (a.0.max(b.0), a.1 + b.1));

    let pixels = f64::from(width) * f64::from(height);
    FrameLight {
        cll: table.nits(max_code),
        fall: if pixels > 0.0 { sum_nits / pixels } else { 0.0 },
    }
}

/// CLL/FALL from the Dolby Vision L1 `max_pq`/`avg_pq` of every RPU.
pub fn rpu_l1_light_levels(rpu_path: &Path) -> Result<LightLevels> {
    let rpus = parse_rpu_file(rpu_path)
        .with_context(|| format!("Failed to parse RPU file {}", rpu_path.display()))?;

    let frames = rpus.iter().map(|rpu| {
        rpu.vdr_dm_data
            .as_ref()
            .and_then(|dm| dm.get_block(1))
            .and_then(|block| match block {
                ExtMetadataBlock::Level1(l1) => Some(l1_to_light(l1.max_pq, l1.avg_pq)),
                _ => None,
            })
    });
    Ok(fill_l1_gaps(frames)?)
}

/// Frames without an L1 block repeat the previous frame. Frames before the
/// first L1 block are black.
pub fn fill_l1_gaps<I>(frames: I) -> Result<LightLevels, PlotError>
where
    I: IntoIterator<Item = Option<FrameLight>>,
{
    let frames = frames.into_iter();
    let mut levels = LightLevels::with_capacity(frames.size_hint().0);
    let mut last: Option<FrameLight> = None;
    for frame in frames {
        last = frame.or(last);
        levels.push(last.unwrap_or(FrameLight { cll: 0.0, fall: 0.0 }));
    }

    if last.is_none() {
        return Err(PlotError::MissingL1);
    }
    Ok(levels)
}

pub fn l1_to_light(max_pq: u16, avg_pq: u16) -> FrameLight {
    FrameLight {
        cll: pq12_to_nits(max_pq),
        fall: pq12_to_nits(avg_pq),
    }
}
