use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::error::PlotError;
use crate::external;

/// Which HDR signalling mediainfo reports for the video track.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct HdrFormat {
    /// SMPTE ST 2086 / ST 2094 static or dynamic metadata is present.
    pub hdr10: bool,
    pub dolby_vision: bool,
}

impl HdrFormat {
    pub fn detect(hdr_format: &str) -> Result<Self, PlotError> {
        let format = HdrFormat {
            hdr10: hdr_format.contains("SMPTE ST 20"),
            dolby_vision: hdr_format.contains("Dolby Vision"),
        };
        if !format.hdr10 && !format.dolby_vision {
            return Err(PlotError::UnrecognizedHdrFormat);
        }
        Ok(format)
    }

    /// Profile 5 carries no HDR10 base layer and must be tonemapped before measuring.
    /// Without a profile from the RPU, a DV track lacking HDR10 metadata is assumed to be P5.
    pub fn needs_tonemap(&self, dovi_profile: Option<u8>) -> bool {
        if !self.dolby_vision {
            return false;
        }
        match dovi_profile {
            Some(profile) => profile == 5,
            None => !self.hdr10,
        }
    }

    pub fn name(&self) -> &'static str {
        match (self.dolby_vision, self.hdr10) {
            (true, true) => "Dolby Vision + HDR10",
            (true, false) => "Dolby Vision",
            _ => "HDR10",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MediaInfoReport {
    media: Option<MediaInfoMedia>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<VideoTrack>,
}

/// The mediainfo track fields used for plotting. mediainfo reports numbers as strings.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct VideoTrack {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "HDR_Format")]
    pub hdr_format: Option<String>,
    #[serde(rename = "HDR_Format_Compatibility")]
    pub hdr_format_compatibility: Option<String>,
    #[serde(rename = "MasteringDisplay_ColorPrimaries")]
    pub mastering_display_primaries: Option<String>,
    #[serde(rename = "MasteringDisplay_Luminance")]
    pub mastering_display_luminance: Option<String>,
    #[serde(rename = "FrameCount")]
    pub frame_count: Option<String>,
    #[serde(rename = "Width")]
    pub width: Option<String>,
    #[serde(rename = "Height")]
    pub height: Option<String>,
}

impl VideoTrack {
    pub fn frame_count(&self) -> Option<usize> {
        self.frame_count.as_deref()?.trim().parse().ok()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let w = self.width.as_deref()?.trim().parse().ok()?;
        let h = self.height.as_deref()?.trim().parse().ok()?;
        Some((w, h))
    }

    pub fn mastering_display(&self) -> MasteringDisplay {
        let luminance = self
            .mastering_display_luminance
            .as_deref()
            .and_then(parse_mastering_luminance);
        MasteringDisplay {
            primaries: self.mastering_display_primaries.clone(),
            luminance,
        }
    }
}

/// Static HDR10 mastering display metadata, kept as mediainfo prints it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MasteringDisplay {
    pub primaries: Option<String>,
    /// (min, max) in nits.
    pub luminance: Option<(String, String)>,
}

pub fn parse_mediainfo_video_track(json: &str) -> Result<VideoTrack> {
    let report: MediaInfoReport =
        serde_json::from_str(json).context("Failed to parse mediainfo JSON")?;
    report
        .media
        .unwrap_or_default()
        .track
        .into_iter()
        .find(|t| t.kind == "Video")
        .context("No video track reported by mediainfo")
}

pub fn probe_video_track(input_file: &Path) -> Result<VideoTrack> {
    let mut cmd = Command::new("mediainfo");
    cmd.arg("--Output=JSON").arg(input_file);
    let out = external::get_command_output(&mut cmd)?;
    parse_mediainfo_video_track(&out)
}

/// `"min: 0.0050 cd/m2, max: 1000 cd/m2"` -> `("0.0050", "1000")`.
pub fn parse_mastering_luminance(s: &str) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"min:\s*([0-9.]+).*max:\s*([0-9.]+)").expect("valid luminance regex")
    });
    let caps = re.captures(s)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Lines of interest from `dovi_tool info --summary`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoviSummary {
    pub frames: Option<usize>,
    /// e.g. `"Profile 8"`
    pub profile: Option<String>,
    /// e.g. `"CM v4.0"`
    pub dm_version: Option<String>,
    /// The whole `RPU mastering display: ...` line.
    pub mastering_display: Option<String>,
}

impl DoviSummary {
    pub fn profile_number(&self) -> Option<u8> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"Profile\D*(\d+)").expect("valid profile regex"));
        let profile = self.profile.as_deref()?;
        re.captures(profile)?[1].parse().ok()
    }
}

pub fn parse_dovi_summary(text: &str) -> DoviSummary {
    let mut summary = DoviSummary::default();
    for line in text.lines().map(str::trim) {
        if line.contains("RPU mastering display") {
            summary.mastering_display = Some(line.to_string());
        }
        if line.starts_with("Profile") {
            summary.profile = Some(line.replace(':', ""));
        }
        if line.contains("DM version") {
            let inner = line.rsplit_once('(').map_or(line, |(_, rest)| rest);
            summary.dm_version = Some(inner.replace(')', ""));
        }
        if let Some(frames) = line.strip_prefix("Frames:") {
            summary.frames = frames.trim().parse().ok();
        }
    }
    summary
}

/// Demux the HEVC stream to Annex B and hand it to `dovi_tool extract-rpu`.
pub fn extract_rpu(input_file: &Path, work_dir: &Path) -> Result<PathBuf> {
    let rpu = work_dir.join("RPU.bin");

    let mut ffmpeg = Command::new("ffmpeg");
    ffmpeg
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(input_file)
        .args([
            "-map",
            "0:v:0",
            "-c:v",
            "copy",
            "-bsf:v",
            "hevc_mp4toannexb",
            "-f",
            "hevc",
            "-",
        ]);

    let mut dovi = Command::new("dovi_tool");
    dovi.args(["extract-rpu", "-o"]).arg(&rpu).arg("-");

    let ok = external::pipe_commands(&mut ffmpeg, &mut dovi, &work_dir.join("extract_rpu.log"))?;
    if !ok || !rpu.exists() {
        return Err(PlotError::ToolFailed("dovi_tool extract-rpu").into());
    }
    Ok(rpu)
}

pub fn dovi_summary(rpu: &Path) -> Result<DoviSummary> {
    let mut cmd = Command::new("dovi_tool");
    cmd.args(["info", "--summary", "-i"]).arg(rpu);
    let out = external::get_command_output(&mut cmd).context("dovi_tool info failed")?;
    Ok(parse_dovi_summary(&out))
}
