use anyhow::Result;
use plotters::coord::combinators::BindKeyPoints;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};

use crate::stats::LightStats;
use crate::subtitles::Subtitles;

const ROYAL_BLUE: RGBColor = RGBColor(65, 105, 225);
const BLUE_VIOLET: RGBColor = RGBColor(138, 43, 226);

/// Log axis bounds in nits. Values below the floor are drawn on it.
const Y_MIN: f64 = 0.1;
const Y_MAX: f64 = 5000.0;

/// Labelled y ticks: 1-2-5 steps per decade across the whole axis.
const Y_KEY_POINTS: [f64; 15] = [
    0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0,
];

const HEADER_HEIGHT: u32 = 110;
const MARGIN: u32 = 12;
const Y_LABEL_AREA: u32 = 70;

pub fn plot_path(output_dir: &Path, identifier: &str) -> PathBuf {
    output_dir.join(format!("HDRplot-{}.png", identifier))
}

/// Everything drawn besides the series themselves.
pub struct PlotLabels<'a> {
    pub title: &'a str,
    pub subtitles: &'a Subtitles,
    pub stats: &'a LightStats,
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow::anyhow!("Failed to draw plot: {}", e)
}

/// Render CLL/FALL on a log scale and write the PNG.
pub fn render(
    path: &Path,
    cll: &[f64],
    fall: &[f64],
    labels: &PlotLabels<'_>,
    size: (u32, u32),
) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let (header, body) = root.split_vertically(HEADER_HEIGHT);
    draw_header(&header, labels)?;

    let frames = cll.len().max(1) as f64;
    let mut chart = ChartBuilder::on(&body)
        .margin(MARGIN)
        .x_label_area_size(45)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(
            0f64..frames,
            (Y_MIN..Y_MAX)
                .log_scale()
                .with_key_points(Y_KEY_POINTS.to_vec()),
        )
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_labels(20)
        .y_labels(Y_KEY_POINTS.len())
        .x_desc("frames")
        .y_desc("nits (cd/m²)")
        .axis_desc_style(("sans-serif", 16))
        .label_style(("sans-serif", 14))
        .x_label_formatter(&|x: &f64| format!("{:.0}", x))
        .y_label_formatter(&|y: &f64| format_tick(*y))
        .bold_line_style(BLACK.mix(0.25))
        .light_line_style(BLACK.mix(0.08))
        .draw()
        .map_err(draw_err)?;

    let cll_pts: Vec<(f64, f64)> = series_points(cll).collect();
    let fall_pts: Vec<(f64, f64)> = series_points(fall).collect();

    // Band between CLL (upper edge) and FALL (lower edge).
    let band: Vec<(f64, f64)> = cll_pts
        .iter()
        .copied()
        .chain(fall_pts.iter().rev().copied())
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(
            band,
            ROYAL_BLUE.mix(0.4).filled(),
        )))
        .map_err(draw_err)?;
    chart
        .draw_series(AreaSeries::new(
            fall_pts.iter().copied(),
            Y_MIN,
            BLUE_VIOLET.mix(0.4),
        ))
        .map_err(draw_err)?;

    chart
        .draw_series(LineSeries::new(cll_pts, ROYAL_BLUE.stroke_width(1)))
        .map_err(draw_err)?
        .label(labels.stats.cll_legend())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], ROYAL_BLUE.stroke_width(3)));
    chart
        .draw_series(LineSeries::new(fall_pts, BLUE_VIOLET.stroke_width(1)))
        .map_err(draw_err)?
        .label(labels.stats.fall_legend())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], BLUE_VIOLET.stroke_width(3)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerLeft)
        .background_style(WHITE)
        .border_style(BLACK.mix(0.4))
        .label_font(("monospace", 17))
        .draw()
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

/// Title centred on top, HDR10 subtitles left and Dolby Vision subtitles right,
/// aligned with the plotting area.
fn draw_header<DB: DrawingBackend>(
    header: &DrawingArea<DB, plotters::coord::Shift>,
    labels: &PlotLabels<'_>,
) -> Result<()> {
    let (width, height) = header.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);
    let left = (MARGIN + Y_LABEL_AREA) as i32;
    let right = width - MARGIN as i32;
    let upper_row = height - 30;
    let lower_row = height - 6;

    let title_style = TextStyle::from(("sans-serif", 30).into_font())
        .pos(Pos::new(HPos::Center, VPos::Top));
    header
        .draw(&Text::new(labels.title.to_string(), (width / 2, 10), title_style))
        .map_err(draw_err)?;

    let left_style =
        TextStyle::from(("sans-serif", 18).into_font()).pos(Pos::new(HPos::Left, VPos::Bottom));
    let right_style =
        TextStyle::from(("sans-serif", 18).into_font()).pos(Pos::new(HPos::Right, VPos::Bottom));

    let subs = labels.subtitles;
    let placed = [
        (&subs.hdr1, (left, upper_row), &left_style),
        (&subs.hdr2, (left, lower_row), &left_style),
        (&subs.dv1, (right, upper_row), &right_style),
        (&subs.dv2, (right, lower_row), &right_style),
    ];
    for (text, pos, style) in placed {
        if text.is_empty() {
            continue;
        }
        header
            .draw(&Text::new(text.as_str(), pos, style.clone()))
            .map_err(draw_err)?;
    }
    Ok(())
}

fn series_points(values: &[f64]) -> impl Iterator<Item = (f64, f64)> + '_ {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v.clamp(Y_MIN, Y_MAX)))
}

/// Positional tick label: `max(1 - ceil(log10 y), 0)` decimals, trailing zeros trimmed.
pub fn format_tick(y: f64) -> String {
    if y <= 0.0 || !y.is_finite() {
        return "0".to_string();
    }
    let precision = (1 - y.log10().ceil() as i32).max(0) as usize;
    let s = format!("{:.*}", precision, y);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.1), "0.1");
        assert_eq!(format_tick(0.5), "0.5");
        assert_eq!(format_tick(1.0), "1");
        assert_eq!(format_tick(2.0), "2");
        assert_eq!(format_tick(50.0), "50");
        assert_eq!(format_tick(5000.0), "5000");
        assert_eq!(format_tick(0.0), "0");
    }

    #[test]
    fn test_y_key_points_span_axis() {
        assert_eq!(Y_KEY_POINTS.first(), Some(&Y_MIN));
        assert_eq!(Y_KEY_POINTS.last(), Some(&Y_MAX));
        assert!(Y_KEY_POINTS.windows(2).all(|w| w[0] < w[1]));
        let labels: Vec<String> = Y_KEY_POINTS.iter().map(|&y| format_tick(y)).collect();
        assert_eq!(labels[..3], ["0.1", "0.2", "0.5"]);
        assert_eq!(labels.last().map(String::as_str), Some("5000"));
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let png = plot_path(dir.path(), "unit");
        let cll: Vec<f64> = (0..200).map(|i| 50.0 + f64::from(i) * 4.0).collect();
        let fall: Vec<f64> = cll.iter().map(|v| v / 8.0).collect();
        let stats = LightStats::compute(&cll, &fall).unwrap();
        let subtitles = Subtitles {
            hdr1: "Mastering Display Color Primaries: Display P3".to_string(),
            hdr2: "Mastering Display Luminance: 0.0050/1000 nits".to_string(),
            dv1: String::new(),
            dv2: "No Dolby Vision".to_string(),
        };
        let labels = PlotLabels {
            title: "HDR grade: unit",
            subtitles: &subtitles,
            stats: &stats,
        };
        render(&png, &cll, &fall, &labels, (900, 360)).unwrap();
        let bytes = std::fs::read(&png).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_plot_path() {
        assert_eq!(
            plot_path(Path::new("."), "DEFAULT"),
            Path::new(".").join("HDRplot-DEFAULT.png")
        );
    }

    #[test]
    fn test_series_points_clamp_to_axis() {
        let pts: Vec<_> = series_points(&[0.0, 100.0, 20000.0]).collect();
        assert_eq!(pts, vec![(0.0, Y_MIN), (1.0, 100.0), (2.0, Y_MAX)]);
    }
}
