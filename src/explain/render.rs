//! Beeswarm-style summary plot written as a PNG.
//!
//! One horizontal band per feature (most important on top); each dot is a
//! row placed at its attribution and colored by the feature's value, blue
//! (low) to red (high). Vertical jitter is derived from the row index so the
//! image is reproducible.

use std::path::Path;

use plotters::prelude::*;
use tracing::debug;

use crate::error::AppError;
use crate::explain::attribution::Attributions;
use crate::explain::summary::ExplanationSummary;
use crate::io::export::ensure_parent_dir;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub top_n: usize,
    pub width: u32,
    pub height: u32,
    /// Upper bound on plotted rows per feature; larger inputs are strided.
    pub max_points: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            top_n: 20,
            width: 1000,
            height: 800,
            max_points: 3000,
        }
    }
}

/// Render the plot to `path` (written to a sibling temp file, then renamed).
pub fn render_summary_png(
    path: &Path,
    summary: &ExplanationSummary,
    attributions: &Attributions,
    opts: &RenderOptions,
) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "summary.png".to_string());
    // The bitmap encoder picks the format from the extension, so keep `.png`.
    let tmp = path.with_file_name(format!(".{file_name}.tmp.png"));

    draw(&tmp, summary, attributions, opts).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        AppError::io(format!("Failed to render '{}': {e}", path.display()))
    })?;

    std::fs::rename(&tmp, path)
        .map_err(|e| AppError::io(format!("Failed to move plot into '{}': {e}", path.display())))?;
    debug!(path = %path.display(), "summary plot written");
    Ok(())
}

fn draw(
    path: &Path,
    summary: &ExplanationSummary,
    attributions: &Attributions,
    opts: &RenderOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let top = summary.top(opts.top_n);
    let k = top.len().max(1);
    let stride = attributions.n_rows().div_ceil(opts.max_points.max(1)).max(1);

    let mut x_min: f64 = 0.0;
    let mut x_max: f64 = 0.0;
    let bands: Vec<(usize, Vec<f64>, Vec<f64>)> = top
        .iter()
        .filter_map(|f| attributions.columns.iter().position(|c| *c == f.feature))
        .map(|j| {
            let phi: Vec<f64> = attributions.phi_column(j).into_iter().step_by(stride).collect();
            let values: Vec<f64> = attributions.value_column(j).into_iter().step_by(stride).collect();
            (j, phi, values)
        })
        .collect();
    for (_, phi, _) in &bands {
        for &v in phi {
            x_min = x_min.min(v);
            x_max = x_max.max(v);
        }
    }
    let pad = ((x_max - x_min) * 0.05).max(1e-6);
    let (x0, x1) = (x_min - pad, x_max + pad);

    let names: Vec<String> = top.iter().map(|f| f.feature.clone()).collect();

    let root = BitMapBackend::new(path, (opts.width, opts.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature attributions", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(230)
        .build_cartesian_2d(x0..x1, -0.5..(k as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(k)
        .y_label_formatter(&|y| {
            let slot = y.round();
            if (y - slot).abs() > 1e-6 || slot < 0.0 {
                return String::new();
            }
            // Band 0 is drawn at the top.
            let rank = k as isize - 1 - slot as isize;
            usize::try_from(rank)
                .ok()
                .and_then(|r| names.get(r))
                .cloned()
                .unwrap_or_default()
        })
        .x_desc(format!("attribution ({})", summary.units.label()))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        [(0.0, -0.5), (0.0, k as f64 - 0.5)],
        &BLACK.mix(0.4),
    ))?;

    for (rank, (_, phi, values)) in bands.iter().enumerate() {
        let y_center = (k - 1 - rank) as f64;
        let (lo, hi) = min_max(values);
        let span = hi - lo;
        chart.draw_series(phi.iter().zip(values).enumerate().map(|(i, (&x, &v))| {
            let t = if span > 0.0 { (v - lo) / span } else { 0.5 };
            let y = y_center + jitter(i) * 0.6;
            Circle::new((x, y), 2, value_color(t).filled())
        }))?;
    }

    root.present()?;
    Ok(())
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Deterministic offset in [-0.5, 0.5).
fn jitter(i: usize) -> f64 {
    let h = (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 40;
    (h % 1000) as f64 / 1000.0 - 0.5
}

/// Blue for low values, red for high.
fn value_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    RGBColor((30.0 + 225.0 * t) as u8, 60, (255.0 - 225.0 * t) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_is_bounded_and_repeatable() {
        for i in 0..500 {
            let j = jitter(i);
            assert!((-0.5..0.5).contains(&j));
            assert_eq!(j, jitter(i));
        }
    }

    #[test]
    fn color_ramp_endpoints() {
        assert_eq!(value_color(0.0), RGBColor(30, 60, 255));
        assert_eq!(value_color(1.0), RGBColor(255, 60, 30));
        assert_eq!(value_color(7.0), value_color(1.0));
    }
}
