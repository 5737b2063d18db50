//! Plotters-powered feature-importance chart for Ratatui.
//!
//! Bars are mean |attribution| per feature, largest on top, colored by the
//! direction the feature pushes churn risk. Output goes into the Ratatui
//! buffer through `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::explain::{Direction, FeatureImportance};

const RAISES: RGBColor = RGBColor(255, 80, 80);
const LOWERS: RGBColor = RGBColor(80, 160, 255);
const MIXED: RGBColor = RGBColor(200, 200, 200);

/// Render-only description of the bar chart; `features` is already ranked.
pub struct ImportanceChart<'a> {
    pub features: &'a [FeatureImportance],
    /// Unit label for the x axis.
    pub x_label: &'a str,
    /// Width of the feature-name tick labels, in characters.
    pub name_width: usize,
}

impl<'a> Widget for ImportanceChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 30 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }
        let k = self.features.len();
        if k == 0 {
            return;
        }

        let x_max = bar_extent(self.features);
        let y_max = k as f64 - 0.5;
        let names: Vec<String> = self
            .features
            .iter()
            .map(|f| crate::report::truncate(&f.feature, self.name_width))
            .collect();
        let name_cells = (self.name_width as u32 + 2).min(u32::from(area.width) / 2);

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, name_cells)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(0.0..x_max, -0.5..y_max)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .x_labels(4)
                .y_labels(k)
                .x_label_formatter(&|v| format!("{v:.3}"))
                .y_label_formatter(&|v| slot_name(&names, *v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            chart.draw_series(self.features.iter().enumerate().map(|(i, f)| {
                let y = slot_y(k, i);
                Rectangle::new(
                    [(0.0, y - 0.3), (f.mean_abs, y + 0.3)],
                    direction_color(f.direction).filled(),
                )
            }))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Vertical position of the i-th ranked feature; rank 0 sits on top.
fn slot_y(k: usize, i: usize) -> f64 {
    (k - 1 - i) as f64
}

/// Tick label for a y value: the feature on that slot, blank between slots.
fn slot_name(names: &[String], y: f64) -> String {
    let slot = y.round();
    if (y - slot).abs() > 0.05 || slot < 0.0 {
        return String::new();
    }
    let k = names.len();
    let from_top = k as f64 - 1.0 - slot;
    if from_top < 0.0 {
        return String::new();
    }
    names.get(from_top as usize).cloned().unwrap_or_default()
}

fn bar_extent(features: &[FeatureImportance]) -> f64 {
    let max = features.iter().map(|f| f.mean_abs).fold(0.0_f64, f64::max);
    if max.is_finite() && max > 0.0 { max * 1.05 } else { 1.0 }
}

fn direction_color(direction: Direction) -> RGBColor {
    match direction {
        Direction::HigherRaisesRisk => RAISES,
        Direction::HigherLowersRisk => LOWERS,
        Direction::Mixed => MIXED,
    }
}
