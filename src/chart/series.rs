use std::collections::{BTreeMap, BTreeSet};

use plotters::coord::Shift;
use plotters::prelude::*;

use super::Figure;
use super::marker::{MarkerShape, draw_marker};
use crate::color::generate_palette;
use crate::data::model::CellValue;
use crate::stats::QuestionSeries;

/// Share of the figure width given to the plot; the rest holds the legend.
const PLOT_FRACTION: f64 = 0.6;
const LEGEND_ROW_HEIGHT: i32 = 22;
const MARKER_SIZE: i32 = 5;

// ---------------------------------------------------------------------------
// Series line
// ---------------------------------------------------------------------------

/// One question's strength over time, as drawn on a series figure.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLine {
    pub label: String,
    /// `(year, strength)` in ascending year order; NaN marks a gap.
    pub points: Vec<(CellValue, f64)>,
    pub marker: MarkerShape,
}

// ---------------------------------------------------------------------------
// Series figure
// ---------------------------------------------------------------------------

/// Line-overlay figure that accumulates one line per question until saved.
#[derive(Debug, Clone)]
pub struct SeriesFigure {
    title: String,
    lines: Vec<SeriesLine>,
    size: (u32, u32),
}

impl Default for SeriesFigure {
    fn default() -> Self {
        Self {
            title: String::new(),
            lines: Vec::new(),
            size: (1400, 600),
        }
    }
}

impl SeriesFigure {
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Append a line for `series`. Years come out of the map already sorted.
    pub fn add_line(&mut self, series: &QuestionSeries, label: &str, marker: MarkerShape) {
        let points = series
            .iter()
            .map(|(year, agg)| (year.clone(), agg.strength))
            .collect();
        self.lines.push(SeriesLine {
            label: label.to_string(),
            points,
            marker,
        });
    }

    pub fn lines(&self) -> &[SeriesLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop every line and the title; the figure can be reused.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.title.clear();
    }

    /// Union of the years of every line, ascending. These are the x ticks.
    pub fn years(&self) -> Vec<CellValue> {
        let years: BTreeSet<&CellValue> = self
            .lines
            .iter()
            .flat_map(|line| line.points.iter().map(|(year, _)| year))
            .collect();
        years.into_iter().cloned().collect()
    }

    /// Finite strength range across all lines, padded; `0..1` when empty.
    fn value_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .lines
            .iter()
            .flat_map(|line| line.points.iter().map(|(_, v)| *v))
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !lo.is_finite() {
            return (0.0, 1.0);
        }
        let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
        (lo - pad, hi + pad)
    }
}

/// Split a line into runs of consecutive finite points so missing years
/// show as gaps instead of being bridged.
pub fn finite_runs(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in points {
        if y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Year tick text for an x position; blank between integer positions.
pub(crate) fn tick_label(years: &[CellValue], x: f64) -> String {
    let pos = x.round();
    if (x - pos).abs() > 1e-6 || pos < 0.0 {
        return String::new();
    }
    years
        .get(pos as usize)
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl Figure for SeriesFigure {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;
        let (width, _) = root.dim_in_pixel();
        let (plot_area, legend_area) =
            root.split_horizontally((width as f64 * PLOT_FRACTION) as i32);

        let years = self.years();
        let slots = years.len().max(1);
        let x_of: BTreeMap<&CellValue, f64> = years
            .iter()
            .enumerate()
            .map(|(i, year)| (year, i as f64))
            .collect();
        let (y_min, y_max) = self.value_range();

        let mut builder = ChartBuilder::on(&plot_area);
        builder
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55);
        if !self.title.is_empty() {
            builder.caption(&self.title, ("sans-serif", 24));
        }
        let mut chart =
            builder.build_cartesian_2d(-0.5f64..(slots as f64 - 0.5), y_min..y_max)?;

        let format_tick = |x: &f64| tick_label(&years, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slots + 1)
            .x_label_formatter(&format_tick)
            .x_desc("Time")
            .y_desc("Strength")
            .draw()?;

        let palette = generate_palette(self.lines.len());
        for (line, &color) in self.lines.iter().zip(palette.iter()) {
            let points: Vec<(f64, f64)> = line
                .points
                .iter()
                .filter_map(|(year, v)| x_of.get(year).map(|&x| (x, *v)))
                .collect();
            for run in finite_runs(&points) {
                chart.draw_series(LineSeries::new(run, color.stroke_width(2)))?;
            }
            for &(x, y) in points.iter().filter(|(_, y)| y.is_finite()) {
                draw_marker(root, chart.backend_coord(&(x, y)), line.marker, color, MARKER_SIZE)?;
            }
        }

        // Legend sits right of the plot, vertically centred.
        let (lx, ly) = legend_area.get_base_pixel();
        let (_, lh) = legend_area.dim_in_pixel();
        let rows = self.lines.len() as i32;
        let top = ly + lh as i32 / 2 - rows * LEGEND_ROW_HEIGHT / 2;
        for (i, (line, &color)) in self.lines.iter().zip(palette.iter()).enumerate() {
            let y = top + i as i32 * LEGEND_ROW_HEIGHT + LEGEND_ROW_HEIGHT / 2;
            root.draw(&PathElement::new(
                vec![(lx + 10, y), (lx + 40, y)],
                color.stroke_width(2),
            ))?;
            draw_marker(root, (lx + 25, y), line.marker, color, MARKER_SIZE)?;
            root.draw(&Text::new(
                line.label.clone(),
                (lx + 50, y - 8),
                ("sans-serif", 15).into_font(),
            ))?;
        }
        if rows > 0 {
            let right = lx + 42 + legend_width(&self.lines);
            let bottom = top + rows * LEGEND_ROW_HEIGHT + 4;
            root.draw(&Rectangle::new(
                [(lx + 2, top - 4), (right, bottom)],
                BLACK.mix(0.3).stroke_width(1),
            ))?;
        }
        Ok(())
    }
}

/// Rough pixel width of the longest legend label.
fn legend_width(lines: &[SeriesLine]) -> i32 {
    let longest = lines
        .iter()
        .map(|line| line.label.chars().count())
        .max()
        .unwrap_or(0);
    20 + longest as i32 * 8
}
