use std::path::Path;

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{Figure, ImageFormat, save_figure};
use super::series::tick_label;
use crate::color::generate_palette;
use crate::data::model::CellValue;
use crate::stats::QuestionSeries;

/// Fraction of a year slot covered by its bar group.
const GROUP_WIDTH: f64 = 0.8;
/// Space above the tallest bar, kept clear for the option legend.
const LEGEND_HEADROOM: f64 = 1.3;

// ---------------------------------------------------------------------------
// Share matrix
// ---------------------------------------------------------------------------

/// Year × option table of response shares.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareMatrix {
    pub years: Vec<CellValue>,
    pub options: Vec<i64>,
    /// `shares[year][option]`. NaN where the option was never given that
    /// year, and across the whole row when the year has no responses.
    pub shares: Vec<Vec<f64>>,
}

/// Row-normalize the option counts of each year.
///
/// A row's total is the sum of the counts present for the listed options,
/// so the finite shares of a non-empty row add up to one.
pub fn share_matrix(series: &QuestionSeries, options: &[i64]) -> ShareMatrix {
    let years: Vec<CellValue> = series.keys().cloned().collect();
    let shares: Vec<Vec<f64>> = series
        .values()
        .map(|agg| {
            let raw: Vec<f64> = options
                .iter()
                .map(|opt| agg.counts.get(opt).map_or(f64::NAN, |&n| n as f64))
                .collect();
            let total: f64 = raw.iter().filter(|v| !v.is_nan()).sum();
            if total > 0.0 {
                raw.into_iter().map(|v| v / total).collect()
            } else {
                vec![f64::NAN; options.len()]
            }
        })
        .collect();
    ShareMatrix {
        years,
        options: options.to_vec(),
        shares,
    }
}

// ---------------------------------------------------------------------------
// Bar figure
// ---------------------------------------------------------------------------

/// Grouped bar chart of option shares per year, one figure per question.
#[derive(Debug, Clone)]
pub struct BarFigure {
    pub title: String,
    pub matrix: ShareMatrix,
    size: (u32, u32),
}

/// Build a fresh bar figure for one question. Nothing carries over between
/// calls.
pub fn render_bar(series: &QuestionSeries, options: &[i64], title: &str) -> BarFigure {
    BarFigure {
        title: title.to_string(),
        matrix: share_matrix(series, options),
        size: (1200, 600),
    }
}

impl BarFigure {
    pub fn save(&self, path: &Path, format: ImageFormat) -> Result<()> {
        save_figure(self, path, format)
    }

    /// Upper end of the share axis: the tallest bar plus legend headroom.
    fn y_max(&self) -> f64 {
        let top = self
            .matrix
            .shares
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        if top > 0.0 {
            top * LEGEND_HEADROOM
        } else {
            1.0
        }
    }

    /// `[x0, x1]` of bar `option_idx` inside the group of `year_idx`.
    fn bar_span(&self, year_idx: usize, option_idx: usize) -> (f64, f64) {
        let width = GROUP_WIDTH / self.matrix.options.len().max(1) as f64;
        let x0 = year_idx as f64 - GROUP_WIDTH / 2.0 + option_idx as f64 * width;
        (x0, x0 + width)
    }
}

impl Figure for BarFigure {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;

        let matrix = &self.matrix;
        let slots = matrix.years.len().max(1);
        let y_max = self.y_max();

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(-0.5f64..(slots as f64 - 0.5), 0f64..y_max)?;

        let format_tick = |x: &f64| tick_label(&matrix.years, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slots + 1)
            .x_label_formatter(&format_tick)
            .x_desc("Year")
            .y_desc("Share")
            .draw()?;

        let palette = generate_palette(matrix.options.len());
        for (j, (option, &color)) in matrix.options.iter().zip(palette.iter()).enumerate() {
            let bars = matrix
                .shares
                .iter()
                .enumerate()
                .filter(|(_, row)| row[j].is_finite())
                .map(|(i, row)| {
                    let (x0, x1) = self.bar_span(i, j);
                    Rectangle::new([(x0, 0.0), (x1, row[j])], color.filled())
                });
            chart
                .draw_series(bars)?
                .label(option.to_string())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{OptionCounts, YearAggregate};

    fn series(rows: &[(i64, &[(i64, u64)])]) -> QuestionSeries {
        rows.iter()
            .map(|&(year, counts)| {
                let year = CellValue::Integer(year);
                let agg = YearAggregate {
                    year: year.clone(),
                    counts: counts.iter().copied().collect::<OptionCounts>(),
                    average: f64::NAN,
                    strength: f64::NAN,
                };
                (year, agg)
            })
            .collect()
    }

    #[test]
    fn test_rows_sum_to_one() {
        let s = series(&[
            (1990, &[(1, 10), (2, 20), (3, 5), (4, 5), (-2, 7)]),
            (1995, &[(1, 3), (4, 1)]),
        ]);
        let matrix = share_matrix(&s, &[1, 2, 3, 4]);
        for row in &matrix.shares {
            let sum: f64 = row.iter().filter(|v| v.is_finite()).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        assert_eq!(matrix.shares[0][0], 0.25);
        assert!(matrix.shares[1][1].is_nan());
        assert_eq!(matrix.shares[1][0], 0.75);
    }

    #[test]
    fn test_zero_total_row_is_nan() {
        let s = series(&[(1982, &[]), (1990, &[(-1, 4)]), (1995, &[(0, 2)])]);
        let matrix = share_matrix(&s, &[0, 1]);
        assert!(matrix.shares[0].iter().all(|v| v.is_nan()));
        assert!(matrix.shares[1].iter().all(|v| v.is_nan()));
        assert_eq!(matrix.shares[2][0], 1.0);
        assert!(matrix.shares[2][1].is_nan());
    }

    #[test]
    fn test_matrix_years_sorted() {
        let s = series(&[(2006, &[(1, 1)]), (1982, &[(1, 1)])]);
        let matrix = share_matrix(&s, &[1]);
        assert_eq!(matrix.years, vec![CellValue::Integer(1982), CellValue::Integer(2006)]);
    }

    #[test]
    fn test_render_bar_is_fresh() {
        let s = series(&[(1990, &[(1, 1), (2, 3)])]);
        let first = render_bar(&s, &[1, 2], "Confidence: The Press");
        let second = render_bar(&s, &[1, 2, 3, 4], "Confidence: Television");
        assert_eq!(first.matrix.options, vec![1, 2]);
        assert_eq!(second.matrix.options, vec![1, 2, 3, 4]);
        assert_eq!(second.title, "Confidence: Television");
    }

    #[test]
    fn test_bar_spans_stay_inside_group() {
        let s = series(&[(1990, &[(1, 1)]), (1995, &[(1, 1)])]);
        let figure = render_bar(&s, &[1, 2, 3, 4], "t");
        let (x0, _) = figure.bar_span(1, 0);
        let (_, x1) = figure.bar_span(1, 3);
        assert!((x0 - 0.6).abs() < 1e-9);
        assert!((x1 - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_y_axis_leaves_room_for_legend() {
        let s = series(&[(1990, &[(1, 9), (2, 1)])]);
        let figure = render_bar(&s, &[1, 2], "t");
        assert!((figure.y_max() - 0.9 * LEGEND_HEADROOM).abs() < 1e-9);

        let unanimous = render_bar(&series(&[(1990, &[(1, 5)])]), &[1, 2], "t");
        assert!(unanimous.y_max() > 1.0);

        let empty = render_bar(&series(&[(1990, &[])]), &[1, 2], "t");
        assert_eq!(empty.y_max(), 1.0);
    }
}
