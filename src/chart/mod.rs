/// Chart rendering: series overlays and per-question bar distributions.
///
/// ```text
///   QuestionSeries ──► Renderer::render_series ──► SeriesFigure (accumulates)
///                                                      │ save_series
///                                                      ▼
///                                              <out>/series/*.svg
///
///   QuestionSeries ──► render_bar ──► BarFigure ──► <out>/bar/*.svg
/// ```

pub mod bar;
pub mod marker;
pub mod series;

use std::path::Path;

use anyhow::{Context, Result, bail};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::stats::QuestionSeries;
use marker::MarkerCycle;
use series::SeriesFigure;

pub use bar::{BarFigure, render_bar};

// ---------------------------------------------------------------------------
// Output image format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ImageFormat {
    /// Scalable vector graphics (default)
    #[default]
    Svg,
    /// Raster PNG
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }

    /// Raster text needs real font files, which only the `ttf` build has.
    pub fn ensure_available(self) -> Result<()> {
        if self == ImageFormat::Png && !cfg!(feature = "ttf") {
            bail!("PNG output needs a build with the `ttf` feature; use --format svg");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Figure trait
// ---------------------------------------------------------------------------

/// Anything that can paint itself onto a plotters drawing area.
pub trait Figure {
    /// Canvas size in pixels.
    fn size(&self) -> (u32, u32);

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>>;
}

/// Render `figure` to `path` with the backend matching `format`.
pub fn save_figure<F: Figure>(figure: &F, path: &Path, format: ImageFormat) -> Result<()> {
    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, figure.size()).into_drawing_area();
            figure
                .draw(&root)
                .with_context(|| format!("drawing {}", path.display()))?;
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
        }
        ImageFormat::Png => {
            format.ensure_available()?;
            let root = BitMapBackend::new(path, figure.size()).into_drawing_area();
            figure
                .draw(&root)
                .with_context(|| format!("drawing {}", path.display()))?;
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }
    log::debug!("Wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Renderer context
// ---------------------------------------------------------------------------

/// Per-run rendering state: the marker cursor shared by every series line
/// and the series figure currently being accumulated.
///
/// Single-threaded by construction; the batch driver owns one and threads it
/// through every question group.
#[derive(Debug, Default)]
pub struct Renderer {
    format: ImageFormat,
    markers: MarkerCycle,
    active: SeriesFigure,
}

impl Renderer {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Title of the series figure currently being accumulated.
    pub fn set_series_title(&mut self, title: &str) {
        self.active.set_title(title);
    }

    /// Add one labeled strength line to the active series figure. The next
    /// marker shape in the cycle is used.
    pub fn render_series(&mut self, series: &QuestionSeries, label: &str) {
        let marker = self.markers.next_shape();
        self.active.add_line(series, label, marker);
    }

    pub fn active_series(&self) -> &SeriesFigure {
        &self.active
    }

    /// Write the accumulated series figure and start a new one. The marker
    /// cursor keeps its position.
    pub fn save_series(&mut self, path: &Path) -> Result<()> {
        if self.active.is_empty() {
            log::warn!("Series figure for {} has no lines", path.display());
        }
        save_figure(&self.active, path, self.format)?;
        self.active.clear();
        Ok(())
    }

    /// Discard the accumulated series figure without writing it.
    pub fn clear_series(&mut self) {
        self.active.clear();
    }

    /// Write a bar figure in the renderer's format.
    pub fn save_bar(&self, figure: &BarFigure, path: &Path) -> Result<()> {
        figure.save(path, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;
    use crate::stats::YearAggregate;
    use marker::MarkerShape;

    fn flat_series(strength: f64) -> QuestionSeries {
        [1990, 1995]
            .into_iter()
            .map(|year| {
                let year = CellValue::Integer(year);
                let agg = YearAggregate {
                    year: year.clone(),
                    counts: Default::default(),
                    average: strength,
                    strength,
                };
                (year, agg)
            })
            .collect()
    }

    #[test]
    fn test_eight_lines_reuse_first_markers() {
        let mut renderer = Renderer::new(ImageFormat::Svg);
        for i in 0..8 {
            renderer.render_series(&flat_series(i as f64), &format!("line {i}"));
        }
        let lines = renderer.active_series().lines();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[6].marker, lines[0].marker);
        assert_eq!(lines[7].marker, lines[1].marker);
        assert_ne!(lines[6].marker, lines[5].marker);
    }

    #[test]
    fn test_marker_cursor_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(ImageFormat::Svg);
        renderer.render_series(&flat_series(1.0), "a");
        renderer.render_series(&flat_series(2.0), "b");
        renderer.save_series(&dir.path().join("first.svg")).unwrap();
        assert!(renderer.active_series().is_empty());

        renderer.render_series(&flat_series(3.0), "c");
        assert_eq!(renderer.active_series().lines()[0].marker, MarkerShape::Star);
    }

    #[test]
    fn test_save_series_writes_svg_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neighbours_series.svg");
        let mut renderer = Renderer::new(ImageFormat::Svg);
        renderer.set_series_title("Neighbours");
        renderer.render_series(&flat_series(0.2), "Neighbours: Heavy drinkers");
        renderer.render_series(&flat_series(f64::NAN), "Neighbours: Muslims");
        renderer.save_series(&path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Neighbours: Heavy drinkers"));
        assert!(svg.contains("Neighbours: Muslims"));
        assert!(svg.contains("1995"));
    }

    /// Point counts of every `<polyline>` with at least three vertices.
    /// Markers and legend swatches are two-point paths, so these are the data
    /// runs.
    fn long_polylines(svg: &str) -> Vec<usize> {
        svg.split("<polyline")
            .skip(1)
            .filter_map(|element| {
                let points = element.split("points=\"").nth(1)?.split('"').next()?;
                Some(points.split_whitespace().count())
            })
            .filter(|&n| n >= 3)
            .collect()
    }

    #[test]
    fn test_missing_year_splits_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confidence_series.svg");
        let strengths = [1.0, 1.5, 2.0, f64::NAN, 3.0, 2.5, 2.0];
        let series: QuestionSeries = [1982, 1990, 1995, 1999, 2006, 2011, 2017]
            .into_iter()
            .zip(strengths)
            .map(|(year, strength)| {
                let year = CellValue::Integer(year);
                let agg = YearAggregate {
                    year: year.clone(),
                    counts: Default::default(),
                    average: strength,
                    strength,
                };
                (year, agg)
            })
            .collect();

        let mut renderer = Renderer::new(ImageFormat::Svg);
        renderer.render_series(&series, "Confidence: Churches");
        renderer.save_series(&path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert_eq!(long_polylines(&svg), vec![3, 3]);
    }

    #[test]
    fn test_save_bar_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confidence_the_press_bar.svg");
        let renderer = Renderer::new(ImageFormat::Svg);
        let figure = render_bar(&flat_series(1.0), &[1, 2, 3, 4], "Confidence: The Press");
        renderer.save_bar(&figure, &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Confidence: The Press"));
    }

    #[test]
    fn test_clear_series_discards_lines() {
        let mut renderer = Renderer::new(ImageFormat::Svg);
        renderer.render_series(&flat_series(1.0), "a");
        renderer.clear_series();
        assert!(renderer.active_series().is_empty());
        renderer.render_series(&flat_series(1.0), "b");
        assert_eq!(renderer.active_series().lines()[0].marker, MarkerShape::Point);
    }

    #[cfg(not(feature = "ttf"))]
    #[test]
    fn test_png_needs_ttf_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importance_series.png");
        let mut renderer = Renderer::new(ImageFormat::Png);
        renderer.render_series(&flat_series(1.0), "a");
        let err = renderer.save_series(&path).unwrap_err();
        assert!(err.to_string().contains("ttf"));
        assert!(!path.exists());
    }

    #[cfg(feature = "ttf")]
    #[test]
    fn test_png_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importance_series.png");
        let mut renderer = Renderer::new(ImageFormat::Png);
        renderer.render_series(&flat_series(1.0), "a");
        renderer.save_series(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
