use plotters::coord::Shift;
use plotters::prelude::*;

// ---------------------------------------------------------------------------
// Marker shapes
// ---------------------------------------------------------------------------

/// Point marker drawn on every non-missing value of a series line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Cross,
    Point,
    Star,
    Square,
    Triangle,
    Diamond,
}

/// Order in which successive series lines pick their marker.
pub const MARKER_CYCLE: [MarkerShape; 6] = [
    MarkerShape::Cross,
    MarkerShape::Point,
    MarkerShape::Star,
    MarkerShape::Square,
    MarkerShape::Triangle,
    MarkerShape::Diamond,
];

/// Cursor into [`MARKER_CYCLE`]; wraps after the last shape.
#[derive(Debug, Clone, Default)]
pub struct MarkerCycle {
    cursor: usize,
}

impl MarkerCycle {
    pub fn next_shape(&mut self) -> MarkerShape {
        let shape = MARKER_CYCLE[self.cursor % MARKER_CYCLE.len()];
        self.cursor += 1;
        shape
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Draw `shape` centred on a pixel position of `area`.
pub fn draw_marker<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    at: (i32, i32),
    shape: MarkerShape,
    color: RGBColor,
    size: i32,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let s = size.max(2);
    let fill = color.filled();
    match shape {
        MarkerShape::Cross => {
            let stroke = color.stroke_width(2);
            area.draw(
                &(EmptyElement::at(at)
                    + PathElement::new(vec![(-s, -s), (s, s)], stroke)
                    + PathElement::new(vec![(-s, s), (s, -s)], stroke)),
            )
        }
        MarkerShape::Point => area.draw(&(EmptyElement::at(at) + Circle::new((0, 0), s / 2 + 1, fill))),
        MarkerShape::Star => area.draw(&(EmptyElement::at(at) + Polygon::new(star_points(s + 1), fill))),
        MarkerShape::Square => {
            let h = s - 1;
            area.draw(&(EmptyElement::at(at) + Rectangle::new([(-h, -h), (h, h)], fill)))
        }
        MarkerShape::Triangle => area.draw(
            &(EmptyElement::at(at) + Polygon::new(vec![(0, -s), (s, s - 1), (-s, s - 1)], fill)),
        ),
        MarkerShape::Diamond => area.draw(
            &(EmptyElement::at(at)
                + Polygon::new(vec![(0, -s - 1), (s - 1, 0), (0, s + 1), (-(s - 1), 0)], fill)),
        ),
    }
}

/// Five-pointed star, alternating outer and inner vertices.
fn star_points(radius: i32) -> Vec<(i32, i32)> {
    let outer = radius as f64;
    let inner = outer * 0.45;
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let angle = -std::f64::consts::FRAC_PI_2 + i as f64 * std::f64::consts::PI / 5.0;
            ((r * angle.cos()).round() as i32, (r * angle.sin()).round() as i32)
        })
        .collect()
}
