// THEORY:
// The `Blob` module holds the output of the Blob Extraction stage. A `Blob` is a
// single closed border found in the foreground mask of one frame: either the
// outer border of a connected region, or the border around a hole inside one.
//
// Key architectural principles:
// 1.  **Stateless Data Container**: A `Blob` describes one border in one frame. It
//     has no memory of earlier frames and is thrown away once the frame is done.
// 2.  **Boundary Representation**: The contour is the ordered, closed sequence of
//     boundary pixel coordinates. Every extreme point of the border lies on it,
//     which is all the enclosing-circle fit needs.
// 3.  **Two Notions of Area**: `pixel_count` is the number of pixels on or inside
//     the border, so a ring's outer border counts its hole too. `polygon_area` is
//     the shoelace area of the contour through pixel centers, the figure a contour
//     library reports (a 10x10 square gives 81).

/// A 2D pixel coordinate in ROI-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Which side of the foreground a border separates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Foreground inside, background outside.
    Outer,
    /// The border of a background hole enclosed by foreground.
    Hole,
}

/// A single closed border detected in a frame's mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Position of this blob in the frame's extraction order. Not persistent.
    pub id: u64,
    pub border: BorderKind,
    /// The closed boundary. The first point is not repeated at the end.
    pub contour: Vec<Point>,
    /// The number of pixels on or inside the contour.
    pub pixel_count: usize,
    /// Top-left and bottom-right contour pixels, inclusive.
    pub bounding_box: (Point, Point),
}

impl Blob {
    /// Shoelace area of the closed contour polygon.
    pub fn polygon_area(&self) -> f64 {
        let n = self.contour.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area = 0i64;
        for i in 0..n {
            let a = self.contour[i];
            let b = self.contour[(i + 1) % n];
            twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }
}
