// THEORY:
// Minimal enclosing circle: the smallest circle containing every point of a
// contour. Its center is the ball estimate and its radius the apparent size.
//
// The fit is the incremental form of Welzl's algorithm. Points are visited in
// contour order with no shuffling, so identical contours always give identical
// circles.

use crate::core_modules::blob::Point;

/// Slack used when testing containment, in pixels.
const CONTAINMENT_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
}

impl Circle {
    fn from_one(a: (f64, f64)) -> Self {
        Self {
            center: a,
            radius: 0.0,
        }
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> Self {
        let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        Self {
            center,
            radius: distance(center, a),
        }
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Self {
        let (bx, by) = (b.0 - a.0, b.1 - a.1);
        let (cx, cy) = (c.0 - a.0, c.1 - a.1);
        let determinant = 2.0 * (bx * cy - by * cx);

        if determinant.abs() < CONTAINMENT_EPSILON {
            // Collinear: the circle on the two farthest points covers the third.
            let candidates = [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)];
            return candidates
                .into_iter()
                .fold(Self::from_one(a), |best, circle| {
                    if circle.radius > best.radius { circle } else { best }
                });
        }

        let b_norm = bx * bx + by * by;
        let c_norm = cx * cx + cy * cy;
        let ux = (cy * b_norm - by * c_norm) / determinant;
        let uy = (bx * c_norm - cx * b_norm) / determinant;
        let center = (a.0 + ux, a.1 + uy);
        Self {
            center,
            radius: (ux * ux + uy * uy).sqrt(),
        }
    }

    pub fn contains(&self, point: (f64, f64)) -> bool {
        distance(self.center, point) <= self.radius + CONTAINMENT_EPSILON
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Fits the smallest circle containing all `points`. `None` for an empty slice.
pub fn min_enclosing_circle(points: &[Point]) -> Option<Circle> {
    let points: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let first = *points.first()?;

    let mut circle = Circle::from_one(first);
    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = Circle::from_one(points[i]);
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = Circle::from_two(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(points[k]) {
                    circle = Circle::from_three(points[i], points[j], points[k]);
                }
            }
        }
    }

    Some(circle)
}
