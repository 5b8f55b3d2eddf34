use crate::types::Point;

// Components smaller than this are treated as exactly zero so axis-aligned
// headings never drift across a cell boundary.
const HEADING_EPSILON: f64 = 1e-9;

/// Linear interpolation between two f64 values
pub fn lerp(start: f64, end: f64, alpha: f64) -> f64 {
    start + (end - start) * alpha
}

/// Linear interpolation between two Point values
pub fn lerp_point(start: Point, end: Point, alpha: f64) -> Point {
    Point {
        x: lerp(start.x, end.x, alpha),
        y: lerp(start.y, end.y, alpha),
    }
}

/// Wraps any angle in degrees into [0, 360)
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed shortest rotation from `from` to `to`, in (-180, 180]
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    let mut diff = normalize_angle(to) - normalize_angle(from);
    if diff > 180.0 {
        diff -= 360.0;
    }
    if diff <= -180.0 {
        diff += 360.0;
    }
    diff
}

/// Absolute angular error between two headings, in [0, 180]
pub fn angle_difference(a: f64, b: f64) -> f64 {
    shortest_angle_delta(a, b).abs()
}

/// Unit vector for a heading in degrees (0 = east, 90 = south in screen space)
pub fn heading_vector(degrees: f64) -> (f64, f64) {
    let rad = degrees.to_radians();
    let snap = |v: f64| if v.abs() < HEADING_EPSILON { 0.0 } else { v };
    (snap(rad.cos()), snap(rad.sin()))
}

/// Heading in degrees [0, 360) from one point towards another
pub fn angle_between(from: Point, to: Point) -> f64 {
    normalize_angle((to.y - from.y).atan2(to.x - from.x).to_degrees())
}
