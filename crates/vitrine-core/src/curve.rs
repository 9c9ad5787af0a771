//! Catmull-Rom curves through tube control points
//!
//! The curve interpolates every control point. Open curves extrapolate one
//! phantom point past each end by reflecting the neighbouring point, so the
//! first and last segments have a tangent to work with.
//!
//! Sampling is uniform in the curve parameter `t`, not in arc length, and
//! the tube mesh uses [`segments_for`] samples per control point.

use serde::{Deserialize, Serialize};

use crate::transform::Vec3;

/// Tension used by every tube in the editor
pub const DEFAULT_TENSION: f64 = 0.0001;

/// Tubular segments generated per control point
pub const SEGMENTS_PER_POINT: u32 = 10;

/// Number of tubular segments for a tube with `points` control points
pub fn segments_for(points: usize) -> u32 {
    points as u32 * SEGMENTS_PER_POINT
}

/// How segment tangents are derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CurveKind {
    /// Uniform parameterization scaled by `tension`
    CatmullRom { tension: f64 },
    /// Knot spacing by distance^0.5
    Centripetal,
    /// Knot spacing by distance
    Chordal,
}

impl Default for CurveKind {
    fn default() -> Self {
        CurveKind::CatmullRom {
            tension: DEFAULT_TENSION,
        }
    }
}

/// Hermite cubic `c0 + c1 t + c2 t² + c3 t³`
#[derive(Debug, Clone, Copy, Default)]
struct CubicPoly {
    c0: f64,
    c1: f64,
    c2: f64,
    c3: f64,
}

impl CubicPoly {
    fn hermite(x0: f64, x1: f64, t0: f64, t1: f64) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    fn uniform(x0: f64, x1: f64, x2: f64, x3: f64, tension: f64) -> Self {
        Self::hermite(x1, x2, tension * (x2 - x0), tension * (x3 - x1))
    }

    fn nonuniform(x0: f64, x1: f64, x2: f64, x3: f64, dt0: f64, dt1: f64, dt2: f64) -> Self {
        let t1 = (x1 - x0) / dt0 - (x2 - x0) / (dt0 + dt1) + (x2 - x1) / dt1;
        let t2 = (x2 - x1) / dt1 - (x3 - x1) / (dt1 + dt2) + (x3 - x2) / dt2;
        Self::hermite(x1, x2, t1 * dt1, t2 * dt1)
    }

    fn calc(&self, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        self.c0 + self.c1 * t + self.c2 * t2 + self.c3 * t3
    }
}

/// A Catmull-Rom curve through an ordered list of points
#[derive(Debug, Clone, PartialEq)]
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    closed: bool,
    kind: CurveKind,
}

impl CatmullRomCurve {
    pub fn new(points: Vec<Vec3>, closed: bool, kind: CurveKind) -> Self {
        Self {
            points,
            closed,
            kind,
        }
    }

    /// The curve used for tubes: open or closed, default tension
    pub fn for_tube(points: Vec<Vec3>, closed: bool) -> Self {
        Self::new(points, closed, CurveKind::default())
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Point at parameter `t` in [0, 1]
    pub fn point_at(&self, t: f64) -> Vec3 {
        let points = &self.points;
        let l = points.len();
        match l {
            0 => return Vec3::ZERO,
            1 => return points[0],
            _ => {}
        }

        let span = if self.closed { l } else { l - 1 };
        let p = span as f64 * t.clamp(0.0, 1.0);
        let mut int_point = p.floor() as usize;
        let mut weight = p - p.floor();

        if !self.closed && weight == 0.0 && int_point == l - 1 {
            int_point = l - 2;
            weight = 1.0;
        }

        let p0 = if self.closed || int_point > 0 {
            points[(int_point + l - 1) % l]
        } else {
            points[0] * 2.0 - points[1]
        };
        let p1 = points[int_point % l];
        let p2 = points[(int_point + 1) % l];
        let p3 = if self.closed || int_point + 2 < l {
            points[(int_point + 2) % l]
        } else {
            points[l - 1] * 2.0 - points[l - 2]
        };

        let (px, py, pz) = match self.kind {
            CurveKind::CatmullRom { tension } => (
                CubicPoly::uniform(p0.x, p1.x, p2.x, p3.x, tension),
                CubicPoly::uniform(p0.y, p1.y, p2.y, p3.y, tension),
                CubicPoly::uniform(p0.z, p1.z, p2.z, p3.z, tension),
            ),
            CurveKind::Centripetal | CurveKind::Chordal => {
                let pow = if self.kind == CurveKind::Chordal { 0.5 } else { 0.25 };
                let dist_sq = |a: Vec3, b: Vec3| {
                    let d = a - b;
                    d.x * d.x + d.y * d.y + d.z * d.z
                };
                let mut dt0 = dist_sq(p0, p1).powf(pow);
                let mut dt1 = dist_sq(p1, p2).powf(pow);
                let mut dt2 = dist_sq(p2, p3).powf(pow);

                // Coincident points
                if dt1 < 1e-4 {
                    dt1 = 1.0;
                }
                if dt0 < 1e-4 {
                    dt0 = dt1;
                }
                if dt2 < 1e-4 {
                    dt2 = dt1;
                }

                (
                    CubicPoly::nonuniform(p0.x, p1.x, p2.x, p3.x, dt0, dt1, dt2),
                    CubicPoly::nonuniform(p0.y, p1.y, p2.y, p3.y, dt0, dt1, dt2),
                    CubicPoly::nonuniform(p0.z, p1.z, p2.z, p3.z, dt0, dt1, dt2),
                )
            }
        };

        Vec3::new(px.calc(weight), py.calc(weight), pz.calc(weight))
    }

    /// `divisions + 1` points evenly spaced in `t`
    pub fn sample(&self, divisions: u32) -> Vec<Vec3> {
        let divisions = divisions.max(1);
        (0..=divisions)
            .map(|d| self.point_at(d as f64 / divisions as f64))
            .collect()
    }
}
