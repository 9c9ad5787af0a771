//! Tube control-point editing
//!
//! A tube is edited through its control points ("tube boxes"). Solid points
//! sit on the path at integer indices `0..N`; between each adjacent pair sits
//! a dotted point at index `i - 0.5`, always at the midpoint of its two solid
//! neighbours. Dragging a dotted point promotes it to a solid point, which
//! splits the segment and spawns two new dotted midpoints.
//!
//! Indices live on a half-integer grid and are stored doubled so comparisons
//! stay exact.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::curve::{segments_for, CatmullRomCurve, CurveKind};
use crate::record::TubeParams;
use crate::transform::Vec3;

/// Tolerance for the midpoint invariant
const MIDPOINT_EPSILON: f64 = 1e-9;

#[derive(Error, Debug, PartialEq)]
pub enum TubeError {
    #[error("Tube needs at least 2 control points, got {0}")]
    TooFewPoints(usize),
    #[error("No control point at index {0}")]
    NoSuchPoint(PointIndex),
    #[error("Control point {0} is not dotted")]
    NotDotted(PointIndex),
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Whether a control point lies on the path or marks a segment midpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Solid,
    Dotted,
}

/// Display style of a control point marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub color: &'static str,
    pub opacity: f64,
}

pub const SOLID_STYLE: PointStyle = PointStyle {
    color: "#00FF00",
    opacity: 0.8,
};

pub const DOTTED_STYLE: PointStyle = PointStyle {
    color: "#0000FF",
    opacity: 0.5,
};

/// Control point index on the half-integer grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointIndex(i64);

impl PointIndex {
    /// Index of the `i`th solid point
    pub fn solid(i: usize) -> Self {
        Self(2 * i as i64)
    }

    /// Index of the dotted point between solid `i - 1` and solid `i`
    pub fn dotted_before(i: usize) -> Self {
        Self(2 * i as i64 - 1)
    }

    /// From a displayed index such as `2` or `1.5`
    pub fn from_f64(value: f64) -> Option<Self> {
        let doubled = value * 2.0;
        if doubled.is_finite() && doubled.fract() == 0.0 {
            Some(Self(doubled as i64))
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 2.0
    }

    pub fn is_whole(self) -> bool {
        self.0 % 2 == 0
    }

    /// Position in the solid path, for whole indices
    pub fn solid_position(self) -> Option<usize> {
        if self.is_whole() && self.0 >= 0 {
            Some((self.0 / 2) as usize)
        } else {
            None
        }
    }

    /// Where this point ends up after the dotted point `promoted` is
    /// promoted
    pub fn after_promotion(self, promoted: PointIndex) -> Self {
        if self == promoted {
            promoted.floor().shifted(2)
        } else if self > promoted {
            self.shifted(2)
        } else {
            self
        }
    }

    fn shifted(self, halves: i64) -> Self {
        Self(self.0 + halves)
    }

    fn floor(self) -> Self {
        Self(self.0.div_euclid(2) * 2)
    }
}

impl fmt::Display for PointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

/// A control point marker, positioned in the tube's local space
#[derive(Debug, Clone, PartialEq)]
pub struct TubeBox {
    pub kind: PointKind,
    pub index: PointIndex,
    pub position: Vec3,
}

impl TubeBox {
    pub fn style(&self) -> PointStyle {
        match self.kind {
            PointKind::Solid => SOLID_STYLE,
            PointKind::Dotted => DOTTED_STYLE,
        }
    }
}

/// Parameters for regenerating the tube mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TubeGeometry {
    /// Curve samples, `tubular_segments + 1` of them
    pub centerline: Vec<Vec3>,
    pub tubular_segments: u32,
    pub radius: f64,
    pub radial_segments: u32,
    pub closed: bool,
}

/// Editable tube: control points plus the curve fitted through them
#[derive(Debug, Clone, PartialEq)]
pub struct TubeEditor {
    boxes: Vec<TubeBox>,
    radius: f64,
    radial_segments: u32,
    closed: bool,
    kind: CurveKind,
    curve: CatmullRomCurve,
}

impl TubeEditor {
    /// Build control points from a stored path and fit the curve
    pub fn from_params(params: &TubeParams) -> Result<Self, TubeError> {
        Self::with_curve_kind(params, CurveKind::default())
    }

    pub fn with_curve_kind(params: &TubeParams, kind: CurveKind) -> Result<Self, TubeError> {
        let path = &params.path;
        if path.len() < 2 {
            return Err(TubeError::TooFewPoints(path.len()));
        }

        let mut boxes = Vec::with_capacity(path.len() * 2 - 1);
        for (i, p) in path.iter().enumerate() {
            boxes.push(TubeBox {
                kind: PointKind::Solid,
                index: PointIndex::solid(i),
                position: *p,
            });
        }
        for i in 1..path.len() {
            boxes.push(TubeBox {
                kind: PointKind::Dotted,
                index: PointIndex::dotted_before(i),
                position: path[i - 1].midpoint(path[i]),
            });
        }

        Ok(Self {
            boxes,
            radius: params.radius,
            radial_segments: params.radial_segments,
            closed: params.closed,
            kind,
            curve: CatmullRomCurve::new(path.clone(), params.closed, kind),
        })
    }

    pub fn boxes(&self) -> &[TubeBox] {
        &self.boxes
    }

    pub fn get(&self, index: PointIndex) -> Option<&TubeBox> {
        self.boxes.iter().find(|b| b.index == index)
    }

    fn get_mut(&mut self, index: PointIndex) -> Option<&mut TubeBox> {
        self.boxes.iter_mut().find(|b| b.index == index)
    }

    fn position_of(&self, index: PointIndex) -> Result<Vec3, TubeError> {
        self.get(index)
            .map(|b| b.position)
            .ok_or(TubeError::NoSuchPoint(index))
    }

    pub fn solid_count(&self) -> usize {
        self.boxes
            .iter()
            .filter(|b| b.kind == PointKind::Solid)
            .count()
    }

    pub fn dotted_count(&self) -> usize {
        self.boxes.len() - self.solid_count()
    }

    /// Solid point positions in index order
    pub fn path(&self) -> Vec<Vec3> {
        (0..self.solid_count())
            .filter_map(|i| self.get(PointIndex::solid(i)).map(|b| b.position))
            .collect()
    }

    pub fn curve(&self) -> &CatmullRomCurve {
        &self.curve
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Radius of the control point markers
    pub fn box_radius(&self) -> f64 {
        self.radius * 1.2
    }

    pub fn geometry(&self) -> TubeGeometry {
        let tubular_segments = segments_for(self.curve.points().len());
        TubeGeometry {
            centerline: self.curve.sample(tubular_segments),
            tubular_segments,
            radius: self.radius,
            radial_segments: self.radial_segments,
            closed: self.closed,
        }
    }

    /// Geometry parameters to persist
    pub fn to_params(&self) -> TubeParams {
        let path = self.path();
        TubeParams {
            tubular_segments: segments_for(path.len()),
            path,
            radius: self.radius,
            radial_segments: self.radial_segments,
            closed: self.closed,
        }
    }

    /// Turn the dotted point at `index` into a solid point.
    ///
    /// Every point after it shifts up by one, the promoted point takes the
    /// next whole index, two new dotted midpoints are inserted on either side
    /// and the curve is refit. Returns the new solid index.
    pub fn promote(&mut self, index: PointIndex) -> Result<PointIndex, TubeError> {
        let cur = self.get(index).ok_or(TubeError::NoSuchPoint(index))?;
        if cur.kind != PointKind::Dotted {
            return Err(TubeError::NotDotted(index));
        }
        let position = cur.position;

        for b in self.boxes.iter_mut().filter(|b| b.index > index) {
            b.index = b.index.shifted(2);
        }

        let new_index = index.floor().shifted(2);
        if let Some(cur) = self.get_mut(index) {
            cur.kind = PointKind::Solid;
            cur.index = new_index;
        }

        let before = self.position_of(new_index.shifted(-2))?;
        let after = self.position_of(new_index.shifted(2))?;
        self.boxes.push(TubeBox {
            kind: PointKind::Dotted,
            index: new_index.shifted(-1),
            position: position.midpoint(before),
        });
        self.boxes.push(TubeBox {
            kind: PointKind::Dotted,
            index: new_index.shifted(1),
            position: position.midpoint(after),
        });

        debug!(from = %index, to = %new_index, "Promoted tube control point");

        self.refit_around(new_index)?;
        Ok(new_index)
    }

    /// Move a control point. A dotted point is promoted at its new position
    /// first. Returns the point's index after the move.
    pub fn move_point(&mut self, index: PointIndex, position: Vec3) -> Result<PointIndex, TubeError> {
        let point = self.get_mut(index).ok_or(TubeError::NoSuchPoint(index))?;
        point.position = position;
        let kind = point.kind;

        match kind {
            PointKind::Dotted => self.promote(index),
            PointKind::Solid => {
                self.refit_around(index)?;
                Ok(index)
            }
        }
    }

    /// Re-attach the dotted neighbours of a solid point and refit the curve
    fn refit_around(&mut self, index: PointIndex) -> Result<(), TubeError> {
        let count = self.solid_count();
        let cur = self.position_of(index)?;
        let Some(pos) = index.solid_position() else {
            return Err(TubeError::Invariant(format!("{} is not a solid index", index)));
        };

        if pos > 0 {
            let neighbour = self.position_of(index.shifted(-2))?;
            if let Some(dotted) = self.get_mut(index.shifted(-1)) {
                dotted.position = cur.midpoint(neighbour);
            }
        }
        if pos + 1 < count {
            let neighbour = self.position_of(index.shifted(2))?;
            if let Some(dotted) = self.get_mut(index.shifted(1)) {
                dotted.position = cur.midpoint(neighbour);
            }
        }

        self.curve = CatmullRomCurve::new(self.path(), self.closed, self.kind);
        Ok(())
    }

    /// Verify the solid/dotted layout and the midpoint positions
    pub fn check_invariant(&self) -> Result<(), TubeError> {
        let solid = self.solid_count();
        let dotted = self.dotted_count();
        if solid < 2 {
            return Err(TubeError::TooFewPoints(solid));
        }
        if dotted != solid - 1 {
            return Err(TubeError::Invariant(format!(
                "{} solid points but {} dotted",
                solid, dotted
            )));
        }

        for i in 0..solid {
            let b = self
                .get(PointIndex::solid(i))
                .ok_or_else(|| TubeError::Invariant(format!("missing solid point {}", i)))?;
            if b.kind != PointKind::Solid {
                return Err(TubeError::Invariant(format!("point {} is not solid", i)));
            }
        }

        for i in 1..solid {
            let index = PointIndex::dotted_before(i);
            let b = self
                .get(index)
                .ok_or_else(|| TubeError::Invariant(format!("missing dotted point {}", index)))?;
            let expected = self
                .position_of(PointIndex::solid(i - 1))?
                .midpoint(self.position_of(PointIndex::solid(i))?);
            if b.kind != PointKind::Dotted || !b.position.approx_eq(expected, MIDPOINT_EPSILON) {
                return Err(TubeError::Invariant(format!(
                    "dotted point {} is not at its midpoint",
                    index
                )));
            }
        }

        Ok(())
    }
}
