//! Axes and signed faces in cell space

use crate::core::types::{IVec3, Vec3};

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0, 1, 2)
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Integer unit vector for this axis
    pub fn unit(self) -> IVec3 {
        match self {
            Axis::X => IVec3::X,
            Axis::Y => IVec3::Y,
            Axis::Z => IVec3::Z,
        }
    }

    /// The two axes spanning the plane orthogonal to this one
    pub fn plane_axes(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::Z, Axis::X),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

/// A signed axis: the outward normal of a voxel face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Face {
    pub axis: Axis,
    /// +1 or -1
    pub sign: i32,
}

impl Face {
    pub fn new(axis: Axis, positive: bool) -> Self {
        Self { axis, sign: if positive { 1 } else { -1 } }
    }

    /// Face from an axis-aligned unit normal; None for anything else
    pub fn from_normal(normal: IVec3) -> Option<Self> {
        match (normal.x, normal.y, normal.z) {
            (1, 0, 0) => Some(Face::new(Axis::X, true)),
            (-1, 0, 0) => Some(Face::new(Axis::X, false)),
            (0, 1, 0) => Some(Face::new(Axis::Y, true)),
            (0, -1, 0) => Some(Face::new(Axis::Y, false)),
            (0, 0, 1) => Some(Face::new(Axis::Z, true)),
            (0, 0, -1) => Some(Face::new(Axis::Z, false)),
            _ => None,
        }
    }

    /// Signed axis id in 1..=3 (negative for -X/-Y/-Z)
    pub fn omit_axis(self) -> i32 {
        (self.axis.index() as i32 + 1) * self.sign
    }

    /// Integer normal
    pub fn normal(self) -> IVec3 {
        self.axis.unit() * self.sign
    }

    /// Float normal
    pub fn normal_f32(self) -> Vec3 {
        self.normal().as_vec3()
    }

    /// Same face after negating the components flagged by `mirror` (-1 entries)
    pub fn mirrored(self, mirror: IVec3) -> Self {
        Self {
            axis: self.axis,
            sign: self.sign * mirror[self.axis.index()],
        }
    }
}
