//! Classification of voxel-to-world affines into anatomical axis codes.
//!
//! World space is RAS+ (x to the patient's right, y anterior, z superior).
//! Each voxel axis is labelled with the direction it points to, e.g. `RAS`
//! or `LPS`.

use crate::enums::Plane;
use nalgebra::Matrix4;
use std::fmt;

/// Anatomical direction a voxel axis points towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Left,
    Anterior,
    Posterior,
    Superior,
    Inferior,
}

impl Direction {
    fn from_world_axis(axis: usize, positive: bool) -> Self {
        match (axis, positive) {
            (0, true) => Direction::Right,
            (0, false) => Direction::Left,
            (1, true) => Direction::Anterior,
            (1, false) => Direction::Posterior,
            (_, true) => Direction::Superior,
            (_, false) => Direction::Inferior,
        }
    }

    /// Index of the world axis (0 = x, 1 = y, 2 = z)
    pub fn world_axis(self) -> usize {
        match self {
            Direction::Right | Direction::Left => 0,
            Direction::Anterior | Direction::Posterior => 1,
            Direction::Superior | Direction::Inferior => 2,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Direction::Right => 'R',
            Direction::Left => 'L',
            Direction::Anterior => 'A',
            Direction::Posterior => 'P',
            Direction::Superior => 'S',
            Direction::Inferior => 'I',
        }
    }
}

/// Orientation of the first three voxel axes in world space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientationCode {
    axes: [Direction; 3],
}

impl OrientationCode {
    pub fn new(axes: [Direction; 3]) -> Self {
        Self { axes }
    }

    /// Derive the code from the rotation/scale block of a voxel-to-world affine.
    ///
    /// Every voxel axis gets the world axis its column points along most
    /// strongly. Columns are resolved in order of decreasing dominance so an
    /// oblique affine never maps two voxel axes onto the same world axis.
    pub fn from_affine(affine: &Matrix4<f64>) -> Self {
        let mut candidates = Vec::with_capacity(9);
        for col in 0..3 {
            for row in 0..3 {
                candidates.push((affine[(row, col)].abs(), col, row));
            }
        }
        candidates.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut assigned: [Option<Direction>; 3] = [None; 3];
        let mut used_rows = [false; 3];
        for (_, col, row) in candidates {
            if assigned[col].is_some() || used_rows[row] {
                continue;
            }
            used_rows[row] = true;
            assigned[col] = Some(Direction::from_world_axis(row, affine[(row, col)] >= 0.0));
        }

        // greedy assignment over a 3x3 grid always fills every column
        let axes = assigned.map(|d| d.unwrap_or(Direction::Superior));
        Self { axes }
    }

    pub fn axes(&self) -> [Direction; 3] {
        self.axes
    }

    /// Plane the slices lie in, judged from the third voxel axis
    pub fn plane(&self) -> Plane {
        match self.axes[2].world_axis() {
            0 => Plane::Sagittal,
            1 => Plane::Coronal,
            _ => Plane::Axial,
        }
    }

    /// Voxel axis perpendicular to `plane`
    pub fn axis_for_plane(&self, plane: Plane) -> usize {
        let world_axis = match plane {
            Plane::Sagittal => 0,
            Plane::Coronal => 1,
            Plane::Axial => 2,
        };
        self.axes
            .iter()
            .position(|d| d.world_axis() == world_axis)
            .unwrap_or(2)
    }
}

impl fmt::Display for OrientationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for direction in self.axes {
            write!(f, "{}", direction.letter())?;
        }
        Ok(())
    }
}
