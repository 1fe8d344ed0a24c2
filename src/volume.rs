use crate::enums::Plane;
use crate::error::{LoaderError, Result};
use crate::orientation::OrientationCode;

use nalgebra::Matrix4;
use ndarray::{ArrayD, ArrayViewD, Axis};
use std::fmt;

/// Where a volume was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    Nifti,
    Dicom { series_uid: String },
}

/// Non-fatal geometry findings attached to a loaded volume
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryWarning {
    /// Consecutive slice gaps deviate from their median beyond tolerance
    NonUniformSpacing { median: f64, min: f64, max: f64 },

    /// Only one slice, so the slice spacing could not be measured
    SingleSlice { spacing: f64 },
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryWarning::NonUniformSpacing { median, min, max } => write!(
                f,
                "non-uniform slice spacing: median {median:.4} mm, range {min:.4}..{max:.4} mm"
            ),
            GeometryWarning::SingleSlice { spacing } => {
                write!(f, "single slice series, slice spacing defaulted to {spacing} mm")
            }
        }
    }
}

/// Canonical in-memory volume shared by all format adapters
///
/// Immutable once built: the only constructor checks that the spacing has
/// one positive entry per data axis.
#[derive(Debug, Clone)]
pub struct UnifiedVolume {
    data: ArrayD<f32>,
    spacing: Vec<f64>,
    affine: Matrix4<f64>,
    orientation: OrientationCode,
    source: VolumeSource,
    warnings: Vec<GeometryWarning>,
}

impl UnifiedVolume {
    pub fn new(
        data: ArrayD<f32>,
        spacing: Vec<f64>,
        affine: Matrix4<f64>,
        source: VolumeSource,
        warnings: Vec<GeometryWarning>,
    ) -> Result<Self> {
        if data.ndim() == 0 {
            return Err(LoaderError::geometry("volume has no axes"));
        }
        if spacing.len() != data.ndim() {
            return Err(LoaderError::geometry(format!(
                "{} spacing values for {} axes",
                spacing.len(),
                data.ndim()
            )));
        }
        if let Some(bad) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(LoaderError::geometry(format!(
                "spacing must be positive, got {bad}"
            )));
        }

        Ok(Self {
            orientation: OrientationCode::from_affine(&affine),
            data,
            spacing,
            affine,
            source,
            warnings,
        })
    }

    /// Extents of the volume, one per axis
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Physical voxel size per axis in millimetres
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn orientation(&self) -> OrientationCode {
        self.orientation
    }

    /// Voxel-to-world (RAS, mm) transform
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    pub fn source(&self) -> &VolumeSource {
        &self.source
    }

    pub fn warnings(&self) -> &[GeometryWarning] {
        &self.warnings
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }

    /// Get the slice at `index` along a voxel axis
    pub fn get_slice_from_axis(&self, axis: usize, index: usize) -> Option<ArrayViewD<'_, f32>> {
        if !self.is_valid_index(axis, index) {
            return None;
        }
        Some(self.data.index_axis(Axis(axis), index))
    }

    /// Get the slice at `index` lying in an anatomical plane
    pub fn get_slice_from_plane(&self, plane: Plane, index: usize) -> Option<ArrayViewD<'_, f32>> {
        let axis = self.orientation.axis_for_plane(plane);
        self.get_slice_from_axis(axis, index)
    }

    fn is_valid_index(&self, axis: usize, index: usize) -> bool {
        axis < self.data.ndim() && index < self.data.len_of(Axis(axis))
    }
}

impl fmt::Display for UnifiedVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape={:?}, spacing={:?}, orientation={} ({})",
            self.shape(),
            self.spacing,
            self.orientation,
            self.orientation.plane()
        )
    }
}
