use crate::error::{LoaderError, Result};
use crate::volume::{UnifiedVolume, VolumeSource};

use flate2::bufread::GzDecoder;
use log::{debug, info};
use nalgebra::Matrix4;
use nifti::writer::WriterOptions;
use nifti::{InMemNiftiObject, IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Highest dimensionality a NIfTI-1 header can declare
const MAX_DIMS: usize = 7;

/// Loads single-file NIfTI-1 volumes (`.nii`, `.nii.gz`)
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiAdapter;

impl NiftiAdapter {
    /// Load a NIfTI file with its full voxel array
    ///
    /// # Errors
    ///
    /// Returns `CorruptFile` if the header cannot be parsed, declares no or
    /// zero-sized axes, or carries a degenerate affine.
    pub fn load(&self, path: &Path) -> Result<UnifiedVolume> {
        let object = read_object(path)?;
        let header = object.header().clone();

        let shape = declared_shape(&header).map_err(|reason| LoaderError::corrupt(path, reason))?;
        let affine = header.affine::<f64>();
        let spacing = spacing_from_header(&header, &affine, shape.len())
            .map_err(|reason| LoaderError::corrupt(path, reason))?;

        let data = object
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| LoaderError::corrupt(path, e))?;
        if data.shape() != shape.as_slice() {
            return Err(LoaderError::corrupt(
                path,
                format!("voxel array is {:?}, header declares {:?}", data.shape(), shape),
            ));
        }

        info!("Loaded NIfTI {} with shape {:?}", path.display(), shape);
        UnifiedVolume::new(data, spacing, affine, VolumeSource::Nifti, Vec::new())
    }
}

/// Write a volume as NIfTI-1, gzip-compressed when `path` ends in `.gz`
///
/// The header carries the volume's affine as both sform and qform, and its
/// spacing as pixdim.
pub fn write_nifti(volume: &UnifiedVolume, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if volume.ndim() > MAX_DIMS {
        return Err(LoaderError::Export {
            path: path.to_path_buf(),
            reason: format!("{} axes do not fit a NIfTI-1 header", volume.ndim()),
        });
    }

    let mut header = NiftiHeader::default();
    header.set_affine(volume.affine());
    header.sform_code = 1;
    header.qform_code = 1;
    for (axis, spacing) in volume.spacing().iter().enumerate() {
        header.pixdim[axis + 1] = *spacing as f32;
    }
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(volume.data())
        .map_err(|e| LoaderError::Export {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    info!("Wrote {} ({})", path.display(), volume);
    Ok(())
}

/// Read a `.nii` file, decompressing any `.gz` suffix regardless of case
fn read_object(path: &Path) -> Result<InMemNiftiObject> {
    if !has_gz_suffix(path) {
        return ReaderOptions::new()
            .read_file(path)
            .map_err(|e| LoaderError::corrupt(path, e));
    }

    debug!("Decompressing {}", path.display());
    let file = File::open(path).map_err(|e| LoaderError::corrupt(path, e))?;
    InMemNiftiObject::from_reader(GzDecoder::new(BufReader::new(file)))
        .map_err(|e| LoaderError::corrupt(path, e))
}

fn has_gz_suffix(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn declared_shape(header: &NiftiHeader) -> std::result::Result<Vec<usize>, String> {
    let ndim = header.dim[0] as usize;
    if ndim == 0 || ndim > MAX_DIMS {
        return Err(format!("invalid dimensionality {ndim}"));
    }

    let shape: Vec<usize> = header.dim[1..=ndim].iter().map(|d| *d as usize).collect();
    if let Some(axis) = shape.iter().position(|d| *d == 0) {
        return Err(format!("axis {axis} has non-positive extent"));
    }
    Ok(shape)
}

/// Spatial axes take their scale from the affine columns, others from pixdim
fn spacing_from_header(
    header: &NiftiHeader,
    affine: &Matrix4<f64>,
    ndim: usize,
) -> std::result::Result<Vec<f64>, String> {
    (0..ndim)
        .map(|axis| {
            if axis < 3 {
                let norm = (0..3)
                    .map(|row| affine[(row, axis)].powi(2))
                    .sum::<f64>()
                    .sqrt();
                if norm.is_finite() && norm > 0.0 {
                    Ok(norm)
                } else {
                    Err(format!("degenerate affine column {axis}"))
                }
            } else {
                let pixdim = f64::from(header.pixdim[axis + 1]);
                Ok(if pixdim.is_finite() && pixdim > 0.0 {
                    pixdim
                } else {
                    1.0
                })
            }
        })
        .collect()
}
