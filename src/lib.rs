//! # Unified volume library
//!
//! This crate loads medical imaging volumes from NIfTI files and DICOM
//! series into one canonical type, [`UnifiedVolume`].
//!
//! A [`UnifiedDataLoader`] classifies every input path first:
//!  - `*.nii` and `*.nii.gz` files are read by the NIfTI adapter, which
//!    takes the spacing and orientation from the header's affine
//!  - directories holding `.dcm` files (or files with the `DICM` magic) are
//!    read by the DICOM adapter, which groups slices by Series Instance
//!    UID, orders them along the slice normal and stacks them into a
//!    `(rows, columns, slices)` array
//!
//! Both paths derive the orientation code (e.g. `RAS`, `LPS`) from a RAS
//! voxel-to-world affine, so volumes from either format can be compared
//! directly. Slice gap irregularities are reported as
//! [`GeometryWarning`]s on the volume instead of failing the load, unless
//! [`LoaderConfig::max_spacing_deviation`] says otherwise.
//!
//! # Examples
//!
//! ## Loading a DICOM series and converting it to NIfTI
//!
//! ```no_run
//! # use unified_volume::{LoaderConfig, UnifiedDataLoader, write_nifti};
//! let loader = UnifiedDataLoader::new(LoaderConfig::default());
//! let volume = loader
//!     .load("dicom/series_001")
//!     .expect("should have loaded the series");
//! println!("shape={:?} spacing={:?}", volume.shape(), volume.spacing());
//! write_nifti(&volume, "converted/series_001.nii.gz").expect("should have written NIfTI");
//! ```
//!
//! ## Picking one series out of a study directory
//!
//! ```no_run
//! # use unified_volume::{LoaderConfig, UnifiedDataLoader};
//! let loader = UnifiedDataLoader::default();
//! let series = loader.scan_series("dicom/study").expect("should have scanned");
//! let config = LoaderConfig::default().with_series_uid(series[0].series_uid.clone());
//! let volume = UnifiedDataLoader::new(config).load("dicom/study");
//! ```

pub mod config;
pub mod dicom_adapter;
pub mod dicom_source;
pub mod enums;
pub mod error;
pub mod nifti_adapter;
pub mod orientation;
pub mod sniffer;
pub mod volume;
pub mod volume_loader;

pub use config::LoaderConfig;
pub use dicom_adapter::{DEFAULT_SLICE_SPACING, DicomAdapter, SeriesSummary};
pub use dicom_source::{DicomFileSource, SliceGeometry, SliceHeader, SliceSource};
pub use enums::{Format, Plane, SortBy};
pub use error::{LoaderError, Result};
pub use nifti_adapter::{NiftiAdapter, write_nifti};
pub use orientation::{Direction, OrientationCode};
pub use sniffer::FormatSniffer;
pub use volume::{GeometryWarning, UnifiedVolume, VolumeSource};
pub use volume_loader::{UnifiedDataLoader, VolumeAdapter};
