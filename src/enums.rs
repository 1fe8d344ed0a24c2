use std::fmt;

/// Input classification produced by the format sniffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    NiftiFile,
    DicomDirectory,
    Unknown,
}

/// Acquisition plane of a volume, named after the plane its slices lie in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Axial,
    Coronal,
    Sagittal,
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::Axial => write!(f, "axial"),
            Plane::Coronal => write!(f, "coronal"),
            Plane::Sagittal => write!(f, "sagittal"),
        }
    }
}

/// How the slices of a DICOM series are stacked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Image Position (Patient) projected onto the slice normal
    #[default]
    ImagePositionPatient,
    InstanceNumber,
}
