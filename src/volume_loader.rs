use crate::config::LoaderConfig;
use crate::dicom_adapter::{DicomAdapter, SeriesSummary};
use crate::dicom_source::{DicomFileSource, SliceSource};
use crate::enums::Format;
use crate::error::{LoaderError, Result};
use crate::nifti_adapter::NiftiAdapter;
use crate::sniffer::{FormatSniffer, has_no_files};
use crate::volume::UnifiedVolume;

use log::debug;
use std::path::Path;

/// Shared contract of the format adapters
pub trait VolumeAdapter {
    fn load(&self, path: &Path) -> Result<UnifiedVolume>;
}

impl VolumeAdapter for NiftiAdapter {
    fn load(&self, path: &Path) -> Result<UnifiedVolume> {
        NiftiAdapter::load(self, path)
    }
}

impl<S: SliceSource> VolumeAdapter for DicomAdapter<S> {
    fn load(&self, path: &Path) -> Result<UnifiedVolume> {
        DicomAdapter::load(self, path)
    }
}

/// Loads NIfTI files and DICOM series directories through one entry point
pub struct UnifiedDataLoader {
    config: LoaderConfig,
    sniffer: FormatSniffer,
    nifti: NiftiAdapter,
    dicom: DicomAdapter<DicomFileSource>,
}

impl Default for UnifiedDataLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl UnifiedDataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            sniffer: FormatSniffer::new(config.recursive),
            nifti: NiftiAdapter,
            dicom: DicomAdapter::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn sniff(&self, path: impl AsRef<Path>) -> Format {
        self.sniffer.sniff(path)
    }

    /// Load the volume at `path`, whichever supported format it holds
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for paths that are neither a NIfTI file
    /// nor a directory of DICOM files, and `EmptySeries` for a directory
    /// without any files. Adapter errors are passed through unchanged.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<UnifiedVolume> {
        let path = path.as_ref();
        let format = self.sniffer.sniff(path);
        debug!("{} classified as {:?}", path.display(), format);

        let adapter: &dyn VolumeAdapter = match format {
            Format::NiftiFile => &self.nifti,
            Format::DicomDirectory => &self.dicom,
            Format::Unknown => {
                if path.is_dir() && has_no_files(path, self.config.recursive)? {
                    return Err(LoaderError::EmptySeries(path.to_path_buf()));
                }
                return Err(LoaderError::UnsupportedFormat(path.to_path_buf()));
            }
        };
        adapter.load(path)
    }

    /// Summaries of every DICOM series in `directory`
    pub fn scan_series(&self, directory: impl AsRef<Path>) -> Result<Vec<SeriesSummary>> {
        self.dicom.scan_series(directory.as_ref())
    }
}
