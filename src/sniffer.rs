use crate::enums::Format;

use log::debug;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Classifies input paths by the imaging format they hold
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatSniffer {
    recursive: bool,
}

impl FormatSniffer {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    pub fn sniff(&self, path: impl AsRef<Path>) -> Format {
        let path = path.as_ref();
        if path.is_file() {
            if is_nifti_name(path) {
                return Format::NiftiFile;
            }
        } else if path.is_dir() {
            match collect_dicom_files(path, self.recursive) {
                Ok(files) if !files.is_empty() => return Format::DicomDirectory,
                Ok(_) => {}
                Err(e) => debug!("Could not list {}: {}", path.display(), e),
            }
        }
        Format::Unknown
    }
}

/// `*.nii` or `*.nii.gz`, case-insensitive
pub fn is_nifti_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_ascii_lowercase())
        .is_some_and(|name| name.ends_with(".nii") || name.ends_with(".nii.gz"))
}

/// Collects the files in `directory` that look like DICOM slices, sorted by path
///
/// Files are accepted by their `.dcm`/`.dicom` extension, or otherwise by the
/// `DICM` magic after the 128-byte preamble.
pub fn collect_dicom_files(directory: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(directory, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(directory: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_into(&path, recursive, files)?;
            }
        } else if path.is_file() && is_dicom_candidate(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// True when the directory holds no regular files, at any depth searched
pub fn has_no_files(directory: &Path, recursive: bool) -> io::Result<bool> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            return Ok(false);
        }
        if recursive && path.is_dir() && !has_no_files(&path, recursive)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_dicom_candidate(path: &Path) -> bool {
    let by_extension = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm") || ext.eq_ignore_ascii_case("dicom"));

    by_extension || has_dicom_magic(path)
}

fn has_dicom_magic(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };

    // 128-byte preamble followed by "DICM"
    let mut buffer = [0u8; 132];
    match file.read_exact(&mut buffer) {
        Ok(()) => &buffer[128..132] == b"DICM",
        Err(_) => false,
    }
}
