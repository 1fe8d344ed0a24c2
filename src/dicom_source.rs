use crate::error::{LoaderError, Result};

use dicom::core::Tag;
use dicom::object::{InMemDicomObject, OpenFileOptions, open_file};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder};
use dicom_dictionary_std::tags;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Spatial attributes of one DICOM image slice
#[derive(Debug, Clone, PartialEq)]
pub struct SliceGeometry {
    pub rows: usize,
    pub columns: usize,
    /// Pixel Spacing: distance between rows, then between columns (mm)
    pub pixel_spacing: [f64; 2],
    /// Image Orientation (Patient): row cosine followed by column cosine
    pub orientation: [f64; 6],
    /// Image Position (Patient) of the first transmitted pixel
    pub position: [f64; 3],
    pub slice_thickness: Option<f64>,
}

/// Header fields of one slice file, read without its pixel data
#[derive(Debug, Clone, PartialEq)]
pub struct SliceHeader {
    pub path: PathBuf,
    pub series_uid: String,
    pub series_description: Option<String>,
    pub modality: Option<String>,
    pub instance_number: Option<i32>,
    /// `None` when any attribute needed to place the slice is missing
    pub geometry: Option<SliceGeometry>,
}

/// Reads DICOM slice files for the DICOM adapter
pub trait SliceSource: Send + Sync {
    /// Read the header of `path`.
    ///
    /// `Ok(None)` means the file is valid DICOM but not part of any series.
    fn read_header(&self, path: &Path) -> Result<Option<SliceHeader>>;

    /// Decode the first frame of a single-channel slice as `(rows, columns)`,
    /// modality LUT applied
    fn read_pixels(&self, header: &SliceHeader) -> Result<Array2<f32>>;
}

/// [`SliceSource`] backed by dicom-rs
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomFileSource;

impl SliceSource for DicomFileSource {
    fn read_header(&self, path: &Path) -> Result<Option<SliceHeader>> {
        let dicom_object = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| LoaderError::corrupt(path, e))?;

        let Some(series_uid) = get_string(&dicom_object, tags::SERIES_INSTANCE_UID) else {
            return Ok(None);
        };

        Ok(Some(SliceHeader {
            path: path.to_path_buf(),
            series_uid,
            series_description: get_string(&dicom_object, tags::SERIES_DESCRIPTION),
            modality: get_string(&dicom_object, tags::MODALITY),
            instance_number: dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()
                .and_then(|e| e.to_int::<i32>().ok()),
            geometry: read_geometry(&dicom_object),
        }))
    }

    fn read_pixels(&self, header: &SliceHeader) -> Result<Array2<f32>> {
        let path = header.path.as_path();
        let geometry = header
            .geometry
            .as_ref()
            .ok_or_else(|| LoaderError::corrupt(path, "missing image geometry"))?;

        let dicom_object = open_file(path).map_err(|e| LoaderError::corrupt(path, e))?;
        let pixel_data = dicom_object
            .decode_pixel_data()
            .map_err(|e| LoaderError::corrupt(path, e))?;
        if pixel_data.samples_per_pixel() != 1 {
            return Err(LoaderError::corrupt(
                path,
                format!(
                    "{} samples per pixel, expected a single channel",
                    pixel_data.samples_per_pixel()
                ),
            ));
        }
        let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::Default);
        let mut values = pixel_data
            .to_vec_with_options::<f32>(&options)
            .map_err(|e| LoaderError::corrupt(path, e))?;

        // multi-frame data: keep the first frame
        let frame_len = geometry.rows * geometry.columns;
        if values.len() < frame_len {
            return Err(LoaderError::corrupt(
                path,
                format!("expected {} pixels, found {}", frame_len, values.len()),
            ));
        }
        values.truncate(frame_len);

        Array2::from_shape_vec((geometry.rows, geometry.columns), values)
            .map_err(|e| LoaderError::corrupt(path, e))
    }
}

fn read_geometry(dicom_object: &InMemDicomObject) -> Option<SliceGeometry> {
    let rows = dicom_object.element(tags::ROWS).ok()?.to_int::<u32>().ok()?;
    let columns = dicom_object
        .element(tags::COLUMNS)
        .ok()?
        .to_int::<u32>()
        .ok()?;
    let pixel_spacing = get_f64_array::<2>(dicom_object, tags::PIXEL_SPACING)?;
    let orientation = get_f64_array::<6>(dicom_object, tags::IMAGE_ORIENTATION_PATIENT)?;
    let position = get_f64_array::<3>(dicom_object, tags::IMAGE_POSITION_PATIENT)?;
    let slice_thickness = dicom_object
        .element(tags::SLICE_THICKNESS)
        .ok()
        .and_then(|e| e.to_float64().ok());

    Some(SliceGeometry {
        rows: rows as usize,
        columns: columns as usize,
        pixel_spacing,
        orientation,
        position,
        slice_thickness,
    })
}

fn get_string(dicom_object: &InMemDicomObject, tag: Tag) -> Option<String> {
    let value = dicom_object.element(tag).ok()?.to_str().ok()?;
    let value = value.trim_end_matches('\0').trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn get_f64_array<const N: usize>(dicom_object: &InMemDicomObject, tag: Tag) -> Option<[f64; N]> {
    let values = dicom_object.element(tag).ok()?.to_multi_float64().ok()?;
    values.get(..N)?.try_into().ok()
}
