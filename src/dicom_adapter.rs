use crate::config::LoaderConfig;
use crate::dicom_source::{DicomFileSource, SliceGeometry, SliceHeader, SliceSource};
use crate::enums::SortBy;
use crate::error::{LoaderError, Result};
use crate::sniffer::collect_dicom_files;
use crate::volume::{GeometryWarning, UnifiedVolume, VolumeSource};

use log::{debug, info, warn};
use nalgebra::{Matrix4, Vector3};
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Slice spacing reported for a single-slice series without Slice Thickness
pub const DEFAULT_SLICE_SPACING: f64 = 1.0;

const ORIENTATION_TOLERANCE: f64 = 1e-3;
const PIXEL_SPACING_TOLERANCE: f64 = 1e-3;
/// Slices closer than this along the normal are considered duplicates (mm)
const POSITION_TOLERANCE: f64 = 1e-4;

/// Overview of one series found in a directory
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub series_uid: String,
    pub description: Option<String>,
    pub modality: Option<String>,
    pub slice_count: usize,
    /// Rows and columns of the first slice with geometry
    pub in_plane_shape: Option<(usize, usize)>,
}

/// Assembles a directory of DICOM slices into a volume
pub struct DicomAdapter<S = DicomFileSource> {
    config: LoaderConfig,
    source: S,
}

impl DicomAdapter<DicomFileSource> {
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_source(config, DicomFileSource)
    }
}

struct PlacedSlice<'a> {
    header: &'a SliceHeader,
    geometry: &'a SliceGeometry,
    projection: f64,
}

impl<S: SliceSource> DicomAdapter<S> {
    pub fn with_source(config: LoaderConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Load the single (or configured) series in `directory`
    ///
    /// # Errors
    ///
    /// - `EmptySeries` if no slice with a Series Instance UID is found
    /// - `AmbiguousSeries` if several series exist and none was selected
    /// - `InconsistentGeometry` if the slices cannot form one volume
    /// - `CorruptFile` if a slice of the series lacks geometry or pixel data
    pub fn load(&self, directory: &Path) -> Result<UnifiedVolume> {
        let series = self.scan(directory)?;
        let (series_uid, slices) = self.select_series(directory, series)?;
        info!(
            "Assembling series {} ({} slices) from {}",
            series_uid,
            slices.len(),
            directory.display()
        );
        self.assemble(series_uid, &slices)
    }

    /// List every series in `directory`, sorted by Series Instance UID
    pub fn scan_series(&self, directory: &Path) -> Result<Vec<SeriesSummary>> {
        let series = self.scan(directory)?;
        Ok(series
            .into_iter()
            .map(|(series_uid, slices)| {
                let first = slices.first();
                SeriesSummary {
                    description: first.and_then(|h| h.series_description.clone()),
                    modality: first.and_then(|h| h.modality.clone()),
                    slice_count: slices.len(),
                    in_plane_shape: slices
                        .iter()
                        .find_map(|h| h.geometry.as_ref())
                        .map(|g| (g.rows, g.columns)),
                    series_uid,
                }
            })
            .collect())
    }

    fn scan(&self, directory: &Path) -> Result<BTreeMap<String, Vec<SliceHeader>>> {
        let paths = collect_dicom_files(directory, self.config.recursive)?;
        debug!("Found {} candidate files in {}", paths.len(), directory.display());

        let mut series: BTreeMap<String, Vec<SliceHeader>> = BTreeMap::new();
        for path in paths {
            match self.source.read_header(&path) {
                Ok(Some(header)) => series
                    .entry(header.series_uid.clone())
                    .or_default()
                    .push(header),
                Ok(None) => warn!("Skipping {}: no Series Instance UID", path.display()),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(series)
    }

    fn select_series(
        &self,
        directory: &Path,
        mut series: BTreeMap<String, Vec<SliceHeader>>,
    ) -> Result<(String, Vec<SliceHeader>)> {
        if let Some(uid) = &self.config.series_uid {
            return match series.remove(uid) {
                Some(slices) => Ok((uid.clone(), slices)),
                None => {
                    warn!("Series {} not found in {}", uid, directory.display());
                    Err(LoaderError::EmptySeries(directory.to_path_buf()))
                }
            };
        }

        match series.len() {
            0 => Err(LoaderError::EmptySeries(directory.to_path_buf())),
            1 => series
                .pop_first()
                .ok_or_else(|| LoaderError::EmptySeries(directory.to_path_buf())),
            _ => Err(LoaderError::AmbiguousSeries {
                path: directory.to_path_buf(),
                series: series.into_keys().collect(),
            }),
        }
    }

    fn assemble(&self, series_uid: String, slices: &[SliceHeader]) -> Result<UnifiedVolume> {
        let mut placed = Vec::with_capacity(slices.len());
        for header in slices {
            let geometry = header.geometry.as_ref().ok_or_else(|| {
                LoaderError::corrupt(
                    &header.path,
                    "missing rows, columns, pixel spacing, orientation or position",
                )
            })?;
            placed.push(PlacedSlice {
                header,
                geometry,
                projection: 0.0,
            });
        }
        let reference = placed
            .first()
            .map(|p| p.geometry)
            .ok_or_else(|| LoaderError::geometry(format!("series {series_uid} has no slices")))?;

        Self::validate_geometry(reference, &placed)?;

        let row_cosine = Vector3::new(
            reference.orientation[0],
            reference.orientation[1],
            reference.orientation[2],
        );
        let column_cosine = Vector3::new(
            reference.orientation[3],
            reference.orientation[4],
            reference.orientation[5],
        );
        let normal = row_cosine.cross(&column_cosine);
        if normal.norm() < 1e-6 {
            return Err(LoaderError::geometry(
                "image orientation row and column cosines are parallel",
            ));
        }
        let normal = normal.normalize();

        for slice in &mut placed {
            slice.projection = Vector3::from(slice.geometry.position).dot(&normal);
        }
        self.sort_slices(&mut placed);
        Self::reject_duplicate_positions(&placed)?;

        let mut warnings = Vec::new();
        let slice_spacing = if placed.len() == 1 {
            let spacing = reference
                .slice_thickness
                .filter(|t| t.is_finite() && *t > 0.0)
                .unwrap_or(DEFAULT_SLICE_SPACING);
            warnings.push(GeometryWarning::SingleSlice { spacing });
            spacing
        } else {
            let projections: Vec<f64> = placed.iter().map(|p| p.projection).collect();
            let (spacing, warning) = measure_slice_spacing(
                &projections,
                self.config.spacing_tolerance,
                self.config.max_spacing_deviation,
            )?;
            warnings.extend(warning);
            spacing
        };
        for warning in &warnings {
            warn!("Series {}: {}", series_uid, warning);
        }

        let images = self.decode_slices(&placed)?;
        let data = Self::build_volume_array(&images, reference.rows, reference.columns);
        let affine = Self::build_affine(
            &placed,
            reference,
            row_cosine,
            column_cosine,
            normal,
            slice_spacing,
        );
        let spacing = vec![
            reference.pixel_spacing[0],
            reference.pixel_spacing[1],
            slice_spacing,
        ];

        UnifiedVolume::new(
            data.into_dyn(),
            spacing,
            affine,
            VolumeSource::Dicom { series_uid },
            warnings,
        )
    }

    fn validate_geometry(reference: &SliceGeometry, placed: &[PlacedSlice<'_>]) -> Result<()> {
        for slice in placed {
            let geometry = slice.geometry;
            let path = slice.header.path.display();
            if (geometry.rows, geometry.columns) != (reference.rows, reference.columns) {
                return Err(LoaderError::geometry(format!(
                    "{} is {}x{}, expected {}x{}",
                    path, geometry.rows, geometry.columns, reference.rows, reference.columns
                )));
            }
            let orientation_differs = geometry
                .orientation
                .iter()
                .zip(reference.orientation.iter())
                .any(|(a, b)| (a - b).abs() > ORIENTATION_TOLERANCE);
            if orientation_differs {
                return Err(LoaderError::geometry(format!(
                    "{} has orientation {:?}, expected {:?}",
                    path, geometry.orientation, reference.orientation
                )));
            }
            let spacing_differs = geometry
                .pixel_spacing
                .iter()
                .zip(reference.pixel_spacing.iter())
                .any(|(a, b)| (a - b).abs() > PIXEL_SPACING_TOLERANCE);
            if spacing_differs {
                return Err(LoaderError::geometry(format!(
                    "{} has pixel spacing {:?}, expected {:?}",
                    path, geometry.pixel_spacing, reference.pixel_spacing
                )));
            }
        }
        Ok(())
    }

    fn sort_slices(&self, placed: &mut [PlacedSlice<'_>]) {
        match self.config.sort_by {
            SortBy::ImagePositionPatient => {
                placed.sort_by(|a, b| a.projection.total_cmp(&b.projection));
            }
            SortBy::InstanceNumber => placed.sort_by(|a, b| {
                a.header
                    .instance_number
                    .cmp(&b.header.instance_number)
                    .then(a.projection.total_cmp(&b.projection))
            }),
        }
    }

    fn reject_duplicate_positions(placed: &[PlacedSlice<'_>]) -> Result<()> {
        let mut projections: Vec<(f64, &Path)> = placed
            .iter()
            .map(|p| (p.projection, p.header.path.as_path()))
            .collect();
        projections.sort_by(|a, b| a.0.total_cmp(&b.0));

        for pair in projections.windows(2) {
            if (pair[1].0 - pair[0].0).abs() < POSITION_TOLERANCE {
                return Err(LoaderError::geometry(format!(
                    "{} and {} share slice position {:.4}",
                    pair[0].1.display(),
                    pair[1].1.display(),
                    pair[0].0
                )));
            }
        }
        Ok(())
    }

    fn decode_slices(&self, placed: &[PlacedSlice<'_>]) -> Result<Vec<Array2<f32>>> {
        let images: Vec<Array2<f32>> = if self.config.parallel {
            placed
                .par_iter()
                .map(|p| self.source.read_pixels(p.header))
                .collect::<Result<_>>()?
        } else {
            placed
                .iter()
                .map(|p| self.source.read_pixels(p.header))
                .collect::<Result<_>>()?
        };

        for (image, slice) in images.iter().zip(placed) {
            let expected = (slice.geometry.rows, slice.geometry.columns);
            if image.dim() != expected {
                return Err(LoaderError::geometry(format!(
                    "{} decoded to {:?}, expected {:?}",
                    slice.header.path.display(),
                    image.dim(),
                    expected
                )));
            }
        }
        Ok(images)
    }

    /// Stack 2D slices into a `(rows, columns, slices)` array
    fn build_volume_array(images: &[Array2<f32>], rows: usize, columns: usize) -> Array3<f32> {
        let mut volume = Array3::<f32>::zeros((rows, columns, images.len()));

        for (k, image) in images.iter().enumerate() {
            volume.slice_mut(s![.., .., k]).assign(image);
        }

        volume
    }

    /// Voxel-to-RAS affine for the stacked `(rows, columns, slices)` array
    fn build_affine(
        placed: &[PlacedSlice<'_>],
        reference: &SliceGeometry,
        row_cosine: Vector3<f64>,
        column_cosine: Vector3<f64>,
        normal: Vector3<f64>,
        slice_spacing: f64,
    ) -> Matrix4<f64> {
        let first = Vector3::from(placed[0].geometry.position);
        // moving down a row follows the column cosine, and vice versa
        let row_step = column_cosine * reference.pixel_spacing[0];
        let column_step = row_cosine * reference.pixel_spacing[1];
        // the slice axis runs along the normal, in the direction the stack was ordered
        let direction = match placed {
            [head, .., last] if last.projection < head.projection => -1.0,
            _ => 1.0,
        };
        let slice_step = normal * (direction * slice_spacing);

        let mut affine = Matrix4::identity();
        for (col, vector) in [row_step, column_step, slice_step, first].iter().enumerate() {
            for row in 0..3 {
                affine[(row, col)] = vector[row];
            }
        }

        // DICOM patient space is LPS
        for col in 0..4 {
            affine[(0, col)] = -affine[(0, col)];
            affine[(1, col)] = -affine[(1, col)];
        }
        affine
    }
}

/// Median gap between consecutive slice projections, checked for uniformity
///
/// Returns a warning when a gap deviates from the median by more than
/// `tolerance` (relative), and fails when `max_deviation` is exceeded.
fn measure_slice_spacing(
    projections: &[f64],
    tolerance: f64,
    max_deviation: Option<f64>,
) -> Result<(f64, Option<GeometryWarning>)> {
    let deltas: Vec<f64> = projections.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let median = median(&deltas)
        .filter(|m| *m > 0.0)
        .ok_or_else(|| LoaderError::geometry("slice spacing could not be measured"))?;

    let min = deltas.iter().copied().fold(f64::INFINITY, f64::min);
    let max = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let deviation = deltas
        .iter()
        .map(|d| (d - median).abs() / median)
        .fold(0.0, f64::max);

    if let Some(limit) = max_deviation {
        if deviation > limit {
            return Err(LoaderError::geometry(format!(
                "slice gaps range {min:.4}..{max:.4} mm around median {median:.4} mm, \
                 relative deviation {deviation:.3} exceeds {limit}"
            )));
        }
    }

    let warning =
        (deviation > tolerance).then_some(GeometryWarning::NonUniformSpacing { median, min, max });
    Ok((median, warning))
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::fs::File;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const AXIAL: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    /// Serves headers from memory and fills each slice with its instance number
    #[derive(Default)]
    struct FakeSource {
        headers: HashMap<PathBuf, SliceHeader>,
        without_series: HashSet<PathBuf>,
    }

    impl SliceSource for FakeSource {
        fn read_header(&self, path: &Path) -> Result<Option<SliceHeader>> {
            if self.without_series.contains(path) {
                return Ok(None);
            }
            self.headers
                .get(path)
                .cloned()
                .map(Some)
                .ok_or_else(|| LoaderError::corrupt(path, "not a DICOM file"))
        }

        fn read_pixels(&self, header: &SliceHeader) -> Result<Array2<f32>> {
            let geometry = header.geometry.as_ref().unwrap();
            let value = header.instance_number.unwrap_or(0) as f32;
            Ok(Array2::from_elem((geometry.rows, geometry.columns), value))
        }
    }

    struct Fixture {
        dir: TempDir,
        source: FakeSource,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                source: FakeSource::default(),
            }
        }

        fn geometry(z: f64) -> SliceGeometry {
            SliceGeometry {
                rows: 2,
                columns: 3,
                pixel_spacing: [0.5, 0.75],
                orientation: AXIAL,
                position: [10.0, 20.0, z],
                slice_thickness: Some(2.5),
            }
        }

        fn add(&mut self, uid: &str, instance: i32, geometry: Option<SliceGeometry>) -> PathBuf {
            let path = self.dir.path().join(format!("{uid}_{instance:03}.dcm"));
            File::create(&path).unwrap();
            self.source.headers.insert(
                path.clone(),
                SliceHeader {
                    path: path.clone(),
                    series_uid: uid.to_string(),
                    series_description: Some(format!("series {uid}")),
                    modality: Some("CT".to_string()),
                    instance_number: Some(instance),
                    geometry,
                },
            );
            path
        }

        fn load(self, config: LoaderConfig) -> Result<UnifiedVolume> {
            let path = self.dir.path().to_path_buf();
            let adapter = DicomAdapter::with_source(config, self.source);
            let result = adapter.load(&path);
            drop(self.dir);
            result
        }
    }

    #[test]
    fn test_slices_are_ordered_along_normal() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(5.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(1.0)));
        fixture.add("1.2.3", 3, Some(Fixture::geometry(3.0)));

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        assert_eq!(volume.shape(), &[2, 3, 3]);
        assert_eq!(volume.spacing(), &[0.5, 0.75, 2.0]);
        assert!(volume.warnings().is_empty());

        let data = volume.data();
        assert_eq!(data[[0, 0, 0]], 2.0);
        assert_eq!(data[[1, 2, 1]], 3.0);
        assert_eq!(data[[0, 1, 2]], 1.0);

        // rows run posterior, columns left, slices superior
        assert_eq!(volume.orientation().to_string(), "PLS");
        let affine = volume.affine();
        assert_eq!(affine[(0, 3)], -10.0);
        assert_eq!(affine[(1, 3)], -20.0);
        assert_eq!(affine[(2, 3)], 1.0);
        assert_eq!(affine[(2, 2)], 2.0);
        assert_eq!(
            volume.source(),
            &VolumeSource::Dicom {
                series_uid: "1.2.3".to_string()
            }
        );
    }

    #[test]
    fn test_instance_number_ordering() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(9.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(6.0)));
        fixture.add("1.2.3", 3, Some(Fixture::geometry(3.0)));

        let volume = fixture
            .load(LoaderConfig::default().with_sort_by(SortBy::InstanceNumber))
            .unwrap();
        assert_eq!(volume.data()[[0, 0, 0]], 1.0);
        assert_eq!(volume.data()[[0, 0, 2]], 3.0);
        assert_eq!(volume.spacing()[2], 3.0);
        assert_eq!(volume.orientation().to_string(), "PLI");
    }

    #[test]
    fn test_two_series_are_ambiguous() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.4", 1, Some(Fixture::geometry(0.0)));

        match fixture.load(LoaderConfig::default()) {
            Err(LoaderError::AmbiguousSeries { series, .. }) => {
                assert_eq!(series, vec!["1.2.3".to_string(), "1.2.4".to_string()]);
            }
            other => panic!("expected AmbiguousSeries, got {other:?}"),
        }
    }

    #[test]
    fn test_selected_series_is_loaded() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.4", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.4", 2, Some(Fixture::geometry(1.0)));

        let volume = fixture
            .load(LoaderConfig::default().with_series_uid("1.2.4"))
            .unwrap();
        assert_eq!(volume.shape()[2], 2);
    }

    #[test]
    fn test_missing_selected_series() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));

        let err = fixture
            .load(LoaderConfig::default().with_series_uid("9.9.9"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::EmptySeries(_)));
    }

    #[test]
    fn test_in_plane_shape_mismatch() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(1.0)));
        let odd = SliceGeometry {
            columns: 4,
            ..Fixture::geometry(2.0)
        };
        fixture.add("1.2.3", 3, Some(odd));

        let err = fixture.load(LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::InconsistentGeometry(_)));
    }

    #[test]
    fn test_orientation_mismatch() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        let tilted = SliceGeometry {
            orientation: [1.0, 0.0, 0.0, 0.0, 0.0, -1.0],
            ..Fixture::geometry(1.0)
        };
        fixture.add("1.2.3", 2, Some(tilted));

        let err = fixture.load(LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::InconsistentGeometry(_)));
    }

    #[test]
    fn test_duplicate_positions() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(1.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(1.0)));

        let err = fixture.load(LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::InconsistentGeometry(_)));
    }

    #[test]
    fn test_single_slice_uses_thickness() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        assert_eq!(volume.shape(), &[2, 3, 1]);
        assert_eq!(volume.spacing()[2], 2.5);
        assert_eq!(
            volume.warnings(),
            &[GeometryWarning::SingleSlice { spacing: 2.5 }]
        );
    }

    #[test]
    fn test_single_slice_sentinel() {
        let mut fixture = Fixture::new();
        let geometry = SliceGeometry {
            slice_thickness: None,
            ..Fixture::geometry(0.0)
        };
        fixture.add("1.2.3", 1, Some(geometry));

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        assert_eq!(volume.spacing()[2], DEFAULT_SLICE_SPACING);
    }

    #[test]
    fn test_non_uniform_gaps_warn() {
        let mut fixture = Fixture::new();
        for (instance, z) in [(1, 0.0), (2, 1.0), (3, 2.0), (4, 4.0)] {
            fixture.add("1.2.3", instance, Some(Fixture::geometry(z)));
        }

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        assert_eq!(volume.spacing()[2], 1.0);
        assert_eq!(
            volume.warnings(),
            &[GeometryWarning::NonUniformSpacing {
                median: 1.0,
                min: 1.0,
                max: 2.0
            }]
        );
    }

    #[test]
    fn test_slice_column_matches_spacing_with_uneven_gaps() {
        let mut fixture = Fixture::new();
        for (instance, z) in [(1, 0.0), (2, 1.0), (3, 2.0), (4, 4.0)] {
            fixture.add("1.2.3", instance, Some(Fixture::geometry(z)));
        }

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        let affine = volume.affine();
        let slice_column = Vector3::new(affine[(0, 2)], affine[(1, 2)], affine[(2, 2)]);
        assert_eq!(slice_column, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(slice_column.norm(), volume.spacing()[2]);
    }

    #[test]
    fn test_slice_column_follows_instance_order() {
        let mut fixture = Fixture::new();
        // instance numbers run against the normal, with an uneven last gap
        fixture.add("1.2.3", 1, Some(Fixture::geometry(9.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(6.0)));
        fixture.add("1.2.3", 3, Some(Fixture::geometry(3.0)));
        fixture.add("1.2.3", 4, Some(Fixture::geometry(-3.0)));

        let volume = fixture
            .load(LoaderConfig::default().with_sort_by(SortBy::InstanceNumber))
            .unwrap();
        let affine = volume.affine();
        assert_eq!(affine[(2, 3)], 9.0);
        assert_eq!(affine[(2, 2)], -3.0);
        assert_eq!(volume.spacing()[2], 3.0);
    }

    #[test]
    fn test_non_uniform_gaps_fail_past_limit() {
        let mut fixture = Fixture::new();
        for (instance, z) in [(1, 0.0), (2, 1.0), (3, 2.0), (4, 4.0)] {
            fixture.add("1.2.3", instance, Some(Fixture::geometry(z)));
        }

        let err = fixture
            .load(LoaderConfig::default().with_max_spacing_deviation(0.5))
            .unwrap_err();
        assert!(matches!(err, LoaderError::InconsistentGeometry(_)));
    }

    #[test]
    fn test_missing_geometry_is_corrupt() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.3", 2, None);

        let err = fixture.load(LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::CorruptFile { .. }));
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(1.0)));
        File::create(fixture.dir.path().join("garbage.dcm")).unwrap();

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        assert_eq!(volume.shape()[2], 2);
    }

    #[test]
    fn test_files_without_series_are_skipped() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.3", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.3", 2, Some(Fixture::geometry(1.0)));
        let orphan = fixture.dir.path().join("orphan.dcm");
        File::create(&orphan).unwrap();
        fixture.source.without_series.insert(orphan);

        let volume = fixture.load(LoaderConfig::default()).unwrap();
        assert_eq!(volume.shape()[2], 2);
    }

    #[test]
    fn test_no_readable_slices() {
        let fixture = Fixture::new();
        File::create(fixture.dir.path().join("garbage.dcm")).unwrap();

        let err = fixture.load(LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::EmptySeries(_)));
    }

    #[test]
    fn test_parallel_decoding_matches_sequential() {
        let build = || {
            let mut fixture = Fixture::new();
            for (instance, z) in [(1, 2.0), (2, 0.0), (3, 1.0)] {
                fixture.add("1.2.3", instance, Some(Fixture::geometry(z)));
            }
            fixture
        };

        let sequential = build().load(LoaderConfig::default()).unwrap();
        let parallel = build()
            .load(LoaderConfig::default().with_parallel(true))
            .unwrap();
        assert_eq!(sequential.data(), parallel.data());
    }

    #[test]
    fn test_scan_series_summaries() {
        let mut fixture = Fixture::new();
        fixture.add("1.2.4", 1, Some(Fixture::geometry(0.0)));
        fixture.add("1.2.3", 1, None);
        fixture.add("1.2.3", 2, Some(Fixture::geometry(1.0)));

        let path = fixture.dir.path().to_path_buf();
        let adapter = DicomAdapter::with_source(LoaderConfig::default(), fixture.source);
        let summaries = adapter.scan_series(&path).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].series_uid, "1.2.3");
        assert_eq!(summaries[0].slice_count, 2);
        assert_eq!(summaries[0].in_plane_shape, Some((2, 3)));
        assert_eq!(summaries[1].series_uid, "1.2.4");
        assert_eq!(summaries[1].modality.as_deref(), Some("CT"));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }
}
