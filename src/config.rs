use crate::enums::SortBy;

/// Relative deviation from the median slice gap tolerated before a warning
pub const DEFAULT_SPACING_TOLERANCE: f64 = 0.01;

/// Loader configuration
///
/// Passed explicitly to [`UnifiedDataLoader::new`](crate::UnifiedDataLoader::new).
/// Builder methods consume and return the config so they can be chained:
///
/// ```
/// use unified_volume::LoaderConfig;
///
/// let config = LoaderConfig::default()
///     .with_series_uid("1.2.840.113619.2.55.3")
///     .with_max_spacing_deviation(0.5);
/// assert_eq!(config.series_uid.as_deref(), Some("1.2.840.113619.2.55.3"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Descend into subdirectories when collecting DICOM slices
    pub recursive: bool,

    /// Series Instance UID to load when a directory holds several series
    pub series_uid: Option<String>,

    pub sort_by: SortBy,

    /// Relative slice gap deviation that produces a warning
    pub spacing_tolerance: f64,

    /// Relative slice gap deviation that fails the load, if set
    pub max_spacing_deviation: Option<f64>,

    /// Decode DICOM pixel data on the rayon thread pool
    pub parallel: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            series_uid: None,
            sort_by: SortBy::default(),
            spacing_tolerance: DEFAULT_SPACING_TOLERANCE,
            max_spacing_deviation: None,
            parallel: false,
        }
    }
}

impl LoaderConfig {
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_series_uid(mut self, uid: impl Into<String>) -> Self {
        self.series_uid = Some(uid.into());
        self
    }

    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_spacing_tolerance(mut self, tolerance: f64) -> Self {
        self.spacing_tolerance = tolerance;
        self
    }

    pub fn with_max_spacing_deviation(mut self, deviation: f64) -> Self {
        self.max_spacing_deviation = Some(deviation);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
