//! Fastener head detection by slice scanning
//!
//! A screw standing on its axis has a narrow shank and a wide head. The
//! detector cuts the part's z-range into thin horizontal bands, estimates a
//! diameter for each band, and reports the first height where the diameter
//! jumps by more than a given ratio relative to the band below.
//!
//! # Diameter estimate
//!
//! The diameter of a band is twice the largest distance from the centroid of
//! the band's vertices to any of those vertices. This samples vertices, it
//! does not intersect the surface with a plane, so results depend on mesh
//! density:
//!
//! - bands that contain no vertex have diameter 0
//! - an empty band followed by a populated one always counts as a jump
//!
//! Bands thinner than the vertex spacing of the mesh therefore produce early
//! false transitions. Use fewer slices for coarse meshes.
//!
//! # Example
//!
//! ```no_run
//! use fastener_assembly::{DetectorConfig, HeadDetector, MeshHandle};
//!
//! let screw = MeshHandle::load("input/screw.stl")?;
//! let detector = HeadDetector::new(DetectorConfig::new().with_num_slices(500))?;
//! let transition = detector.detect(&screw)?;
//! println!("head starts at z = {}", transition.height);
//! # Ok::<(), fastener_assembly::Error>(())
//! ```

use nalgebra::Point3;

use crate::error::{Error, Result};
use crate::mesh_handle::MeshHandle;

/// Default number of slices scanned
pub const DEFAULT_NUM_SLICES: usize = 1000;

/// Default diameter ratio that counts as a transition
pub const DEFAULT_THRESHOLD_RATIO: f64 = 2.0;

/// Default fraction of the part height ignored at each end
pub const DEFAULT_TRIM_FRACTION: f64 = 0.05;

/// Configuration for [`HeadDetector`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    num_slices: usize,
    threshold_ratio: f64,
    trim_fraction: f64,
}

impl DetectorConfig {
    /// Default configuration: 1000 slices, ratio 2.0, 5% trimmed at each end
    pub fn new() -> Self {
        Self {
            num_slices: DEFAULT_NUM_SLICES,
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            trim_fraction: DEFAULT_TRIM_FRACTION,
        }
    }

    /// Set the number of slices
    pub fn with_num_slices(mut self, num_slices: usize) -> Self {
        self.num_slices = num_slices;
        self
    }

    /// Set the diameter ratio that must be exceeded
    pub fn with_threshold_ratio(mut self, threshold_ratio: f64) -> Self {
        self.threshold_ratio = threshold_ratio;
        self
    }

    /// Set the fraction of the height trimmed from each end
    pub fn with_trim_fraction(mut self, trim_fraction: f64) -> Self {
        self.trim_fraction = trim_fraction;
        self
    }

    /// Number of slices
    pub fn num_slices(&self) -> usize {
        self.num_slices
    }

    /// Diameter ratio threshold
    pub fn threshold_ratio(&self) -> f64 {
        self.threshold_ratio
    }

    /// Fraction of the height trimmed from each end
    pub fn trim_fraction(&self) -> f64 {
        self.trim_fraction
    }

    /// Check that the configuration can produce a scan
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if there are no slices, the ratio is
    /// not a positive finite number, or the trim fraction is outside `[0, 0.5)`.
    pub fn validate(&self) -> Result<()> {
        if self.num_slices == 0 {
            return Err(Error::InvalidConfig(
                "num_slices must be at least 1".to_string(),
            ));
        }
        if !(self.threshold_ratio.is_finite() && self.threshold_ratio > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "threshold_ratio must be a positive finite number, got {}",
                self.threshold_ratio
            )));
        }
        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(Error::InvalidConfig(format!(
                "trim_fraction must be in [0, 0.5), got {}",
                self.trim_fraction
            )));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One horizontal band of the scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    /// Inclusive lower bound
    pub z_lower: f64,
    /// Exclusive upper bound
    pub z_upper: f64,
    /// Number of vertices with `z_lower <= z < z_upper`
    pub vertex_count: usize,
    /// Estimated diameter, 0 for an empty slice
    pub diameter: f64,
}

/// Where the diameter first jumps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionPoint {
    /// Lower bound of the slice where the jump was observed
    pub height: f64,
    /// Index of that slice (always at least 1)
    pub slice_index: usize,
    /// Thickness of every slice
    pub thickness: f64,
    /// Diameter of the slice below
    pub diameter_below: f64,
    /// Diameter of the transition slice
    pub diameter: f64,
}

/// Slice-scan detector for the start of a fastener head
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadDetector {
    config: DetectorConfig,
}

impl HeadDetector {
    /// Create a detector, validating the configuration
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Compute the diameter profile of every slice, bottom to top
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] if the trimmed height range is empty (a flat
    /// part) and [`Error::InvalidConfig`] for an invalid configuration.
    pub fn slices(&self, mesh: &MeshHandle) -> Result<Vec<Slice>> {
        self.config.validate()?;

        let (z_start, thickness) = self.scan_range(mesh)?;

        let mut points: Vec<Point3<f64>> =
            mesh.solid().vertices().iter().map(|v| v.to_point()).collect();
        points.sort_unstable_by(|a, b| a.z.total_cmp(&b.z));

        let slices = (0..self.config.num_slices)
            .map(|i| {
                let z_lower = z_start + i as f64 * thickness;
                let z_upper = z_lower + thickness;
                let begin = points.partition_point(|p| p.z < z_lower);
                let end = points.partition_point(|p| p.z < z_upper);
                let band = &points[begin..end.max(begin)];

                Slice {
                    z_lower,
                    z_upper,
                    vertex_count: band.len(),
                    diameter: band_diameter(band),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            num_slices = slices.len(),
            thickness,
            z_start,
            populated = slices.iter().filter(|s| s.vertex_count > 0).count(),
            "Computed slice profile"
        );

        Ok(slices)
    }

    /// Find the first slice whose diameter exceeds the one below it by more
    /// than the threshold ratio
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoTransitionFound`] if no slice qualifies, plus the
    /// errors of [`HeadDetector::slices`].
    pub fn detect(&self, mesh: &MeshHandle) -> Result<TransitionPoint> {
        let slices = self.slices(mesh)?;
        let ratio = self.config.threshold_ratio;

        let transition = slices
            .windows(2)
            .enumerate()
            .find(|(_, pair)| pair[1].diameter > pair[0].diameter * ratio)
            .map(|(i, pair)| TransitionPoint {
                height: pair[1].z_lower,
                slice_index: i + 1,
                thickness: pair[1].z_upper - pair[1].z_lower,
                diameter_below: pair[0].diameter,
                diameter: pair[1].diameter,
            });

        match transition {
            Some(point) => {
                tracing::info!(
                    height = point.height,
                    slice_index = point.slice_index,
                    diameter_below = point.diameter_below,
                    diameter = point.diameter,
                    "Detected head transition"
                );
                Ok(point)
            }
            None => Err(Error::NoTransitionFound {
                num_slices: self.config.num_slices,
                threshold_ratio: ratio,
            }),
        }
    }

    /// Trimmed scan start and slice thickness
    fn scan_range(&self, mesh: &MeshHandle) -> Result<(f64, f64)> {
        let bbox = mesh.bounding_box();
        let height = bbox.max.z - bbox.min.z;
        let trim = self.config.trim_fraction * height;
        let z_start = bbox.min.z + trim;
        let z_end = bbox.max.z - trim;
        let thickness = (z_end - z_start) / self.config.num_slices as f64;

        if !(thickness.is_finite() && thickness > 0.0) {
            return Err(Error::geometry_context(
                "head detection",
                &format!("part has no usable height (z range {} to {})", bbox.min.z, bbox.max.z),
            ));
        }

        Ok((z_start, thickness))
    }
}

/// Twice the largest centroid-to-vertex distance, 0 for an empty band
fn band_diameter(band: &[Point3<f64>]) -> f64 {
    if band.is_empty() {
        return 0.0;
    }

    let sum = band
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
    let centroid = Point3::from(sum / band.len() as f64);

    let radius = band
        .iter()
        .map(|p| nalgebra::distance(p, &centroid))
        .fold(0.0_f64, f64::max);

    2.0 * radius
}

/// Convenience wrapper: height where the head starts
pub fn find_head_start(mesh: &MeshHandle, num_slices: usize, threshold_ratio: f64) -> Result<f64> {
    let config = DetectorConfig::new()
        .with_num_slices(num_slices)
        .with_threshold_ratio(threshold_ratio);
    HeadDetector::new(config)?.detect(mesh).map(|t| t.height)
}
