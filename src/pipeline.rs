//! Screw and nut assembly pipeline
//!
//! The pipeline loads the two parts, brings them into a common frame, finds
//! where the screw head starts and writes three composite solids:
//!
//! 1. the nut raised so its top meets the head ([`Variant::NutAtHead`])
//! 2. screw and nut merged, then cut at the nut's bottom ([`Variant::CutAtNut`])
//! 3. the nut stretched along z to cover the shank ([`Variant::NutSpansShank`])
//!
//! Each variant starts from its own copy of the aligned nut, so the order in
//! which variants are built does not change their geometry.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::head_detector::{DetectorConfig, HeadDetector, TransitionPoint};
use crate::mesh_handle::MeshHandle;
use crate::mesh_ops::Axis;
use crate::stl::StlEncoding;

/// Default directory holding the input parts
pub const DEFAULT_INPUT_DIR: &str = "input";

/// Default screw file name inside the input directory
pub const SCREW_FILE: &str = "screw.stl";

/// Default nut file name inside the input directory
pub const NUT_FILE: &str = "nut.stl";

/// Output file names, in variant order
pub const OUTPUT_FILES: [&str; 3] = [
    "nut_and_screw_1.stl",
    "nut_and_screw_2.stl",
    "nut_and_screw_3.stl",
];

/// Rotation applied to the screw on load
///
/// Screw assets are modelled head-down; turning them over puts the head on top.
pub const SCREW_ASSET_ROTATION: AssetRotation = AssetRotation {
    angle_degrees: 180.0,
    axis: Axis::X,
};

/// A rotation about a coordinate axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetRotation {
    /// Angle in degrees
    pub angle_degrees: f64,
    /// Rotation axis
    pub axis: Axis,
}

/// How the two parts are placed on `z = 0` before centering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentMode {
    /// Each part's bottom is moved to `z = 0` on its own
    #[default]
    Independent,
    /// Legacy chained checks that couple the two parts
    ///
    /// Kept for output compatibility with older runs. A part whose bottom is
    /// above zero may be moved further up instead of down.
    Coupled,
}

/// The three composite outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Nut top placed at the head transition, then `nut + screw`
    NutAtHead,
    /// `screw + nut` cut at the aligned nut's bottom
    CutAtNut,
    /// Nut scaled along z to span from the screw's bottom to the head, then
    /// `nut + screw`
    NutSpansShank,
}

impl Variant {
    /// All variants in output order
    pub const ALL: [Variant; 3] = [Variant::NutAtHead, Variant::CutAtNut, Variant::NutSpansShank];

    /// Position in [`OUTPUT_FILES`]
    pub fn index(self) -> usize {
        match self {
            Variant::NutAtHead => 0,
            Variant::CutAtNut => 1,
            Variant::NutSpansShank => 2,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    screw_path: PathBuf,
    nut_path: PathBuf,
    output_files: [String; 3],
    detector: DetectorConfig,
    screw_rotation: AssetRotation,
    alignment: AlignmentMode,
    encoding: StlEncoding,
}

impl PipelineConfig {
    /// Defaults: parts read from `input/`, 1000 slices, ratio 2.0, screw
    /// turned 180° about x, independent alignment, binary STL
    pub fn new() -> Self {
        Self {
            screw_path: Path::new(DEFAULT_INPUT_DIR).join(SCREW_FILE),
            nut_path: Path::new(DEFAULT_INPUT_DIR).join(NUT_FILE),
            output_files: OUTPUT_FILES.map(String::from),
            detector: DetectorConfig::new(),
            screw_rotation: SCREW_ASSET_ROTATION,
            alignment: AlignmentMode::Independent,
            encoding: StlEncoding::Binary,
        }
    }

    /// Read `screw.stl` and `nut.stl` from `dir`
    pub fn with_input_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.screw_path = dir.as_ref().join(SCREW_FILE);
        self.nut_path = dir.as_ref().join(NUT_FILE);
        self
    }

    /// Set the screw file
    pub fn with_screw_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.screw_path = path.into();
        self
    }

    /// Set the nut file
    pub fn with_nut_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.nut_path = path.into();
        self
    }

    /// Set the head detector configuration
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Set the rotation applied to the screw on load
    pub fn with_screw_rotation(mut self, rotation: AssetRotation) -> Self {
        self.screw_rotation = rotation;
        self
    }

    /// Set the bottom alignment mode
    pub fn with_alignment(mut self, alignment: AlignmentMode) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the STL encoding of the outputs
    pub fn with_encoding(mut self, encoding: StlEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Screw input path
    pub fn screw_path(&self) -> &Path {
        &self.screw_path
    }

    /// Nut input path
    pub fn nut_path(&self) -> &Path {
        &self.nut_path
    }

    /// Output file name of a variant
    pub fn output_file(&self, variant: Variant) -> &str {
        &self.output_files[variant.index()]
    }

    /// Head detector configuration
    pub fn detector(&self) -> &DetectorConfig {
        &self.detector
    }

    /// Rotation applied to the screw
    pub fn screw_rotation(&self) -> AssetRotation {
        self.screw_rotation
    }

    /// Bottom alignment mode
    pub fn alignment(&self) -> AlignmentMode {
        self.alignment
    }

    /// STL encoding of the outputs
    pub fn encoding(&self) -> StlEncoding {
        self.encoding
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Both parts in the common frame, with the detected head transition
#[derive(Debug, Clone)]
pub struct AlignedParts {
    /// Screw after reorientation, alignment and centering
    pub screw: MeshHandle,
    /// Nut after alignment and centering
    pub nut: MeshHandle,
    /// Where the screw head starts
    pub transition: TransitionPoint,
}

/// The three composite solids, in variant order
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Parts the variants were built from
    pub parts: AlignedParts,
    /// One handle per [`Variant`], indexed by [`Variant::index`]
    pub variants: [MeshHandle; 3],
}

impl Assembly {
    /// The solid for one variant
    pub fn variant(&self, variant: Variant) -> &MeshHandle {
        &self.variants[variant.index()]
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    /// Where the screw head starts
    pub transition: TransitionPoint,
    /// Written files, in variant order
    pub outputs: [PathBuf; 3],
    /// Aligned screw `[height, width, length]`
    pub screw_dimensions: [f64; 3],
    /// Aligned nut `[height, width, length]`
    pub nut_dimensions: [f64; 3],
}

/// Screw and nut assembly pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    detector: HeadDetector,
}

impl Pipeline {
    /// Create a pipeline, validating the detector configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let detector = HeadDetector::new(config.detector)?;
        Ok(Self { config, detector })
    }

    /// The configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load both input parts
    ///
    /// Both paths are checked before either file is parsed.
    pub fn load_parts(&self) -> Result<(MeshHandle, MeshHandle)> {
        for path in [&self.config.screw_path, &self.config.nut_path] {
            if !path.is_file() {
                return Err(Error::InputNotFound(path.clone()));
            }
        }

        let screw = MeshHandle::load(&self.config.screw_path)?;
        let nut = MeshHandle::load(&self.config.nut_path)?;
        tracing::info!(
            screw = %self.config.screw_path.display(),
            screw_triangles = screw.triangle_count(),
            nut = %self.config.nut_path.display(),
            nut_triangles = nut.triangle_count(),
            "Loaded parts"
        );
        Ok((screw, nut))
    }

    /// Reorient, bottom-align and center both parts, then detect the head
    pub fn align(&self, mut screw: MeshHandle, mut nut: MeshHandle) -> Result<AlignedParts> {
        let rotation = self.config.screw_rotation;
        screw.rotate(rotation.angle_degrees, rotation.axis);

        match self.config.alignment {
            AlignmentMode::Independent => {
                for part in [&mut screw, &mut nut] {
                    let bottom = part.bounding_box_min().z;
                    part.translate([0.0, 0.0, -bottom]);
                }
            }
            AlignmentMode::Coupled => align_coupled(&mut screw, &mut nut),
        }

        for part in [&mut screw, &mut nut] {
            let center = part.center_of_mass()?;
            part.translate([-center.x, -center.y, -center.z]);
        }

        let transition = self.detector.detect(&screw)?;
        tracing::info!(
            head_start_z = transition.height,
            screw_bottom_z = screw.bounding_box_min().z,
            nut_height = nut.height(),
            "Aligned parts"
        );

        Ok(AlignedParts {
            screw,
            nut,
            transition,
        })
    }

    /// Build one composite from aligned parts
    pub fn build_variant(&self, parts: &AlignedParts, variant: Variant) -> Result<MeshHandle> {
        let head_z = parts.transition.height;
        let screw = &parts.screw;
        let mut nut = parts.nut.clone();

        match variant {
            Variant::NutAtHead => {
                let top = nut.bounding_box_max().z;
                nut.translate([0.0, 0.0, head_z - top]);
                nut.join(screw)
            }
            Variant::CutAtNut => {
                let plane_z = nut.bounding_box_min().z;
                screw.join(&nut)?.cut(plane_z)
            }
            Variant::NutSpansShank => {
                let screw_bottom = screw.bounding_box_min().z;
                let nut_height = nut.height();
                if nut_height <= 0.0 {
                    return Err(Error::geometry_context(
                        "nut scaling",
                        "nut has zero height",
                    ));
                }
                nut.scale([1.0, 1.0, (head_z - screw_bottom) / nut_height]);
                let bottom = nut.bounding_box_min().z;
                nut.translate([0.0, 0.0, screw_bottom - bottom]);
                nut.join(screw)
            }
        }
    }

    /// Compute all three composites without writing anything
    pub fn assemble(&self, screw: MeshHandle, nut: MeshHandle) -> Result<Assembly> {
        let parts = self.align(screw, nut)?;
        let [first, second, third] = Variant::ALL;
        let variants = [
            self.build_variant(&parts, first)?,
            self.build_variant(&parts, second)?,
            self.build_variant(&parts, third)?,
        ];
        Ok(Assembly { parts, variants })
    }

    /// Run the whole pipeline and write the outputs into `output_dir`
    ///
    /// The directory is created if missing and reused as-is otherwise.
    /// Variants are written as soon as they are built, so a failure in a later
    /// variant leaves the earlier files in place.
    pub fn run<P: AsRef<Path>>(&self, output_dir: P) -> Result<AssemblyReport> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let (screw, nut) = self.load_parts()?;
        let parts = self.align(screw, nut)?;

        let mut outputs: [PathBuf; 3] = Default::default();
        for variant in Variant::ALL {
            let mesh = self.build_variant(&parts, variant)?;
            let path = output_dir.join(self.config.output_file(variant));
            mesh.save_with_encoding(&path, self.config.encoding)?;
            tracing::info!(
                variant = ?variant,
                path = %path.display(),
                triangles = mesh.triangle_count(),
                "Wrote composite"
            );
            outputs[variant.index()] = path;
        }

        Ok(AssemblyReport {
            transition: parts.transition,
            outputs,
            screw_dimensions: parts.screw.dimensions(),
            nut_dimensions: parts.nut.dimensions(),
        })
    }
}

/// Legacy bottom alignment
///
/// The second branch of each pair inspects the other part and moves it by
/// `+bottom`, not `-bottom`. Only the screw branch of the first pair and the
/// nut branch of the second pair bring a part to `z = 0`.
fn align_coupled(screw: &mut MeshHandle, nut: &mut MeshHandle) {
    let screw_bottom = screw.bounding_box_min().z;
    if screw_bottom < 0.0 {
        screw.translate([0.0, 0.0, -screw_bottom]);
    } else {
        let nut_bottom = nut.bounding_box_min().z;
        if nut_bottom > 0.0 {
            nut.translate([0.0, 0.0, nut_bottom]);
        }
    }

    let nut_bottom = nut.bounding_box_min().z;
    if nut_bottom < 0.0 {
        nut.translate([0.0, 0.0, -nut_bottom]);
    } else {
        let screw_bottom = screw.bounding_box_min().z;
        if screw_bottom > 0.0 {
            screw.translate([0.0, 0.0, screw_bottom]);
        }
    }
}
