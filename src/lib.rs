//! # fastener-assembly
//!
//! Builds composite solids from a screw and a nut.
//!
//! The crate bundles a small triangle-mesh kernel (STL and 3MF input, STL
//! output, transforms, volume and center of mass, concatenation and capped
//! plane cuts) with the assembly logic on top of it:
//!
//! - [`HeadDetector`] scans a part in thin z-slices and finds the height where
//!   its diameter first jumps, i.e. where a screw's head begins
//! - [`Pipeline`] aligns both parts, runs the detector on the screw and writes
//!   three composites
//!
//! ## Example
//!
//! ```no_run
//! use fastener_assembly::{Pipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(PipelineConfig::new().with_input_dir("input"))?;
//! let report = pipeline.run("output")?;
//!
//! println!("Head starts at z = {:.3}", report.transition.height);
//! for path in &report.outputs {
//!     println!("wrote {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod head_detector;
pub mod io;
pub mod mesh_handle;
pub mod mesh_ops;
pub mod model;
pub mod pipeline;
pub mod polygon_triangulation;
pub mod slicing;
pub mod stl;
pub mod threemf;

pub use error::{Error, ErrorCategory, Result};
pub use head_detector::{DetectorConfig, HeadDetector, Slice, TransitionPoint};
pub use mesh_handle::MeshHandle;
pub use mesh_ops::Axis;
pub use model::{BoundingBox, Solid, Triangle, Vertex};
pub use pipeline::{
    AlignmentMode, Assembly, AssemblyReport, Pipeline, PipelineConfig, SCREW_ASSET_ROTATION,
    Variant,
};
pub use stl::StlEncoding;
