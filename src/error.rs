//! Error types for mesh loading, geometry and assembly
//!
//! Every error carries a stable code so log lines and CLI output can be grepped
//! and categorized.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: File content and XML errors
//! - **E3xxx**: Geometry errors
//! - **E4xxx**: Feature detection errors
//! - **E5xxx**: Validation of user input (invocation, paths, arguments)
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading or writing a file
//! - `E1002`: ZIP archive format error (3MF input)
//! - `E2004`: Invalid file content (malformed STL or 3MF)
//! - `E3001`: Geometry error (empty or degenerate solid)
//! - `E4001`: No head transition found
//! - `E5002`: Input file not found
//! - `E5004`: Export path does not have the `.stl` extension

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::polygon_triangulation::TriangulationError;

/// Result type for assembly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Mirrors the three failure families of the assembly tool: bad input that is
/// rejected before any geometry is computed, failures raised while loading or
/// processing geometry, and the head detector giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad invocation, missing input, invalid axis or export extension
    Validation,
    /// Malformed or degenerate solids, unreadable mesh files
    Geometry,
    /// The head detector found no qualifying diameter jump
    Detection,
    /// Operating system I/O failure
    Io,
}

/// Errors that can occur while loading, transforming or assembling meshes
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Insufficient permissions on the output directory
    /// - Disk full
    /// - Truncated input file
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted 3MF file
    /// - Unsupported compression method
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required part in a 3MF archive
    ///
    /// **Error Code**: E1003
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure in a 3MF model part
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Vertex or triangle element missing a coordinate or index
    /// - DTD declaration present
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid file content
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - Binary STL shorter than its declared triangle count
    /// - ASCII STL facet with fewer than three vertices
    /// - 3MF package without a model relationship
    #[error("[E2004] Invalid file content: {0}")]
    InvalidFormat(String),

    /// Geometry error
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - Solid with no vertices
    /// - Triangle referencing a vertex index out of range
    /// - Zero-volume solid where a center of mass is required
    #[error("[E3001] Geometry error: {0}")]
    Geometry(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// Cap triangulation failed during a plane cut
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Cap triangulation failed: {0}")]
    Triangulation(#[from] TriangulationError),

    /// No significant diameter increase was found while scanning slices
    ///
    /// **Error Code**: E4001
    ///
    /// **Common Causes**:
    /// - The part has no head (uniform diameter)
    /// - The threshold ratio is too high for the part's proportions
    /// - Slices are too thick for the mesh density
    ///
    /// **Suggestions**:
    /// - Lower the threshold ratio or change the slice count
    #[error(
        "[E4001] No head transition found: no slice diameter exceeded {threshold_ratio} times \
         its predecessor across {num_slices} slices"
    )]
    NoTransitionFound {
        /// Number of slices scanned
        num_slices: usize,
        /// Ratio that a diameter jump had to exceed
        threshold_ratio: f64,
    },

    /// Bad command line invocation
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Usage: {0}")]
    Usage(String),

    /// Input file does not exist
    ///
    /// **Error Code**: E5002
    #[error("[E5002] Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Rotation axis is not one of x, y, z
    ///
    /// **Error Code**: E5003
    #[error("[E5003] Invalid axis '{0}': expected one of x, y, z")]
    InvalidAxis(String),

    /// Export path does not carry the supported extension
    ///
    /// **Error Code**: E5004
    #[error("[E5004] Invalid export format for '{}': only .stl is supported", .0.display())]
    UnsupportedExportFormat(PathBuf),

    /// Input path extension is not a loadable mesh format
    ///
    /// **Error Code**: E5005
    #[error("[E5005] Unsupported input format for '{}': expected .stl or .3mf", .0.display())]
    UnsupportedInputFormat(PathBuf),

    /// Configuration value out of range
    ///
    /// **Error Code**: E5006
    #[error("[E5006] Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Classify this error into one of the failure families
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Usage(_)
            | Error::InputNotFound(_)
            | Error::InvalidAxis(_)
            | Error::UnsupportedExportFormat(_)
            | Error::UnsupportedInputFormat(_)
            | Error::InvalidConfig(_) => ErrorCategory::Validation,
            Error::NoTransitionFound { .. } => ErrorCategory::Detection,
            Error::Io(_) => ErrorCategory::Io,
            Error::Zip(_)
            | Error::MissingFile(_)
            | Error::Xml(_)
            | Error::XmlAttr(_)
            | Error::InvalidXml(_)
            | Error::InvalidFormat(_)
            | Error::Geometry(_)
            | Error::ParseError(_)
            | Error::Triangulation(_) => ErrorCategory::Geometry,
        }
    }

    /// Returns true for errors raised before any geometry is computed
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Create a Geometry error with context about the operation that failed
    ///
    /// # Arguments
    /// * `operation` - What was being computed (e.g., "center of mass")
    /// * `message` - Description of the error
    pub fn geometry_context(operation: &str, message: &str) -> Self {
        Error::Geometry(format!("{}: {}", operation, message))
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "vertex x coordinate")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "floating-point number")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse {} '{}' as {}",
            field_name, value, expected_type
        ))
    }
}
