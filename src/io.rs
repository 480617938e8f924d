//! File format dispatch
//!
//! Input may be STL or 3MF, chosen by file extension. Output is always STL.

use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Solid;
use crate::stl::{self, StlEncoding};
use crate::threemf;

/// Mesh file formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    /// STL (ASCII or binary)
    Stl,
    /// 3MF package
    ThreeMf,
}

impl MeshFormat {
    /// Detect the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("stl") {
            Some(Self::Stl)
        } else if ext.eq_ignore_ascii_case("3mf") {
            Some(Self::ThreeMf)
        } else {
            None
        }
    }

    /// Canonical lowercase extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::ThreeMf => "3mf",
        }
    }
}

/// Load a solid from an STL or 3MF file
///
/// # Errors
///
/// - [`Error::InputNotFound`] if `path` does not exist
/// - [`Error::UnsupportedInputFormat`] for any other extension
/// - format-specific parse and geometry errors
pub fn load_solid<P: AsRef<Path>>(path: P) -> Result<Solid> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let format = MeshFormat::from_path(path)
        .ok_or_else(|| Error::UnsupportedInputFormat(path.to_path_buf()))?;

    let solid = match format {
        MeshFormat::Stl => stl::load_stl(path)?,
        MeshFormat::ThreeMf => threemf::load_threemf(path)?,
    };

    tracing::debug!(
        path = %path.display(),
        format = format.extension(),
        vertices = solid.vertex_count(),
        triangles = solid.triangle_count(),
        "Loaded solid"
    );
    Ok(solid)
}

/// Save a solid as STL
///
/// The extension must be exactly `.stl`; anything else is rejected before
/// the file is created.
pub fn save_solid<P: AsRef<Path>>(solid: &Solid, path: P, encoding: StlEncoding) -> Result<()> {
    let path = path.as_ref();
    if path.extension().and_then(|e| e.to_str()) != Some("stl") {
        return Err(Error::UnsupportedExportFormat(path.to_path_buf()));
    }

    stl::save_stl(solid, path, encoding)?;

    tracing::debug!(
        path = %path.display(),
        triangles = solid.triangle_count(),
        "Saved solid"
    );
    Ok(())
}
