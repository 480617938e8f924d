//! STL (Stereolithography) file format support.
//!
//! Supports both ASCII and binary STL formats. STL stores each facet with its
//! own copy of the three corners; loading welds identical positions so the
//! resulting [`Solid`] is an indexed mesh.
//!
//! # Format Detection
//!
//! A file is read as binary when its length matches `84 + 50 * face_count`
//! for the face count stored at offset 80. Otherwise it is read as ASCII if it
//! starts with `solid`. Some binary exporters put `solid` at the start of the
//! 80-byte header, so the size check comes first.
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header (ignored)
//! UINT32       – Number of triangles
//! foreach triangle
//!     REAL32[3] – Normal vector
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (usually 0)
//! end
//! ```

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::mesh_ops::calculate_face_normal;
use crate::model::{Solid, Vertex};

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
const TRIANGLE_SIZE: usize = 50;

/// Text written into the binary header
const HEADER_TEXT: &[u8] = b"Binary STL generated by fastener-assembly";

/// STL encoding used when saving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StlEncoding {
    /// Little-endian binary STL
    #[default]
    Binary,
    /// Human-readable ASCII STL
    Ascii,
}

/// Load a solid from an STL file
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid STL, or holds no
/// facets.
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<Solid> {
    let file = File::open(path.as_ref())?;
    read_stl(file)
}

/// Read a solid from STL data, detecting ASCII or binary encoding
pub fn read_stl<R: Read>(mut reader: R) -> Result<Solid> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let faces = if is_binary(&data) {
        parse_binary(&data)?
    } else if data.trim_ascii_start().starts_with(b"solid") {
        parse_ascii(&data)?
    } else {
        // Not ASCII; let the binary parser report what is wrong
        parse_binary(&data)?
    };

    Solid::from_triangle_soup(&faces)
}

fn is_binary(data: &[u8]) -> bool {
    if data.len() < HEADER_SIZE + 4 {
        return false;
    }
    let face_count = u32::from_le_bytes([
        data[HEADER_SIZE],
        data[HEADER_SIZE + 1],
        data[HEADER_SIZE + 2],
        data[HEADER_SIZE + 3],
    ]) as usize;
    face_count
        .checked_mul(TRIANGLE_SIZE)
        .and_then(|body| body.checked_add(HEADER_SIZE + 4))
        == Some(data.len())
}

fn parse_binary(data: &[u8]) -> Result<Vec<[Vertex; 3]>> {
    if data.len() < HEADER_SIZE + 4 {
        return Err(Error::InvalidFormat(format!(
            "STL file too small: expected at least {} bytes, got {}",
            HEADER_SIZE + 4,
            data.len()
        )));
    }

    let face_count = u32::from_le_bytes([
        data[HEADER_SIZE],
        data[HEADER_SIZE + 1],
        data[HEADER_SIZE + 2],
        data[HEADER_SIZE + 3],
    ]) as usize;

    let body = &data[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    if available < face_count {
        return Err(Error::InvalidFormat(format!(
            "Binary STL declares {} triangles but contains only {}",
            face_count, available
        )));
    }

    let faces = body
        .chunks_exact(TRIANGLE_SIZE)
        .take(face_count)
        .map(|chunk| {
            // Skip the stored normal (12 bytes); it is recomputed on export
            [
                read_vertex(&chunk[12..24]),
                read_vertex(&chunk[24..36]),
                read_vertex(&chunk[36..48]),
            ]
        })
        .collect();

    Ok(faces)
}

/// Read a vertex from 12 bytes (3 f32s).
fn read_vertex(buf: &[u8]) -> Vertex {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Vertex::new(f64::from(x), f64::from(y), f64::from(z))
}

fn parse_ascii(data: &[u8]) -> Result<Vec<[Vertex; 3]>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::InvalidFormat(format!("ASCII STL is not valid UTF-8: {}", e)))?;

    let mut faces = Vec::new();
    let mut corners: Vec<Vertex> = Vec::with_capacity(3);
    let mut in_loop = false;

    for (line_number, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "outer" => {
                in_loop = true;
                corners.clear();
            }
            "vertex" if in_loop => {
                let mut coord = || -> Result<f64> {
                    let token = parts.next().ok_or_else(|| {
                        Error::InvalidFormat(format!(
                            "Line {}: vertex needs three coordinates",
                            line_number + 1
                        ))
                    })?;
                    token.parse::<f64>().map_err(|_| {
                        Error::parse_error_with_context(
                            "vertex coordinate",
                            token,
                            "floating-point number",
                        )
                    })
                };
                let (x, y, z) = (coord()?, coord()?, coord()?);
                corners.push(Vertex::new(x, y, z));
            }
            "endloop" => {
                in_loop = false;
            }
            "endfacet" => {
                let face: [Vertex; 3] = corners.as_slice().try_into().map_err(|_| {
                    Error::InvalidFormat(format!(
                        "Line {}: facet has {} vertices, expected 3",
                        line_number + 1,
                        corners.len()
                    ))
                })?;
                faces.push(face);
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }

    Ok(faces)
}

/// Save a solid to an STL file
///
/// # Arguments
///
/// * `solid` - The solid to save
/// * `path` - Output file path (created or overwritten)
/// * `encoding` - Binary or ASCII
pub fn save_stl<P: AsRef<Path>>(solid: &Solid, path: P, encoding: StlEncoding) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    match encoding {
        StlEncoding::Binary => write_stl_binary(solid, &mut writer)?,
        StlEncoding::Ascii => write_stl_ascii(solid, &mut writer)?,
    }

    writer.flush()?;
    Ok(())
}

/// Write a solid as binary STL.
pub fn write_stl_binary<W: Write>(solid: &Solid, mut writer: W) -> Result<()> {
    let mut header = [b' '; HEADER_SIZE];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    writer.write_all(&header)?;

    let face_count = u32::try_from(solid.triangle_count()).map_err(|_| {
        Error::Geometry(format!(
            "Too many triangles for binary STL: {}",
            solid.triangle_count()
        ))
    })?;
    writer.write_all(&face_count.to_le_bytes())?;

    for triangle in solid.triangles() {
        let [v0, v1, v2] = solid.triangle_vertices(triangle);
        let normal = calculate_face_normal(&v0, &v1, &v2);

        // STL stores single precision
        for value in [normal.x, normal.y, normal.z] {
            writer.write_all(&(value as f32).to_le_bytes())?;
        }
        for v in [v0, v1, v2] {
            writer.write_all(&(v.x as f32).to_le_bytes())?;
            writer.write_all(&(v.y as f32).to_le_bytes())?;
            writer.write_all(&(v.z as f32).to_le_bytes())?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}

/// Write a solid as ASCII STL.
pub fn write_stl_ascii<W: Write>(solid: &Solid, mut writer: W) -> Result<()> {
    writeln!(writer, "solid fastener_assembly")?;

    for triangle in solid.triangles() {
        let [v0, v1, v2] = solid.triangle_vertices(triangle);
        let n = calculate_face_normal(&v0, &v1, &v2);

        writeln!(writer, "  facet normal {:.6e} {:.6e} {:.6e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for v in [v0, v1, v2] {
            writeln!(writer, "      vertex {:.6e} {:.6e} {:.6e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }

    writeln!(writer, "endsolid fastener_assembly")?;
    Ok(())
}
