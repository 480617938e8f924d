//! 3MF input
//!
//! 3MF files are ZIP archives following the Open Packaging Conventions. The
//! model part is located through the package relationships, then every mesh
//! object placed by a `<build><item>` is transformed into build space and
//! merged into a single [`Solid`].
//!
//! Only the core specification is read. Materials, colors and extensions are
//! ignored; objects made of components are rejected.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::mesh_ops::apply_transform;
use crate::model::{Solid, Triangle, Vertex};

/// Main 3D model file path within the 3MF archive
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Number of values in a 3MF affine transform (`m00 m01 m02 ... m32`)
const TRANSFORM_MATRIX_SIZE: usize = 12;

/// Load every build item of a 3MF file as one solid
pub fn load_threemf<P: AsRef<Path>>(path: P) -> Result<Solid> {
    let file = File::open(path.as_ref())?;
    read_threemf(BufReader::new(file))
}

/// Read a 3MF package from any seekable reader
pub fn read_threemf<R: Read + Seek>(reader: R) -> Result<Solid> {
    let mut archive = ZipArchive::new(reader)?;
    let model_path = discover_model_path(&mut archive)?;
    tracing::debug!(model_path = %model_path, "Reading 3MF model part");

    let xml = read_part(&mut archive, &model_path)?;
    parse_model_xml(&xml)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| Error::MissingFile(name.to_string()))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Find the model part named by the package relationships
///
/// Packages without `_rels/.rels` fall back to the conventional
/// `3D/3dmodel.model` location.
fn discover_model_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    if archive.by_name(RELS_PATH).is_err() {
        return Ok(MODEL_PATH.to_string());
    }
    let rels = read_part(archive, RELS_PATH)?;

    let mut reader = Reader::from_str(&rels);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let attrs = parse_attributes(e)?;
                let is_model = attrs.get("Type").is_some_and(|t| t == MODEL_REL_TYPE);
                if let (true, Some(target)) = (is_model, attrs.get("Target")) {
                    // Targets are part URIs: percent-encoded, usually absolute
                    let decoded = urlencoding::decode(target)
                        .map_err(|e| Error::InvalidXml(format!("Bad relationship target: {}", e)))?;
                    return Ok(decoded.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::InvalidXml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Err(Error::MissingFile(
        "3D model relationship not found".to_string(),
    ))
}

#[derive(Debug, Default)]
struct MeshObject {
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
}

#[derive(Debug)]
struct BuildItem {
    objectid: usize,
    transform: Option<[f64; TRANSFORM_MATRIX_SIZE]>,
}

/// Parse the model XML and merge all build items into one solid
pub fn parse_model_xml(xml: &str) -> Result<Solid> {
    // DTDs open the door to entity expansion; 3MF never needs them
    let check_len = xml.len().min(2000);
    let head = xml.get(..check_len).unwrap_or(xml);
    if head.to_ascii_lowercase().contains("<!doctype") {
        return Err(Error::InvalidXml(
            "DTD declarations are not allowed in 3MF files".to_string(),
        ));
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::with_capacity(4096);

    let mut objects: HashMap<usize, MeshObject> = HashMap::new();
    let mut items: Vec<BuildItem> = Vec::new();
    let mut current: Option<(usize, MeshObject)> = None;
    let mut in_build = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"object" => {
                        let attrs = parse_attributes(e)?;
                        let id = attrs
                            .get("id")
                            .ok_or_else(|| {
                                Error::InvalidXml("Object missing id attribute".to_string())
                            })?
                            .parse::<usize>()?;
                        current = Some((id, MeshObject::default()));
                    }
                    b"vertex" => {
                        if let Some((_, object)) = current.as_mut() {
                            object.vertices.push(parse_vertex(e)?);
                        }
                    }
                    b"triangle" => {
                        if let Some((_, object)) = current.as_mut() {
                            object.triangles.push(parse_triangle(e)?);
                        }
                    }
                    b"components" | b"component" => {
                        if let Some((id, _)) = current.as_ref() {
                            return Err(Error::InvalidFormat(format!(
                                "Object {} is built from components, which are not supported",
                                id
                            )));
                        }
                    }
                    b"build" => in_build = true,
                    b"item" if in_build => items.push(parse_build_item(e)?),
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"object" => {
                    if let Some((id, object)) = current.take() {
                        objects.insert(id, object);
                    }
                }
                b"build" => in_build = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if items.is_empty() {
        return Err(Error::InvalidFormat(
            "3MF build contains no items".to_string(),
        ));
    }

    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    for item in &items {
        let object = objects.get(&item.objectid).ok_or_else(|| {
            Error::InvalidXml(format!(
                "Build item references unknown object {}",
                item.objectid
            ))
        })?;

        // Validate per object, before offsets hide the range
        if let Some(t) = object
            .triangles
            .iter()
            .find(|t| t.indices().iter().any(|&i| i >= object.vertices.len()))
        {
            return Err(Error::InvalidXml(format!(
                "Object {} triangle {:?} references a vertex out of range (vertex count {})",
                item.objectid,
                t.indices(),
                object.vertices.len()
            )));
        }

        let offset = vertices.len();
        vertices.extend(object.vertices.iter().map(|v| match &item.transform {
            Some(t) => {
                let (x, y, z) = apply_transform((v.x, v.y, v.z), t);
                Vertex::new(x, y, z)
            }
            None => *v,
        }));
        triangles.extend(
            object
                .triangles
                .iter()
                .map(|t| Triangle::new(t.v1 + offset, t.v2 + offset, t.v3 + offset)),
        );

    }

    tracing::debug!(
        objects = objects.len(),
        items = items.len(),
        vertices = vertices.len(),
        triangles = triangles.len(),
        "Parsed 3MF model"
    );

    Solid::new(vertices, triangles)
}

fn parse_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value =
            std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;
        attrs.insert(key.to_string(), value.to_string());
    }

    Ok(attrs)
}

fn parse_vertex(e: &BytesStart) -> Result<Vertex> {
    let mut coords = [None; 3];

    for attr in e.attributes() {
        let attr = attr?;
        let slot = match attr.key.as_ref() {
            b"x" => 0,
            b"y" => 1,
            b"z" => 2,
            _ => continue,
        };
        let text = std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value = text.parse::<f64>()?;
        if !value.is_finite() {
            return Err(Error::InvalidXml(format!(
                "Vertex coordinate must be finite (got {})",
                value
            )));
        }
        coords[slot] = Some(value);
    }

    match coords {
        [Some(x), Some(y), Some(z)] => Ok(Vertex::new(x, y, z)),
        _ => Err(Error::InvalidXml(
            "Vertex requires x, y and z attributes".to_string(),
        )),
    }
}

fn parse_triangle(e: &BytesStart) -> Result<Triangle> {
    let mut indices = [None; 3];

    for attr in e.attributes() {
        let attr = attr?;
        let slot = match attr.key.as_ref() {
            b"v1" => 0,
            b"v2" => 1,
            b"v3" => 2,
            // Property references (pid, p1..p3) carry no geometry
            _ => continue,
        };
        let text = std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;
        indices[slot] = Some(text.parse::<usize>()?);
    }

    match indices {
        [Some(v1), Some(v2), Some(v3)] => Ok(Triangle::new(v1, v2, v3)),
        _ => Err(Error::InvalidXml(
            "Triangle requires v1, v2 and v3 attributes".to_string(),
        )),
    }
}

fn parse_build_item(e: &BytesStart) -> Result<BuildItem> {
    let attrs = parse_attributes(e)?;

    let objectid = attrs
        .get("objectid")
        .ok_or_else(|| Error::InvalidXml("Build item missing objectid attribute".to_string()))?
        .parse::<usize>()?;

    let transform = match attrs.get("transform") {
        Some(text) => {
            let values = text
                .split_whitespace()
                .map(|s| s.parse::<f64>().map_err(Error::from))
                .collect::<Result<Vec<f64>>>()?;
            let matrix: [f64; TRANSFORM_MATRIX_SIZE] =
                values.as_slice().try_into().map_err(|_| {
                    Error::InvalidXml(format!(
                        "Transform matrix must have exactly {} values (got {})",
                        TRANSFORM_MATRIX_SIZE,
                        values.len()
                    ))
                })?;
            if let Some(bad) = matrix.iter().find(|v| !v.is_finite()) {
                return Err(Error::InvalidXml(format!(
                    "Transform matrix values must be finite (got {})",
                    bad
                )));
            }
            Some(matrix)
        }
        None => None,
    };

    Ok(BuildItem {
        objectid,
        transform,
    })
}
