//! Data structures for triangulated solids
//!
//! A [`Solid`] is an indexed triangle mesh: a vertex list and a triangle list
//! whose entries index into it. Solids are never empty; every constructor that
//! can produce one validates that at least one vertex is present and that all
//! triangle indices are in range.

use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};

/// A vertex in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Position as an nalgebra point
    pub fn to_point(self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Build a vertex from an nalgebra point
    pub fn from_point(point: &Point3<f64>) -> Self {
        Self::new(point.x, point.y, point.z)
    }

    /// Exact bit pattern of the coordinates, used to weld duplicates
    pub(crate) fn bits(&self) -> [u64; 3] {
        // -0.0 and 0.0 must weld together
        let canonical = |v: f64| if v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() };
        [canonical(self.x), canonical(self.y), canonical(self.z)]
    }
}

/// A triangle defined by three vertex indices
///
/// Winding is counter-clockwise when viewed from outside the solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self { v1, v2, v3 }
    }

    /// Vertex indices as an array
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Returns true if two corners share the same index
    pub fn is_degenerate(&self) -> bool {
        self.v1 == self.v2 || self.v2 == self.v3 || self.v1 == self.v3
    }
}

/// A 2D vertex, used for cap polygons projected onto a cutting plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex2D {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Vertex2D {
    /// Create a new 2D vertex
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Point3<f64>,
    /// Maximum corner
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Extent along each axis (`max - min`)
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Center of the box
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

/// A triangulated solid
///
/// Fields are private so the non-empty and index-range invariants hold for
/// every value in circulation. Positions can only be changed through
/// [`Solid::map_vertices`], which keeps the vertex count and connectivity.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
}

impl Solid {
    /// Create a solid from vertices and triangles
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] if `vertices` is empty or any triangle
    /// references a vertex index out of range.
    pub fn new(vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(Error::Geometry(
                "Solid must contain at least one vertex".to_string(),
            ));
        }

        let count = vertices.len();
        if let Some((index, triangle)) = triangles
            .iter()
            .enumerate()
            .find(|(_, t)| t.indices().iter().any(|&i| i >= count))
        {
            return Err(Error::Geometry(format!(
                "Triangle {} references vertex out of range: {:?} (vertex count {})",
                index,
                triangle.indices(),
                count
            )));
        }

        if let Some(v) = vertices
            .iter()
            .find(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
        {
            return Err(Error::Geometry(format!(
                "Vertex coordinates must be finite, got ({}, {}, {})",
                v.x, v.y, v.z
            )));
        }

        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Build a solid from triangle soup (three positions per face), merging
    /// vertices with identical coordinates
    ///
    /// STL stores every facet with its own copy of each corner; welding
    /// restores the shared-vertex topology that slicing and capping rely on.
    pub fn from_triangle_soup(faces: &[[Vertex; 3]]) -> Result<Self> {
        let mut index_of = std::collections::HashMap::with_capacity(faces.len() * 3 / 2);
        let mut vertices = Vec::with_capacity(faces.len() / 2 + 3);
        let mut triangles = Vec::with_capacity(faces.len());

        for face in faces {
            let mut idx = [0usize; 3];
            for (slot, vertex) in idx.iter_mut().zip(face.iter()) {
                *slot = *index_of.entry(vertex.bits()).or_insert_with(|| {
                    vertices.push(*vertex);
                    vertices.len() - 1
                });
            }
            triangles.push(Triangle::new(idx[0], idx[1], idx[2]));
        }

        tracing::debug!(
            faces = faces.len(),
            soup_vertices = faces.len() * 3,
            welded_vertices = vertices.len(),
            "Welded triangle soup"
        );

        Self::new(vertices, triangles)
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Triangle connectivity
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of vertices (always at least one)
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of a triangle
    pub fn triangle_vertices(&self, triangle: &Triangle) -> [Vertex; 3] {
        [
            self.vertices[triangle.v1],
            self.vertices[triangle.v2],
            self.vertices[triangle.v3],
        ]
    }

    /// Replace every vertex position with `f(position)`
    ///
    /// Connectivity and vertex count are untouched.
    pub fn map_vertices<F>(&mut self, mut f: F)
    where
        F: FnMut(Point3<f64>) -> Point3<f64>,
    {
        for vertex in &mut self.vertices {
            *vertex = Vertex::from_point(&f(vertex.to_point()));
        }
    }

    /// Decompose into the vertex and triangle lists
    pub fn into_parts(self) -> (Vec<Vertex>, Vec<Triangle>) {
        (self.vertices, self.triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_solid_rejected() {
        let result = Solid::new(Vec::new(), Vec::new());
        assert!(matches!(result, Err(Error::Geometry(_))));
    }

    #[test]
    fn test_out_of_range_triangle_rejected() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        let result = Solid::new(vertices, vec![Triangle::new(0, 1, 3)]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
    }

    #[test]
    fn test_non_finite_vertex_rejected() {
        let result = Solid::new(vec![Vertex::new(f64::NAN, 0.0, 0.0)], Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_single_vertex_solid_is_valid() {
        let solid = Solid::new(vec![Vertex::new(1.0, 2.0, 3.0)], Vec::new()).unwrap();
        assert_eq!(solid.vertex_count(), 1);
        assert_eq!(solid.triangle_count(), 0);
    }

    #[test]
    fn test_weld_triangle_soup() {
        let a = Vertex::new(0.0, 0.0, 0.0);
        let b = Vertex::new(1.0, 0.0, 0.0);
        let c = Vertex::new(0.0, 1.0, 0.0);
        let d = Vertex::new(1.0, 1.0, 0.0);

        // Two facets sharing the edge b-c
        let solid = Solid::from_triangle_soup(&[[a, b, c], [b, d, c]]).unwrap();

        assert_eq!(solid.vertex_count(), 4);
        assert_eq!(solid.triangle_count(), 2);
        assert_eq!(solid.triangles()[0], Triangle::new(0, 1, 2));
        assert_eq!(solid.triangles()[1], Triangle::new(1, 3, 2));
    }

    #[test]
    fn test_weld_signed_zero() {
        let a = Vertex::new(0.0, 0.0, 0.0);
        let a_neg = Vertex::new(-0.0, 0.0, -0.0);
        assert_eq!(a.bits(), a_neg.bits());
    }

    #[test]
    fn test_map_vertices_keeps_connectivity() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        let mut solid = Solid::new(vertices, vec![Triangle::new(0, 1, 2)]).unwrap();
        solid.map_vertices(|p| p + Vector3::new(0.0, 0.0, 5.0));

        assert_eq!(solid.vertex_count(), 3);
        assert_eq!(solid.triangles()[0], Triangle::new(0, 1, 2));
        assert!(solid.vertices().iter().all(|v| v.z == 5.0));
    }
}
