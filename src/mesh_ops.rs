//! Triangle mesh operations
//!
//! This module provides the geometric queries and transforms the assembly
//! works with:
//! - Bounding box calculation
//! - Volume and center of mass computation
//! - Rigid transforms and anisotropic scale
//! - Concatenation of two solids
//! - Face normal calculation
//!
//! All computations run in f64 on the solid's current vertex positions; nothing
//! is cached between calls.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::{BoundingBox, Solid, Triangle, Vertex};
use nalgebra::{Point3, Rotation3, Unit, Vector3};

/// A 3D point represented as (x, y, z)
pub type Point3d = (f64, f64, f64);

/// Signed volumes smaller than this are treated as zero when a center of mass
/// is requested
const MIN_VOLUME: f64 = 1e-12;

/// Coordinate axis for rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The x axis
    X,
    /// The y axis
    Y,
    /// The z axis
    Z,
}

impl Axis {
    /// Unit vector along this axis
    pub fn unit_vector(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(Error::InvalidAxis(other.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Compute the axis-aligned bounding box (AABB) of a solid
///
/// Solids always hold at least one vertex, so this cannot fail.
pub fn compute_bounding_box(solid: &Solid) -> BoundingBox {
    let first = solid.vertices()[0].to_point();
    let (min, max) = solid
        .vertices()
        .iter()
        .skip(1)
        .fold((first, first), |(mut min, mut max), v| {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
            (min, max)
        });

    BoundingBox { min, max }
}

/// Compute the signed volume of a solid using the divergence theorem
///
/// For a closed mesh with outward (counter-clockwise) winding the volume is
/// positive. Negative volume indicates inverted triangles.
pub fn compute_signed_volume(solid: &Solid) -> f64 {
    let volume: f64 = solid
        .triangles()
        .iter()
        .map(|t| {
            let [a, b, c] = solid.triangle_vertices(t);
            signed_tetrahedron_volume(&a, &b, &c)
        })
        .sum();

    volume
}

/// Compute the unsigned volume of a solid
pub fn compute_volume(solid: &Solid) -> f64 {
    compute_signed_volume(solid).abs()
}

/// Compute the volumetric centroid of a closed solid
///
/// Each triangle spans a tetrahedron with the origin; the centroid is the
/// volume-weighted mean of the tetrahedron centroids. Orientation cancels out,
/// so inverted solids give the same result.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if the solid encloses no volume (open surface,
/// flat patch, point cloud).
pub fn compute_center_of_mass(solid: &Solid) -> Result<Point3<f64>> {
    let mut volume = 0.0_f64;
    let mut weighted = Vector3::zeros();

    for triangle in solid.triangles() {
        let [a, b, c] = solid.triangle_vertices(triangle);
        let tet_volume = signed_tetrahedron_volume(&a, &b, &c);
        // Centroid of (origin, a, b, c) is (a + b + c) / 4
        let centroid = (a.to_point().coords + b.to_point().coords + c.to_point().coords) / 4.0;
        volume += tet_volume;
        weighted += centroid * tet_volume;
    }

    if volume.abs() < MIN_VOLUME {
        return Err(Error::geometry_context(
            "center of mass",
            "solid encloses no volume",
        ));
    }

    Ok(Point3::from(weighted / volume))
}

#[inline]
fn signed_tetrahedron_volume(v1: &Vertex, v2: &Vertex, v3: &Vertex) -> f64 {
    (v1.x * (v2.y * v3.z - v2.z * v3.y)
        + v2.x * (v3.y * v1.z - v3.z * v1.y)
        + v3.x * (v1.y * v2.z - v1.z * v2.y))
        / 6.0
}

/// Rotate every vertex about the origin
///
/// # Arguments
/// * `solid` - The solid to transform in place
/// * `angle_degrees` - Rotation angle, counter-clockwise looking down the axis
/// * `axis` - Rotation axis
pub fn rotate(solid: &mut Solid, angle_degrees: f64, axis: Axis) {
    let rotation = Rotation3::from_axis_angle(&axis.unit_vector(), angle_degrees.to_radians());
    solid.map_vertices(|p| rotation * p);
}

/// Translate every vertex by `offset`
pub fn translate(solid: &mut Solid, offset: Vector3<f64>) {
    solid.map_vertices(|p| p + offset);
}

/// Scale every vertex about the origin, component-wise
///
/// Winding is left as-is, so a negative factor along an odd number of axes
/// inverts the solid (its signed volume turns negative).
pub fn scale(solid: &mut Solid, factors: Vector3<f64>) {
    solid.map_vertices(|p| Point3::from(p.coords.component_mul(&factors)));
}

/// Concatenate two solids into one
///
/// Vertices of `second` follow those of `first` and its triangle indices are
/// offset accordingly. Nothing is merged or removed, so overlapping geometry is
/// kept as-is and the result need not be manifold.
pub fn concatenate(first: &Solid, second: &Solid) -> Result<Solid> {
    let offset = first.vertex_count();

    let mut vertices = Vec::with_capacity(offset + second.vertex_count());
    vertices.extend_from_slice(first.vertices());
    vertices.extend_from_slice(second.vertices());

    let mut triangles = Vec::with_capacity(first.triangle_count() + second.triangle_count());
    triangles.extend_from_slice(first.triangles());
    triangles.extend(
        second
            .triangles()
            .iter()
            .map(|t| Triangle::new(t.v1 + offset, t.v2 + offset, t.v3 + offset)),
    );

    Solid::new(vertices, triangles)
}

/// Apply a 3MF affine transform to a point
///
/// The 12 values are `m00 m01 m02 m10 m11 m12 m20 m21 m22 m30 m31 m32`, the
/// first three rows of a 4x3 matrix multiplied from the left by `(x, y, z, 1)`.
/// The translation is therefore the last three values.
pub fn apply_transform(point: Point3d, transform: &[f64; 12]) -> Point3d {
    let (x, y, z) = point;
    let m = transform;

    let tx = m[0] * x + m[3] * y + m[6] * z + m[9];
    let ty = m[1] * x + m[4] * y + m[7] * z + m[10];
    let tz = m[2] * x + m[5] * y + m[8] * z + m[11];

    (tx, ty, tz)
}

/// Calculate the normal vector for a single triangle face
///
/// The normal is computed using the cross product of two edges of the triangle.
/// The result is normalized to unit length. If the triangle is degenerate
/// (zero area), returns a zero vector.
pub fn calculate_face_normal(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Vector3<f64> {
    let edge1 = v1.to_point() - v0.to_point();
    let edge2 = v2.to_point() - v0.to_point();

    edge1
        .cross(&edge2)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}
