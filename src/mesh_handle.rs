//! Mesh handle: a solid plus its derived metrics and mutations
//!
//! [`MeshHandle`] is the unit the assembly pipeline works with. Rigid
//! transforms and scaling mutate the handle in place; [`MeshHandle::cut`] and
//! [`MeshHandle::join`] leave their inputs untouched and return new handles.
//! Every metric is recomputed from the current vertex positions, so nothing can
//! go stale after a mutation.

use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::Result;
use crate::io;
use crate::mesh_ops::{self, Axis};
use crate::model::{BoundingBox, Solid};
use crate::slicing;
use crate::stl::StlEncoding;

/// A triangulated solid with metric and transform operations
#[derive(Debug, Clone, PartialEq)]
pub struct MeshHandle {
    solid: Solid,
}

impl MeshHandle {
    /// Load a mesh from an STL or 3MF file
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`](crate::Error::InputNotFound) if the
    /// file does not exist, or a parse/geometry error if it cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        io::load_solid(path).map(Self::from_solid)
    }

    /// Wrap an existing solid
    pub fn from_solid(solid: Solid) -> Self {
        Self { solid }
    }

    /// The underlying solid
    pub fn solid(&self) -> &Solid {
        &self.solid
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.solid.vertex_count()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.solid.triangle_count()
    }

    /// Rotate about a coordinate axis through the origin
    pub fn rotate(&mut self, angle_degrees: f64, axis: Axis) {
        mesh_ops::rotate(&mut self.solid, angle_degrees, axis);
    }

    /// Rotate about an axis given by name (`"x"`, `"y"` or `"z"`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAxis`](crate::Error::InvalidAxis) for any other
    /// name; the mesh is left unchanged.
    pub fn rotate_named(&mut self, angle_degrees: f64, axis: &str) -> Result<()> {
        let axis: Axis = axis.parse()?;
        self.rotate(angle_degrees, axis);
        Ok(())
    }

    /// Shift every vertex by `[dx, dy, dz]`
    pub fn translate(&mut self, offset: [f64; 3]) {
        mesh_ops::translate(&mut self.solid, Vector3::from(offset));
    }

    /// Scale every vertex component-wise about the origin
    pub fn scale(&mut self, factors: [f64; 3]) {
        mesh_ops::scale(&mut self.solid, Vector3::from(factors));
    }

    /// Axis-aligned bounding box of the current vertices
    pub fn bounding_box(&self) -> BoundingBox {
        mesh_ops::compute_bounding_box(&self.solid)
    }

    /// Minimum corner of the bounding box
    pub fn bounding_box_min(&self) -> Point3<f64> {
        self.bounding_box().min
    }

    /// Maximum corner of the bounding box
    pub fn bounding_box_max(&self) -> Point3<f64> {
        self.bounding_box().max
    }

    /// Enclosed volume
    pub fn volume(&self) -> f64 {
        mesh_ops::compute_volume(&self.solid)
    }

    /// Volumetric center of mass
    ///
    /// # Errors
    ///
    /// Returns a geometry error if the solid encloses no volume.
    pub fn center_of_mass(&self) -> Result<Point3<f64>> {
        mesh_ops::compute_center_of_mass(&self.solid)
    }

    /// Extent along z
    pub fn height(&self) -> f64 {
        self.bounding_box().extents().z
    }

    /// Extent along x
    pub fn width(&self) -> f64 {
        self.bounding_box().extents().x
    }

    /// Extent along y
    pub fn length(&self) -> f64 {
        self.bounding_box().extents().y
    }

    /// `[height, width, length]`
    pub fn dimensions(&self) -> [f64; 3] {
        let extents = self.bounding_box().extents();
        [extents.z, extents.x, extents.y]
    }

    /// Keep the part at or above `plane_z`, capping the cross-section
    ///
    /// Returns a new handle; `self` is not modified.
    ///
    /// # Errors
    ///
    /// Returns a geometry error if nothing lies above the plane or the cap
    /// cannot be triangulated.
    pub fn cut(&self, plane_z: f64) -> Result<Self> {
        slicing::cut_below(&self.solid, plane_z).map(Self::from_solid)
    }

    /// Concatenate two meshes, `self` first
    ///
    /// Vertices are not merged and no boolean union is performed.
    pub fn join(&self, other: &Self) -> Result<Self> {
        mesh_ops::concatenate(&self.solid, &other.solid).map(Self::from_solid)
    }

    /// Save as binary STL
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExportFormat`](crate::Error::UnsupportedExportFormat)
    /// unless the extension is `.stl`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with_encoding(path, StlEncoding::Binary)
    }

    /// Save as STL with the given encoding
    pub fn save_with_encoding<P: AsRef<Path>>(&self, path: P, encoding: StlEncoding) -> Result<()> {
        io::save_solid(&self.solid, path, encoding)
    }
}

impl From<Solid> for MeshHandle {
    fn from(solid: Solid) -> Self {
        Self::from_solid(solid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::model::{Triangle, Vertex};

    /// Axis-aligned box with outward-facing triangles
    fn box_handle(min: [f64; 3], max: [f64; 3]) -> MeshHandle {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let vertices = vec![
            Vertex::new(x0, y0, z0),
            Vertex::new(x1, y0, z0),
            Vertex::new(x1, y1, z0),
            Vertex::new(x0, y1, z0),
            Vertex::new(x0, y0, z1),
            Vertex::new(x1, y0, z1),
            Vertex::new(x1, y1, z1),
            Vertex::new(x0, y1, z1),
        ];
        let triangles = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ]
        .iter()
        .map(|&[a, b, c]| Triangle::new(a, b, c))
        .collect();
        MeshHandle::from_solid(Solid::new(vertices, triangles).unwrap())
    }

    #[test]
    fn test_dimensions_order() {
        let mesh = box_handle([0.0, 0.0, 0.0], [2.0, 3.0, 4.0]);
        assert_eq!(mesh.dimensions(), [4.0, 2.0, 3.0]);
        assert_eq!(mesh.height(), 4.0);
        assert_eq!(mesh.width(), 2.0);
        assert_eq!(mesh.length(), 3.0);
    }

    #[test]
    fn test_translate_moves_bounding_box() {
        let mut mesh = box_handle([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        mesh.translate([1.0, -2.0, 3.0]);
        assert_eq!(mesh.bounding_box_min(), Point3::new(1.0, -2.0, 3.0));
        assert_eq!(mesh.bounding_box_max(), Point3::new(2.0, -1.0, 4.0));
    }

    #[test]
    fn test_rotate_x_180_flips_z() {
        let mut mesh = box_handle([0.0, 0.0, 0.0], [1.0, 1.0, 2.0]);
        mesh.rotate(180.0, Axis::X);
        let bbox = mesh.bounding_box();
        assert!((bbox.min.z + 2.0).abs() < 1e-12);
        assert!(bbox.max.z.abs() < 1e-12);
        assert!((mesh.volume() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_named_rejects_unknown_axis() {
        let mut mesh = box_handle([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let before = mesh.clone();
        let err = mesh.rotate_named(90.0, "w").unwrap_err();
        assert!(matches!(err, Error::InvalidAxis(ref a) if a == "w"));
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_scale_z_only() {
        let mut mesh = box_handle([0.0, 0.0, 1.0], [1.0, 1.0, 3.0]);
        mesh.scale([1.0, 1.0, 0.5]);
        assert_eq!(mesh.bounding_box_min().z, 0.5);
        assert_eq!(mesh.height(), 1.0);
        assert_eq!(mesh.width(), 1.0);
    }

    #[test]
    fn test_center_of_mass_of_box() {
        let mesh = box_handle([0.0, 0.0, 0.0], [2.0, 4.0, 6.0]);
        let com = mesh.center_of_mass().unwrap();
        assert!((com - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn test_cut_returns_new_handle() {
        let mesh = box_handle([0.0, 0.0, 0.0], [1.0, 1.0, 4.0]);
        let upper = mesh.cut(1.0).unwrap();

        assert_eq!(mesh.height(), 4.0, "original must be unchanged");
        assert_eq!(upper.bounding_box_min().z, 1.0);
        assert!((upper.volume() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_join_is_concatenation() {
        let a = box_handle([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = box_handle([0.5, 0.5, 0.5], [1.5, 1.5, 1.5]);
        let joined = a.join(&b).unwrap();

        assert_eq!(joined.vertex_count(), a.vertex_count() + b.vertex_count());
        assert_eq!(joined.triangle_count(), 24);
        assert_eq!(joined.solid().vertices()[0], a.solid().vertices()[0]);
        assert_eq!(joined.bounding_box_max(), Point3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_save_rejects_non_stl() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = box_handle([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let err = mesh.save(dir.path().join("out.obj")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.stl");
        let mesh = box_handle([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        mesh.save(&path).unwrap();

        let loaded = MeshHandle::load(&path).unwrap();
        assert_eq!(loaded.vertex_count(), 8);
        assert_eq!(loaded.triangle_count(), 12);
        assert_eq!(loaded.dimensions(), [3.0, 1.0, 2.0]);
    }
}
