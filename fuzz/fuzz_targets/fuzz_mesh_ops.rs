#![no_main]

use fastener_assembly::{DetectorConfig, HeadDetector, MeshHandle, Solid, Triangle, Vertex};
use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct FuzzMesh {
    vertices: Vec<(f64, f64, f64)>,
    triangles: Vec<(usize, usize, usize)>,
    plane: f64,
    num_slices: usize,
}

impl<'a> Arbitrary<'a> for FuzzMesh {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let vertex_count = u.int_in_range(1..=100)?;
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push((u.arbitrary()?, u.arbitrary()?, u.arbitrary()?));
        }

        // Keep indices in range so the solid constructor accepts the mesh
        let triangle_count = u.int_in_range(0..=50)?;
        let mut triangles = Vec::with_capacity(triangle_count);
        for _ in 0..triangle_count {
            triangles.push((
                u.int_in_range(0..=(vertex_count - 1))?,
                u.int_in_range(0..=(vertex_count - 1))?,
                u.int_in_range(0..=(vertex_count - 1))?,
            ));
        }

        Ok(FuzzMesh {
            vertices,
            triangles,
            plane: u.arbitrary()?,
            num_slices: u.int_in_range(1..=200)?,
        })
    }
}

fuzz_target!(|input: FuzzMesh| {
    let vertices = input
        .vertices
        .iter()
        .map(|&(x, y, z)| Vertex::new(x, y, z))
        .collect();
    let triangles = input
        .triangles
        .iter()
        .map(|&(a, b, c)| Triangle::new(a, b, c))
        .collect();

    // Non-finite coordinates are rejected here
    let Ok(solid) = Solid::new(vertices, triangles) else {
        return;
    };
    let mesh = MeshHandle::from_solid(solid);

    if input.plane.is_finite() {
        if let Ok(upper) = mesh.cut(input.plane) {
            assert!(upper.solid().vertices().iter().all(|v| v.z >= input.plane));
        }
    }

    if let Ok(detector) = HeadDetector::new(DetectorConfig::new().with_num_slices(input.num_slices)) {
        if let Ok(slices) = detector.slices(&mesh) {
            assert_eq!(slices.len(), input.num_slices);
        }
        let _ = detector.detect(&mesh);
    }
});
