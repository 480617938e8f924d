//! Property-based tests for mesh transforms, cut and join
//!
//! These tests use proptest to drive random transform sequences and cutting
//! planes through the mesh handle and check invariants that must always hold.

mod common;

use common::{box_solid, is_closed, revolve};
use fastener_assembly::{Axis, MeshHandle};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Rotate(f64, Axis),
    Translate([f64; 3]),
    Scale([f64; 3]),
}

fn axis_strategy() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-360.0..360.0f64, axis_strategy()).prop_map(|(a, axis)| Op::Rotate(a, axis)),
        prop::array::uniform3(-100.0..100.0f64).prop_map(Op::Translate),
        prop::array::uniform3(0.1..10.0f64).prop_map(Op::Scale),
    ]
}

fn apply(mesh: &mut MeshHandle, op: &Op) {
    match *op {
        Op::Rotate(angle, axis) => mesh.rotate(angle, axis),
        Op::Translate(offset) => mesh.translate(offset),
        Op::Scale(factors) => mesh.scale(factors),
    }
}

fn screw() -> MeshHandle {
    MeshHandle::from_solid(common::screw())
}

proptest! {
    /// height/width/length always match the bounding box extents
    #[test]
    fn test_dimensions_track_bounding_box(ops in prop::collection::vec(op_strategy(), 0..8)) {
        let mut mesh = screw();
        let vertex_count = mesh.vertex_count();
        let triangles = mesh.solid().triangles().to_vec();

        for op in &ops {
            apply(&mut mesh, op);
        }

        let bbox = mesh.bounding_box();
        prop_assert_eq!(mesh.height(), bbox.max.z - bbox.min.z);
        prop_assert_eq!(mesh.width(), bbox.max.x - bbox.min.x);
        prop_assert_eq!(mesh.length(), bbox.max.y - bbox.min.y);
        prop_assert_eq!(mesh.dimensions(), [mesh.height(), mesh.width(), mesh.length()]);

        // Transforms only move vertices
        prop_assert_eq!(mesh.vertex_count(), vertex_count);
        prop_assert_eq!(mesh.solid().triangles(), triangles.as_slice());
    }

    /// Rotating back by the opposite angle restores every vertex
    #[test]
    fn test_rotation_round_trip(angle in -720.0..720.0f64, axis in axis_strategy()) {
        let original = screw();
        let mut mesh = original.clone();
        mesh.rotate(angle, axis);
        mesh.rotate(-angle, axis);

        for (a, b) in original.solid().vertices().iter().zip(mesh.solid().vertices()) {
            let distance = (a.to_point() - b.to_point()).norm();
            prop_assert!(distance < 1e-9, "vertex moved by {}", distance);
        }
    }

    /// Rigid motions keep the volume
    #[test]
    fn test_rigid_motion_keeps_volume(
        angle in -360.0..360.0f64,
        axis in axis_strategy(),
        offset in prop::array::uniform3(-50.0..50.0f64),
    ) {
        let original = screw();
        let mut mesh = original.clone();
        mesh.rotate(angle, axis);
        mesh.translate(offset);

        let relative = (mesh.volume() - original.volume()).abs() / original.volume();
        prop_assert!(relative < 1e-9);
    }

    /// Cutting keeps only material above the plane and leaves the input alone
    #[test]
    fn test_cut_box(plane in 0.05..3.95f64) {
        let mesh = MeshHandle::from_solid(box_solid([0.0, 0.0, 0.0], [2.0, 3.0, 4.0]));
        let before = mesh.clone();
        let upper = mesh.cut(plane).unwrap();

        prop_assert_eq!(&mesh, &before);
        prop_assert!(upper.solid().vertices().iter().all(|v| v.z >= plane));
        prop_assert!((upper.bounding_box_min().z - plane).abs() < 1e-12);
        prop_assert!(is_closed(upper.solid()));
        prop_assert!((upper.volume() - 6.0 * (4.0 - plane)).abs() < 1e-9);
    }

    /// Cutting a revolved part through its shank yields a closed solid
    #[test]
    fn test_cut_screw_is_closed(plane in 4.5..29.5f64) {
        let mesh = screw();
        let upper = mesh.cut(plane).unwrap();

        prop_assert!(is_closed(upper.solid()));
        prop_assert!(upper.solid().vertices().iter().all(|v| v.z >= plane));
        prop_assert!(upper.volume() < mesh.volume());
    }

    /// Joining concatenates vertex and triangle lists
    #[test]
    fn test_join_counts(offset in prop::array::uniform3(-10.0..10.0f64)) {
        let a = screw();
        let mut b = MeshHandle::from_solid(revolve(common::NUT_PROFILE, 16, None));
        b.translate(offset);

        let joined = a.join(&b).unwrap();
        prop_assert_eq!(joined.vertex_count(), a.vertex_count() + b.vertex_count());
        prop_assert_eq!(joined.triangle_count(), a.triangle_count() + b.triangle_count());
        prop_assert_eq!(&joined.solid().vertices()[..a.vertex_count()], a.solid().vertices());
    }
}
