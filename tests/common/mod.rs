//! Shared fixtures for integration tests
//!
//! Parts are built as surfaces of revolution around the z axis from a closed
//! profile in the (r, z) half-plane. Profile points on the axis (r = 0) become
//! single pole vertices, every other point a ring of vertices.

#![allow(dead_code)]

use fastener_assembly::stl::{StlEncoding, save_stl};
use fastener_assembly::{Solid, Triangle, Vertex};
use std::collections::HashMap;
use std::path::Path;

/// Number of vertices per ring
pub const SEGMENTS: usize = 32;

/// Screw modelled head-down: head radius 12 from z=0 to 4, shank radius 5
/// from z=4 to 30
pub const SCREW_PROFILE: &[(f64, f64)] = &[
    (0.0, 0.0),
    (12.0, 0.0),
    (12.0, 4.0),
    (5.0, 4.0),
    (5.0, 30.0),
    (0.0, 30.0),
];

/// Nut: annulus with inner radius 5.5, outer radius 9, height 3
pub const NUT_PROFILE: &[(f64, f64)] = &[(5.5, 0.0), (9.0, 0.0), (9.0, 3.0), (5.5, 3.0)];

/// Revolve a counter-clockwise (r, z) profile into a closed solid
///
/// Profile edges longer than `max_step` get intermediate rings so that
/// vertices are spread along the part instead of sitting only at corners.
pub fn revolve(profile: &[(f64, f64)], segments: usize, max_step: Option<f64>) -> Solid {
    let points = subdivide(profile, max_step);

    let mut vertices = Vec::new();
    // Per profile point: first vertex index and whether it is a pole
    let mut rings = Vec::with_capacity(points.len());
    for &(r, z) in &points {
        let start = vertices.len();
        if r == 0.0 {
            vertices.push(Vertex::new(0.0, 0.0, z));
            rings.push((start, true));
        } else {
            for k in 0..segments {
                let angle = k as f64 * std::f64::consts::TAU / segments as f64;
                vertices.push(Vertex::new(r * angle.cos(), r * angle.sin(), z));
            }
            rings.push((start, false));
        }
    }

    let index = |ring: usize, k: usize| {
        let (start, pole) = rings[ring];
        if pole { start } else { start + k % segments }
    };

    let mut triangles = Vec::new();
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        for k in 0..segments {
            let a = index(i, k);
            let b = index(i, k + 1);
            let c = index(j, k + 1);
            let d = index(j, k);
            for t in [Triangle::new(a, b, c), Triangle::new(a, c, d)] {
                if !t.is_degenerate() {
                    triangles.push(t);
                }
            }
        }
    }

    Solid::new(vertices, triangles).unwrap()
}

fn subdivide(profile: &[(f64, f64)], max_step: Option<f64>) -> Vec<(f64, f64)> {
    let Some(step) = max_step else {
        return profile.to_vec();
    };

    let mut points = Vec::new();
    for (i, &(r0, z0)) in profile.iter().enumerate() {
        let (r1, z1) = profile[(i + 1) % profile.len()];
        // The closing edge along the axis needs no rings
        if r0 == 0.0 && r1 == 0.0 {
            points.push((r0, z0));
            continue;
        }
        let length = ((r1 - r0).powi(2) + (z1 - z0).powi(2)).sqrt();
        let pieces = (length / step).ceil().max(1.0) as usize;
        for p in 0..pieces {
            let t = p as f64 / pieces as f64;
            points.push((r0 + t * (r1 - r0), z0 + t * (z1 - z0)));
        }
    }
    points
}

/// Screw fixture, head-down as stored on disk
pub fn screw() -> Solid {
    revolve(SCREW_PROFILE, SEGMENTS, None)
}

/// Nut fixture
pub fn nut() -> Solid {
    revolve(NUT_PROFILE, SEGMENTS, None)
}

/// Axis-aligned box with outward-facing triangles
pub fn box_solid(min: [f64; 3], max: [f64; 3]) -> Solid {
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
    Solid::new(vertices, triangles).unwrap()
}

/// Write `screw.stl` and `nut.stl` into `dir`
pub fn write_parts(dir: &Path) {
    save_stl(&screw(), dir.join("screw.stl"), StlEncoding::Binary).unwrap();
    save_stl(&nut(), dir.join("nut.stl"), StlEncoding::Binary).unwrap();
}

/// True if every directed edge is matched by exactly one opposite edge
pub fn is_closed(solid: &Solid) -> bool {
    let mut edges: HashMap<(usize, usize), i32> = HashMap::new();
    for t in solid.triangles() {
        let [a, b, c] = t.indices();
        for (u, v) in [(a, b), (b, c), (c, a)] {
            *edges.entry((u, v)).or_default() += 1;
        }
    }
    edges
        .iter()
        .all(|(&(u, v), &count)| count == 1 && edges.get(&(v, u)) == Some(&1))
}
