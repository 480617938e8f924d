//! Plane cutting with capping
//!
//! [`cut_below`] removes everything under a horizontal plane and closes the
//! opening with a flat cap, the way a saw cut through a solid part would.
//!
//! The algorithm:
//! 1. Classify each vertex as kept (`z >= plane`) or removed
//! 2. Clip every straddling triangle against the plane; intersection points are
//!    keyed by the edge they lie on (or the vertex, when it sits exactly on the
//!    plane), so neighbouring triangles share them
//! 3. Each straddling triangle contributes one segment on the plane; segments
//!    are chained into closed contours through the shared keys
//! 4. Contours are grouped into outer boundaries and holes, triangulated, and
//!    added as cap triangles facing −z

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::{Solid, Triangle, Vertex, Vertex2D};
use crate::polygon_triangulation::{group_contours, signed_area, triangulate_with_holes};

/// Identity of a vertex in the cut result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum CutVertex {
    /// An original vertex on the kept side
    Original(usize),
    /// Intersection of the plane with the edge between two original vertices
    /// (stored with the smaller index first)
    Edge(usize, usize),
}

/// Builder for the cut result, assigning output indices on first use
struct CutBuilder<'a> {
    solid: &'a Solid,
    plane_z: f64,
    depth: Vec<f64>,
    index_of: HashMap<CutVertex, usize>,
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
}

impl<'a> CutBuilder<'a> {
    fn new(solid: &'a Solid, plane_z: f64) -> Self {
        let depth = solid.vertices().iter().map(|v| v.z - plane_z).collect();
        Self {
            solid,
            plane_z,
            depth,
            index_of: HashMap::new(),
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    fn is_kept(&self, vertex: usize) -> bool {
        self.depth[vertex] >= 0.0
    }

    /// Key of the point where edge `kept -> removed` meets the plane
    fn crossing(&self, kept: usize, removed: usize) -> CutVertex {
        if self.depth[kept] == 0.0 {
            CutVertex::Original(kept)
        } else {
            CutVertex::Edge(kept.min(removed), kept.max(removed))
        }
    }

    fn position(&self, key: CutVertex) -> Vertex {
        let vertices = self.solid.vertices();
        match key {
            CutVertex::Original(i) => vertices[i],
            CutVertex::Edge(a, b) => {
                let (da, db) = (self.depth[a], self.depth[b]);
                let t = da / (da - db);
                let (pa, pb) = (&vertices[a], &vertices[b]);
                // Snap z so the cap is exactly planar
                Vertex::new(pa.x + t * (pb.x - pa.x), pa.y + t * (pb.y - pa.y), self.plane_z)
            }
        }
    }

    fn index(&mut self, key: CutVertex) -> usize {
        if let Some(&index) = self.index_of.get(&key) {
            return index;
        }
        let index = self.vertices.len();
        let position = self.position(key);
        self.vertices.push(position);
        self.index_of.insert(key, index);
        index
    }

    fn push_triangle(&mut self, a: CutVertex, b: CutVertex, c: CutVertex) {
        if a == b || b == c || a == c {
            return;
        }
        let (a, b, c) = (self.index(a), self.index(b), self.index(c));
        self.triangles.push(Triangle::new(a, b, c));
    }
}

/// Remove the part of `solid` below `plane_z` and cap the cross-section
///
/// Returns a new solid containing every triangle with all corners at
/// `z >= plane_z`, the clipped remainders of triangles that straddle the plane,
/// and cap triangles closing each cross-section contour. Input is not modified.
///
/// If the plane lies below the solid the result is a copy of the input (with
/// unused vertices dropped). If the plane lies above the solid nothing is kept;
/// since solids cannot be empty this returns a geometry error.
///
/// Capping assumes the cross-section contours are closed and do not cross each
/// other, which holds for closed manifold input. Open chains (from open or
/// overlapping input) are skipped and the result is left open there.
pub fn cut_below(solid: &Solid, plane_z: f64) -> Result<Solid> {
    let mut builder = CutBuilder::new(solid, plane_z);
    let mut segments: Vec<(CutVertex, CutVertex)> = Vec::new();

    for triangle in solid.triangles() {
        let corners = triangle.indices();
        let kept: Vec<bool> = corners.iter().map(|&i| builder.is_kept(i)).collect();
        let kept_count = kept.iter().filter(|&&k| k).count();

        match kept_count {
            3 => builder.push_triangle(
                CutVertex::Original(corners[0]),
                CutVertex::Original(corners[1]),
                CutVertex::Original(corners[2]),
            ),
            0 => {}
            1 => {
                // Rotate so the kept corner comes first, preserving winding
                let start = kept.iter().position(|&k| k).unwrap_or(0);
                let a = corners[start];
                let b = corners[(start + 1) % 3];
                let c = corners[(start + 2) % 3];
                let ab = builder.crossing(a, b);
                let ca = builder.crossing(a, c);
                builder.push_triangle(CutVertex::Original(a), ab, ca);
                segments.push((ab, ca));
            }
            _ => {
                // Rotate so the removed corner comes last
                let start = (kept.iter().position(|&k| !k).unwrap_or(0) + 1) % 3;
                let a = corners[start];
                let b = corners[(start + 1) % 3];
                let c = corners[(start + 2) % 3];
                let bc = builder.crossing(b, c);
                let ca = builder.crossing(a, c);
                builder.push_triangle(CutVertex::Original(a), CutVertex::Original(b), bc);
                builder.push_triangle(CutVertex::Original(a), bc, ca);
                segments.push((bc, ca));
            }
        }
    }

    let contours = assemble_contours(&segments);
    tracing::debug!(
        plane_z,
        segments = segments.len(),
        contours = contours.len(),
        "Collected cut contours"
    );
    add_cap(&mut builder, &contours)?;

    Solid::new(builder.vertices, builder.triangles)
}

/// Chain plane segments into closed contours
///
/// Segments are matched through shared endpoint keys, so no distance tolerance
/// is involved. Duplicate segments (the same edge reported twice) are merged;
/// chains that do not close, or close with fewer than three points, are dropped.
fn assemble_contours(segments: &[(CutVertex, CutVertex)]) -> Vec<Vec<CutVertex>> {
    let mut unique: HashSet<(CutVertex, CutVertex)> = HashSet::new();
    let mut adjacency: HashMap<CutVertex, Vec<CutVertex>> = HashMap::new();

    for &(a, b) in segments {
        if a == b || !unique.insert((a.min(b), a.max(b))) {
            continue;
        }
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }

    // Walk from keys in sorted order so the output is deterministic
    let mut starts: Vec<CutVertex> = adjacency.keys().copied().collect();
    starts.sort();

    let mut visited: HashSet<CutVertex> = HashSet::new();
    let mut contours = Vec::new();

    for start in starts {
        if visited.contains(&start) {
            continue;
        }

        let mut contour = vec![start];
        visited.insert(start);
        let mut previous = None;
        let mut current = start;
        let mut closed = false;

        loop {
            let next = adjacency.get(&current).and_then(|neighbours| {
                neighbours
                    .iter()
                    .copied()
                    .find(|&n| Some(n) != previous && (n == start || !visited.contains(&n)))
            });

            match next {
                Some(n) if n == start => {
                    closed = true;
                    break;
                }
                Some(n) => {
                    visited.insert(n);
                    contour.push(n);
                    previous = Some(current);
                    current = n;
                }
                None => break,
            }
        }

        if closed && contour.len() >= 3 {
            contours.push(contour);
        }
    }

    contours
}

/// Triangulate the contours and append cap triangles facing −z
fn add_cap(builder: &mut CutBuilder<'_>, contours: &[Vec<CutVertex>]) -> Result<()> {
    let projected: Vec<Vec<Vertex2D>> = contours
        .iter()
        .map(|contour| {
            contour
                .iter()
                .map(|&key| {
                    let v = builder.position(key);
                    Vertex2D::new(v.x, v.y)
                })
                .collect()
        })
        .collect();

    for group in group_contours(&projected) {
        if signed_area(&projected[group.outer]).abs() <= f64::EPSILON {
            continue;
        }

        let holes: Vec<Vec<Vertex2D>> = group
            .holes
            .iter()
            .map(|&h| projected[h].clone())
            .collect();
        let flat = triangulate_with_holes(&projected[group.outer], &holes)?;

        let members: Vec<usize> = std::iter::once(group.outer)
            .chain(group.holes.iter().copied())
            .collect();
        let keys: Vec<CutVertex> = members
            .iter()
            .flat_map(|&c| contours[c].iter().copied())
            .collect();
        let points: Vec<Vertex2D> = members
            .iter()
            .flat_map(|&c| projected[c].iter().copied())
            .collect();
        let loops = LoopIndex::new(members.iter().map(|&c| contours[c].len()));

        for [a, b, c] in loops.restore_skipped_points(&flat, &points) {
            let area = signed_area(&[points[a], points[b], points[c]]);
            // Clockwise seen from +z means the normal points down, out of the
            // material that remains above the plane
            if area > 0.0 {
                builder.push_triangle(keys[a], keys[c], keys[b]);
            } else {
                builder.push_triangle(keys[a], keys[b], keys[c]);
            }
        }
    }

    Ok(())
}

/// Position of every point of the concatenated contour loops handed to the
/// triangulator
struct LoopIndex {
    /// (start offset, length) per loop
    loops: Vec<(usize, usize)>,
    /// Loop number of each flat index
    owner: Vec<usize>,
}

impl LoopIndex {
    fn new(lengths: impl Iterator<Item = usize>) -> Self {
        let mut loops = Vec::new();
        let mut owner = Vec::new();
        let mut offset = 0;
        for (id, len) in lengths.enumerate() {
            loops.push((offset, len));
            owner.extend(std::iter::repeat_n(id, len));
            offset += len;
        }
        Self { loops, owner }
    }

    /// Points strictly between `from` and `to` walking forward along their
    /// loop, or `None` if they lie on different loops
    fn between(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let id = self.owner[from];
        if self.owner[to] != id {
            return None;
        }
        let (offset, len) = self.loops[id];
        let mut points = Vec::new();
        let mut pos = (from - offset + 1) % len;
        while offset + pos != to {
            points.push(offset + pos);
            pos = (pos + 1) % len;
        }
        Some(points)
    }

    /// Re-insert contour points the triangulator dropped
    ///
    /// Ear clipping discards collinear boundary points, or clips them as
    /// zero-area ears. Side triangles of the cut still end at those points, so
    /// zero-area ears are removed and every cap triangle whose edge runs along
    /// a straight stretch of boundary is fanned out to include each point on
    /// it. Otherwise the result would have T-junctions and not be closed.
    fn restore_skipped_points(&self, flat: &[usize], points: &[Vertex2D]) -> Vec<[usize; 3]> {
        let on_segment = |p: usize, u: usize, v: usize| {
            let (a, b, q) = (points[u], points[v], points[p]);
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let (qx, qy) = (q.x - a.x, q.y - a.y);
            let length_sq = dx * dx + dy * dy;
            let along = qx * dx + qy * dy;
            (dx * qy - dy * qx).abs() <= COLLINEAR_TOLERANCE * length_sq
                && along > 0.0
                && along < length_sq
        };

        let skipped_on_edge = |u: usize, v: usize| -> Option<Vec<usize>> {
            let forward = self.between(u, v)?;
            if !forward.is_empty() && forward.iter().all(|&p| on_segment(p, u, v)) {
                return Some(forward);
            }
            let mut backward = self.between(v, u)?;
            if !backward.is_empty() && backward.iter().all(|&p| on_segment(p, u, v)) {
                backward.reverse();
                return Some(backward);
            }
            None
        };

        let mut pending: Vec<[usize; 3]> = flat
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .filter(|&[a, b, c]| !is_sliver(points[a], points[b], points[c]))
            .collect();
        let mut result = Vec::with_capacity(pending.len());

        while let Some(tri) = pending.pop() {
            let split = (0..3).find_map(|e| {
                let (u, v, w) = (tri[e], tri[(e + 1) % 3], tri[(e + 2) % 3]);
                skipped_on_edge(u, v).map(|points| (u, v, w, points))
            });

            match split {
                Some((u, v, w, points)) => {
                    let chain: Vec<usize> = std::iter::once(u)
                        .chain(points)
                        .chain(std::iter::once(v))
                        .collect();
                    for pair in chain.windows(2) {
                        pending.push([pair[0], pair[1], w]);
                    }
                }
                None => result.push(tri),
            }
        }

        result
    }
}

/// Relative tolerance for treating three cap points as collinear
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// True for a triangle whose area is negligible against its longest edge
fn is_sliver(a: Vertex2D, b: Vertex2D, c: Vertex2D) -> bool {
    let longest_sq = [(a, b), (b, c), (c, a)]
        .iter()
        .map(|(p, q)| (p.x - q.x).powi(2) + (p.y - q.y).powi(2))
        .fold(0.0, f64::max);
    2.0 * signed_area(&[a, b, c]).abs() <= COLLINEAR_TOLERANCE * longest_sq
}
