//! Cap triangulation for plane cuts
//!
//! A plane cut leaves closed contours in the cut plane. [`group_contours`]
//! pairs every outer boundary with the holes directly inside it and
//! [`triangulate_with_holes`] fills each group through `earcutr`.

use crate::model::Vertex2D;

/// Why a cap polygon could not be filled
#[derive(Debug, thiserror::Error)]
pub enum TriangulationError {
    /// A loop with fewer than three points
    #[error("loop {index} has {points} points, at least 3 are needed")]
    DegenerateLoop {
        /// Position of the loop, 0 for the outer boundary
        index: usize,
        /// Number of points in the loop
        points: usize,
    },

    /// earcut rejected the coordinates
    #[error("earcut failed: {0}")]
    Earcut(String),

    /// earcut returned nothing for a polygon with the given point count
    #[error("earcut produced no triangles for {0} points")]
    NoTriangles(usize),
}

/// An outer contour together with the contours that form holes in it
///
/// Indices refer to the contour list passed to [`group_contours`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourGroup {
    /// Index of the outer boundary
    pub outer: usize,
    /// Indices of the holes directly inside the outer boundary
    pub holes: Vec<usize>,
}

/// Signed area of a closed polygon (shoelace formula)
///
/// Positive for counter-clockwise vertex order.
pub fn signed_area(polygon: &[Vertex2D]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for (i, a) in polygon.iter().enumerate() {
        let b = &polygon[(i + 1) % polygon.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    twice_area / 2.0
}

/// Even-odd point in polygon test
pub fn point_in_polygon(point: &Vertex2D, polygon: &[Vertex2D]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);

    for (i, pi) in polygon.iter().enumerate() {
        let pj = &polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Sort non-intersecting contours into outer boundaries and holes
///
/// A contour's nesting depth is the number of other contours containing it.
/// Even depth makes it an outer boundary, odd depth a hole of the smallest
/// enclosing contour. A nut cross-section (ring) yields one group with one
/// hole; a screw shank passing through the nut's hole yields a second group.
pub fn group_contours(contours: &[Vec<Vertex2D>]) -> Vec<ContourGroup> {
    let areas: Vec<f64> = contours.iter().map(|c| signed_area(c).abs()).collect();

    // For each contour: the indices of the contours that contain it
    let containers: Vec<Vec<usize>> = contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            let Some(probe) = contour.first() else {
                return Vec::new();
            };
            contours
                .iter()
                .enumerate()
                .filter(|&(j, other)| {
                    j != i && areas[j] > areas[i] && point_in_polygon(probe, other)
                })
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let mut groups: Vec<ContourGroup> = containers
        .iter()
        .enumerate()
        .filter(|(_, parents)| parents.len() % 2 == 0)
        .map(|(i, _)| ContourGroup {
            outer: i,
            holes: Vec::new(),
        })
        .collect();

    for (i, parents) in containers.iter().enumerate() {
        if parents.len() % 2 == 0 {
            continue;
        }
        // The direct parent is the smallest container
        let parent = parents
            .iter()
            .copied()
            .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
        if let Some(group) = parent.and_then(|p| groups.iter_mut().find(|g| g.outer == p)) {
            group.holes.push(i);
        }
    }

    groups
}

/// Triangulate one outer loop together with its holes
///
/// Points are numbered across the concatenation `outer, holes[0], holes[1],
/// ...`, and the result holds three such indices per triangle. Loop `0` in an
/// error is the outer boundary, loop `i + 1` is `holes[i]`.
///
/// ```
/// use fastener_assembly::model::Vertex2D;
/// use fastener_assembly::polygon_triangulation::triangulate_with_holes;
///
/// let washer = [
///     Vertex2D::new(-3.0, -3.0),
///     Vertex2D::new(3.0, -3.0),
///     Vertex2D::new(3.0, 3.0),
///     Vertex2D::new(-3.0, 3.0),
/// ];
/// let bore = vec![
///     Vertex2D::new(-1.0, -1.0),
///     Vertex2D::new(-1.0, 1.0),
///     Vertex2D::new(1.0, 1.0),
///     Vertex2D::new(1.0, -1.0),
/// ];
///
/// let indices = triangulate_with_holes(&washer, &[bore])?;
/// assert_eq!(indices.len() % 3, 0);
/// assert!(indices.iter().all(|&i| i < 8));
/// # Ok::<(), fastener_assembly::polygon_triangulation::TriangulationError>(())
/// ```
pub fn triangulate_with_holes(
    outer: &[Vertex2D],
    holes: &[Vec<Vertex2D>],
) -> Result<Vec<usize>, TriangulationError> {
    let loops = std::iter::once(outer).chain(holes.iter().map(Vec::as_slice));

    let mut coords = Vec::new();
    let mut hole_starts = Vec::with_capacity(holes.len());
    for (index, ring) in loops.enumerate() {
        if ring.len() < 3 {
            return Err(TriangulationError::DegenerateLoop {
                index,
                points: ring.len(),
            });
        }
        if index > 0 {
            hole_starts.push(coords.len() / 2);
        }
        coords.extend(ring.iter().flat_map(|v| [v.x, v.y]));
    }

    let indices = earcutr::earcut(&coords, &hole_starts, 2)
        .map_err(|e| TriangulationError::Earcut(e.to_string()))?;
    if indices.is_empty() {
        return Err(TriangulationError::NoTriangles(coords.len() / 2));
    }

    Ok(indices)
}
