//! Planar partition of the canvas into Voronoi cells.
//!
//! Sites are inserted into a Delaunay triangulation and each site's Voronoi
//! face is walked. A cell is **unbounded** when any of its Voronoi vertices
//! is an outer vertex, i.e. the site lies on the convex hull of the distinct
//! site positions (a hull vertex, or collinear on a hull edge). Without a
//! single inner triangle (fewer than three distinct positions, or all of them
//! collinear) every cell is unbounded. Unbounded cells are reported as such
//! and are never rasterized; they are *not* clipped to the canvas.
//!
//! Bounded cells are the circumcenters of the site's adjacent triangles,
//! clipped to the clip rectangle.

use std::collections::HashMap;

use spade::handles::{FixedVertexHandle, VoronoiVertex};
use spade::{DelaunayTriangulation, Point2, Triangulation};

/// A vertex in canvas coordinates.
pub type Vertex = (f64, f64);

/// One cell of the partition.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Convex polygon (possibly empty if the cell lies outside the clip rect).
    Bounded(Vec<Vertex>),
    /// The region extends to infinity.
    Unbounded,
}

impl Cell {
    /// Polygon of a bounded cell.
    pub fn polygon(&self) -> Option<&[Vertex]> {
        match self {
            Cell::Bounded(polygon) => Some(polygon),
            Cell::Unbounded => None,
        }
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        matches!(self, Cell::Bounded(_))
    }
}

/// Axis-aligned rectangle bounded cells are clipped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ClipRect {
    /// The canvas grown by one pixel on every side, so clipping never
    /// changes a rasterized pixel.
    pub fn canvas(width: u32, height: u32) -> Self {
        Self {
            min_x: -1.0,
            min_y: -1.0,
            max_x: width as f64 + 1.0,
            max_y: height as f64 + 1.0,
        }
    }

    /// Boundary lines as `(nx, ny, offset)`; inside is `nx*x + ny*y <= offset`.
    fn half_planes(&self) -> [(f64, f64, f64); 4] {
        [
            (-1.0, 0.0, -self.min_x),
            (1.0, 0.0, self.max_x),
            (0.0, -1.0, -self.min_y),
            (0.0, 1.0, self.max_y),
        ]
    }
}

/// Voronoi partition with one cell per site, in site order.
#[derive(Debug, Clone)]
pub struct Partition {
    cells: Vec<Cell>,
}

impl Partition {
    /// Partition the plane around `sites`, clipping bounded cells to `clip`.
    ///
    /// Coincident sites share one triangulation vertex and therefore the
    /// same cell.
    pub fn compute(sites: &[(i32, i32)], clip: ClipRect) -> Self {
        let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
        let handles: Vec<Option<FixedVertexHandle>> = sites
            .iter()
            .map(|&(x, y)| match triangulation.insert(Point2::new(x as f64, y as f64)) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    log::warn!("Site ({x}, {y}) rejected by triangulation: {err:?}");
                    None
                }
            })
            .collect();

        // No inner triangle: every Voronoi region is open
        if triangulation.num_inner_faces() == 0 {
            return Self {
                cells: vec![Cell::Unbounded; sites.len()],
            };
        }

        let mut by_vertex: HashMap<FixedVertexHandle, Cell> = HashMap::new();
        let cells = handles
            .iter()
            .map(|handle| match *handle {
                Some(handle) => by_vertex
                    .entry(handle)
                    .or_insert_with(|| voronoi_cell(&triangulation, handle, clip))
                    .clone(),
                None => Cell::Unbounded,
            })
            .collect();

        Self { cells }
    }

    /// Cells in site order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of bounded cells.
    pub fn bounded_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_bounded()).count()
    }
}

/// Walk the Voronoi face of one vertex.
fn voronoi_cell(
    triangulation: &DelaunayTriangulation<Point2<f64>>,
    handle: FixedVertexHandle,
    clip: ClipRect,
) -> Cell {
    let mut polygon = Vec::new();
    for edge in triangulation.vertex(handle).as_voronoi_face().adjacent_edges() {
        match edge.from() {
            VoronoiVertex::Inner(face) => {
                let center = face.circumcenter();
                polygon.push((center.x, center.y));
            }
            VoronoiVertex::Outer(_) => return Cell::Unbounded,
        }
    }
    Cell::Bounded(clip_to_rect(polygon, clip))
}

/// Sutherland-Hodgman against the four sides of `clip`.
fn clip_to_rect(mut polygon: Vec<Vertex>, clip: ClipRect) -> Vec<Vertex> {
    for (nx, ny, offset) in clip.half_planes() {
        if polygon.is_empty() {
            break;
        }
        polygon = clip_half_plane(&polygon, nx, ny, offset);
    }
    polygon
}

/// Keep the part of a convex polygon where `nx*x + ny*y <= offset`.
fn clip_half_plane(polygon: &[Vertex], nx: f64, ny: f64, offset: f64) -> Vec<Vertex> {
    if polygon.len() < 3 {
        return Vec::new();
    }
    let side = |v: Vertex| nx * v.0 + ny * v.1 - offset;

    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, &current) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        let fc = side(current);
        let fn_ = side(next);

        if fc <= 0.0 {
            out.push(current);
        }
        if (fc < 0.0 && fn_ > 0.0) || (fc > 0.0 && fn_ < 0.0) {
            let t = fc / (fc - fn_);
            out.push((
                current.0 + (next.0 - current.0) * t,
                current.1 + (next.1 - current.1) * t,
            ));
        }
    }

    if out.len() < 3 { Vec::new() } else { out }
}

/// Area of a simple polygon (shoelace).
pub fn polygon_area(polygon: &[Vertex]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (x0, y0) = polygon[i];
            let (x1, y1) = polygon[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    twice.abs() / 2.0
}
