//! Rasterization of seed points into an RGBA image.
//!
//! The canvas is filled with the opaque background, then every bounded cell is
//! composited over it in point order. Later cells overwrite earlier ones where
//! their outlines overlap.

use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use super::point::SeedPoint;
use super::voronoi::{ClipRect, Partition, Vertex};
use crate::schema::{OPAQUE, Rgb};

/// Render `points` over `background` on a `width` x `height` canvas, upscaled
/// by `scale`.
///
/// Cells of points on the convex hull are unbounded and are skipped, so their
/// color never reaches the image.
pub fn render_points(
    points: &[SeedPoint],
    background: Rgb,
    width: u32,
    height: u32,
    scale: u32,
) -> RgbaImage {
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(
        width.saturating_mul(scale),
        height.saturating_mul(scale),
        Rgba([r, g, b, OPAQUE]),
    );

    let sites: Vec<(i32, i32)> = points.iter().map(|p| p.position).collect();
    let partition = Partition::compute(&sites, ClipRect::canvas(width, height));

    for (point, cell) in points.iter().zip(partition.cells()) {
        let Some(polygon) = cell.polygon() else {
            continue;
        };
        if let Some(pixels) = to_pixel_polygon(polygon, scale) {
            composite_polygon(&mut canvas, &pixels, Rgba(point.color));
        }
    }

    canvas
}

/// Scale a cell to output pixels and drop repeated vertices.
///
/// Returns `None` when fewer than three distinct vertices remain, which
/// `draw_polygon_mut` cannot fill.
fn to_pixel_polygon(polygon: &[Vertex], scale: u32) -> Option<Vec<Point<i32>>> {
    let s = scale as f64;
    let mut pixels: Vec<Point<i32>> = polygon
        .iter()
        .map(|&(x, y)| Point::new((x * s).round() as i32, (y * s).round() as i32))
        .collect();
    pixels.dedup();
    while pixels.len() > 1 && pixels.first() == pixels.last() {
        pixels.pop();
    }
    (pixels.len() >= 3).then_some(pixels)
}

/// Composite a filled polygon over the canvas (Porter-Duff "over").
fn composite_polygon(canvas: &mut RgbaImage, polygon: &[Point<i32>], color: Rgba<u8>) {
    match color.0[3] {
        0 => {}
        // Compositing an opaque layer replaces the covered pixels
        OPAQUE => draw_polygon_mut(canvas, polygon, color),
        _ => {
            let mut layer = RgbaImage::new(canvas.width(), canvas.height());
            draw_polygon_mut(&mut layer, polygon, color);
            for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
                if src.0[3] != 0 {
                    dst.blend(src);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_center(center: [u8; 4]) -> Vec<SeedPoint> {
        let corner = [255, 255, 255, 255];
        vec![
            SeedPoint::new((0, 0), corner),
            SeedPoint::new((100, 0), corner),
            SeedPoint::new((100, 100), corner),
            SeedPoint::new((0, 100), corner),
            SeedPoint::new((50, 50), center),
        ]
    }

    #[test]
    fn test_background_only_for_hull_points() {
        let points = vec![
            SeedPoint::new((1, 1), [255, 0, 0, 255]),
            SeedPoint::new((8, 2), [0, 255, 0, 255]),
            SeedPoint::new((4, 9), [0, 0, 255, 255]),
        ];
        let img = render_points(&points, [10, 20, 30], 10, 10, 1);
        assert_eq!(img.dimensions(), (10, 10));
        assert!(img.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_interior_cell_is_drawn() {
        let img = render_points(&square_with_center([200, 0, 0, 255]), [0, 0, 0], 100, 100, 1);
        assert_eq!(*img.get_pixel(50, 50), Rgba([200, 0, 0, 255]));
        assert_eq!(*img.get_pixel(60, 45), Rgba([200, 0, 0, 255]));
        // Corners belong to unbounded cells
        assert_eq!(*img.get_pixel(2, 2), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(97, 97), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_scale_multiplies_resolution() {
        let points = square_with_center([0, 200, 0, 255]);
        let img = render_points(&points, [0, 0, 0], 100, 100, 3);
        assert_eq!(img.dimensions(), (300, 300));
        assert_eq!(*img.get_pixel(150, 150), Rgba([0, 200, 0, 255]));
        assert_eq!(*img.get_pixel(6, 6), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_later_point_wins() {
        let mut points = square_with_center([200, 0, 0, 255]);
        points.push(SeedPoint::new((50, 50), [0, 0, 200, 255]));
        let img = render_points(&points, [0, 0, 0], 100, 100, 1);
        assert_eq!(*img.get_pixel(50, 50), Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn test_translucent_cell_blends() {
        let img = render_points(&square_with_center([255, 0, 0, 128]), [0, 0, 0], 100, 100, 1);
        let px = img.get_pixel(50, 50);
        assert!((120..=136).contains(&px.0[0]));
        assert_eq!(px.0[3], 255);
    }

    #[test]
    fn test_render_is_deterministic() {
        let points: Vec<SeedPoint> = (0..30)
            .map(|i| SeedPoint::new(((i * 37) % 64, (i * 53) % 48), [i as u8 * 8, 100, 50, 255]))
            .collect();
        let a = render_points(&points, [5, 5, 5], 64, 48, 2);
        let b = render_points(&points, [5, 5, 5], 64, 48, 2);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_pixel_polygon_dedup() {
        let polygon = vec![(0.0, 0.0), (0.1, 0.1), (5.0, 0.0), (5.0, 5.0), (0.2, 0.0)];
        let pixels = to_pixel_polygon(&polygon, 1).unwrap();
        assert_eq!(pixels.len(), 3);
        assert!(to_pixel_polygon(&[(0.0, 0.0), (0.2, 0.2), (0.4, 0.1)], 1).is_none());
    }
}
