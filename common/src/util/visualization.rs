use crate::db::hierarchy;
use crate::db::layout::{Layout, ShapeLayer};
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

const METAL_COLORS: [Rgba<u8>; 6] = [
    // M1: Blue
    Rgba([0, 110, 255, 255]),
    // M2: Red
    Rgba([255, 20, 80, 255]),
    // M3: Green
    Rgba([0, 255, 100, 255]),
    // M4: Gold
    Rgba([255, 215, 0, 255]),
    // M5: Violet
    Rgba([180, 50, 255, 255]),
    // M6: Cyan
    Rgba([0, 240, 255, 255]),
];

/// Renders every flattened shape of `layout` to a square PNG. Lower metals
/// are drawn first, cuts on top of the metals, and remaining unrouted
/// placeholders as yellow flight lines.
pub fn draw_layout(layout: &Layout, filename: &str, size: u32) -> anyhow::Result<()> {
    let mut metals: Vec<(usize, Rect, u32)> = Vec::new();
    let mut cuts: Vec<Rect> = Vec::new();
    hierarchy::enumerate(layout, |shape| match shape.layer {
        ShapeLayer::Metal(layer) => metals.push((layer, shape.geometry.bbox(), shape.net)),
        ShapeLayer::Cut(_) => cuts.push(shape.geometry.bbox()),
    })?;

    let Some(bounds) = metals
        .iter()
        .map(|(_, r, _)| *r)
        .chain(cuts.iter().copied())
        .reduce(|a, b| a.union(&b))
    else {
        log::warn!("Nothing to draw for {}", filename);
        return Ok(());
    };
    let bounds = bounds.expand(bounds.width().max(bounds.height()) * 0.02);

    let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255]));
    let scale = size as f64 / bounds.width().max(bounds.height()).max(1e-9);
    let map = |p: Point<f64>| {
        (
            (p.x - bounds.min.x) * scale,
            size as f64 - (p.y - bounds.min.y) * scale,
        )
    };
    let to_image = |r: &Rect| {
        let (x0, y1) = map(r.min);
        let (x1, y0) = map(r.max);
        ImageRect::at(x0 as i32, y0 as i32)
            .of_size(((x1 - x0) as u32).max(1), ((y1 - y0) as u32).max(1))
    };

    metals.sort_by_key(|(layer, _, _)| *layer);
    for (layer, rect, net) in &metals {
        let color = METAL_COLORS[(*layer).min(METAL_COLORS.len() - 1)];
        if *net == 0 {
            // unconnected obstructions are outlined only
            draw_hollow_rect_mut(&mut img, to_image(rect), color);
        } else {
            draw_filled_rect_mut(&mut img, to_image(rect), color);
        }
    }
    for cut in &cuts {
        draw_filled_rect_mut(&mut img, to_image(cut), Rgba([255, 255, 255, 255]));
    }

    let top = layout.top_cell()?;
    for wire in &top.unrouted {
        let head = layout.port_info(layout.top, wire.head)?.center;
        let tail = layout.port_info(layout.top, wire.tail)?.center;
        let (x0, y0) = map(head);
        let (x1, y1) = map(tail);
        draw_line_segment_mut(
            &mut img,
            (x0 as f32, y0 as f32),
            (x1 as f32, y1 as f32),
            Rgba([255, 255, 0, 255]),
        );
    }

    img.save(Path::new(filename))?;
    Ok(())
}
