use crate::session::bbox::{BboxParseError, BoundingBox};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use thiserror::Error;

pub const BOX_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const STROKE_WIDTH: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("Invalid format! Expected: x, y, width, height")]
    Format(#[source] BboxParseError),
}

#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image: RgbaImage,
    pub bbox: BoundingBox,
    pub message: String,
}

pub fn draw_bounding_box(image: &DynamicImage, coords: &str) -> Result<AnnotatedImage, PreviewError> {
    let bbox = BoundingBox::parse(coords).map_err(PreviewError::Format)?;
    let mut canvas = image.to_rgba8();
    draw_outline(&mut canvas, bbox);

    Ok(AnnotatedImage {
        image: canvas,
        bbox,
        message: format!("Box drawn at ({bbox})"),
    })
}

/// Outline from `(x, y)` to `(x + w, y + h)` inclusive, stroke grows inward.
fn draw_outline(canvas: &mut RgbaImage, bbox: BoundingBox) {
    let (left, right) = ordered(i64::from(bbox.x), bbox.right());
    let (top, bottom) = ordered(i64::from(bbox.y), bbox.bottom());

    // Edges pushed past the canvas stay off-canvas but keep sizes in range.
    let clamp_x = |v: i64| v.clamp(-STROKE_WIDTH, i64::from(canvas.width()) + STROKE_WIDTH);
    let clamp_y = |v: i64| v.clamp(-STROKE_WIDTH, i64::from(canvas.height()) + STROKE_WIDTH);
    let (left, right) = (clamp_x(left), clamp_x(right));
    let (top, bottom) = (clamp_y(top), clamp_y(bottom));

    for inset in 0..STROKE_WIDTH {
        let width = right - left + 1 - 2 * inset;
        let height = bottom - top + 1 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at((left + inset) as i32, (top + inset) as i32)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
