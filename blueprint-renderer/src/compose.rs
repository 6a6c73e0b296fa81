/// Canvas composition: views, info panel, seam separators and aspect ratio padding
use crate::rasterizer::ViewKind;
use constants::render_settings::{BACKGROUND_COLOUR, SEPARATOR_COLOUR, SEPARATOR_WIDTH};
use image::{Rgb, RgbImage, imageops};
use tracing::debug;

/// Pixel rectangle of a view inside the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbImage,
    placements: [Placement; 3],
}

impl Composite {
    pub fn placement(&self, kind: ViewKind) -> Placement {
        match kind {
            ViewKind::Side => self.placements[0],
            ViewKind::Top => self.placements[1],
            ViewKind::Front => self.placements[2],
        }
    }
}

/// Extra background around an image
fn pad_image(image: &RgbImage, top: u32, bottom: u32, left: u32, right: u32) -> RgbImage {
    if top == 0 && bottom == 0 && left == 0 && right == 0 {
        return image.clone();
    }
    let mut out = RgbImage::from_pixel(
        image.width() + left + right,
        image.height() + top + bottom,
        Rgb(BACKGROUND_COLOUR),
    );
    imageops::replace(&mut out, image, left as i64, top as i64);
    out
}

fn fill_rect(image: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, colour: [u8; 3]) {
    let x1 = (x + width).min(image.width());
    let y1 = (y + height).min(image.height());
    for py in y.min(y1)..y1 {
        for px in x.min(x1)..x1 {
            image.put_pixel(px, py, Rgb(colour));
        }
    }
}

/// Padding (before, after) along the short dimension so that width / height matches `ratio`.
/// Returns `(true, ..)` when height is padded, `(false, ..)` for width.
pub fn aspect_padding(width: u32, height: u32, ratio: f64) -> (bool, u32, u32) {
    let (w, h) = (width as f64, height.max(1) as f64);
    if w / h > ratio {
        let needed = ((w / ratio) as i64 - height as i64).max(0) as u32;
        (true, needed / 2, needed - needed / 2)
    } else {
        let needed = ((h * ratio) as i64 - width as i64).max(0) as u32;
        (false, needed / 2, needed - needed / 2)
    }
}

/// Lay out side | front over top | info with 2 px separators on every seam
pub fn compose(
    side: &RgbImage,
    front: &RgbImage,
    top: &RgbImage,
    info: &RgbImage,
    aspect_ratio: Option<f64>,
) -> Composite {
    let (mut side, mut front, mut top, mut info) = (side.clone(), front.clone(), top.clone(), info.clone());

    if let Some(ratio) = aspect_ratio.filter(|r| r.is_finite() && *r > 0.0) {
        let width = side.width() + info.width();
        let height = side.height() + info.height();
        let (pad_height, before, after) = aspect_padding(width, height, ratio);
        debug!("Aspect ratio padding {} + {} ({})", before, after, if pad_height { "height" } else { "width" });
        if pad_height {
            side = pad_image(&side, before, 0, 0, 0);
            front = pad_image(&front, before, 0, 0, 0);
            top = pad_image(&top, 0, after, 0, 0);
            info = pad_image(&info, 0, after, 0, 0);
        } else {
            side = pad_image(&side, 0, 0, before, 0);
            top = pad_image(&top, 0, 0, before, 0);
            front = pad_image(&front, 0, 0, 0, after);
            info = pad_image(&info, 0, 0, 0, after);
        }
    }

    let top_row = side.height().max(front.height());
    let bottom_row = top.height().max(info.height());
    let width = (side.width() + front.width()).max(top.width() + info.width());
    let height = top_row + bottom_row;

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(BACKGROUND_COLOUR));
    let placements = [
        Placement {
            x: 0,
            y: 0,
            width: side.width(),
            height: side.height(),
        },
        Placement {
            x: 0,
            y: top_row,
            width: top.width(),
            height: top.height(),
        },
        Placement {
            x: side.width(),
            y: 0,
            width: front.width(),
            height: front.height(),
        },
    ];
    for (image, place) in [(&side, placements[0]), (&top, placements[1]), (&front, placements[2])] {
        imageops::replace(&mut canvas, image, place.x as i64, place.y as i64);
    }
    imageops::replace(&mut canvas, &info, top.width() as i64, top_row as i64);

    let sep = SEPARATOR_WIDTH;
    // side | front
    fill_rect(&mut canvas, side.width().saturating_sub(sep), 0, sep, side.height(), SEPARATOR_COLOUR);
    fill_rect(&mut canvas, side.width(), 0, sep, front.height(), SEPARATOR_COLOUR);
    // top | info
    fill_rect(&mut canvas, top.width().saturating_sub(sep), top_row, sep, bottom_row, SEPARATOR_COLOUR);
    fill_rect(&mut canvas, top.width(), top_row, sep, info.height(), SEPARATOR_COLOUR);
    // upper row / lower row
    fill_rect(&mut canvas, 0, top_row.saturating_sub(sep), width, sep, SEPARATOR_COLOUR);
    fill_rect(&mut canvas, 0, top_row, width, sep, SEPARATOR_COLOUR);

    Composite {
        image: canvas,
        placements,
    }
}
