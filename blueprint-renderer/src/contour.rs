/// Height shading, upscaling and contour line glyphs for a single view
use crate::rasterizer::ViewBuffer;
use constants::render_settings::{
    CONTOUR_STEP, EMPTY_HEIGHT, FOREGROUND_COLOUR, SHADE_FLOOR, UPSCALE_FACTOR,
};
use image::{Rgb, RgbImage};

const F: usize = UPSCALE_FACTOR as usize;

type Glyph = [[bool; F]; F];

/// A view turned into output pixels, plus the padded height grid the firing overlay
/// depth-tests against.
#[derive(Debug, Clone)]
pub struct ViewImage {
    pub image: RgbImage,
    pub padded: ViewBuffer,
}

/// Surround a view with `border` empty cells on every side
pub fn pad(view: &ViewBuffer, border: usize) -> ViewBuffer {
    let mut out = ViewBuffer::new(view.rows + 2 * border, view.cols + 2 * border);
    for r in 0..view.rows {
        let src = view.index(r, 0);
        let dst = out.index(r + border, border);
        out.colours[dst..dst + view.cols].copy_from_slice(&view.colours[src..src + view.cols]);
        out.heights[dst..dst + view.cols].copy_from_slice(&view.heights[src..src + view.cols]);
    }
    out
}

/// Lowest and highest height with empty cells counted as the highest
fn shade_range(heights: &[i32]) -> (i64, i64) {
    let hmax = heights.iter().copied().max().unwrap_or(0) as i64;
    let hmin = heights
        .iter()
        .map(|&h| if h == EMPTY_HEIGHT { hmax } else { h as i64 })
        .min()
        .unwrap_or(hmax);
    if hmin == hmax { (hmin - 1, hmax) } else { (hmin, hmax) }
}

/// Brightness multiplier, 1 at the highest cell and 4/5 at the lowest
pub fn shade_factor(height: i32, hmin: i64, hmax: i64) -> f64 {
    let h = if height == EMPTY_HEIGHT { hmax } else { height as i64 };
    let dh = (hmax - hmin) as f64;
    let floor = SHADE_FLOOR as f64 * dh;
    (h as f64 + floor - hmin as f64) / (floor + dh)
}

/// Pad, shade, upscale and optionally draw contour lines
pub fn render_view(view: &ViewBuffer, border: usize, contours: bool) -> ViewImage {
    let padded = pad(view, border);
    let (hmin, hmax) = shade_range(&padded.heights);

    let mut image = RgbImage::new((padded.cols * F) as u32, (padded.rows * F) as u32);
    for r in 0..padded.rows {
        for c in 0..padded.cols {
            let factor = shade_factor(padded.height(r, c), hmin, hmax);
            let colour = padded.colour(r, c).map(|v| (v as f64 * factor).clamp(0.0, 255.0) as u8);
            fill_cell(&mut image, r, c, Rgb(colour));
        }
    }

    if contours {
        draw_contours(&mut image, &padded);
    }

    ViewImage { image, padded }
}

fn fill_cell(image: &mut RgbImage, row: usize, col: usize, colour: Rgb<u8>) {
    for y in 0..F {
        for x in 0..F {
            image.put_pixel((col * F + x) as u32, (row * F + y) as u32, colour);
        }
    }
}

/// Edge flags of one cell, in up/down/left/right order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellEdges {
    pub sides: [bool; 4],
    pub circle: bool,
    /// `/`
    pub rising: bool,
    /// `\`
    pub falling: bool,
}

const UP: usize = 0;
const DOWN: usize = 1;
const LEFT: usize = 2;
const RIGHT: usize = 3;

/// Classify the contour pattern of a cell from its four neighbours
pub fn classify(view: &ViewBuffer, row: usize, col: usize) -> CellEdges {
    let h = view.height(row, col) as i64;
    let neighbour = |dr: isize, dc: isize| -> i64 {
        let r = row as isize + dr;
        let c = col as isize + dc;
        if r < 0 || c < 0 || r as usize >= view.rows || c as usize >= view.cols {
            EMPTY_HEIGHT as i64
        } else {
            view.height(r as usize, c as usize) as i64
        }
    };
    let around = [neighbour(-1, 0), neighbour(1, 0), neighbour(0, -1), neighbour(0, 1)];

    let mut step = around.map(|n| h - n > CONTOUR_STEP);
    let filled = h != EMPTY_HEIGHT as i64;
    let silhouette = around.map(|n| filled && n == EMPTY_HEIGHT as i64);
    let lone_silhouette = silhouette.iter().filter(|s| **s).count() == 1;

    let mut edges = CellEdges::default();
    match step.iter().filter(|s| **s).count() {
        4 => {
            edges.circle = true;
            step = [false; 4];
        }
        2 if step[UP] == step[LEFT] => {
            edges.rising = true;
            step = [false; 4];
        }
        2 if step[UP] == step[RIGHT] => {
            edges.falling = true;
            step = [false; 4];
        }
        _ => {}
    }
    if lone_silhouette {
        for (s, edge) in silhouette.iter().zip(step.iter_mut()) {
            *edge |= *s;
        }
    }
    edges.sides = step;
    edges
}

fn side_glyph(side: usize) -> Glyph {
    let mut g = [[false; F]; F];
    for i in 0..F {
        match side {
            UP => g[0][i] = true,
            DOWN => g[F - 1][i] = true,
            LEFT => g[i][0] = true,
            _ => g[i][F - 1] = true,
        }
    }
    g
}

/// Midpoint circle of radius `F / 2` centred in the cell
fn circle_glyph() -> Glyph {
    let mut g = [[false; F]; F];
    let centre = (F / 2) as i32;
    let (mut x, mut y) = (0i32, centre);
    let mut d = 1 - centre;
    while x <= y {
        for (dx, dy) in [(x, y), (y, x)] {
            for (sx, sy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
                g[(centre + sy * dy) as usize][(centre + sx * dx) as usize] = true;
            }
        }
        x += 1;
        if d < 0 {
            d += 2 * x + 1;
        } else {
            y -= 1;
            d += 2 * (x - y) + 1;
        }
    }
    g
}

fn diagonal_glyph(rising: bool) -> Glyph {
    let mut g = [[false; F]; F];
    for i in 0..F {
        if rising {
            g[i][F - 1 - i] = true;
        } else {
            g[i][i] = true;
        }
    }
    g
}

fn stamp(image: &mut RgbImage, row: usize, col: usize, glyph: &Glyph) {
    for (y, line) in glyph.iter().enumerate() {
        for (x, on) in line.iter().enumerate() {
            if *on {
                image.put_pixel((col * F + x) as u32, (row * F + y) as u32, Rgb(FOREGROUND_COLOUR));
            }
        }
    }
}

fn draw_contours(image: &mut RgbImage, view: &ViewBuffer) {
    let sides = [side_glyph(UP), side_glyph(DOWN), side_glyph(LEFT), side_glyph(RIGHT)];
    let circle = circle_glyph();
    let rising = diagonal_glyph(true);
    let falling = diagonal_glyph(false);

    for r in 0..view.rows {
        for c in 0..view.cols {
            let edges = classify(view, r, c);
            for (on, glyph) in edges.sides.iter().zip(sides.iter()) {
                if *on {
                    stamp(image, r, c, glyph);
                }
            }
            if edges.circle {
                stamp(image, r, c, &circle);
            }
            if edges.rising {
                stamp(image, r, c, &rising);
            }
            if edges.falling {
                stamp(image, r, c, &falling);
            }
        }
    }
}
