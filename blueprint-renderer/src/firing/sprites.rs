/// Muzzle flash sprite sequences, loaded from PNG frames or generated
use crate::error::AssetError;
use constants::animation::{
    BACK_SPRITE_DEPTH, FRONT_SPRITE_DEPTH, FRONT_SPRITE_ORIGIN, FRONT_SPRITE_SIZE, SIDE_SPRITE_DEPTH,
    SIDE_SPRITE_ORIGIN, SIDE_SPRITE_SIZE, SPRITE_FRAME_COUNT,
};
use constants::render_settings::UPSCALE_FACTOR;
use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Sprite pixels stored ready for blending: `colour * alpha` and `1 - alpha`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    rows: usize,
    cols: usize,
    premultiplied: Vec<[u8; 3]>,
    background_weight: Vec<f32>,
}

impl Sprite {
    pub fn from_rgba(image: &RgbaImage) -> Sprite {
        let (cols, rows) = (image.width() as usize, image.height() as usize);
        let mut premultiplied = Vec::with_capacity(rows * cols);
        let mut background_weight = Vec::with_capacity(rows * cols);
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as f32 / 255.0;
            premultiplied.push([r, g, b].map(|v| (v as f32 * alpha) as u8));
            background_weight.push(1.0 - alpha);
        }
        Sprite {
            rows,
            cols,
            premultiplied,
            background_weight,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Premultiplied colour and background weight at (row, col)
    pub fn pixel(&self, row: usize, col: usize) -> ([u8; 3], f32) {
        let i = row * self.cols + col;
        (self.premultiplied[i], self.background_weight[i])
    }

    fn remap(&self, rows: usize, cols: usize, source: impl Fn(usize, usize) -> (usize, usize)) -> Sprite {
        let mut premultiplied = Vec::with_capacity(rows * cols);
        let mut background_weight = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let (pixel, weight) = {
                    let (sr, sc) = source(r, c);
                    self.pixel(sr, sc)
                };
                premultiplied.push(pixel);
                background_weight.push(weight);
            }
        }
        Sprite {
            rows,
            cols,
            premultiplied,
            background_weight,
        }
    }

    fn transposed(&self) -> Sprite {
        self.remap(self.cols, self.rows, |r, c| (c, r))
    }

    fn flipped_rows(&self) -> Sprite {
        let rows = self.rows;
        self.remap(self.rows, self.cols, |r, c| (rows - 1 - r, c))
    }

    fn flipped_cols(&self) -> Sprite {
        let cols = self.cols;
        self.remap(self.rows, self.cols, |r, c| (r, cols - 1 - c))
    }
}

/// A sprite picked for one event in one frame.
#[derive(Debug, Clone, Copy)]
pub struct SpriteFrame<'a> {
    pub sprite: &'a Sprite,
    /// Depth the flash reaches above its muzzle cell
    pub depth: i32,
    /// Muzzle pixel inside the sprite, (row, col)
    pub offset: [i32; 2],
}

/// Flash sequences for every screen direction: 0 right, 1 up, 2 left, 3 down,
/// 4 toward the viewer, 5 away.
#[derive(Debug, Clone)]
pub struct SpriteSet {
    side: [Vec<Sprite>; 4],
    front: Vec<Sprite>,
    back: Vec<Sprite>,
    offsets: [[i32; 2]; 6],
}

impl SpriteSet {
    /// Build the rotated sequences; `back` holds the two dedicated back frames
    /// which replace frames 1 and 2 of the front sequence
    fn from_sequences(side: Vec<Sprite>, front: Vec<Sprite>, back_frames: [Sprite; 2]) -> SpriteSet {
        let [back1, back2] = back_frames;
        let mut back = front.clone();
        if back.len() > 2 {
            back[1] = back1;
            back[2] = back2;
        }

        let f = UPSCALE_FACTOR as i32;
        let [a, b] = SIDE_SPRITE_ORIGIN;
        let (c, d) = side.first().map_or((0, 0), |s| (s.rows as i32, s.cols as i32));
        let offsets = [
            [a, b],
            [d - f, c - a - f],
            [c - a - f, d - f],
            [-b, c - a - f],
            FRONT_SPRITE_ORIGIN,
            FRONT_SPRITE_ORIGIN,
        ];

        let up = side.iter().map(|s| s.transposed().flipped_rows()).collect();
        let left = side.iter().map(Sprite::flipped_cols).collect();
        let down = side.iter().map(|s| s.transposed().flipped_cols()).collect();

        SpriteSet {
            side: [side, up, left, down],
            front,
            back,
            offsets,
        }
    }

    /// Load `frame0..5.png`, `frame_front0..5.png` and `frame_back1..2.png` from `dir`
    pub fn load(dir: &Path) -> Result<SpriteSet, AssetError> {
        let side = load_sequence(dir, "frame", SPRITE_FRAME_COUNT)?;
        let front = load_sequence(dir, "frame_front", SPRITE_FRAME_COUNT)?;
        let front_size = front.first().map(RgbaImage::dimensions);

        let load_back = |state: usize| -> Result<Sprite, AssetError> {
            let path = dir.join(format!("frame_back{state}.png"));
            let image = load_frame(&path)?;
            match front_size {
                Some(expected) if expected != image.dimensions() => Err(AssetError::SpriteSize {
                    path,
                    expected,
                    found: image.dimensions(),
                }),
                _ => Ok(Sprite::from_rgba(&image)),
            }
        };
        let back = [load_back(1)?, load_back(2)?];

        debug!("Loaded firing sprites from {}", dir.display());
        Ok(Self::from_sequences(
            side.iter().map(Sprite::from_rgba).collect(),
            front.iter().map(Sprite::from_rgba).collect(),
            back,
        ))
    }

    /// Generated flashes, used when no sprite directory is configured
    pub fn procedural() -> SpriteSet {
        let [side_rows, side_cols] = SIDE_SPRITE_SIZE;
        let [front_rows, front_cols] = FRONT_SPRITE_SIZE;
        let muzzle_row = SIDE_SPRITE_ORIGIN[0] as f32;
        let centre = FRONT_SPRITE_ORIGIN.map(|v| v as f32 + 0.5);

        let side = (0..SPRITE_FRAME_COUNT)
            .map(|state| {
                let (growth, fade) = flash_curve(state);
                let length = side_cols as f32 * growth;
                let half_height = 3.0 + (side_rows as f32 / 2.0 - 4.0) * growth;
                Sprite::from_rgba(&flash(
                    side_rows,
                    side_cols,
                    [muzzle_row + 0.5, length / 2.0],
                    [half_height, length / 2.0],
                    fade,
                ))
            })
            .collect();

        let front: Vec<Sprite> = (0..SPRITE_FRAME_COUNT)
            .map(|state| {
                let (growth, fade) = flash_curve(state);
                let radius = 4.0 + (front_rows as f32 / 2.0 - 5.0) * growth;
                Sprite::from_rgba(&flash(front_rows, front_cols, centre, [radius, radius], fade))
            })
            .collect();

        let back = [1, 2].map(|state| {
            let (growth, fade) = flash_curve(state);
            let radius = 2.0 + 6.0 * growth;
            Sprite::from_rgba(&flash(front_rows, front_cols, centre, [radius, radius], fade * 0.8))
        });

        Self::from_sequences(side, front, back)
    }

    pub fn sequence_len(&self) -> usize {
        self.side[0].len()
    }

    /// Sprite, depth and muzzle offset for a lifecycle state and screen direction
    pub fn frame(&self, state: usize, rotation: usize) -> Option<SpriteFrame<'_>> {
        let (sprite, depth) = match rotation {
            0..=3 => (self.side[rotation].get(state)?, *SIDE_SPRITE_DEPTH.get(state)?),
            4 => (self.front.get(state)?, *FRONT_SPRITE_DEPTH.get(state)?),
            5 => (self.back.get(state)?, BACK_SPRITE_DEPTH),
            _ => return None,
        };
        Some(SpriteFrame {
            sprite,
            depth,
            offset: self.offsets[rotation],
        })
    }
}

fn load_frame(path: &Path) -> Result<RgbaImage, AssetError> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// `{prefix}0.png` .. `{prefix}{count - 1}.png`, all the same size
fn load_sequence(dir: &Path, prefix: &str, count: usize) -> Result<Vec<RgbaImage>, AssetError> {
    let mut frames: Vec<RgbaImage> = Vec::with_capacity(count);
    for state in 0..count {
        let path = dir.join(format!("{prefix}{state}.png"));
        let image = load_frame(&path)?;
        if let Some(first) = frames.first() {
            if first.dimensions() != image.dimensions() {
                return Err(AssetError::SpriteSize {
                    path,
                    expected: first.dimensions(),
                    found: image.dimensions(),
                });
            }
        }
        frames.push(image);
    }
    Ok(frames)
}

/// Growth and opacity of the generated flash over its lifetime
fn flash_curve(state: usize) -> (f32, f32) {
    const GROWTH: [f32; SPRITE_FRAME_COUNT] = [0.3, 0.6, 0.9, 1.0, 1.0, 1.0];
    const FADE: [f32; SPRITE_FRAME_COUNT] = [1.0, 1.0, 0.9, 0.7, 0.45, 0.2];
    let i = state.min(SPRITE_FRAME_COUNT - 1);
    (GROWTH[i], FADE[i])
}

/// Elliptic flash, pale at `centre` and orange toward the rim
fn flash(rows: u32, cols: u32, centre: [f32; 2], radii: [f32; 2], fade: f32) -> RgbaImage {
    const RIM: [f32; 3] = [255.0, 110.0, 20.0];
    const CORE: [f32; 3] = [255.0, 245.0, 190.0];
    RgbaImage::from_fn(cols, rows, |x, y| {
        let dy = (y as f32 + 0.5 - centre[0]) / radii[0].max(0.5);
        let dx = (x as f32 + 0.5 - centre[1]) / radii[1].max(0.5);
        let distance = (dx * dx + dy * dy).sqrt();
        if distance >= 1.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let heat = 1.0 - distance;
        let colour: [u8; 3] = std::array::from_fn(|i| (RIM[i] + (CORE[i] - RIM[i]) * heat) as u8);
        let alpha = (fade * (0.35 + 0.65 * heat) * 255.0) as u8;
        Rgba([colour[0], colour[1], colour[2], alpha])
    })
}
