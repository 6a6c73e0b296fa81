/// Per-frame firing overlays drawn over the composed still image
use super::sprites::SpriteSet;
use super::{FiringEvent, FiringKind, Schedule};
use crate::compose::Placement;
use crate::rasterizer::{ViewBuffer, ViewKind, ViewSet};
use constants::beam::{BeamStyle, FLAME_BASE, FLAME_KERNEL, FLAME_NOISE_GAIN, LASER_BEAM, PARTICLE_BEAM};
use constants::render_settings::UPSCALE_FACTOR;
use image::{Rgb, RgbImage};
use rand::{Rng, RngCore};

const F: i64 = UPSCALE_FACTOR as i64;

/// Where a view sits in the canvas and the heights it depth-tests against.
#[derive(Debug, Clone, Copy)]
pub struct ViewTarget<'a> {
    pub kind: ViewKind,
    /// Border-padded heights, one cell per `UPSCALE_FACTOR` pixels
    pub padded: &'a ViewBuffer,
    pub placement: Placement,
}

/// An event as seen from one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Projected {
    event: usize,
    /// Muzzle in padded cells, (row, col)
    cell: [i64; 2],
    depth: i64,
    rotation: usize,
}

struct ViewLayer<'a> {
    target: ViewTarget<'a>,
    /// Back to front
    events: Vec<Projected>,
}

/// Screen direction of a shot: 0 right, 1 up, 2 left, 3 down, 4 toward the viewer, 5 away
pub fn sprite_rotation(kind: ViewKind, direction: [i32; 3]) -> usize {
    let [row_axis, col_axis, depth_axis] = kind.axes();
    let top = kind == ViewKind::Top;
    let front = kind == ViewKind::Front;
    match (direction[row_axis], direction[col_axis], direction[depth_axis]) {
        (1, _, _) => if top { 3 } else { 1 },
        (-1, _, _) => if top { 1 } else { 3 },
        (_, 1, _) => if front { 2 } else { 0 },
        (_, -1, _) => if front { 0 } else { 2 },
        (_, _, 1) => 4,
        (_, _, -1) => 5,
        _ => 0,
    }
}

/// Row/column multiplier and addend that map unflipped view cells to screen cells
fn screen_flip(kind: ViewKind, rows: i64, cols: i64) -> ([i64; 2], [i64; 2]) {
    match kind {
        ViewKind::Side => ([-1, 1], [rows - 1, 0]),
        ViewKind::Front => ([-1, -1], [rows - 1, cols - 1]),
        ViewKind::Top => ([1, 1], [0, 0]),
    }
}

/// Pixel rectangle `[start, end)` of a beam leaving `muzzle` (view pixels, row/col), in
/// canvas pixels and kept two pixels clear of the view's edges
pub fn beam_rect(
    muzzle: [i64; 2],
    origin: [i64; 2],
    size: [i64; 2],
    rotation: usize,
    offset: i64,
    width: i64,
) -> Option<([i64; 2], [i64; 2])> {
    if size.iter().any(|s| *s < 5) {
        return None;
    }
    let mut sp = muzzle;
    let at = |p: [i64; 2]| [p[0] + origin[0], p[1] + origin[1]];
    let (start, end) = match rotation {
        0 => {
            sp[0] += offset;
            let start = at(sp);
            (start, [start[0] + width, i64::MAX])
        }
        1 => {
            sp = sp.map(|v| v + F - 1);
            sp[1] -= offset;
            let end = at(sp).map(|v| v + 1);
            ([0, end[1] - width], end)
        }
        2 => {
            sp = sp.map(|v| v + F);
            sp[0] -= offset;
            let end = at(sp);
            ([end[0] - width, 0], end)
        }
        3 => {
            sp[1] += offset;
            let start = at(sp);
            (start, [i64::MAX, start[1] + width])
        }
        _ => {
            let start = at(sp.map(|v| v + offset));
            (start, start.map(|v| v + width))
        }
    };
    let start: [i64; 2] = std::array::from_fn(|i| start[i].clamp(origin[i] + 2, origin[i] + size[i] - 3));
    let end: [i64; 2] = std::array::from_fn(|i| end[i].clamp(origin[i] + 3, origin[i] + size[i] - 2));
    (start[0] < end[0] && start[1] < end[1]).then_some((start, end))
}

fn blend(pixel: &mut Rgb<u8>, premultiplied: [u8; 3], background_weight: f32) {
    for (dst, src) in pixel.0.iter_mut().zip(premultiplied) {
        *dst = (src as f32 + *dst as f32 * background_weight).min(255.0) as u8;
    }
}

/// Random field blurred with the flame kernel, mirrored at the edges, as flame colours
fn flame_colours<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Vec<[u8; 3]> {
    let noise: Vec<f32> = (0..rows * cols).map(|_| rng.r#gen::<f32>()).collect();
    let total: f32 = FLAME_KERNEL.iter().flatten().sum();
    let mirror = |i: i64, n: usize| -> usize {
        let n = n as i64;
        let i = if i < 0 { -i - 1 } else if i >= n { 2 * n - i - 1 } else { i };
        i.clamp(0, n - 1) as usize
    };

    let mut colours = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let mut blurred = 0.0;
            for (kr, line) in FLAME_KERNEL.iter().enumerate() {
                for (kc, weight) in line.iter().enumerate() {
                    let sr = mirror(r as i64 + kr as i64 - 1, rows);
                    let sc = mirror(c as i64 + kc as i64 - 1, cols);
                    blurred += noise[sr * cols + sc] * weight;
                }
            }
            blurred /= total;
            colours.push(std::array::from_fn(|i| {
                (FLAME_BASE[i] + blurred * FLAME_NOISE_GAIN[i]).clamp(0.0, 255.0) as u8
            }));
        }
    }
    colours
}

/// Renders animation frames from a shared base image.
pub struct FrameRenderer<'a> {
    base: &'a RgbImage,
    layers: Vec<ViewLayer<'a>>,
    events: &'a [FiringEvent],
    schedule: &'a Schedule,
    sprites: &'a SpriteSet,
}

impl<'a> FrameRenderer<'a> {
    /// Project every event into every view; `border` is the padding the targets carry
    pub fn new(
        base: &'a RgbImage,
        views: &ViewSet,
        targets: [ViewTarget<'a>; 3],
        events: &'a [FiringEvent],
        schedule: &'a Schedule,
        sprites: &'a SpriteSet,
        border: usize,
    ) -> Self {
        let border = border as i64;
        let layers = targets
            .into_iter()
            .map(|target| {
                let rows = target.padded.rows as i64 - 2 * border;
                let cols = target.padded.cols as i64 - 2 * border;
                let (mul, add) = screen_flip(target.kind, rows, cols);
                let depth_axis = target.kind.depth_axis();

                let mut order: Vec<usize> = (0..events.len()).collect();
                order.sort_by_key(|&i| events[i].origin[depth_axis]);

                let projected = order
                    .into_iter()
                    .map(|i| {
                        let event = &events[i];
                        let (cell, depth) = views.project(target.kind, event.origin);
                        Projected {
                            event: i,
                            cell: std::array::from_fn(|k| cell[k] * mul[k] + add[k] + border),
                            depth,
                            rotation: sprite_rotation(target.kind, event.direction),
                        }
                    })
                    .collect();
                ViewLayer {
                    target,
                    events: projected,
                }
            })
            .collect();

        FrameRenderer {
            base,
            layers,
            events,
            schedule,
            sprites,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.schedule.total_frames()
    }

    /// Base image with every shot active in `frame` drawn on top
    pub fn render<R: Rng>(&self, frame: usize, rng: &mut R) -> RgbImage {
        let mut image = self.base.clone();
        for layer in &self.layers {
            for projected in &layer.events {
                let Some(state) = self.schedule.state(projected.event, frame) else {
                    continue;
                };
                match self.events[projected.event].kind {
                    FiringKind::Ballistic => self.draw_sprite(&mut image, &layer.target, projected, state),
                    FiringKind::Laser => draw_beam(&mut image, &layer.target, projected, &LASER_BEAM, None),
                    FiringKind::Particle => draw_beam(&mut image, &layer.target, projected, &PARTICLE_BEAM, None),
                    FiringKind::Flame => {
                        let flame = BeamStyle {
                            premultiplied: [0; 3],
                            background_weight: 0.0,
                            offset: (-(F as i32)).div_euclid(2),
                            width: 2 * F as i32 + 1,
                        };
                        let rng: &mut dyn RngCore = &mut *rng;
                        draw_beam(&mut image, &layer.target, projected, &flame, Some(rng));
                    }
                }
            }
        }
        image
    }

    fn draw_sprite(&self, image: &mut RgbImage, target: &ViewTarget, projected: &Projected, state: usize) {
        let Some(frame) = self.sprites.frame(state, projected.rotation) else {
            return;
        };
        let sprite = frame.sprite;
        let cell = [
            projected.cell[0] - (frame.offset[0] as i64).div_euclid(F),
            projected.cell[1] - (frame.offset[1] as i64).div_euclid(F),
        ];
        let compare = projected.depth + frame.depth as i64;
        let padded = target.padded;
        let origin = [target.placement.y as i64, target.placement.x as i64];

        for sy in 0..sprite.rows() {
            let row = cell[0] + sy as i64 / F;
            if row < 0 || row >= padded.rows as i64 {
                continue;
            }
            for sx in 0..sprite.cols() {
                let col = cell[1] + sx as i64 / F;
                if col < 0 || col >= padded.cols as i64 {
                    continue;
                }
                let (colour, weight) = sprite.pixel(sy, sx);
                if weight >= 1.0 || padded.height(row as usize, col as usize) as i64 >= compare {
                    continue;
                }
                let y = origin[0] + cell[0] * F + sy as i64;
                let x = origin[1] + cell[1] * F + sx as i64;
                if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
                    continue;
                }
                blend(image.get_pixel_mut(x as u32, y as u32), colour, weight);
            }
        }
    }
}

/// Straight beam from the muzzle to the view edge, hidden behind taller cells.
/// With `noise` the colour is a fresh flame field instead of the style's solid colour.
fn draw_beam(
    image: &mut RgbImage,
    target: &ViewTarget,
    projected: &Projected,
    style: &BeamStyle,
    noise: Option<&mut dyn RngCore>,
) {
    let placement = target.placement;
    let origin = [placement.y as i64, placement.x as i64];
    let size = [placement.height as i64, placement.width as i64];
    let muzzle = projected.cell.map(|v| v * F);
    let Some((start, end)) = beam_rect(
        muzzle,
        origin,
        size,
        projected.rotation,
        style.offset as i64,
        style.width as i64,
    ) else {
        return;
    };
    let end = [end[0].min(image.height() as i64), end[1].min(image.width() as i64)];
    if start[0] >= end[0] || start[1] >= end[1] {
        return;
    }

    let rows = (end[0] - start[0]) as usize;
    let cols = (end[1] - start[1]) as usize;
    let flame = noise.map(|rng| flame_colours(rows, cols, rng));
    let padded = target.padded;

    for r in 0..rows {
        let y = start[0] + r as i64;
        let cell_row = ((y - origin[0]) / F) as usize;
        for c in 0..cols {
            let x = start[1] + c as i64;
            let cell_col = ((x - origin[1]) / F) as usize;
            if cell_row < padded.rows
                && cell_col < padded.cols
                && padded.height(cell_row, cell_col) as i64 >= projected.depth
            {
                continue;
            }
            let colour = flame.as_ref().map_or(style.premultiplied, |f| f[r * cols + c]);
            blend(image.get_pixel_mut(x as u32, y as u32), colour, style.background_weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BlockBounds;
    use crate::catalog::SizeClass;
    use crate::compose::{Composite, compose};
    use crate::contour::{ViewImage, render_view};
    use crate::firing::FiringOrder;
    use crate::rasterizer::{RasterBlock, RasterSettings, rasterize};
    use crate::rotation::BlockAxes;
    use constants::animation::SIDE_SPRITE_DEPTH;
    use constants::render_settings::ANIMATION_BORDER;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Scene {
        views: ViewSet,
        images: Vec<ViewImage>,
        composite: Composite,
    }

    /// Cubes at z = 0 and z = 4 on the x = y = 0 line
    fn scene() -> Scene {
        let axes = BlockAxes::for_rotation_id(0).unwrap();
        let blocks: Vec<RasterBlock> = [[0, 0, 0], [0, 0, 4]]
            .into_iter()
            .map(|position| RasterBlock {
                position,
                axes,
                size: SizeClass::default(),
                colour: [200, 200, 200],
            })
            .collect();
        let bounds = BlockBounds::from_corners([0, 0, 0], [0, 0, 4]);
        let views = rasterize(&blocks, &bounds, &RasterSettings::default()).unwrap();
        let border = ANIMATION_BORDER as usize;
        let images: Vec<ViewImage> = ViewKind::ALL
            .iter()
            .map(|kind| render_view(views.view(*kind), border, false))
            .collect();
        let info = RgbImage::new(images[1].image.width().max(1), images[1].image.width().max(1));
        let composite = compose(&images[0].image, &images[2].image, &images[1].image, &info, None);
        Scene {
            views,
            images,
            composite,
        }
    }

    fn targets(scene: &Scene) -> [ViewTarget<'_>; 3] {
        std::array::from_fn(|i| {
            let kind = ViewKind::ALL[i];
            ViewTarget {
                kind,
                padded: &scene.images[i].padded,
                placement: scene.composite.placement(kind),
            }
        })
    }

    fn event(kind: FiringKind) -> Vec<FiringEvent> {
        vec![FiringEvent {
            origin: [0, 0, 1],
            direction: [0, 0, 1],
            kind,
        }]
    }

    #[test]
    fn test_sprite_rotation_per_view() {
        assert_eq!(sprite_rotation(ViewKind::Side, [0, 1, 0]), 1);
        assert_eq!(sprite_rotation(ViewKind::Side, [0, 0, 1]), 0);
        assert_eq!(sprite_rotation(ViewKind::Side, [1, 0, 0]), 4);
        assert_eq!(sprite_rotation(ViewKind::Side, [-1, 0, 0]), 5);
        assert_eq!(sprite_rotation(ViewKind::Top, [1, 0, 0]), 3);
        assert_eq!(sprite_rotation(ViewKind::Top, [0, 0, -1]), 2);
        assert_eq!(sprite_rotation(ViewKind::Front, [1, 0, 0]), 2);
        assert_eq!(sprite_rotation(ViewKind::Front, [-1, 0, 0]), 0);
        assert_eq!(sprite_rotation(ViewKind::Front, [0, -1, 0]), 3);
    }

    #[test]
    fn test_beam_rect_to_the_right() {
        let rect = beam_rect([50, 50], [0, 0], [200, 300], 0, 1, 3);
        assert_eq!(rect, Some(([51, 50], [54, 298])));
    }

    #[test]
    fn test_beam_rect_upward_is_clipped_to_view() {
        let rect = beam_rect([50, 50], [100, 0], [200, 300], 1, 1, 3);
        // runs from the view's top edge down to the muzzle
        assert_eq!(rect, Some(([102, 51], [155, 54])));
    }

    #[test]
    fn test_beam_rect_toward_viewer_is_a_square() {
        let rect = beam_rect([50, 50], [0, 0], [200, 300], 4, -3, 11);
        assert_eq!(rect, Some(([47, 47], [58, 58])));
    }

    #[test]
    fn test_laser_drawn_and_occluded() {
        let scene = scene();
        let events = event(FiringKind::Laser);
        let schedule = Schedule::new(&events, FiringOrder::AllAtOnce, 6, &mut StdRng::seed_from_u64(0));
        let sprites = SpriteSet::procedural();
        let base = &scene.composite.image;
        let renderer = FrameRenderer::new(
            base,
            &scene.views,
            targets(&scene),
            &events,
            &schedule,
            &sprites,
            ANIMATION_BORDER as usize,
        );
        let frame = renderer.render(0, &mut StdRng::seed_from_u64(0));

        // side view: muzzle cell (10, 11), beam rows 51..54 heading right
        assert_eq!(base.get_pixel(60, 52).0, [33, 118, 255]);
        assert_eq!(frame.get_pixel(60, 52).0, [166, 58, 102]);
        // the cube at z = 4 is as deep as the beam and hides it
        assert_eq!(frame.get_pixel(72, 52), base.get_pixel(72, 52));
        // past the cube the beam shows again
        assert_eq!(frame.get_pixel(80, 52).0, [166, 58, 102]);
        // rows outside the beam are untouched
        assert_eq!(frame.get_pixel(60, 56), base.get_pixel(60, 56));
    }

    #[test]
    fn test_sprite_only_inside_lifecycle() {
        let scene = scene();
        let events = event(FiringKind::Ballistic);
        let schedule = Schedule::new(&events, FiringOrder::AllAtOnce, 6, &mut StdRng::seed_from_u64(0));
        let sprites = SpriteSet::procedural();
        let base = &scene.composite.image;
        let renderer = FrameRenderer::new(
            base,
            &scene.views,
            targets(&scene),
            &events,
            &schedule,
            &sprites,
            ANIMATION_BORDER as usize,
        );
        assert_eq!(renderer.frame_count(), 6);
        let mut rng = StdRng::seed_from_u64(0);

        // side view, state 3: sprite cell (7, 11), muzzle pixel row 15 col 1 lands at (50, 56)
        let frame = renderer.render(3, &mut rng);
        assert_ne!(frame.get_pixel(56, 50), base.get_pixel(56, 50));
        assert!(SIDE_SPRITE_DEPTH[3] > 0);

        // past the end of the sequence nothing is drawn
        let after = renderer.render(6, &mut rng);
        assert_eq!(&after, base);
    }

    #[test]
    fn test_flame_is_seeded() {
        let scene = scene();
        let events = event(FiringKind::Flame);
        let schedule = Schedule::new(&events, FiringOrder::AllAtOnce, 6, &mut StdRng::seed_from_u64(0));
        let sprites = SpriteSet::procedural();
        let renderer = FrameRenderer::new(
            &scene.composite.image,
            &scene.views,
            targets(&scene),
            &events,
            &schedule,
            &sprites,
            ANIMATION_BORDER as usize,
        );
        let a = renderer.render(1, &mut StdRng::seed_from_u64(9));
        let b = renderer.render(1, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_ne!(&a, &scene.composite.image);
        // flame pixels are red with a noisy green channel
        let pixel = a.get_pixel(60, 52).0;
        assert_eq!(pixel[0], 255);
        assert_eq!(pixel[2], 0);
        assert!(pixel[1] >= 20);
    }

    #[test]
    fn test_flame_colours_in_range() {
        let colours = flame_colours(4, 6, &mut StdRng::seed_from_u64(3));
        assert_eq!(colours.len(), 24);
        assert!(colours.iter().all(|c| c[0] == 255 && c[2] == 0 && (20..=240).contains(&c[1])));
    }
}
