/// Orthographic top, side and front view rasterization with height-buffer occlusion
use crate::assembly::{Block, BlockSet};
use crate::blueprint::CraftColour;
use crate::bounds::BlockBounds;
use crate::catalog::{Catalog, SizeClass};
use crate::error::OverflowError;
use crate::rotation::BlockAxes;
use constants::coordinate_system::{AXIS_X, AXIS_Y, AXIS_Z};
use constants::render_settings::{BACKGROUND_COLOUR, EMPTY_HEIGHT, MAX_VIEW_CELLS, MAX_VIEW_EXTENT};
use rayon::prelude::*;
use tracing::{debug, warn};

/// The three projections, in on-canvas order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Side,
    Top,
    Front,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Side, ViewKind::Top, ViewKind::Front];

    /// World axes used as (row, column, depth)
    pub fn axes(self) -> [usize; 3] {
        match self {
            ViewKind::Side => [AXIS_Y, AXIS_Z, AXIS_X],
            ViewKind::Top => [AXIS_X, AXIS_Z, AXIS_Y],
            ViewKind::Front => [AXIS_Y, AXIS_X, AXIS_Z],
        }
    }

    pub fn depth_axis(self) -> usize {
        self.axes()[2]
    }

    fn index(self) -> usize {
        match self {
            ViewKind::Side => 0,
            ViewKind::Top => 1,
            ViewKind::Front => 2,
        }
    }
}

/// Colour and height grids of one projection, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewBuffer {
    pub rows: usize,
    pub cols: usize,
    pub colours: Vec<[u8; 3]>,
    pub heights: Vec<i32>,
}

impl ViewBuffer {
    /// Background colour, every height empty
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            colours: vec![BACKGROUND_COLOUR; rows * cols],
            heights: vec![EMPTY_HEIGHT; rows * cols],
        }
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn height(&self, row: usize, col: usize) -> i32 {
        self.heights[self.index(row, col)]
    }

    pub fn colour(&self, row: usize, col: usize) -> [u8; 3] {
        self.colours[self.index(row, col)]
    }

    pub fn is_empty_at(&self, row: usize, col: usize) -> bool {
        self.height(row, col) == EMPTY_HEIGHT
    }

    /// Write-if-taller, strict so the first of equal depths is kept
    fn write(&mut self, row: usize, col: usize, depth: i32, colour: [u8; 3]) {
        let i = self.index(row, col);
        if depth > self.heights[i] {
            self.heights[i] = depth;
            self.colours[i] = colour;
        }
    }

    /// Cyclic shift so the cell at (0, 0) moves to (row_shift, col_shift)
    pub fn roll(&mut self, row_shift: usize, col_shift: usize) {
        if self.rows == 0 || self.cols == 0 || (row_shift % self.rows == 0 && col_shift % self.cols == 0) {
            return;
        }
        let mut colours = vec![BACKGROUND_COLOUR; self.colours.len()];
        let mut heights = vec![EMPTY_HEIGHT; self.heights.len()];
        for r in 0..self.rows {
            let nr = (r + row_shift) % self.rows;
            for c in 0..self.cols {
                let nc = (c + col_shift) % self.cols;
                colours[nr * self.cols + nc] = self.colours[r * self.cols + c];
                heights[nr * self.cols + nc] = self.heights[r * self.cols + c];
            }
        }
        self.colours = colours;
        self.heights = heights;
    }

    /// Shift every non-empty height by `delta`
    fn offset_heights(&mut self, delta: i32) {
        if delta == 0 {
            return;
        }
        for h in self.heights.iter_mut().filter(|h| **h != EMPTY_HEIGHT) {
            *h += delta;
        }
    }

    pub fn flip_rows(&mut self) {
        for r in 0..self.rows / 2 {
            let other = self.rows - 1 - r;
            for c in 0..self.cols {
                let (a, b) = (r * self.cols + c, other * self.cols + c);
                self.colours.swap(a, b);
                self.heights.swap(a, b);
            }
        }
    }

    pub fn flip_cols(&mut self) {
        for r in 0..self.rows {
            let row = r * self.cols..(r + 1) * self.cols;
            self.colours[row.clone()].reverse();
            self.heights[row].reverse();
        }
    }
}

/// A block reduced to what rasterization needs, resolved once up front.
#[derive(Debug, Clone, Copy)]
pub struct RasterBlock {
    pub position: [i32; 3],
    pub axes: BlockAxes,
    pub size: SizeClass,
    pub colour: [u8; 3],
}

impl RasterBlock {
    /// Visit every cell of the block's size-class footprint
    pub fn for_each_cell(&self, mut f: impl FnMut([i32; 3])) {
        let BlockAxes { dir, tan, bitan } = self.axes;
        let s = self.size;
        let start: [i32; 3] =
            std::array::from_fn(|a| self.position[a] - s.zn * dir[a] - s.yn * tan[a] - s.xp * bitan[a]);
        for i in 0..=(s.xp + s.xn) {
            for j in 0..=(s.yp + s.yn) {
                for k in 0..=(s.zp + s.zn) {
                    f(std::array::from_fn(|a| start[a] + i * bitan[a] + j * tan[a] + k * dir[a]));
                }
            }
        }
    }
}

/// Rasterization switches taken from the render options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterSettings {
    /// Per world axis (x = side, y = top, z = front)
    pub clip: [Option<f64>; 3],
    pub craft_colours: bool,
}

/// Blend a material colour with a craft colour, each term truncated on its own
pub fn blend_craft_colour(material: [u8; 3], craft: &CraftColour) -> [u8; 3] {
    let a = craft.alpha;
    std::array::from_fn(|i| {
        let base = (material[i] as f32 * (1.0 - a)) as u8;
        let tint = (255.0 * craft.rgb[i] * a) as u8;
        base.saturating_add(tint)
    })
}

/// Resolve catalog colours and footprints, dropping invisible materials.
/// Craft colouring is turned off for the whole craft when the palette is missing or
/// any block points outside it.
pub fn prepare_blocks(
    set: &BlockSet,
    catalog: &Catalog,
    palette: Option<&[CraftColour]>,
    craft_colours: bool,
) -> Vec<RasterBlock> {
    let palette = if craft_colours {
        match palette {
            None => {
                warn!("Blueprint has no craft colour table, craft colouring disabled");
                None
            }
            Some(p) if set.blocks.iter().any(|b| !palette_covers(p, b)) => {
                warn!("Block colour index outside the craft colour table, craft colouring disabled");
                None
            }
            Some(p) => Some(p),
        }
    } else {
        None
    };

    set.blocks
        .iter()
        .filter_map(|block| {
            let kind = catalog.kind(block.kind);
            let material = catalog.material(kind.material);
            if material.invisible {
                return None;
            }
            let colour = match (palette, block.colour_index) {
                (Some(p), Some(i)) => blend_craft_colour(material.colour, &p[i as usize]),
                _ => material.colour,
            };
            Some(RasterBlock {
                position: block.position,
                axes: block.axes,
                size: kind.size,
                colour,
            })
        })
        .collect()
}

fn palette_covers(palette: &[CraftColour], block: &Block) -> bool {
    block
        .colour_index
        .is_none_or(|i| i >= 0 && (i as usize) < palette.len())
}

/// Finished projections plus the frame that maps world cells into them.
#[derive(Debug, Clone)]
pub struct ViewSet {
    views: [ViewBuffer; 3],
    /// World cell that lands on row/column/height zero before flipping
    pub origin: [i32; 3],
    pub size: [usize; 3],
}

impl ViewSet {
    pub fn view(&self, kind: ViewKind) -> &ViewBuffer {
        &self.views[kind.index()]
    }

    pub fn into_views(self) -> [ViewBuffer; 3] {
        self.views
    }

    /// Unflipped (row, column) and depth of a world cell in a view
    pub fn project(&self, kind: ViewKind, world: [i32; 3]) -> ([i64; 2], i64) {
        let [r, c, d] = kind.axes();
        let rel = |a: usize| world[a] as i64 - self.origin[a] as i64;
        ([rel(r), rel(c)], rel(d))
    }
}

/// One fill pass over fixed buffers.
struct RasterPass {
    views: [ViewBuffer; 3],
    realized: BlockBounds,
}

fn rasterize_view(
    kind: ViewKind,
    blocks: &[RasterBlock],
    size: [usize; 3],
    clip: Option<f64>,
) -> (ViewBuffer, BlockBounds, bool) {
    let [row_axis, col_axis, depth_axis] = kind.axes();
    let mut view = ViewBuffer::new(size[row_axis], size[col_axis]);
    let mut realized = BlockBounds::new();
    let mut overflowed = false;
    let limit = clip.map(|f| size[depth_axis] as f64 * f);

    for block in blocks {
        block.for_each_cell(|rel| {
            realized.update(rel);
            if overflowed {
                return;
            }
            if (0..3).any(|a| rel[a] < -(size[a] as i32) || rel[a] >= size[a] as i32) {
                overflowed = true;
                return;
            }
            let depth = rel[depth_axis];
            if limit.is_some_and(|l| depth as f64 > l) {
                return;
            }
            let row = rel[row_axis].rem_euclid(size[row_axis] as i32) as usize;
            let col = rel[col_axis].rem_euclid(size[col_axis] as i32) as usize;
            view.write(row, col, depth, block.colour);
        });
    }

    (view, realized, overflowed)
}

/// Fill all three views in parallel; blocks carry world positions relative to `origin`
fn try_rasterize(
    blocks: &[RasterBlock],
    size: [usize; 3],
    settings: &RasterSettings,
) -> Result<RasterPass, OverflowError> {
    let results: Vec<(ViewBuffer, BlockBounds, bool)> = ViewKind::ALL
        .par_iter()
        .map(|&kind| rasterize_view(kind, blocks, size, settings.clip[kind.depth_axis()]))
        .collect();

    let mut realized = BlockBounds::new();
    let mut overflowed = false;
    let mut views = Vec::with_capacity(3);
    for (view, bounds, overflow) in results {
        realized.merge(&bounds);
        overflowed |= overflow;
        views.push(view);
    }

    let extent = realized.dimensions();
    overflowed |= (0..3).any(|a| extent[a] > size[a]);
    let overflow = || OverflowError {
        size,
        min: realized.min,
        max: realized.max,
    };
    if overflowed {
        return Err(overflow());
    }
    let views: [ViewBuffer; 3] = views.try_into().map_err(|_| overflow())?;
    Ok(RasterPass { views, realized })
}

fn relative_to(blocks: &[RasterBlock], origin: [i32; 3]) -> Vec<RasterBlock> {
    blocks
        .iter()
        .map(|b| RasterBlock {
            position: std::array::from_fn(|a| b.position[a] - origin[a]),
            ..*b
        })
        .collect()
}

/// Refuse buffers larger than any craft the renderer supports
fn check_buffer_size(size: [usize; 3], min: [i32; 3], max: [i32; 3]) -> Result<(), OverflowError> {
    let too_large = size.iter().any(|s| *s > MAX_VIEW_EXTENT)
        || ViewKind::ALL.iter().any(|kind| {
            let [r, c, _] = kind.axes();
            size[r] * size[c] > MAX_VIEW_CELLS
        });
    if too_large {
        return Err(OverflowError { size, min, max });
    }
    Ok(())
}

/// Project the blocks into the three views.
/// Buffers start at the nominal bounds; an overflow is retried once with the realized bounds.
pub fn rasterize(
    blocks: &[RasterBlock],
    bounds: &BlockBounds,
    settings: &RasterSettings,
) -> Result<ViewSet, OverflowError> {
    let mut origin = if bounds.is_empty() { [0; 3] } else { bounds.min };
    let mut size = bounds.dimensions().map(|s| s.max(1));
    check_buffer_size(size, bounds.min, bounds.max)?;

    let pass = match try_rasterize(&relative_to(blocks, origin), size, settings) {
        Ok(pass) => pass,
        Err(overflow) => {
            warn!("Rasterization overflowed ({}), retrying with realized bounds", overflow);
            origin = std::array::from_fn(|a| origin[a] + overflow.min[a]);
            size = std::array::from_fn(|a| (overflow.max[a] as i64 - overflow.min[a] as i64 + 1).max(1) as usize);
            check_buffer_size(size, overflow.min, overflow.max)?;
            try_rasterize(&relative_to(blocks, origin), size, settings)?
        }
    };

    let RasterPass { mut views, realized } = pass;

    // Negative realized minimums were stored cyclically; shift them back to zero.
    let shift: [i32; 3] = if realized.is_empty() {
        [0; 3]
    } else {
        realized.min.map(|m| (-m).max(0))
    };
    if shift.iter().any(|s| *s > 0) {
        debug!("Re-centering views by {:?}", shift);
        for kind in ViewKind::ALL {
            let [r, c, d] = kind.axes();
            let view = &mut views[kind.index()];
            view.roll(shift[r] as usize, shift[c] as usize);
            view.offset_heights(shift[d]);
        }
        origin = std::array::from_fn(|a| origin[a] - shift[a]);
    }

    let [side, _, front] = &mut views;
    side.flip_rows();
    front.flip_rows();
    front.flip_cols();

    Ok(ViewSet { views, origin, size })
}
