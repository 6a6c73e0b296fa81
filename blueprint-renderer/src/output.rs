/// Still PNG output and the streamed, looping GIF encoder for animations
use crate::error::RenderError;
use crate::firing::FrameRenderer;
use crate::pipeline::CancellationToken;
use constants::animation::{FIRST_FRAME_DELAY_MS, FRAME_DELAY_MS};
use image::buffer::ConvertBuffer;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, RgbImage, RgbaImage};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Quantizer speed, 1 (best) to 30 (fastest)
const GIF_SPEED: i32 = 10;

pub fn write_png(path: &Path, image: &RgbImage) -> Result<(), RenderError> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Frames are written as soon as they are pushed; nothing is buffered here.
pub struct GifStream<W: Write> {
    encoder: GifEncoder<W>,
    frames: usize,
}

impl<W: Write> GifStream<W> {
    pub fn new(writer: W) -> Result<Self, RenderError> {
        let mut encoder = GifEncoder::new_with_speed(writer, GIF_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self { encoder, frames: 0 })
    }

    pub fn push(&mut self, image: &RgbImage, delay_ms: u32) -> Result<(), RenderError> {
        let rgba: RgbaImage = image.convert();
        let frame = Frame::from_parts(rgba, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
        self.encoder.encode_frame(frame)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

/// Progress bar for long encodes, hidden unless `visible`
pub fn animation_progress(frames: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Rendering frames");
    pb
}

/// Per-frame noise seed, so batches render the same frames regardless of thread count
fn frame_seed(seed: u64, frame: usize) -> u64 {
    seed.wrapping_add(frame as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Write the idle frame, then every animation frame. Frames render in parallel batches
/// of one frame per worker thread; cancellation is checked between batches.
pub fn encode_animation<W: Write>(
    stream: &mut GifStream<W>,
    renderer: &FrameRenderer,
    base: &RgbImage,
    seed: u64,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> Result<(), RenderError> {
    stream.push(base, FIRST_FRAME_DELAY_MS)?;

    let total = renderer.frame_count();
    let batch = rayon::current_num_threads().max(1);
    debug!("Encoding {} frames in batches of {}", total, batch);

    let mut start = 0;
    while start < total {
        if cancel.is_cancelled() {
            progress.abandon_with_message("Cancelled");
            return Err(RenderError::Cancelled);
        }
        let end = (start + batch).min(total);
        let frames: Vec<RgbImage> = (start..end)
            .into_par_iter()
            .map(|frame| renderer.render(frame, &mut StdRng::seed_from_u64(frame_seed(seed, frame))))
            .collect();
        for frame in &frames {
            stream.push(frame, FRAME_DELAY_MS)?;
        }
        progress.inc((end - start) as u64);
        start = end;
    }

    progress.finish_with_message("Frames encoded");
    Ok(())
}
