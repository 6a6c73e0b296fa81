/// Render orchestration: parse, normalize, gather info, rasterize, compose or animate, persist
use crate::blueprint::{BlueprintDocument, validate_extension};
use crate::catalog::Catalog;
use crate::compose::compose;
use crate::config::{AppConfig, RenderOptions};
use crate::contour::{ViewImage, render_view};
use crate::error::{ParseError, PipelineError, RenderError, Stage};
use crate::firing::overlay::ViewTarget;
use crate::firing::{FrameRenderer, Schedule, SpriteSet, collect_events};
use crate::info::InfoRecord;
use crate::info_panel::render_info_panel;
use crate::output::{GifStream, animation_progress, encode_animation, write_png};
use crate::rasterizer::{RasterSettings, ViewKind, prepare_blocks, rasterize};
use crate::text::{BitmapFont, GlyphFont, TextRenderer};
use constants::render_settings::{ANIMATION_BORDER, STILL_BORDER};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Default directory for the catalog JSON files
pub const DEFAULT_CATALOG_DIR: &str = "data";

/// Shared flag a caller sets to stop a render at the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A blueprint to render.
#[derive(Debug, Clone)]
pub enum RenderSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl RenderSource {
    pub fn file_name(&self) -> String {
        match self {
            RenderSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            RenderSource::Bytes { name, .. } => name.clone(),
        }
    }

    fn read(&self) -> Result<Cow<'_, [u8]>, ParseError> {
        match self {
            RenderSource::Path(path) => fs::read(path).map(Cow::Owned).map_err(|source| ParseError::Io {
                path: path.clone(),
                source,
            }),
            RenderSource::Bytes { bytes, .. } => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// Seconds spent in parse, normalize, info, rasterize and compose/animate (with persist).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings(pub [f64; 5]);

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [parse, normalize, info, rasterize, compose] = self.0;
        write!(
            f,
            "parse {parse:.3}s, normalize {normalize:.3}s, info {info:.3}s, rasterize {rasterize:.3}s, compose {compose:.3}s"
        )
    }
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub path: PathBuf,
    pub timings: StageTimings,
    /// Animation frames written after the idle frame
    pub frames: Option<usize>,
}

/// Holds the immutable catalog, sprites and font shared by every render.
pub struct BlueprintRenderer {
    catalog: Arc<Catalog>,
    sprites: Arc<SpriteSet>,
    font: Arc<dyn TextRenderer>,
    output_dir: PathBuf,
}

impl BlueprintRenderer {
    pub fn new(
        catalog: Arc<Catalog>,
        sprites: Arc<SpriteSet>,
        font: Arc<dyn TextRenderer>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            sprites,
            font,
            output_dir: output_dir.into(),
        }
    }

    /// Load catalogs, sprites and font named by the config
    pub fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let catalog_dir = config
            .catalog_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_DIR));
        let catalog = Catalog::load_from_dir(&catalog_dir)?;

        let sprites = match &config.sprite_dir {
            Some(dir) => SpriteSet::load(dir)?,
            None => {
                debug!("No sprite directory configured, generating firing sprites");
                SpriteSet::procedural()
            }
        };

        let font: Arc<dyn TextRenderer> = match &config.font_path {
            Some(path) => Arc::new(GlyphFont::load(path)?),
            None => {
                debug!("No font configured, using the built-in bitmap font");
                Arc::new(BitmapFont)
            }
        };

        let output_dir = config.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(Arc::new(catalog), Arc::new(sprites), font, output_dir))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn font(&self) -> &dyn TextRenderer {
        self.font.as_ref()
    }

    /// `<stem>_view.png`, or `<stem>_view.gif` for animations, in the output directory
    pub fn output_path(&self, source: &RenderSource, animate: bool) -> PathBuf {
        let name = source.file_name();
        let stem = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blueprint".to_string());
        let extension = if animate { "gif" } else { "png" };
        self.output_dir.join(format!("{stem}_view.{extension}"))
    }

    /// Run every stage, stopping at the first failure or when `cancel` is set
    pub fn render(
        &self,
        source: &RenderSource,
        options: &RenderOptions,
        cancel: &CancellationToken,
    ) -> Result<RenderOutput, PipelineError> {
        let output_path = self.output_path(source, options.animate);
        let fail = |stage: Stage| {
            let output_path = output_path.clone();
            move |source: RenderError| PipelineError {
                stage,
                output_path,
                source,
            }
        };
        let checkpoint = |stage: Stage| -> Result<(), PipelineError> {
            if cancel.is_cancelled() {
                debug!("Render cancelled before {} stage", stage);
                return Err(fail(stage)(RenderError::Cancelled));
            }
            Ok(())
        };
        let log = |message: String| {
            if !options.silent {
                info!("{}", message);
            }
        };

        let mut timings = [0.0; 5];
        let name = source.file_name();

        // Parse
        checkpoint(Stage::Parse)?;
        let start = Instant::now();
        let document = validate_extension(&name)
            .and_then(|_| source.read())
            .and_then(|bytes| BlueprintDocument::parse(&name, &bytes))
            .map_err(|e| fail(Stage::Parse)(e.into()))?;
        timings[0] = start.elapsed().as_secs_f64();
        log(format!("Parsed {} in {:.3}s", name, timings[0]));

        // Normalize
        checkpoint(Stage::Normalize)?;
        let start = Instant::now();
        let blocks = document
            .normalize(&self.catalog)
            .map_err(|e| fail(Stage::Normalize)(e.into()))?;
        let events = if options.animate {
            collect_events(&blocks, &self.catalog)
        } else {
            Vec::new()
        };
        timings[1] = start.elapsed().as_secs_f64();
        log(format!(
            "Normalized {} blocks in {:.3}s",
            blocks.blocks.len(),
            timings[1]
        ));

        // Info
        checkpoint(Stage::ComputeInfo)?;
        let start = Instant::now();
        let record = InfoRecord::gather(&document.meta, blocks.size());
        timings[2] = start.elapsed().as_secs_f64();

        // Rasterize
        checkpoint(Stage::Rasterize)?;
        let start = Instant::now();
        let settings = RasterSettings {
            clip: options.clip.0,
            craft_colours: options.craft_colours,
        };
        let raster_blocks = prepare_blocks(
            &blocks,
            &self.catalog,
            document.craft_colours.as_deref(),
            settings.craft_colours,
        );
        let views = rasterize(&raster_blocks, &blocks.bounds, &settings).map_err(|e| fail(Stage::Rasterize)(e.into()))?;
        timings[3] = start.elapsed().as_secs_f64();
        log(format!(
            "Rasterized views of size {:?} in {:.3}s",
            views.size, timings[3]
        ));

        // Compose, then animate or persist
        checkpoint(Stage::Compose)?;
        let start = Instant::now();
        let border = (if options.animate { ANIMATION_BORDER } else { STILL_BORDER }) as usize;
        let images: Vec<ViewImage> = ViewKind::ALL
            .iter()
            .map(|kind| render_view(views.view(*kind), border, true))
            .collect();
        let [side, top, front] = [&images[0], &images[1], &images[2]];
        let panel = render_info_panel(Some(&record), front.image.width(), self.font.as_ref());
        let aspect_ratio = if options.animate {
            None
        } else {
            options.aspect_ratio.map(|a| a.ratio())
        };
        let composite = compose(&side.image, &front.image, &top.image, &panel, aspect_ratio);

        let frames = if options.animate {
            let mut rng = match options.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let schedule = Schedule::new(&events, options.firing_order, self.sprites.sequence_len(), &mut rng);
            log(format!(
                "Animating {} weapons over {} frames ({})",
                events.len(),
                schedule.total_frames(),
                options.firing_order
            ));

            let targets: [ViewTarget; 3] = std::array::from_fn(|i| ViewTarget {
                kind: ViewKind::ALL[i],
                padded: &images[i].padded,
                placement: composite.placement(ViewKind::ALL[i]),
            });
            let renderer = FrameRenderer::new(
                &composite.image,
                &views,
                targets,
                &events,
                &schedule,
                &self.sprites,
                border,
            );

            checkpoint(Stage::Persist)?;
            let file = File::create(&output_path).map_err(|e| fail(Stage::Persist)(e.into()))?;
            let mut stream = GifStream::new(BufWriter::new(file)).map_err(fail(Stage::Persist))?;
            let progress = animation_progress(schedule.total_frames(), options.progress && !options.silent);
            encode_animation(
                &mut stream,
                &renderer,
                &composite.image,
                rng.next_u64(),
                cancel,
                &progress,
            )
            .map_err(|e| fail(animation_failure_stage(&e))(e))?;
            Some(stream.frames().saturating_sub(1))
        } else {
            checkpoint(Stage::Persist)?;
            write_png(&output_path, &composite.image).map_err(fail(Stage::Persist))?;
            None
        };
        timings[4] = start.elapsed().as_secs_f64();
        log(format!(
            "Wrote {} ({}x{}) in {:.3}s",
            output_path.display(),
            composite.image.width(),
            composite.image.height(),
            timings[4]
        ));

        Ok(RenderOutput {
            path: output_path,
            timings: StageTimings(timings),
            frames,
        })
    }
}

/// Frames are streamed straight into the output file, so only a cancellation between
/// batches belongs to the animation itself
fn animation_failure_stage(err: &RenderError) -> Stage {
    match err {
        RenderError::Cancelled => Stage::Compose,
        _ => Stage::Persist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::tests::single_block_json;
    use crate::catalog::tests::test_catalog;

    fn renderer(output_dir: &Path) -> BlueprintRenderer {
        BlueprintRenderer::new(
            Arc::new(test_catalog()),
            Arc::new(SpriteSet::procedural()),
            Arc::new(BitmapFont),
            output_dir,
        )
    }

    fn bytes(name: &str) -> RenderSource {
        RenderSource::Bytes {
            name: name.to_string(),
            bytes: single_block_json("metal-cube", "0,0,0").into_bytes(),
        }
    }

    #[test]
    fn test_output_names() {
        let renderer = renderer(Path::new("out"));
        let source = bytes("My Ship.blueprint");
        assert_eq!(renderer.output_path(&source, false), PathBuf::from("out/My Ship_view.png"));
        assert_eq!(renderer.output_path(&source, true), PathBuf::from("out/My Ship_view.gif"));
        let path = RenderSource::Path(PathBuf::from("/tmp/a/b.blueprint_ba"));
        assert_eq!(path.file_name(), "b.blueprint_ba");
    }

    #[test]
    fn test_cancelled_before_parse() {
        let renderer = renderer(&std::env::temp_dir());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = renderer
            .render(&bytes("a.blueprint"), &RenderOptions::default(), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.stage, Stage::Parse);
        assert!(!err.output_path.exists());
    }

    #[test]
    fn test_bad_extension_fails_in_parse() {
        let renderer = renderer(&std::env::temp_dir());
        let err = renderer
            .render(&bytes("a.json"), &RenderOptions::default(), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        assert!(matches!(
            err.source,
            RenderError::Parse(ParseError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn test_invalid_json_fails_in_parse() {
        let renderer = renderer(&std::env::temp_dir());
        let source = RenderSource::Bytes {
            name: "broken.blueprint".to_string(),
            bytes: b"{ not json".to_vec(),
        };
        let err = renderer
            .render(&source, &RenderOptions::default(), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.stage, Stage::Parse);
        assert!(err.to_string().contains("broken.blueprint"));
    }

    #[test]
    fn test_animation_write_failures_are_persist_failures() {
        let io = RenderError::Io(std::io::Error::other("disk full"));
        assert_eq!(animation_failure_stage(&io), Stage::Persist);
        assert_eq!(animation_failure_stage(&RenderError::Cancelled), Stage::Compose);
    }

    #[test]
    fn test_far_apart_blocks_fail_in_normalize() {
        let renderer = renderer(&std::env::temp_dir());
        let source = RenderSource::Bytes {
            name: "far.blueprint".to_string(),
            bytes: single_block_json("metal-cube", "2000000000,0,0").into_bytes(),
        };
        let err = renderer
            .render(&source, &RenderOptions::default(), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.stage, Stage::Normalize);
        assert!(matches!(
            err.source,
            RenderError::Parse(ParseError::CoordinateRange { .. })
        ));
        assert!(!err.output_path.exists());
    }

    #[test]
    fn test_timings_display() {
        let text = StageTimings([0.5, 0.25, 0.0, 1.0, 2.0]).to_string();
        assert!(text.starts_with("parse 0.500s"));
        assert!(text.ends_with("compose 2.000s"));
    }
}
