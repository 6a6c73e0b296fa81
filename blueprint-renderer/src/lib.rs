//! Blueprint view renderer: turns game blueprint files into composited top, side
//! and front view images, or looping GIFs of the craft's weapons firing.

pub mod assembly;
pub mod blueprint;
pub mod bounds;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod contour;
pub mod error;
pub mod firing;
pub mod info;
pub mod info_panel;
pub mod legend;
pub mod output;
pub mod pipeline;
pub mod rasterizer;
pub mod rotation;
pub mod text;

pub use error::{PipelineError, RenderError, Stage};
pub use pipeline::{BlueprintRenderer, CancellationToken, RenderOutput, RenderSource, StageTimings};
