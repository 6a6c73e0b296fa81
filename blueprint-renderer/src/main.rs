/// Blueprint view renderer command line entry point
use blueprint_renderer::config::{AppConfig, AspectRatio, ClipFractions};
use blueprint_renderer::firing::FiringOrder;
use blueprint_renderer::legend::render_legend;
use blueprint_renderer::output::write_png;
use blueprint_renderer::pipeline::{BlueprintRenderer, CancellationToken, RenderSource};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Render game blueprints as top, side and front views, or as firing animations
#[derive(Parser)]
#[command(name = "blueprint-renderer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file; command line flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding blocks.json, materials.json and size_id_dictionary.json
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// TrueType/OpenType font for panel text
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one or more blueprint files
    Render {
        /// Blueprint files (.blueprint, .blueprint_ba, .blueprint_bac)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Write a firing animation GIF instead of a PNG
        #[arg(short, long)]
        animate: bool,

        /// Firing order name or code, e.g. "front to back", "random", -2
        #[arg(long, allow_hyphen_values = true)]
        order: Option<FiringOrder>,

        /// Depth clip fractions as side,top,front, e.g. 0.5,,
        #[arg(long)]
        clip: Option<ClipFractions>,

        /// Output aspect ratio W:H or a preset name (stills only)
        #[arg(long)]
        aspect: Option<AspectRatio>,

        /// Use material colours only
        #[arg(long)]
        no_colour: bool,

        /// Directory with firing sprite frames
        #[arg(long)]
        sprites: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seed for random firing orders and flame noise
        #[arg(long)]
        seed: Option<u64>,

        /// Print stage timings after each render
        #[arg(long)]
        stats: bool,

        /// Only log warnings and errors
        #[arg(short, long)]
        silent: bool,
    },

    /// Draw the material colour legend
    Legend {
        /// Output PNG
        #[arg(short, long, default_value = "legend.png")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if cli.catalog.is_some() {
        config.catalog_dir = cli.catalog.clone();
    }
    if cli.font.is_some() {
        config.font_path = cli.font.clone();
    }

    match cli.command {
        Commands::Render {
            inputs,
            animate,
            order,
            clip,
            aspect,
            no_colour,
            sprites,
            output_dir,
            seed,
            stats,
            silent,
        } => {
            if sprites.is_some() {
                config.sprite_dir = sprites;
            }
            if output_dir.is_some() {
                config.output_dir = output_dir;
            }
            let options = &mut config.render;
            options.animate |= animate;
            options.firing_order = order.unwrap_or(options.firing_order);
            options.clip = clip.unwrap_or(options.clip);
            options.aspect_ratio = aspect.or(options.aspect_ratio);
            options.craft_colours &= !no_colour;
            options.seed = seed.or(options.seed);
            options.silent |= silent;
            options.progress = !options.silent;

            if let Some(dir) = &config.output_dir {
                fs::create_dir_all(dir)?;
            }
            let renderer = BlueprintRenderer::from_config(&config)?;
            let cancel = CancellationToken::new();

            for input in inputs {
                let source = RenderSource::Path(input);
                match renderer.render(&source, &config.render, &cancel) {
                    Ok(output) => {
                        if !config.render.silent {
                            info!("Saved {}", output.path.display());
                        }
                        if stats {
                            println!("{}: {}", output.path.display(), output.timings);
                        }
                    }
                    Err(err) => {
                        error!("{}", err);
                        if err.output_path.exists() {
                            fs::remove_file(&err.output_path)?;
                        }
                        return Err(err.into());
                    }
                }
            }
        }
        Commands::Legend { output } => {
            let renderer = BlueprintRenderer::from_config(&config)?;
            let legend = render_legend(renderer.catalog().materials(), renderer.font());
            write_png(&output, &legend)?;
            info!("Saved legend to {}", output.display());
        }
    }

    Ok(())
}
