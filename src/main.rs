use anyhow::{Context, Result};
use clap::Parser;
use quadmosaic::render::RenderConfig;
use quadmosaic::{debug::save_render, QuadError, QuadTree, QuadTreeConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Decompose an image into an adaptive quadtree and render the mosaic.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path of the source image
    input: PathBuf,

    /// Where to write the rendered mosaic
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Upper bound on the number of splits
    #[arg(short = 'n', long, default_value_t = 1000)]
    iterations: u32,

    /// Leaf area that must be strictly exceeded for a leaf to keep splitting
    #[arg(long, default_value_t = 16)]
    min_area: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Open the image file
    let img = image::open(&args.input)
        .with_context(|| format!("Failed to open image {}", args.input.display()))?
        .to_rgb8();

    let mut tree = QuadTree::from_image_with_config(&img, QuadTreeConfig::new(args.min_area))?;

    // Grow the tree until the budget runs out or nothing is left to split
    let mut splits = 0;
    while splits < args.iterations {
        match tree.split_once(&img) {
            Ok(_) => splits += 1,
            Err(QuadError::NoEligibleLeaf) => break,
            Err(e) => return Err(e.into()),
        }
    }
    info!(
        "Performed {} splits, tree holds {} leaves",
        splits,
        tree.leaf_count()
    );

    // Save the rendered mosaic
    save_render(&tree, &img, &args.output, &RenderConfig::default())
        .with_context(|| format!("Failed to save mosaic to {}", args.output.display()))?;

    Ok(())
}
