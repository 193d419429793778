use image::RgbImage;
use render::*;
use std::path::Path;

use super::*;
/// Renders the quadtree and saves the result to disk.
///
/// The output raster is freshly allocated (black), painted from `tree` via
/// [`render`], and written to `output_path`.
///
/// # Arguments
/// * `tree` - The quadtree to render.
/// * `src` - The source raster the tree was built over.
/// * `output_path` - The path to save the output image.
/// * `config` - The rendering configuration.
///
/// # Errors
/// Returns [`QuadError`] if rendering or saving fails.
///
/// # Examples
///
/// ```rust
/// use quadmosaic::{*, render::*};
/// use image::{Rgb, RgbImage};
///
/// let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 0]));
/// let mut tree = QuadTree::try_from(&img).unwrap();
/// tree.split_once(&img).unwrap();
///
/// debug::save_render(&tree, &img, "mosaic.png", &RenderConfig::default()).unwrap();
/// # std::fs::remove_file("mosaic.png").unwrap();
/// ```
pub fn save_render(
    tree: &QuadTree,
    src: &RgbImage,
    output_path: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<(), QuadError> {
    let out = render(tree, src, config)?;
    out.save(output_path)
        .map_err(|e| QuadError::ImageError(e.to_string()))
}
