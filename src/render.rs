//! This module provides the rendering traversal for quadtrees.
//! Leaves are painted as solid mean-color regions and internal nodes as
//! split markers, using the `image` and `imageproc` crates.
//!
//! # Examples
//!
//! ```rust
//! use quadmosaic::{QuadTree, QuadTreeConfig, render::*};
//! use image::{Rgb, RgbImage};
//!
//! // Build a tree over a small gradient
//! let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 0]));
//! let mut tree = QuadTree::from_image_with_config(&img, QuadTreeConfig::default()).unwrap();
//! tree.split_once(&img).unwrap();
//!
//! // Configure the split marker color
//! let render_config = RenderConfig {
//!     line_color: Rgb([255, 0, 0]), // Red markers
//! };
//!
//! let mosaic = render(&tree, &img, &render_config).unwrap();
//! assert_eq!(mosaic.dimensions(), img.dimensions());
//! ```

use crate::{region_mean_color, NodeStack, QuadError, QuadNode, QuadTree, Rect};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as PixelRect;
use tracing::trace;

/// Configuration for rendering a quadtree onto a raster.
///
/// # Examples
///
/// ```
/// use quadmosaic::render::RenderConfig;
/// use image::Rgb;
///
/// let config = RenderConfig::default();
/// assert_eq!(config.line_color, Rgb([0, 0, 0]));
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Color of the split markers drawn across internal nodes.
    pub line_color: Rgb<u8>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            line_color: Rgb([0, 0, 0]), // Black
        }
    }
}

/// Repaints `out` from the current state of `tree`.
///
/// The traversal visits nodes in pre-order, quadrant order. Each leaf region
/// is filled with the mean color of `src` over its rectangle, inset by one
/// pixel from the top and left edges; the strip left unpainted keeps the
/// markers of ancestor splits visible. Each internal node gets two one-pixel
/// lines across its rectangle's midpoints before its children are painted.
///
/// The repaint is complete, not incremental: calling this after every split
/// is the progressive-preview pattern, and pixels outside all painted areas
/// keep whatever `out` already held.
///
/// # Errors
/// Returns [`QuadError::DimensionMismatch`] if `out` and `src` differ in
/// size, and [`QuadError::OutOfBounds`] if a leaf rectangle escapes `src`
/// (possible only when the tree was built over a different raster).
pub fn render_into(
    tree: &QuadTree,
    src: &RgbImage,
    out: &mut RgbImage,
    config: &RenderConfig,
) -> Result<(), QuadError> {
    if src.dimensions() != out.dimensions() {
        return Err(QuadError::DimensionMismatch {
            src_width: src.width(),
            src_height: src.height(),
            out_width: out.width(),
            out_height: out.height(),
        });
    }
    trace!("Rendering {} nodes", tree.len());

    let mut stack = NodeStack::new();
    stack.push(tree.root());
    while let Some(id) = stack.pop() {
        match tree.node(id) {
            QuadNode::Leaf { rect, .. } => {
                let color = region_mean_color(src, rect)?;
                fill_leaf(out, rect, color);
            }
            QuadNode::Internal { rect, children } => {
                draw_split_marker(out, rect, config.line_color);
                for &child in children.iter().rev() {
                    stack.push(child);
                }
            }
        }
    }

    Ok(())
}

/// Renders `tree` into a freshly allocated raster the size of `src`.
///
/// The new raster starts out black, so the one-pixel strips leaf fills
/// leave untouched come out in the default marker color.
pub fn render(tree: &QuadTree, src: &RgbImage, config: &RenderConfig) -> Result<RgbImage, QuadError> {
    let (width, height) = src.dimensions();
    let mut out = RgbImage::new(width, height);
    render_into(tree, src, &mut out, config)?;
    Ok(out)
}

/// Fills a leaf rectangle with `color`, leaving the one-pixel strip along
/// its top and left edges unmodified.
fn fill_leaf(out: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    if rect.width <= 1 || rect.height <= 1 {
        return;
    }
    let fill = PixelRect::at(rect.x as i32 + 1, rect.y as i32 + 1)
        .of_size(rect.width - 1, rect.height - 1);
    draw_filled_rect_mut(out, fill, color);
}

/// Draws the two one-pixel lines crossing `rect` at its midpoints.
fn draw_split_marker(out: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    let mid_x = (rect.x + rect.width / 2) as f32;
    let mid_y = (rect.y + rect.height / 2) as f32;
    // Endpoints are inclusive; the pixel past the far edge is clipped
    draw_line_segment_mut(
        out,
        (mid_x, rect.y as f32),
        (mid_x, (rect.y + rect.height) as f32),
        color,
    );
    draw_line_segment_mut(
        out,
        (rect.x as f32, mid_y),
        ((rect.x + rect.width) as f32, mid_y),
        color,
    );
}
