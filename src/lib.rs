//! This module provides functionality for decomposing a raster image into an
//! adaptive quadtree and rendering it back as a mosaic of mean-color regions.
//! It uses the `image` and `imageproc` crates for raster manipulation and
//! `insta` for snapshot testing.

/// Debug module for rendering a quadtree and saving the result to disk.
///
/// # Example
/// ```
/// use quadmosaic::{QuadTree, QuadTreeConfig, render::RenderConfig};
/// use image::{Rgb, RgbImage};
///
/// let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 0]));
/// let mut tree = QuadTree::from_image_with_config(&img, QuadTreeConfig::default()).unwrap();
/// while tree.split_once(&img).is_ok() {}
///
/// quadmosaic::debug::save_render(&tree, &img, "output.png", &RenderConfig::default()).unwrap();
/// # std::fs::remove_file("output.png").unwrap();
/// ```
pub mod debug;
/// This module provides the rendering traversal that paints a quadtree onto an
/// output raster: leaf regions are filled with their mean source color and a
/// split marker is drawn across every internal node.
///
/// The main components of this module are:
/// - [`RenderConfig`]: Configuration for the split marker color.
/// - [`render_into`]: Repaints a caller-supplied output raster from a tree.
/// - [`render`]: Allocates a fresh output raster and paints it.
///
/// [`RenderConfig`]: render::RenderConfig
/// [`render_into`]: render::render_into
/// [`render`]: render::render
pub mod render;
use image::{Rgb, RgbImage};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::*;

const DEFAULT_MIN_SPLIT_AREA: u32 = 16;
// Deep enough for any raster whose smallest dimension fits in u32
const DEFAULT_STACK_SIZE: usize = 32;

#[derive(Error, Debug)]
pub enum QuadError {
    #[error("No leaf above the minimum split area remains")]
    NoEligibleLeaf,

    #[error("Rectangle {rect:?} escapes the {width}x{height} raster")]
    OutOfBounds { rect: Rect, width: u32, height: u32 },

    #[error("Invalid image dimensions: width={width}, height={height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Output raster is {out_width}x{out_height} but source is {src_width}x{src_height}")]
    DimensionMismatch {
        src_width: u32,
        src_height: u32,
        out_width: u32,
        out_height: u32,
    },

    #[error("Failed to save rendered image: {0}")]
    ImageError(String),
}

/// A type alias for the stack used by iterative depth-first traversals.
pub type NodeStack = SmallVec<[NodeId; DEFAULT_STACK_SIZE]>;

/// Configuration for quadtree construction.
///
/// # Example
/// ```
/// use quadmosaic::QuadTreeConfig;
///
/// let config = QuadTreeConfig::default();
/// assert_eq!(config.min_split_area, 16);
/// ```
#[derive(Debug, Clone)]
pub struct QuadTreeConfig {
    /// Area a leaf must strictly exceed to qualify for splitting (default: 16)
    pub min_split_area: u32,
}

impl QuadTreeConfig {
    /// Creates a new `QuadTreeConfig` with the specified minimum split area.
    ///
    /// # Example
    /// ```
    /// use quadmosaic::QuadTreeConfig;
    ///
    /// let config = QuadTreeConfig::new(64);
    /// assert_eq!(config.min_split_area, 64);
    /// ```
    pub fn new(min_split_area: u32) -> Self {
        Self { min_split_area }
    }
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        QuadTreeConfig::new(DEFAULT_MIN_SPLIT_AREA)
    }
}

/// An axis-aligned pixel rectangle, origin at the top-left of the raster.
///
/// Every rectangle instantiated by this crate has positive width and height;
/// zero-sized quadrants can only appear by subdividing a rectangle that is a
/// single pixel wide or tall, and scoring and rendering treat them as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Splits the rectangle into its four quadrants.
    ///
    /// Quadrant order is 0 = top-left, 1 = top-right, 2 = bottom-left,
    /// 3 = bottom-right. Halving rounds down, so odd remainders go to the
    /// right and bottom quadrants; the four parts tile the rectangle exactly.
    ///
    /// # Example
    /// ```
    /// use quadmosaic::Rect;
    ///
    /// let quads = Rect::new(0, 0, 5, 5).subdivide();
    /// assert_eq!(quads[0], Rect::new(0, 0, 2, 2));
    /// assert_eq!(quads[3], Rect::new(2, 2, 3, 3));
    /// ```
    pub fn subdivide(&self) -> [Rect; 4] {
        let half_w = self.width / 2;
        let half_h = self.height / 2;
        [
            Rect::new(self.x, self.y, half_w, half_h),
            Rect::new(self.x + half_w, self.y, self.width - half_w, half_h),
            Rect::new(self.x, self.y + half_h, half_w, self.height - half_h),
            Rect::new(
                self.x + half_w,
                self.y + half_h,
                self.width - half_w,
                self.height - half_h,
            ),
        ]
    }

    /// Whether the rectangle lies fully inside a raster of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

fn check_bounds(img: &RgbImage, rect: &Rect) -> Result<(), QuadError> {
    if rect.fits_within(img.width(), img.height()) {
        Ok(())
    } else {
        Err(QuadError::OutOfBounds {
            rect: *rect,
            width: img.width(),
            height: img.height(),
        })
    }
}

/// Per-channel pixel sums over a rectangle, row-major.
///
/// Shared first pass of [`region_score`] and [`region_mean_color`].
fn region_channel_sums(img: &RgbImage, rect: &Rect) -> [u64; 3] {
    let mut sums = [0u64; 3];
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let Rgb(p) = *img.get_pixel(x, y);
            sums[0] += p[0] as u64;
            sums[1] += p[1] as u64;
            sums[2] += p[2] as u64;
        }
    }
    sums
}

/// Scores the detail of a rectangular region of `img`.
///
/// The score is the largest of the three per-channel population variances,
/// computed in two passes: the per-channel mean over the region, then the
/// mean of squared deviations from it. Uniform and single-pixel regions
/// score exactly 0.
///
/// # Errors
/// Returns [`QuadError::OutOfBounds`] if the rectangle escapes the raster.
///
/// # Example
/// ```
/// use quadmosaic::{region_score, Rect};
/// use image::{Rgb, RgbImage};
///
/// let img = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
/// assert_eq!(region_score(&img, &Rect::new(0, 0, 4, 4)).unwrap(), 0.0);
/// ```
pub fn region_score(img: &RgbImage, rect: &Rect) -> Result<f64, QuadError> {
    trace!("Scoring region {:?}", rect);
    check_bounds(img, rect)?;
    let n = rect.area();
    if n == 0 {
        return Ok(0.0);
    }

    let sums = region_channel_sums(img, rect);
    let means = [
        sums[0] as f64 / n as f64,
        sums[1] as f64 / n as f64,
        sums[2] as f64 / n as f64,
    ];

    let mut sq = [0f64; 3];
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let Rgb(p) = *img.get_pixel(x, y);
            for c in 0..3 {
                let d = p[c] as f64 - means[c];
                sq[c] += d * d;
            }
        }
    }

    Ok(sq[0].max(sq[1]).max(sq[2]) / n as f64)
}

/// Mean color of a rectangular region of `img`.
///
/// Channel sums are divided by the pixel count with integer truncation.
///
/// # Errors
/// Returns [`QuadError::OutOfBounds`] if the rectangle escapes the raster.
pub fn region_mean_color(img: &RgbImage, rect: &Rect) -> Result<Rgb<u8>, QuadError> {
    check_bounds(img, rect)?;
    let n = rect.area();
    if n == 0 {
        return Ok(Rgb([0, 0, 0]));
    }
    let sums = region_channel_sums(img, rect);
    Ok(Rgb([
        (sums[0] / n) as u8,
        (sums[1] / n) as u8,
        (sums[2] / n) as u8,
    ]))
}

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the quadtree.
///
/// A node is either a leaf carrying its region and detail score, or an
/// internal node whose four children tile its region in quadrant order.
/// The variant makes "internal nodes have exactly 4 children" structural;
/// no child slot is ever probed to decide leaf-ness.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum QuadNode {
    Leaf { rect: Rect, score: f64 },
    Internal { rect: Rect, children: [NodeId; 4] },
}

impl QuadNode {
    /// The region this node covers.
    pub fn rect(&self) -> &Rect {
        match self {
            QuadNode::Leaf { rect, .. } => rect,
            QuadNode::Internal { rect, .. } => rect,
        }
    }

    /// Detail score, present on leaves only.
    pub fn score(&self) -> Option<f64> {
        match self {
            QuadNode::Leaf { score, .. } => Some(*score),
            QuadNode::Internal { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, QuadNode::Leaf { .. })
    }
}

/// An adaptive quadtree over a raster image.
///
/// Nodes live in a contiguous arena indexed by [`NodeId`]; the root covers
/// the full image and is created scored. The tree only grows: the sole
/// mutation is [`QuadTree::split_once`], which turns the highest-scoring
/// splittable leaf into an internal node with four scored leaf children.
///
/// # Example
/// ```
/// use quadmosaic::{QuadTree, QuadTreeConfig};
/// use image::{Rgb, RgbImage};
///
/// let img = RgbImage::from_fn(16, 16, |x, _| Rgb([(x * 16) as u8, 0, 0]));
/// let mut tree = QuadTree::from_image_with_config(&img, QuadTreeConfig::default()).unwrap();
/// tree.split_once(&img).unwrap();
/// assert_eq!(tree.leaf_count(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    config: QuadTreeConfig,
}

impl QuadTree {
    /// Creates a single-leaf tree covering `img`, scoring the root region.
    ///
    /// # Errors
    /// Returns [`QuadError::InvalidDimensions`] for a zero-sized image.
    pub fn from_image_with_config(
        img: &RgbImage,
        config: QuadTreeConfig,
    ) -> Result<Self, QuadError> {
        trace!("Building quadtree with config: {:?}", config);
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            error!(
                "Invalid image dimensions: width={}, height={}",
                width, height
            );
            return Err(QuadError::InvalidDimensions { width, height });
        }

        let rect = Rect::new(0, 0, width, height);
        let score = region_score(img, &rect)?;
        debug!("Root region scored at {}", score);

        Ok(QuadTree {
            nodes: vec![QuadNode::Leaf { rect, score }],
            config,
        })
    }

    /// The root node's id.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Looks up a node by id.
    pub fn node(&self, id: NodeId) -> &QuadNode {
        &self.nodes[id.index()]
    }

    /// Total number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }

    /// Number of leaves currently in the tree.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Returns an iterator over all nodes in pre-order, quadrant order
    /// (0, 1, 2, 3) within each internal node.
    pub fn iter(&self) -> NodeIter<'_> {
        let mut stack = NodeStack::new();
        stack.push(self.root());
        NodeIter { tree: self, stack }
    }

    /// Returns an iterator over the current leaves in traversal order.
    ///
    /// # Example
    /// ```
    /// use quadmosaic::QuadTree;
    /// use image::{Rgb, RgbImage};
    ///
    /// let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
    /// let tree = QuadTree::try_from(&img).unwrap();
    ///
    /// for (_, leaf) in tree.leaves() {
    ///     println!("Leaf over {:?}", leaf.rect());
    /// }
    /// ```
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &QuadNode)> {
        self.iter().filter(|(_, node)| node.is_leaf())
    }

    /// The rectangles of the current leaves in traversal order.
    pub fn leaf_rects(&self) -> Vec<Rect> {
        self.leaves().map(|(_, node)| *node.rect()).collect()
    }

    /// Finds the splittable leaf with the strictly greatest score.
    ///
    /// A leaf is splittable when its area strictly exceeds the configured
    /// minimum. Comparison is strict `>`, so ties keep the node found first
    /// in traversal order.
    fn find_splittable(&self, min_area: u64) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (id, node) in self.iter() {
            if let QuadNode::Leaf { rect, score } = node {
                if rect.area() > min_area {
                    match best {
                        Some((_, best_score)) if *score <= best_score => {}
                        _ => best = Some((id, *score)),
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Splits the highest-scoring splittable leaf into four scored children.
    ///
    /// Returns the id of the node that was split. The four children are
    /// scored against `img` before the tree is touched, so a failed scoring
    /// leaves the tree unchanged.
    ///
    /// # Errors
    /// Returns [`QuadError::NoEligibleLeaf`] when every leaf's area is at or
    /// below the configured minimum. This is the normal termination signal
    /// for the caller's iteration loop, not a fault.
    pub fn split_once(&mut self, img: &RgbImage) -> Result<NodeId, QuadError> {
        let min_area = self.config.min_split_area as u64;
        let target = self
            .find_splittable(min_area)
            .ok_or(QuadError::NoEligibleLeaf)?;

        let rect = *self.node(target).rect();
        let quadrants = rect.subdivide();
        let mut scores = [0f64; 4];
        for (quadrant, score) in quadrants.iter().zip(scores.iter_mut()) {
            *score = region_score(img, quadrant)?;
        }

        let base = self.nodes.len() as u32;
        let children = [
            NodeId(base),
            NodeId(base + 1),
            NodeId(base + 2),
            NodeId(base + 3),
        ];
        for (quadrant, score) in quadrants.into_iter().zip(scores) {
            self.nodes.push(QuadNode::Leaf {
                rect: quadrant,
                score,
            });
        }
        self.nodes[target.index()] = QuadNode::Internal { rect, children };
        trace!("Split {:?} into quadrants", rect);

        Ok(target)
    }
}

/// Pre-order depth-first iterator over a tree's nodes.
pub struct NodeIter<'a> {
    tree: &'a QuadTree,
    stack: NodeStack,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = (NodeId, &'a QuadNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id.index()];
        if let QuadNode::Internal { children, .. } = node {
            // Reversed push so quadrant 0 pops first
            for &child in children.iter().rev() {
                self.stack.push(child);
            }
        }
        Some((id, node))
    }
}

impl TryFrom<&RgbImage> for QuadTree {
    type Error = QuadError;

    fn try_from(image: &RgbImage) -> Result<Self, Self::Error> {
        QuadTree::from_image_with_config(image, QuadTreeConfig::default())
    }
}
