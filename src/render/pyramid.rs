//! Hierarchical depth buffer ("z-pyramid")
//!
//! Level 0 holds one view-space depth per pixel. Depths are negative in front
//! of the eye and grow towards it, so "nearer" means numerically larger and
//! an empty pixel holds `-inf`. Each coarser level stores the farthest
//! (numerically smallest) depth of its 2x2 block, which makes a cell a safe
//! bound: geometry strictly farther than a cell's value is hidden in every
//! pixel under it.
//!
//! The grid is padded to a power-of-two square. Padding pixels hold `+inf`
//! so they never lower a coarse cell; they are never drawn to.

use crate::core::types::{Vec2, Vec3};
use crate::geometry::Triangle;

/// Inclusive pixel rectangle, already clamped to the image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// A triangle being drawn: its screen-space and view-space copies
struct Fragment<'a> {
    screen: &'a Triangle,
    view: &'a Triangle,
    rect: PixelRect,
    nearest: f32,
}

/// Multi-resolution farthest-depth buffer
#[derive(Clone, Debug)]
pub struct ZPyramid {
    width: u32,
    height: u32,
    /// Padded power-of-two side of level 0
    side: u32,
    /// `levels[k]` is `(side >> k)^2` cells, row-major
    levels: Vec<Vec<f32>>,
}

impl ZPyramid {
    pub fn new(width: u32, height: u32) -> Self {
        let side = width.max(height).max(1).next_power_of_two();
        let count = side.trailing_zeros() as usize + 1;
        let levels = (0..count)
            .map(|k| vec![f32::NEG_INFINITY; ((side >> k) * (side >> k)) as usize])
            .collect();
        let mut pyramid = Self { width, height, side, levels };
        pyramid.clear();
        pyramid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Padded side of the finest level
    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Reset every pixel to "nothing drawn"
    pub fn clear(&mut self) {
        let (w, h, side) = (self.width, self.height, self.side);
        for (i, z) in self.levels[0].iter_mut().enumerate() {
            let (x, y) = (i as u32 % side, i as u32 / side);
            *z = if x < w && y < h { f32::NEG_INFINITY } else { f32::INFINITY };
        }
        for level in 1..self.levels.len() {
            let fine_side = self.side >> (level - 1);
            let side = fine_side >> 1;
            for cy in 0..side {
                for cx in 0..side {
                    let v = self.block_farthest(level - 1, fine_side, cx * 2, cy * 2);
                    self.levels[level][(cy * side + cx) as usize] = v;
                }
            }
        }
    }

    /// Stored depth of a pixel
    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.levels[0][(y * self.side + x) as usize]
    }

    /// Farthest depth under cell `(cx, cy)` of `level`
    pub fn farthest(&self, level: usize, cx: u32, cy: u32) -> f32 {
        let side = self.side >> level;
        self.levels[level][(cy * side + cx) as usize]
    }

    /// Record a written depth and restore the coarse levels above it
    pub fn set_depth(&mut self, x: u32, y: u32, z: f32) {
        self.levels[0][(y * self.side + x) as usize] = z;
        let (mut cx, mut cy) = (x, y);
        for level in 1..self.levels.len() {
            let fine_side = self.side >> (level - 1);
            let side = fine_side >> 1;
            cx >>= 1;
            cy >>= 1;
            let v = self.block_farthest(level - 1, fine_side, cx * 2, cy * 2);
            let slot = &mut self.levels[level][(cy * side + cx) as usize];
            if *slot == v {
                break;
            }
            *slot = v;
        }
    }

    fn block_farthest(&self, level: usize, side: u32, x: u32, y: u32) -> f32 {
        let fine = &self.levels[level];
        let at = |x: u32, y: u32| fine[(y * side + x) as usize];
        at(x, y).min(at(x + 1, y)).min(at(x, y + 1)).min(at(x + 1, y + 1))
    }

    /// Pixels whose centers might fall inside a screen-space triangle.
    ///
    /// `None` when the box misses the image or a coordinate is not finite.
    pub fn screen_rect(&self, screen: &Triangle) -> Option<PixelRect> {
        let bbox = screen.bbox();
        let (min, max) = (bbox.min, bbox.max);
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }
        if self.width == 0 || self.height == 0 {
            return None;
        }
        if max.x < 0.0 || max.y < 0.0 || min.x >= self.width as f32 || min.y >= self.height as f32 {
            return None;
        }
        Some(PixelRect {
            x0: min.x.floor().max(0.0) as u32,
            y0: min.y.floor().max(0.0) as u32,
            x1: (max.x.ceil() as u32).min(self.width - 1),
            y1: (max.y.ceil() as u32).min(self.height - 1),
        })
    }

    /// Coarsest level at which `rect` spans at most 2x2 cells
    fn query_level(&self, rect: &PixelRect) -> usize {
        let mut level = 0;
        while level + 1 < self.levels.len()
            && ((rect.x1 >> level) - (rect.x0 >> level) > 1 || (rect.y1 >> level) - (rect.y0 >> level) > 1)
        {
            level += 1;
        }
        level
    }

    /// Coarse occlusion query: true if geometry no nearer than `nearest` is
    /// hidden in every pyramid cell `rect` overlaps.
    pub fn is_occluded(&self, rect: &PixelRect, nearest: f32) -> bool {
        let level = self.query_level(rect);
        for cy in (rect.y0 >> level)..=(rect.y1 >> level) {
            for cx in (rect.x0 >> level)..=(rect.x1 >> level) {
                if !(nearest < self.farthest(level, cx, cy)) {
                    return false;
                }
            }
        }
        true
    }

    /// Hierarchical depth test and write.
    ///
    /// Rejects against the coarse cells first, then descends only into cells
    /// the triangle could still win, down to per-pixel tests. Every pixel
    /// that passes is written and reported to `on_pixel` with its screen-space
    /// barycentric weights and view-space depth. Returns true if at least one
    /// pixel passed.
    pub fn rasterize<F>(&mut self, screen: &Triangle, view: &Triangle, on_pixel: &mut F) -> bool
    where
        F: FnMut(u32, u32, Vec3, f32),
    {
        let Some(rect) = self.screen_rect(screen) else {
            return false;
        };
        let nearest = view.nearest_depth();
        if self.is_occluded(&rect, nearest) {
            return false;
        }

        let frag = Fragment { screen, view, rect, nearest };
        let level = self.query_level(&rect);
        let mut visible = false;
        for cy in (rect.y0 >> level)..=(rect.y1 >> level) {
            for cx in (rect.x0 >> level)..=(rect.x1 >> level) {
                visible |= self.visit(level, cx, cy, &frag, on_pixel);
            }
        }
        visible
    }

    /// Flat depth test and write: scans every pixel of the screen box
    /// against level 0 only.
    pub fn rasterize_flat<F>(&mut self, screen: &Triangle, view: &Triangle, on_pixel: &mut F) -> bool
    where
        F: FnMut(u32, u32, Vec3, f32),
    {
        let Some(rect) = self.screen_rect(screen) else {
            return false;
        };
        let frag = Fragment { screen, view, rect, nearest: view.nearest_depth() };
        let mut visible = false;
        for y in rect.y0..=rect.y1 {
            for x in rect.x0..=rect.x1 {
                visible |= self.shade_pixel(x, y, &frag, on_pixel);
            }
        }
        visible
    }

    fn visit<F>(&mut self, level: usize, cx: u32, cy: u32, frag: &Fragment<'_>, on_pixel: &mut F) -> bool
    where
        F: FnMut(u32, u32, Vec3, f32),
    {
        let size = 1u32 << level;
        let (x0, y0) = (cx * size, cy * size);
        let rect = &frag.rect;
        if x0 > rect.x1 || y0 > rect.y1 || x0 + size - 1 < rect.x0 || y0 + size - 1 < rect.y0 {
            return false;
        }
        if frag.nearest < self.farthest(level, cx, cy) {
            return false;
        }
        if level == 0 {
            return self.shade_pixel(cx, cy, frag, on_pixel);
        }
        let mut visible = false;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            visible |= self.visit(level - 1, cx * 2 + dx, cy * 2 + dy, frag, on_pixel);
        }
        visible
    }

    /// Per-pixel test at the pixel center. Pixels with non-finite weights or
    /// a depth not in front of the eye are skipped.
    fn shade_pixel<F>(&mut self, x: u32, y: u32, frag: &Fragment<'_>, on_pixel: &mut F) -> bool
    where
        F: FnMut(u32, u32, Vec3, f32),
    {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        if !frag.screen.contains(px, py) {
            return false;
        }
        let weights = frag.screen.barycentric(Vec2::new(px, py));
        if !weights.is_finite() {
            return false;
        }
        let z = frag.view.depth_at(weights);
        if !(z < 0.0) || !z.is_finite() {
            return false;
        }
        if z > self.depth(x, y) {
            self.set_depth(x, y, z);
            on_pixel(x, y, weights, z);
            return true;
        }
        false
    }
}
