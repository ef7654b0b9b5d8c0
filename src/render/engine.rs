//! Visibility engine: decides which scene triangles can be seen from a camera
//!
//! Three modes share the same per-triangle tests (back-face, canonical
//! volume, z-pyramid depth):
//!
//! - `Naive` transforms every triangle and depth-tests it pixel by pixel.
//! - `ZPyramid` does the same but uses the hierarchical depth test.
//! - `Octree` walks the scene octree, skipping whole nodes whose bounding
//!   box is outside the view volume, and only writes depth.
//!
//! Survivors of every mode are gathered first and then drawn in one global
//! nearest-first order, so a farther triangle never claims pixels that a
//! nearer one owns. The modes reach the same verdicts up to sampling
//! differences at pixel centers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Mat4, Result, Vec3, Vec4};
use crate::geometry::Triangle;
use crate::math::Aabb;
use crate::octree::{NodeId, Octree, OctreeNode};
use crate::render::frame::FrameBuffer;
use crate::render::pyramid::ZPyramid;
use crate::render::shader::{self, Shader};
use crate::scene::Scene;

/// Which culling algorithm to run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Naive,
    #[serde(alias = "z_pyramid")]
    ZPyramid,
    #[default]
    Octree,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Naive, RenderMode::ZPyramid, RenderMode::Octree];

    pub fn name(&self) -> &'static str {
        match self {
            RenderMode::Naive => "naive",
            RenderMode::ZPyramid => "zpyramid",
            RenderMode::Octree => "octree",
        }
    }

    /// Flat modes shade the preview image; octree mode only writes depth
    pub fn shades(&self) -> bool {
        !matches!(self, RenderMode::Octree)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(RenderMode::Naive),
            "zpyramid" | "z_pyramid" | "z-pyramid" => Ok(RenderMode::ZPyramid),
            "octree" => Ok(RenderMode::Octree),
            other => Err(Error::Config(format!(
                "unknown render mode '{}' (expected naive, zpyramid or octree)",
                other
            ))),
        }
    }
}

/// Why a triangle was kept or dropped in the last pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Visible,
    BackFacing,
    OutsideFrustum,
    Occluded,
    /// The octree node holding it was outside the view volume
    NodeCulled,
}

impl Verdict {
    pub fn is_visible(&self) -> bool {
        *self == Verdict::Visible
    }
}

/// Counters for one render pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    pub mode: RenderMode,
    pub triangles: usize,
    pub visible: usize,
    pub back_facing: usize,
    pub outside_frustum: usize,
    pub occluded: usize,
    pub node_culled: usize,
    pub nodes_visited: usize,
    pub nodes_culled: usize,
    pub pixels_written: usize,
    pub elapsed_ms: f64,
}

impl RenderStats {
    pub fn deleted(&self) -> usize {
        self.triangles - self.visible
    }

    fn tally(&mut self, verdicts: &[Verdict]) {
        self.triangles = verdicts.len();
        for v in verdicts {
            match v {
                Verdict::Visible => self.visible += 1,
                Verdict::BackFacing => self.back_facing += 1,
                Verdict::OutsideFrustum => self.outside_frustum += 1,
                Verdict::Occluded => self.occluded += 1,
                Verdict::NodeCulled => self.node_culled += 1,
            }
        }
    }
}

/// Output targets sized to the viewport
struct RenderTarget {
    viewport: Mat4,
    pyramid: ZPyramid,
    frame: FrameBuffer,
}

/// Matrices for one pass
struct Transforms {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    /// Model straight to clip space, for node boxes
    clip: Mat4,
    viewport: Mat4,
    gaze: Vec3,
    /// Eye in model space, for the octree camera-inside test
    eye_model: Vec3,
}

/// A triangle that survived the back-face and view volume tests
struct Prepared {
    index: usize,
    view: Triangle,
    screen: Triangle,
}

enum Staged {
    Culled(usize, Verdict),
    Draw(Prepared),
}

impl Transforms {
    fn new(camera: &Camera, model: Mat4, viewport: Mat4) -> Self {
        let eye_model = model.inverse().transform_point3(camera.position());
        Self {
            model,
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            view_projection: camera.view_projection(),
            clip: camera.view_projection() * model,
            viewport,
            gaze: camera.gaze(),
            eye_model: if eye_model.is_finite() { eye_model } else { camera.position() },
        }
    }

    /// Model -> world (back-face test) -> view -> canonical (volume test) -> screen
    fn stage(&self, t: &Triangle) -> Staged {
        let world = t.transform(&self.model);
        if world.faces_away_from(self.gaze) {
            return Staged::Culled(t.global_index, Verdict::BackFacing);
        }
        let view = world.transform(&self.view);
        let ndc = view.transform(&self.projection);
        if !ndc.vert_in_canonical() {
            return Staged::Culled(t.global_index, Verdict::OutsideFrustum);
        }
        let screen = ndc.transform(&self.viewport);
        Staged::Draw(Prepared { index: t.global_index, view, screen })
    }

    /// A node is worth entering if the eye is inside its bounds, or any of its
    /// front-facing shell faces has a vertex inside the view volume.
    ///
    /// The shell only accepts. A node whose shell vertices all fall outside
    /// can still cross the view (a wall wider than the view, seen up close),
    /// so it is rejected only when its box is wholly outside one clip plane.
    fn node_visible(&self, node: &OctreeNode) -> bool {
        if node.bounds.contains_point(self.eye_model) {
            return true;
        }
        let shell_hit = node.shell.iter().any(|face| {
            let world = face.transform(&self.model);
            !world.faces_away_from(self.gaze)
                && world.transform(&self.view_projection).vert_in_canonical()
        });
        shell_hit || !self.box_outside_frustum(&node.bounds)
    }

    /// True if all eight corners lie on the outer side of one view volume plane.
    ///
    /// Clip w is the (negative) view depth, so it is flipped before testing
    /// `-w <= x, y, z <= w`.
    fn box_outside_frustum(&self, bounds: &Aabb) -> bool {
        if bounds.is_empty() {
            return true;
        }
        let distances = bounds.corners().map(|c| {
            let p = self.clip * c.extend(1.0);
            plane_distances(Vec4::new(p.x, p.y, p.z, -p.w))
        });
        (0..6).any(|plane| distances.iter().all(|d| d[plane] < 0.0))
    }
}

/// Signed distances of a clip-space point to the six view volume planes;
/// non-negative on the inner side
fn plane_distances(c: Vec4) -> [f32; 6] {
    [c.w + c.x, c.w - c.x, c.w + c.y, c.w - c.y, c.w + c.z, c.w - c.z]
}

/// Nearest first; ties by global index so traversal order never matters
fn sort_front_to_back(prepared: &mut [Prepared]) {
    prepared.sort_by(|a, b| {
        b.view.nearest_depth()
            .partial_cmp(&a.view.nearest_depth())
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
}

/// Screen-space mapping of the canonical square to `[0, w] x [0, h]`
pub fn viewport_matrix(width: u32, height: u32) -> Mat4 {
    Mat4::from_scale(Vec3::new(width as f32 * 0.5, height as f32 * 0.5, 1.0))
        * Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0))
}

/// Octree traversal state. Triangles of entered nodes that pass the
/// per-triangle tests are collected in `survivors` for the shared draw.
struct OctreePass<'a> {
    octree: &'a Octree,
    triangles: &'a [Triangle],
    xf: &'a Transforms,
    verdicts: &'a mut [Verdict],
    stats: &'a mut RenderStats,
    survivors: Vec<Prepared>,
}

impl OctreePass<'_> {
    fn visit(&mut self, id: NodeId) {
        let octree = self.octree;
        let node = octree.node(id);
        if !self.xf.node_visible(node) {
            let verdicts = &mut *self.verdicts;
            octree.for_each_in_subtree(id, &mut |t| verdicts[t] = Verdict::NodeCulled);
            self.stats.nodes_culled += 1;
            log::trace!("Node {} (depth {}) outside the view volume", id, node.depth);
            return;
        }
        self.stats.nodes_visited += 1;

        for &index in &node.triangles {
            match self.xf.stage(&self.triangles[index]) {
                Staged::Culled(i, verdict) => self.verdicts[i] = verdict,
                Staged::Draw(p) => self.survivors.push(p),
            }
        }
        for child in node.child_ids() {
            self.visit(child);
        }
    }
}

/// Runs visibility passes over a scene it owns
pub struct VisibilityEngine {
    scene: Scene,
    camera: Option<Camera>,
    model: Option<Mat4>,
    target: Option<RenderTarget>,
    shader: Shader,
    verdicts: Vec<Verdict>,
}

impl VisibilityEngine {
    /// Engine with no camera, transformation or viewport yet
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            camera: None,
            model: None,
            target: None,
            shader: Box::new(shader::normal),
            verdicts: Vec::new(),
        }
    }

    pub fn with_viewport(scene: Scene, width: u32, height: u32) -> Result<Self> {
        let mut engine = Self::new(scene);
        engine.init_viewport(width, height)?;
        Ok(engine)
    }

    /// Allocate the depth pyramid and preview image
    pub fn init_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!("viewport must be non-empty, got {}x{}", width, height)));
        }
        self.target = Some(RenderTarget {
            viewport: viewport_matrix(width, height),
            pyramid: ZPyramid::new(width, height),
            frame: FrameBuffer::new(width, height),
        });
        log::debug!("Viewport {}x{}", width, height);
        Ok(())
    }

    pub fn init_camera(&mut self, camera: Camera) {
        log::debug!(
            "Camera at {:?} gazing {:?} (near {}, far {})",
            camera.position(),
            camera.gaze(),
            camera.near(),
            camera.far()
        );
        self.camera = Some(camera);
    }

    /// Set the model transform; view and projection come from the camera,
    /// which must already be initialized.
    pub fn set_model_transformation(&mut self, model: Mat4) -> Result<()> {
        if self.camera.is_none() {
            return Err(Error::NotInitialized("camera"));
        }
        if !model.is_finite() {
            return Err(Error::Config("model transformation must be finite".to_string()));
        }
        self.model = Some(model);
        Ok(())
    }

    pub fn set_shader(&mut self, shader: Shader) {
        self.shader = shader;
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }

    /// Preview image of the last pass
    pub fn image(&self) -> Option<&FrameBuffer> {
        self.target.as_ref().map(|t| &t.frame)
    }

    /// Depth pyramid of the last pass
    pub fn pyramid(&self) -> Option<&ZPyramid> {
        self.target.as_ref().map(|t| &t.pyramid)
    }

    /// Per-triangle verdicts of the last pass, by global index
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Clear the image, the depth pyramid and every deleted flag
    pub fn reset(&mut self) {
        if let Some(target) = &mut self.target {
            target.pyramid.clear();
            target.frame.fill(Vec3::ZERO);
        }
        self.scene.clear_deleted();
        self.verdicts.clear();
    }

    /// Run one visibility pass and write the deleted flags back to the scene.
    ///
    /// Buffers are cleared first, so repeated passes with the same inputs
    /// produce the same flags.
    pub fn render(&mut self, mode: RenderMode) -> Result<RenderStats> {
        let camera = self.camera.as_ref().ok_or(Error::NotInitialized("camera"))?;
        let model = self.model.ok_or(Error::NotInitialized("transformation matrices"))?;
        let target = self.target.as_mut().ok_or(Error::NotInitialized("viewport"))?;

        let start = Instant::now();
        let xf = Transforms::new(camera, model, target.viewport);
        target.pyramid.clear();
        target.frame.fill(Vec3::ZERO);

        let triangles = self.scene.triangles();
        let mut stats = RenderStats { mode, ..Default::default() };
        let mut verdicts = vec![Verdict::NodeCulled; triangles.len()];

        let mut drawable = match mode {
            RenderMode::Octree => {
                let mut pass = OctreePass {
                    octree: self.scene.octree(),
                    triangles,
                    xf: &xf,
                    verdicts: &mut verdicts,
                    stats: &mut stats,
                    survivors: Vec::new(),
                };
                if !triangles.is_empty() {
                    pass.visit(Octree::ROOT);
                }
                pass.survivors
            }
            RenderMode::Naive | RenderMode::ZPyramid => {
                let staged: Vec<Staged> = triangles.par_iter().map(|t| xf.stage(t)).collect();
                let mut drawable = Vec::with_capacity(staged.len());
                for s in staged {
                    match s {
                        Staged::Culled(i, verdict) => verdicts[i] = verdict,
                        Staged::Draw(p) => drawable.push(p),
                    }
                }
                drawable
            }
        };
        sort_front_to_back(&mut drawable);

        let hierarchical = mode != RenderMode::Naive;
        let shades = mode.shades();
        let shader = &self.shader;
        let frame = &mut target.frame;
        for p in &drawable {
            let mut written = 0;
            let mut on_pixel = |x: u32, y: u32, weights: Vec3, _z: f32| {
                if shades {
                    frame.set(x, y, shader(&p.screen, &p.view, weights));
                }
                written += 1;
            };
            let visible = if hierarchical {
                target.pyramid.rasterize(&p.screen, &p.view, &mut on_pixel)
            } else {
                target.pyramid.rasterize_flat(&p.screen, &p.view, &mut on_pixel)
            };
            stats.pixels_written += written;
            verdicts[p.index] = if visible { Verdict::Visible } else { Verdict::Occluded };
        }

        for (i, verdict) in verdicts.iter().enumerate() {
            self.scene.set_deleted(i, !verdict.is_visible());
        }
        stats.tally(&verdicts);
        stats.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.verdicts = verdicts;

        log::info!(
            "{} pass: {}/{} visible ({} back-facing, {} outside, {} occluded, {} in culled nodes) in {:.2}ms",
            mode,
            stats.visible,
            stats.triangles,
            stats.back_facing,
            stats.outside_frustum,
            stats.occluded,
            stats.node_culled,
            stats.elapsed_ms
        );
        if mode == RenderMode::Octree {
            log::debug!("Octree nodes: {} visited, {} culled", stats.nodes_visited, stats.nodes_culled);
        }
        Ok(stats)
    }
}
