//! Wavefront OBJ import
//!
//! Supports the subset needed for triangle soups: `v` (with optional vertex
//! colors), `vn`, `vt`, `f` in every index form including negative indices,
//! `o`/`g` groups and `usemtl`. Polygons are fan-triangulated. Other
//! statements are skipped.

use std::collections::HashMap;
use std::path::Path;

use crate::core::error::Error;
use crate::core::types::{Color, Result, Vec2, Vec3};
use crate::geometry::Triangle;
use crate::octree::OctreeConfig;
use crate::scene::{MeshGroup, Scene};

/// One triangle of an OBJ face, as 0-based attribute indices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjFace {
    pub position: [u32; 3],
    pub texcoord: Option<[u32; 3]>,
    pub normal: Option<[u32; 3]>,
    pub material: Option<u32>,
}

/// Parsed OBJ file
#[derive(Clone, Debug, Default)]
pub struct ObjModel {
    pub positions: Vec<Vec3>,
    /// One per position; black where the file gives no color
    pub colors: Vec<Color>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub faces: Vec<ObjFace>,
    /// Triangle runs in face order, empty groups dropped
    pub groups: Vec<MeshGroup>,
    /// Material names, indexed by `ObjFace::material`
    pub materials: Vec<String>,
}

/// Parser state that is not part of the result
#[derive(Default)]
struct ParseState {
    material: Option<u32>,
    material_ids: HashMap<String, u32>,
}

impl ObjModel {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let model = Self::parse(&text)?;
        log::info!(
            "Loaded {}: {} vertices, {} triangles, {} groups",
            path.display(),
            model.positions.len(),
            model.faces.len(),
            model.groups.len()
        );
        Ok(model)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut model = ObjModel::default();
        let mut state = ParseState::default();
        model.groups.push(MeshGroup::new("default", 0));

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            let mut tokens = content.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            let args: Vec<&str> = tokens.collect();

            match keyword {
                "v" => {
                    let values = parse_floats(&args, line)?;
                    if values.len() < 3 {
                        return Err(obj_error(line, "vertex needs at least 3 coordinates"));
                    }
                    model.positions.push(Vec3::new(values[0], values[1], values[2]));
                    let color = if values.len() >= 6 {
                        Color::new(values[3], values[4], values[5])
                    } else {
                        Color::ZERO
                    };
                    model.colors.push(color);
                }
                "vn" => {
                    let values = parse_floats(&args, line)?;
                    if values.len() < 3 {
                        return Err(obj_error(line, "normal needs 3 components"));
                    }
                    model.normals.push(Vec3::new(values[0], values[1], values[2]));
                }
                "vt" => {
                    let values = parse_floats(&args, line)?;
                    if values.is_empty() {
                        return Err(obj_error(line, "texture coordinate needs at least 1 component"));
                    }
                    let v = values.get(1).copied().unwrap_or(0.0);
                    model.texcoords.push(Vec2::new(values[0], v));
                }
                "f" => model.parse_face(&args, line, state.material)?,
                "o" | "g" => {
                    let name = if args.is_empty() { "default".to_string() } else { args.join(" ") };
                    model.start_group(name);
                }
                "usemtl" => {
                    let name = args.join(" ");
                    let next = model.materials.len() as u32;
                    let id = *state.material_ids.entry(name.clone()).or_insert_with(|| {
                        model.materials.push(name);
                        next
                    });
                    state.material = Some(id);
                }
                _ => log::trace!("Skipping OBJ statement '{}' at line {}", keyword, line),
            }
        }

        model.groups.retain(|g| g.triangle_count > 0);
        Ok(model)
    }

    /// Load a file straight into a scene
    pub fn load_scene(path: &Path, config: &OctreeConfig) -> Result<Scene> {
        Self::load(path)?.into_scene(config)
    }

    pub fn into_scene(self, config: &OctreeConfig) -> Result<Scene> {
        let triangles = self.triangles();
        Scene::new(triangles, self.groups, config)
    }

    /// Resolve faces into world-space triangles, in face order
    pub fn triangles(&self) -> Vec<Triangle> {
        self.faces
            .iter()
            .map(|face| {
                let [a, b, c] = face.position.map(|i| self.positions[i as usize]);
                let mut t = Triangle::with_indices(a, b, c, face.position)
                    .with_colors(face.position.map(|i| self.colors[i as usize]));
                if let Some(n) = face.normal {
                    t = t.with_normals(n.map(|i| self.normals[i as usize]));
                }
                if let Some(uv) = face.texcoord {
                    t = t.with_uvs(uv.map(|i| self.texcoords[i as usize]));
                }
                if let Some(m) = face.material {
                    t = t.with_material(m);
                }
                t
            })
            .collect()
    }

    fn start_group(&mut self, name: String) {
        if let Some(current) = self.groups.last_mut().filter(|g| g.triangle_count == 0) {
            current.name = name;
        } else {
            self.groups.push(MeshGroup::new(name, 0));
        }
    }

    fn parse_face(&mut self, args: &[&str], line: usize, material: Option<u32>) -> Result<()> {
        if args.len() < 3 {
            return Err(obj_error(line, "face needs at least 3 vertices"));
        }
        let mut corners = Vec::with_capacity(args.len());
        for token in args {
            corners.push(self.parse_corner(token, line)?);
        }
        let has_uv = corners.iter().all(|c| c.1.is_some());
        let has_normal = corners.iter().all(|c| c.2.is_some());

        for k in 1..corners.len() - 1 {
            let tri = [corners[0], corners[k], corners[k + 1]];
            self.faces.push(ObjFace {
                position: tri.map(|c| c.0),
                texcoord: has_uv.then(|| tri.map(|c| c.1.unwrap_or(0))),
                normal: has_normal.then(|| tri.map(|c| c.2.unwrap_or(0))),
                material,
            });
            if let Some(group) = self.groups.last_mut() {
                group.triangle_count += 1;
            }
        }
        Ok(())
    }

    /// `v`, `v/vt`, `v/vt/vn` or `v//vn`
    fn parse_corner(&self, token: &str, line: usize) -> Result<(u32, Option<u32>, Option<u32>)> {
        let mut parts = token.split('/');
        let position = match parts.next() {
            Some(p) if !p.is_empty() => resolve_index(p, self.positions.len(), "vertex", line)?,
            _ => return Err(obj_error(line, format!("face corner '{}' has no vertex index", token))),
        };
        let texcoord = match parts.next() {
            Some(p) if !p.is_empty() => Some(resolve_index(p, self.texcoords.len(), "texture coordinate", line)?),
            _ => None,
        };
        let normal = match parts.next() {
            Some(p) if !p.is_empty() => Some(resolve_index(p, self.normals.len(), "normal", line)?),
            _ => None,
        };
        Ok((position, texcoord, normal))
    }
}

/// 1-based (or negative, relative to the end) OBJ index to a 0-based one
fn resolve_index(token: &str, len: usize, what: &str, line: usize) -> Result<u32> {
    let index: i64 = token
        .parse()
        .map_err(|_| obj_error(line, format!("invalid {} index '{}'", what, token)))?;
    let resolved = match index {
        0 => return Err(obj_error(line, format!("{} index 0 is not valid", what))),
        i if i > 0 => i - 1,
        i => len as i64 + i,
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(obj_error(
            line,
            format!("{} index {} out of range ({} defined)", what, index, len),
        ));
    }
    Ok(resolved as u32)
}

fn parse_floats(args: &[&str], line: usize) -> Result<Vec<f32>> {
    args.iter()
        .map(|s| s.parse::<f32>().map_err(|_| obj_error(line, format!("invalid number '{}'", s))))
        .collect()
}

fn obj_error(line: usize, message: impl Into<String>) -> Error {
    Error::Obj { line, message: message.into() }
}
