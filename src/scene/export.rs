//! Output of a culled scene: kept/dropped face lists, model buffers and a
//! JSON summary per mesh group

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::geometry::Triangle;
use crate::scene::Scene;

/// OBJ face line with 1-based vertex indices: `f a// b// c//`
pub fn face_line(t: &Triangle) -> String {
    let [a, b, c] = t.indices.map(|i| i + 1);
    format!("f {}// {}// {}//", a, b, c)
}

fn face_list<'a>(triangles: impl Iterator<Item = &'a Triangle>) -> String {
    let mut out = String::new();
    for t in triangles {
        let _ = writeln!(out, "{}", face_line(t));
    }
    out
}

/// Write the kept and the dropped faces as two OBJ face lists
pub fn write_face_lists(scene: &Scene, kept: &Path, dropped: &Path) -> Result<()> {
    fs::write(kept, face_list(scene.triangles().iter().filter(|t| !t.is_deleted())))?;
    fs::write(dropped, face_list(scene.triangles().iter().filter(|t| t.is_deleted())))?;
    log::info!(
        "Wrote face lists: {} kept to {}, {} dropped to {}",
        scene.kept_count(),
        kept.display(),
        scene.deleted_count(),
        dropped.display()
    );
    Ok(())
}

/// Corners of the selected triangles and their per-group index buffer.
///
/// On disk every position is three `f32`s, followed by every index as a
/// `u32`, native byte order. The n-th selected triangle of a mesh group gets
/// indices `3n, 3n + 1, 3n + 2`: numbering restarts at each group, so a
/// group's indices address its own run of positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelBuffer {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl ModelBuffer {
    /// Gather the triangles whose deleted flag equals `deleted`, looking their
    /// corners up in the importer's position table.
    pub fn gather(scene: &Scene, positions: &[Vec3], deleted: bool) -> Result<Self> {
        let mut buffer = Self::default();
        for (_, range) in scene.group_ranges() {
            let mut k = 0u32;
            for t in scene.triangles()[range].iter().filter(|t| t.is_deleted() == deleted) {
                for &i in &t.indices {
                    let p = positions.get(i as usize).ok_or_else(|| {
                        Error::Scene(format!(
                            "triangle {} references vertex {} but only {} exist",
                            t.global_index,
                            i,
                            positions.len()
                        ))
                    })?;
                    buffer.positions.push(*p);
                }
                buffer.indices.extend([k, k + 1, k + 2]);
                k += 3;
            }
        }
        Ok(buffer)
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.positions.len() * 12 + self.indices.len() * 4);
        bytes.extend_from_slice(bytemuck::cast_slice::<Vec3, u8>(&self.positions));
        bytes.extend_from_slice(bytemuck::cast_slice::<u32, u8>(&self.indices));
        bytes
    }

    /// Split a buffer written by `to_bytes`; there is one index per position
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 48 != 0 {
            return Err(Error::Scene(format!(
                "{} bytes is not a whole number of triangles",
                bytes.len()
            )));
        }
        let (positions, indices) = bytes.split_at(bytes.len() / 16 * 12);
        Ok(Self {
            positions: bytemuck::pod_collect_to_vec::<u8, Vec3>(positions),
            indices: bytemuck::pod_collect_to_vec::<u8, u32>(indices),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes).map_err(|e| Error::Scene(format!("{}: {}", path.display(), e)))
    }
}

/// Write the kept and the dropped triangles as two model buffers
pub fn write_model_buffers(scene: &Scene, positions: &[Vec3], kept: &Path, dropped: &Path) -> Result<()> {
    let kept_buffer = ModelBuffer::gather(scene, positions, false)?;
    let dropped_buffer = ModelBuffer::gather(scene, positions, true)?;
    kept_buffer.save(kept)?;
    dropped_buffer.save(dropped)?;
    log::debug!(
        "Wrote model buffers: {} triangles to {}, {} to {}",
        kept_buffer.triangle_count(),
        kept.display(),
        dropped_buffer.triangle_count(),
        dropped.display()
    );
    Ok(())
}

/// Kept/dropped counts of one mesh group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub triangles: usize,
    pub kept: usize,
    pub dropped: usize,
}

/// Kept/dropped counts for a whole scene
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullSummary {
    pub triangles: usize,
    pub kept: usize,
    pub dropped: usize,
    pub groups: Vec<GroupSummary>,
}

impl CullSummary {
    pub fn from_scene(scene: &Scene) -> Self {
        let groups = scene
            .group_ranges()
            .map(|(group, range)| {
                let dropped = scene.triangles()[range].iter().filter(|t| t.is_deleted()).count();
                GroupSummary {
                    name: group.name.clone(),
                    triangles: group.triangle_count,
                    kept: group.triangle_count - dropped,
                    dropped,
                }
            })
            .collect();
        Self {
            triangles: scene.len(),
            kept: scene.kept_count(),
            dropped: scene.deleted_count(),
            groups,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
