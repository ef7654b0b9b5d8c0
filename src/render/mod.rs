//! Software depth rasterization and the visibility passes built on it

pub mod pyramid;
pub mod frame;
pub mod shader;
pub mod engine;

pub use engine::{viewport_matrix, RenderMode, RenderStats, Verdict, VisibilityEngine};
pub use frame::FrameBuffer;
pub use pyramid::{PixelRect, ZPyramid};
pub use shader::{Shader, ShaderKind};
