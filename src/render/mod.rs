//! GPU rendering: asset loading, meshes, frame targets, and the pass sequencer.

mod assets;
mod mesh;
mod passes;
mod targets;

pub use assets::*;
pub use mesh::*;
pub use passes::*;
pub use targets::*;
