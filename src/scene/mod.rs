//! Live scene state: camera, light, and orbital animation.

mod camera;
mod light;
mod orbit;

pub use camera::*;
pub use light::*;
pub use orbit::*;
