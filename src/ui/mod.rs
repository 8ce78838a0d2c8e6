//! Overlay windows for scene and orbit tuning.

mod panels;

pub use panels::*;
