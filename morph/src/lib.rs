pub mod camera;
pub mod config;
pub mod constants;
pub mod exchange;
pub mod gesture;
pub mod shape;
pub mod sim;
pub mod ui;
pub mod vision;

pub use config::{GeminiConfig, MorphConfig};
pub use exchange::{Exchange, LoadedShape, VisionStatus};
pub use gesture::{GestureExtractor, GestureState, Hand, Landmark};
pub use shape::{
    GeminiGenerator, PresetShape, ShapeError, ShapeGenerator, ShapeOrigin, ShapePoints,
    ShapeSource,
};
pub use sim::{ParticleSet, Simulation};
pub use ui::MorphApp;
pub use vision::{HandSource, SimHandSource, VisionError, VisionHandle, spawn_vision_loop};
