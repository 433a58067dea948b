// keyglow - keyboard lighting daemon core
// Render buffers, renderer registry and the diffing device render loop

pub mod animation;
pub mod color;
pub mod config;
pub mod effect;
pub mod render;

pub use animation::{Animation, AnimationLoop, StopHandle};
pub use color::RgbaColor;
pub use config::{ConfigError, DaemonConfig, EffectConfig};
pub use render::{
    shared, LoopState, LoopStats, RenderLoop, RenderLoopError, RenderTarget, Renderer,
    RendererRegistry, SharedRenderer, Termination,
};

pub use keyglow_device as device;
