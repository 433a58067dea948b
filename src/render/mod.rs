//! Rendering core: color buffers, byte-level blending, renderers and the
//! device render loop.

pub mod blend;
pub mod render_loop;
pub mod renderer;
pub mod target;

pub use render_loop::{LoopState, LoopStats, RenderLoop, RenderLoopError, Termination};
pub use renderer::{shared, Renderer, RendererRegistry, SharedRenderer};
pub use target::{blend, swap, RenderTarget, ALIGN_BYTES, ALIGN_COLORS};
