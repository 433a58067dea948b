//! Renderer trait and the shared renderer registry.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::target::RenderTarget;

/// Something that paints key colors into a render target
///
/// Called once per frame with the nanoseconds elapsed since the previous
/// frame. The target is reused across frames and not cleared, so a renderer
/// should repaint every key it cares about.
pub trait Renderer: Send {
    fn render(&mut self, elapsed_ns: u64, target: &mut RenderTarget);
}

/// Renderer handle shared between its owner and the registry
pub type SharedRenderer = Arc<Mutex<dyn Renderer>>;

/// Wrap a renderer into a [`SharedRenderer`]
pub fn shared<R: Renderer + 'static>(renderer: R) -> SharedRenderer {
    Arc::new(Mutex::new(renderer))
}

/// Ordered list of renderers, shared between a render loop and whoever
/// manages its effects
///
/// Every access goes through one mutex. The render loop holds it for the
/// whole renderer pass of a frame, so anything done while holding
/// [`RendererRegistry::lock`] is atomic with respect to frames. Dropping a
/// registry entry only drops a handle; renderers live as long as their
/// owners keep them.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    inner: Arc<Mutex<Vec<SharedRenderer>>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the list for reading or arbitrary modification
    pub fn lock(&self) -> MutexGuard<'_, Vec<SharedRenderer>> {
        self.inner.lock()
    }

    /// Replace the whole list
    pub fn set(&self, renderers: Vec<SharedRenderer>) {
        let mut list = self.inner.lock();
        *list = renderers;
        debug!("Enabled {} renderers", list.len());
    }

    /// Append a renderer; it runs after all current ones
    pub fn push(&self, renderer: SharedRenderer) {
        let mut list = self.inner.lock();
        list.push(renderer);
        debug!("Enabled {} renderers", list.len());
    }

    /// Remove a renderer by identity. Returns whether it was registered.
    pub fn remove(&self, renderer: &SharedRenderer) -> bool {
        let mut list = self.inner.lock();
        let before = list.len();
        list.retain(|r| !Arc::ptr_eq(r, renderer));
        before != list.len()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
