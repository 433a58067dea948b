//! Device render loop.
//!
//! A [`RenderLoop`] runs a set of renderers at a fixed rate and sends the
//! resulting key colors to a [`Device`]. Only keys whose color changed since
//! the last committed frame are sent.
//!
//! ```text
//!   Idle ──run──▶ Priming ──▶ Running ──device error──▶ Recovering
//!                    │           ▲                          │
//!                    │           └────────resync ok─────────┤
//!                    ▼                                      ▼
//!                Terminated ◀────────resync failed / stop / other error
//! ```
//!
//! The loop takes full control of the device. No other code may use the
//! device while a loop for it exists.

use std::any::Any;
use std::collections::TryReserveError;
use std::panic::{self, AssertUnwindSafe};

use keyglow_device::{ColorDirective, Device, DeviceError, ErrorCode};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::renderer::RendererRegistry;
use super::target::{self, RenderTarget};
use crate::animation::{Animation, AnimationLoop};
use crate::color::RgbaColor;

/// Lifecycle state of a [`RenderLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, not started
    Idle,
    /// Reading the device's current colors
    Priming,
    /// Rendering frames
    Running,
    /// Resynchronizing the device after an error
    Recovering,
    /// Stopped for good
    Terminated,
}

/// Errors that end a render loop
#[derive(Error, Debug)]
pub enum RenderLoopError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("renderer panicked: {0}")]
    RendererPanicked(String),

    #[error("cannot allocate render target: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Why [`RenderLoop::run`] returned
#[derive(Debug)]
pub enum Termination {
    /// The scheduler was stopped
    Stopped,
    /// The device went away or stopped answering; not a failure
    Expected(DeviceError),
    /// Unrecoverable error, already logged
    Failed(RenderLoopError),
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed(_))
    }
}

/// Frame counters, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames rendered
    pub frames: u64,
    /// Frames that sent at least one change
    pub commits: u64,
    /// Directives sent
    pub directives: u64,
    /// Successful resynchronizations
    pub resyncs: u64,
}

/// Device errors that mean the device is gone rather than broken
fn is_expected_termination(err: &DeviceError) -> bool {
    err.is_device_removed() || err.code() == ErrorCode::TimedOut
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Renders a registry of renderers to a device
pub struct RenderLoop<D: Device> {
    device: D,
    renderers: RendererRegistry,
    /// What the device currently shows
    committed: RenderTarget,
    /// Render buffer, reused across frames
    scratch: RenderTarget,
    /// Reused across frames so rendering does not allocate
    directives: Vec<ColorDirective>,
    state: LoopState,
    stats: LoopStats,
}

impl<D: Device> RenderLoop<D> {
    /// Create a loop for `device`, rendering the renderers of `renderers`
    pub fn new(device: D, renderers: RendererRegistry) -> Result<Self, RenderLoopError> {
        let committed = Self::try_render_target_for(&device)?;
        let scratch = Self::try_render_target_for(&device)?;

        let max_keys = device
            .blocks()
            .iter()
            .map(|b| b.keys().len())
            .max()
            .unwrap_or(0);
        let mut directives = Vec::new();
        directives.try_reserve_exact(max_keys)?;

        Ok(Self {
            device,
            renderers,
            committed,
            scratch,
            directives,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        })
    }

    /// Create a render target matching the block layout of `device`
    pub fn render_target_for(device: &D) -> RenderTarget {
        RenderTarget::new(&device.block_sizes())
    }

    fn try_render_target_for(device: &D) -> Result<RenderTarget, TryReserveError> {
        RenderTarget::try_new(&device.block_sizes())
    }

    /// Handle to the renderer list; lock it to change renderers
    pub fn renderers(&self) -> RendererRegistry {
        self.renderers.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Color the loop believes `(block, offset)` currently shows
    pub fn committed_color(&self, block: usize, offset: usize) -> RgbaColor {
        *self.committed.get(block, offset)
    }

    /// Consume the loop, handing the device back
    pub fn into_device(self) -> D {
        self.device
    }

    /// Run the loop on the calling thread until it stops
    ///
    /// Reads the device state first, then renders frames through
    /// `scheduler`. A device error during a frame triggers one resync; if
    /// that works, rendering resumes against the unchanged committed state.
    /// Errors are logged here, except for device removal and timeouts, which
    /// are reported as [`Termination::Expected`] without error output.
    pub fn run(&mut self, scheduler: &AnimationLoop) -> Termination {
        self.state = LoopState::Priming;
        if let Err(err) = self.prime() {
            error!("device error: {err}");
            self.state = LoopState::Terminated;
            return Termination::Failed(err.into());
        }

        // Pacing belongs to the scheduler; idle periods must not time out
        self.device.set_timeout(0);
        self.state = LoopState::Running;
        info!(
            "Render loop running at {:.1} FPS",
            1.0 / scheduler.period().as_secs_f64()
        );

        let result = loop {
            match scheduler.run(self) {
                Ok(()) => break Ok(()),
                Err(RenderLoopError::Device(err)) => {
                    self.state = LoopState::Recovering;
                    warn!("device error: {err}, resynchronizing");
                    if !self.device.resync() {
                        break Err(RenderLoopError::Device(err));
                    }
                    self.stats.resyncs += 1;
                    self.state = LoopState::Running;
                }
                Err(err) => break Err(err),
            }
        };

        self.state = LoopState::Terminated;
        match result {
            Ok(()) => {
                info!("Render loop stopped after {} frames", self.stats.frames);
                Termination::Stopped
            }
            Err(RenderLoopError::Device(err)) if is_expected_termination(&err) => {
                info!("Device gone ({err}), render loop stopped");
                Termination::Expected(err)
            }
            Err(err) => {
                error!("{err}");
                Termination::Failed(err)
            }
        }
    }

    /// Render one frame and send changed keys to the device
    ///
    /// Returns `Ok(true)` to keep the scheduler running.
    pub fn render_frame(&mut self, elapsed_ns: u64) -> Result<bool, RenderLoopError> {
        let has_renderers = {
            let renderers = self.renderers.lock();
            let scratch = &mut self.scratch;
            panic::catch_unwind(AssertUnwindSafe(|| {
                for renderer in renderers.iter() {
                    renderer.lock().render(elapsed_ns, scratch);
                }
            }))
            .map_err(|payload| RenderLoopError::RendererPanicked(panic_message(&*payload)))?;
            !renderers.is_empty()
        };

        if !has_renderers {
            return Ok(true);
        }
        self.stats.frames += 1;

        // Another program may have filled the inbound queue
        self.device.flush()?;

        let mut has_changes = false;
        for (bidx, block) in self.device.blocks().iter().enumerate() {
            self.directives.clear();
            for (idx, &key) in block.keys().iter().enumerate() {
                let color = self.scratch.get(bidx, idx);
                if color != self.committed.get(bidx, idx) {
                    self.directives.push(ColorDirective::new(
                        key,
                        color.red,
                        color.green,
                        color.blue,
                    ));
                }
            }
            if !self.directives.is_empty() {
                self.device.set_colors(block, &self.directives)?;
                self.stats.directives += self.directives.len() as u64;
                has_changes = true;
            }
        }

        if has_changes {
            self.device.commit_colors()?;
            self.stats.commits += 1;
        }
        target::swap(&mut self.committed, &mut self.scratch);
        Ok(true)
    }

    /// Read the current device colors into the committed buffer
    fn prime(&mut self) -> Result<(), DeviceError> {
        for (bidx, block) in self.device.blocks().iter().enumerate() {
            let colors = self.device.get_colors(block)?;
            debug!("Read {} colors from block {}", colors.len(), block.name());
            for (idx, key) in colors.iter().take(block.keys().len()).enumerate() {
                let color = self.committed.get_mut(bidx, idx);
                color.red = key.red;
                color.green = key.green;
                color.blue = key.blue;
                color.alpha = 255;
            }
        }
        Ok(())
    }
}

impl<D: Device> Animation for RenderLoop<D> {
    type Error = RenderLoopError;

    fn render(&mut self, elapsed_ns: u64) -> Result<bool, RenderLoopError> {
        self.render_frame(elapsed_ns)
    }
}
