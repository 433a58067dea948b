//! Fixed-rate frame scheduler.
//!
//! [`AnimationLoop`] calls an [`Animation`] at a fixed frame rate on the
//! calling thread until the animation asks to stop, fails, or a
//! [`StopHandle`] is triggered from elsewhere.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Per-frame callback driven by an [`AnimationLoop`]
pub trait Animation {
    type Error;

    /// Render one frame. `elapsed_ns` is the time since the previous call
    /// within the same run (0 for the first frame). Return `Ok(false)` to
    /// stop the loop.
    fn render(&mut self, elapsed_ns: u64) -> Result<bool, Self::Error>;
}

/// Cloneable handle to stop an [`AnimationLoop`] from another thread
///
/// A stop is sticky: once requested, every later `run` returns immediately.
#[derive(Clone, Default)]
pub struct StopHandle {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopHandle {
    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep until `deadline` or until stopped. Returns true if stopped.
    fn wait_until(&self, deadline: Instant) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock();
        while !*stopped {
            if cvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Fixed-rate scheduler
pub struct AnimationLoop {
    period: Duration,
    stop: StopHandle,
}

impl AnimationLoop {
    /// Create a loop running at `fps` frames per second (at least 1)
    pub fn new(fps: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / fps.max(1),
            stop: StopHandle::default(),
        }
    }

    /// Time between two frame starts
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run `animation` on the calling thread until it returns `Ok(false)`,
    /// returns an error, or the loop is stopped
    ///
    /// A frame that overruns its slot delays the next one; missed slots are
    /// not caught up.
    pub fn run<A: Animation + ?Sized>(&self, animation: &mut A) -> Result<(), A::Error> {
        let mut last: Option<Instant> = None;
        let mut deadline = Instant::now();

        while !self.stop.is_stopped() {
            let now = Instant::now();
            let elapsed_ns = last.map_or(0, |t| {
                u64::try_from(now.duration_since(t).as_nanos()).unwrap_or(u64::MAX)
            });
            last = Some(now);

            if !animation.render(elapsed_ns)? {
                break;
            }

            deadline += self.period;
            let now = Instant::now();
            if deadline <= now {
                trace!("Frame overran its slot by {:?}", now - deadline);
                deadline = now;
                continue;
            }
            if self.stop.wait_until(deadline) {
                break;
            }
        }
        Ok(())
    }
}
