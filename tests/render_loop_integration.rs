//! Integration tests for the render loop.
//!
//! These drive a `RenderLoop` over a `SimulatedDevice` with a real
//! `AnimationLoop` running at a high frame rate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use keyglow::device::{ColorDirective, Device, DeviceError, DeviceOp, SimulatedDevice};
use keyglow::render::RenderLoopError;
use keyglow::{
    shared, AnimationLoop, LoopState, RenderLoop, RenderTarget, Renderer, RendererRegistry,
    RgbaColor, StopHandle, Termination,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

const TEST_FPS: u32 = 500;

/// Fills every key black, then paints a fixed set of keys
struct Paint(Vec<(usize, usize, RgbaColor)>);

impl Renderer for Paint {
    fn render(&mut self, _elapsed_ns: u64, target: &mut RenderTarget) {
        target.fill(RgbaColor::BLACK);
        for &(b, k, c) in &self.0 {
            *target.get_mut(b, k) = c;
        }
    }
}

/// Changes key (0, 0) on every frame so each frame writes to the device
struct Cycle(u8);

impl Renderer for Cycle {
    fn render(&mut self, _elapsed_ns: u64, target: &mut RenderTarget) {
        self.0 = self.0.wrapping_add(1);
        *target.get_mut(0, 0) = RgbaColor::opaque(self.0, 0, 0);
    }
}

/// Stops the scheduler once it has seen `remaining` frames
struct StopAfter {
    stop: StopHandle,
    remaining: usize,
}

impl Renderer for StopAfter {
    fn render(&mut self, _elapsed_ns: u64, _target: &mut RenderTarget) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop.stop();
        }
    }
}

/// Counts error-level events
#[derive(Clone, Default)]
struct ErrorEvents(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` on this thread and count the error events it logs
fn count_errors<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let errors = ErrorEvents::default();
    let subscriber = tracing_subscriber::registry().with(errors.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, errors.0.load(Ordering::SeqCst))
}

fn setup(
    layout: &[(&str, usize)],
) -> (
    SimulatedDevice,
    RendererRegistry,
    RenderLoop<SimulatedDevice>,
    AnimationLoop,
) {
    let device = SimulatedDevice::new(layout);
    let registry = RendererRegistry::new();
    let render_loop = RenderLoop::new(device.clone(), registry.clone()).unwrap();
    let scheduler = AnimationLoop::new(TEST_FPS);
    (device, registry, render_loop, scheduler)
}

fn stop_after(scheduler: &AnimationLoop, frames: usize) -> keyglow::SharedRenderer {
    shared(StopAfter {
        stop: scheduler.stop_handle(),
        remaining: frames,
    })
}

#[test]
fn single_key_change_sends_one_directive() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 6), ("logo", 2)]);
    registry.set(vec![
        shared(Paint(vec![(0, 3, RgbaColor::new(255, 0, 0, 255))])),
        stop_after(&scheduler, 1),
    ]);

    let termination = render_loop.run(&scheduler);
    assert!(matches!(termination, Termination::Stopped));

    let key = device.blocks()[0].keys()[3];
    let sent = device.take_sent();
    assert_eq!(sent, vec![(0, vec![ColorDirective::new(key, 255, 0, 0)])]);
    assert_eq!(device.stats().commits, 1);

    let c = device.color(0, 3);
    assert_eq!((c.red, c.green, c.blue), (255, 0, 0));
    assert_eq!(render_loop.state(), LoopState::Terminated);
}

#[test]
fn unchanged_frames_send_nothing() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 6)]);
    registry.set(vec![
        shared(Paint(vec![(0, 0, RgbaColor::WHITE)])),
        stop_after(&scheduler, 5),
    ]);

    render_loop.run(&scheduler);

    // first frame sends the change, the next four are identical
    assert_eq!(device.take_sent().len(), 1);
    let stats = device.stats();
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.flushes, 5);
    assert_eq!(render_loop.stats().frames, 5);
}

#[test]
fn priming_reads_state_and_disables_timeout() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4), ("logo", 1)]);
    device.set_timeout(2000);
    device.set_color(0, 1, 0, 128, 0);
    registry.set(vec![
        shared(Paint(vec![(0, 1, RgbaColor::opaque(0, 128, 0))])),
        stop_after(&scheduler, 1),
    ]);

    render_loop.run(&scheduler);

    assert_eq!(device.stats().get_colors, 2);
    assert_eq!(device.timeout(), 0);
    // the painted key already matched the device, so nothing was sent
    assert!(device.take_sent().is_empty());
}

#[test]
fn empty_registry_does_no_device_io() {
    let (device, _registry, mut render_loop, scheduler) = setup(&[("keys", 8)]);
    let stop = scheduler.stop_handle();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        stop.stop();
    });

    let termination = render_loop.run(&scheduler);
    stopper.join().unwrap();

    assert!(matches!(termination, Termination::Stopped));
    let stats = device.stats();
    assert_eq!(stats.io_calls(), stats.get_colors);
    assert_eq!(stats.flushes, 0);
    assert_eq!(render_loop.stats().frames, 0);
}

#[test]
fn recovers_from_one_transport_error() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4)]);
    device.inject(
        DeviceOp::SetColors,
        DeviceError::Transport("report dropped".into()),
    );
    registry.set(vec![shared(Cycle(0)), stop_after(&scheduler, 5)]);

    let termination = render_loop.run(&scheduler);

    assert!(matches!(termination, Termination::Stopped));
    let stats = device.stats();
    assert_eq!(stats.resyncs, 1);
    assert_eq!(stats.get_colors, 1, "recovery must not prime again");
    assert_eq!(stats.commits, 4);
    assert_eq!(render_loop.stats().resyncs, 1);
    assert_eq!(device.color(0, 0).red, 5);
}

#[test]
fn failed_resync_is_reported() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4)]);
    device.inject(DeviceOp::Commit, DeviceError::Transport("bad ack".into()));
    device.set_resync_result(false);
    registry.set(vec![shared(Cycle(0)), stop_after(&scheduler, 50)]);

    let (termination, errors) = count_errors(|| render_loop.run(&scheduler));
    match termination {
        Termination::Failed(RenderLoopError::Device(DeviceError::Transport(msg))) => {
            assert_eq!(msg, "bad ack")
        }
        other => panic!("unexpected termination: {other:?}"),
    }
    assert_eq!(errors, 1);
    assert_eq!(device.stats().resyncs, 1);
    assert_eq!(render_loop.state(), LoopState::Terminated);
}

#[test]
fn device_removal_is_an_expected_termination() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4)]);
    device.inject(DeviceOp::SetColors, DeviceError::removed());
    device.set_resync_result(false);
    registry.set(vec![shared(Cycle(0)), stop_after(&scheduler, 50)]);

    let (termination, errors) = count_errors(|| render_loop.run(&scheduler));

    assert!(!termination.is_failure());
    match termination {
        Termination::Expected(err) => assert!(err.is_device_removed()),
        other => panic!("unexpected termination: {other:?}"),
    }
    assert_eq!(errors, 0);
}

#[test]
fn read_timeout_is_an_expected_termination() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4)]);
    device.inject(DeviceOp::Flush, DeviceError::Timeout);
    device.set_resync_result(false);
    registry.set(vec![shared(Cycle(0)), stop_after(&scheduler, 50)]);

    let (termination, errors) = count_errors(|| render_loop.run(&scheduler));

    assert!(matches!(termination, Termination::Expected(DeviceError::Timeout)));
    assert_eq!(errors, 0);
}

#[test]
fn priming_failure_aborts_startup() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4)]);
    device.inject(DeviceOp::GetColors, DeviceError::removed());
    registry.set(vec![shared(Cycle(0))]);

    let (termination, errors) = count_errors(|| render_loop.run(&scheduler));

    assert!(termination.is_failure());
    assert_eq!(errors, 1);
    let stats = device.stats();
    assert_eq!(stats.resyncs, 0);
    assert_eq!(stats.timeouts_set, 0);
    assert_eq!(stats.flushes, 0);
    assert_eq!(render_loop.state(), LoopState::Terminated);
}

#[test]
fn renderer_panic_terminates_the_loop() {
    struct Faulty;

    impl Renderer for Faulty {
        fn render(&mut self, _elapsed_ns: u64, _target: &mut RenderTarget) {
            panic!("bad effect");
        }
    }

    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 4)]);
    registry.set(vec![shared(Faulty)]);

    let (termination, errors) = count_errors(|| render_loop.run(&scheduler));
    match termination {
        Termination::Failed(RenderLoopError::RendererPanicked(msg)) => assert_eq!(msg, "bad effect"),
        other => panic!("unexpected termination: {other:?}"),
    }
    assert_eq!(errors, 1);
    assert_eq!(device.stats().resyncs, 0);
}

#[test]
fn renderers_can_be_added_while_running() {
    let (device, registry, mut render_loop, scheduler) = setup(&[("keys", 3)]);
    let stop = scheduler.stop_handle();

    let worker = std::thread::spawn(move || {
        let termination = render_loop.run(&scheduler);
        (termination, render_loop)
    });

    std::thread::sleep(Duration::from_millis(20));
    let red = shared(Paint(vec![
        (0, 0, RgbaColor::opaque(255, 0, 0)),
        (0, 1, RgbaColor::opaque(255, 0, 0)),
        (0, 2, RgbaColor::opaque(255, 0, 0)),
    ]));
    registry.push(Arc::clone(&red));

    let deadline = Instant::now() + Duration::from_secs(5);
    while device.color(0, 2).red != 255 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    stop.stop();

    let (termination, render_loop) = worker.join().unwrap();
    assert!(matches!(termination, Termination::Stopped));
    assert_eq!(device.color(0, 2).red, 255);
    assert_eq!(render_loop.committed_color(0, 2), RgbaColor::opaque(255, 0, 0));

    // the loop never owned the renderer
    drop(render_loop);
    assert_eq!(Arc::strong_count(&red), 2);
    registry.clear();
    assert_eq!(Arc::strong_count(&red), 1);
}
