//! keyglow lighting daemon
//!
//! Runs the render loop with the configured effect stack. Without a hardware
//! backend the loop drives an in-memory device, which makes this a dry run
//! of exactly what would be sent to a keyboard.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod cli;
use cli::{Cli, Commands};

use keyglow::device::{Device, SimulatedDevice};
use keyglow::{AnimationLoop, DaemonConfig, RenderLoop, RendererRegistry, Termination};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(DaemonConfig::default_path);
    info!("Loading config from {:?}", config_path);
    let config = DaemonConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command {
        None => run(config, None),
        Some(Commands::Run { fps }) => run(config, fps),
        Some(Commands::Layout) => {
            layout(&config);
            Ok(())
        }
        Some(Commands::ShowConfig) => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn run(config: DaemonConfig, fps: Option<u32>) -> Result<()> {
    let fps = fps.unwrap_or(config.fps);
    if fps == 0 {
        bail!("frame rate must be at least 1");
    }

    let device = SimulatedDevice::new(&config.layout());
    for block in device.blocks() {
        info!("Block {} '{}': {} keys", block.id(), block.name(), block.keys().len());
    }

    let registry = RendererRegistry::new();
    registry.set(config.renderers()?);
    if registry.is_empty() {
        warn!("No effects configured; the device will not be touched");
    }

    let mut render_loop = RenderLoop::new(device.clone(), registry)?;
    let scheduler = AnimationLoop::new(fps);

    let stop = scheduler.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("installing Ctrl+C handler")?;
    println!("Rendering at {fps} FPS. Ctrl+C to stop.");

    let termination = render_loop.run(&scheduler);

    let stats = render_loop.stats();
    let calls = device.stats();
    println!(
        "Frames: {}, commits: {}, directives: {}, resyncs: {}",
        stats.frames, stats.commits, stats.directives, stats.resyncs
    );
    println!(
        "Device calls: flush={} set_colors={} commit={}",
        calls.flushes, calls.set_colors, calls.commits
    );

    match termination {
        Termination::Stopped => Ok(()),
        Termination::Expected(err) => {
            println!("Device went away: {err}");
            Ok(())
        }
        Termination::Failed(err) => Err(err.into()),
    }
}

fn layout(config: &DaemonConfig) {
    let device = SimulatedDevice::new(&config.layout());
    let target = RenderLoop::render_target_for(&device);

    println!(
        "{} blocks, {} colors ({} bytes, {}-byte aligned)",
        target.block_count(),
        target.len(),
        target.len() * std::mem::size_of::<keyglow::RgbaColor>(),
        keyglow::render::ALIGN_BYTES
    );
    for (b, block) in device.blocks().iter().enumerate() {
        let offset = target.block_offset(b);
        let len = target.block_len(b);
        let next = if b + 1 < target.block_count() {
            target.block_offset(b + 1)
        } else {
            target.len()
        };
        println!(
            "  {:>2} {:<12} offset {:>4}  keys {:>4}  padding {:>2}",
            b,
            block.name(),
            offset,
            len,
            next - offset - len
        );
    }
}
