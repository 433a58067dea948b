//! Built-in renderers.
//!
//! - [`Solid`]: every key one color
//! - [`Breathe`]: a color fading in and out over whatever is below it
//! - [`Wave`]: a rainbow scrolling across each block

use std::f32::consts::TAU;

use crate::color::RgbaColor;
use crate::render::{blend, RenderTarget, Renderer};

const NANOS_PER_MS: u64 = 1_000_000;

/// Advance a phase accumulator and return the position in the period (0..1)
fn advance(phase_ns: &mut u64, elapsed_ns: u64, period_ns: u64) -> f32 {
    let period_ns = period_ns.max(1);
    let sum = u128::from(*phase_ns) + u128::from(elapsed_ns);
    *phase_ns = (sum % u128::from(period_ns)) as u64;
    *phase_ns as f32 / period_ns as f32
}

/// Paints every key with one color
#[derive(Debug, Clone)]
pub struct Solid {
    pub color: RgbaColor,
}

impl Solid {
    pub fn new(color: RgbaColor) -> Self {
        Self { color }
    }
}

impl Renderer for Solid {
    fn render(&mut self, _elapsed_ns: u64, target: &mut RenderTarget) {
        target.fill(self.color);
    }
}

/// Fades a color in and out, blended over previous renderers' output
#[derive(Debug)]
pub struct Breathe {
    color: RgbaColor,
    period_ns: u64,
    phase_ns: u64,
    layer: Option<RenderTarget>,
}

impl Breathe {
    pub fn new(color: RgbaColor, period_ms: u64) -> Self {
        Self {
            color,
            period_ns: period_ms.saturating_mul(NANOS_PER_MS),
            phase_ns: 0,
            layer: None,
        }
    }

    /// Opacity at a position in the period: 0 at the ends, 1 in the middle
    fn intensity(position: f32) -> f32 {
        0.5 - 0.5 * (TAU * position).cos()
    }
}

impl Renderer for Breathe {
    fn render(&mut self, elapsed_ns: u64, target: &mut RenderTarget) {
        let position = advance(&mut self.phase_ns, elapsed_ns, self.period_ns);
        let alpha = (Self::intensity(position) * self.color.alpha as f32).round() as u8;

        // The layout only changes if the renderer moves to another device
        if self
            .layer
            .as_ref()
            .is_none_or(|layer| !layer.same_layout(target))
        {
            self.layer = Some(RenderTarget::with_layout_of(target));
        }
        if let Some(layer) = self.layer.as_mut() {
            layer.fill(self.color.with_alpha(alpha));
            blend(target, layer);
        }
    }
}

/// Rainbow scrolling across each block
#[derive(Debug, Clone)]
pub struct Wave {
    period_ns: u64,
    phase_ns: u64,
}

impl Wave {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ns: period_ms.saturating_mul(NANOS_PER_MS),
            phase_ns: 0,
        }
    }
}

impl Renderer for Wave {
    fn render(&mut self, elapsed_ns: u64, target: &mut RenderTarget) {
        let base = advance(&mut self.phase_ns, elapsed_ns, self.period_ns) * 360.0;
        for b in 0..target.block_count() {
            let len = target.block_len(b);
            for k in 0..len {
                let hue = base + k as f32 * 360.0 / len as f32;
                *target.get_mut(b, k) = RgbaColor::from_hsv(hue, 1.0, 1.0);
            }
        }
    }
}
