// RGBA color type shared by render buffers and effects

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Color with straight (non-premultiplied) alpha
///
/// Tightly packed as R, G, B, A bytes so buffers of colors can be processed
/// as raw bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntoBytes, FromBytes, KnownLayout, Immutable,
)]
#[repr(C)]
pub struct RgbaColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

const _: () = assert!(std::mem::size_of::<RgbaColor>() == 4);

impl RgbaColor {
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Opaque color from RGB components
    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 255)
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// Create an opaque color from HSV (h: 0-360, s: 0-1, v: 0-1)
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as i32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self::opaque(
            ((r + m) * 255.0) as u8,
            ((g + m) * 255.0) as u8,
            ((b + m) * 255.0) as u8,
        )
    }

    /// Parse "#RRGGBB", "#RRGGBBAA" or a color name
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(hex) = s.strip_prefix('#') {
            let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Self::opaque(channel(0)?, channel(2)?, channel(4)?)),
                8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
                _ => None,
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::opaque(255, 0, 0)),
            "green" => Some(Self::opaque(0, 255, 0)),
            "blue" => Some(Self::opaque(0, 0, 255)),
            "yellow" => Some(Self::opaque(255, 255, 0)),
            "cyan" => Some(Self::opaque(0, 255, 255)),
            "magenta" | "pink" => Some(Self::opaque(255, 0, 255)),
            "orange" => Some(Self::opaque(255, 165, 0)),
            "purple" => Some(Self::opaque(128, 0, 255)),
            "transparent" => Some(Self::TRANSPARENT),
            _ => None,
        }
    }
}
