use serde::{Deserialize, Serialize};

use crate::mapping::remap;

/// 线性 RGB，分量在 [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const NEUTRAL: Rgb = Rgb { r: 0.6, g: 0.6, b: 0.6 };

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// 解析 `#rrggbb` 或 `rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self {
            r: channel(0..2)? as f64 / 255.0,
            g: channel(2..4)? as f64 / 255.0,
            b: channel(4..6)? as f64 / 255.0,
        })
    }

    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        Rgb {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn offset(self, delta: f64) -> Rgb {
        Rgb { r: self.r + delta, g: self.g + delta, b: self.b + delta }.clamped()
    }

    pub fn clamped(self) -> Rgb {
        let c = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Rgb { r: c(self.r), g: c(self.g), b: c(self.b) }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

/// 全局色彩函数：x 归一化后从暖色过渡到冷色
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChromaShift {
    pub warm: Rgb,
    pub cool: Rgb,
}

impl Default for ChromaShift {
    fn default() -> Self {
        Self {
            warm: Rgb::new(0.96, 0.62, 0.38),
            cool: Rgb::new(0.32, 0.56, 0.94),
        }
    }
}

impl ChromaShift {
    pub fn at(&self, x_norm: f64) -> Rgb {
        Rgb {
            r: remap(x_norm, 0.0, 1.0, self.warm.r, self.cool.r),
            g: remap(x_norm, 0.0, 1.0, self.warm.g, self.cool.g),
            b: remap(x_norm, 0.0, 1.0, self.warm.b, self.cool.b),
        }
    }
}
