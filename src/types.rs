use fixed::types::I32F32;

/// A length in points, stored with milli-point precision.
///
/// Layout hands geometry over in fractional points (1/1000 pt); `Pt` keeps
/// that exact value and only becomes an `f32` at the drawing boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn from_i32(value: i32) -> Pt {
        Pt::from_milli_i64((value as i64) * 1000)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        Pt::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Pt {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn a4() -> Self {
        Self {
            width: Pt::from_f32(595.28),
            height: Pt::from_f32(841.89),
        }
    }

    pub fn letter() -> Self {
        // 8.5in x 11in at 72pt/in.
        Self {
            width: Pt::from_f32(612.0),
            height: Pt::from_f32(792.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl Rect {
    pub fn new(x: Pt, y: Pt, width: Pt, height: Pt) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from raw fractional-point values.
    pub fn from_milli(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x: Pt::from_milli_i64(x),
            y: Pt::from_milli_i64(y),
            width: Pt::from_milli_i64(width),
            height: Pt::from_milli_i64(height),
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: size.width,
            height: size.height,
        }
    }
}

/// An RGBA colour with channels in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Shifts every colour channel toward white (`factor > 0`) or black
    /// (`factor < 0`) by `|factor|`. Alpha is left alone.
    pub fn lighten(self, factor: f32) -> Color {
        let factor = if factor.is_finite() {
            factor.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let shift = |c: f32| {
            let c = c.clamp(0.0, 1.0);
            if factor > 0.0 {
                c + (1.0 - c) * factor
            } else {
                c - c * -factor
            }
        };
        Color {
            r: shift(self.r),
            g: shift(self.g),
            b: shift(self.b),
            a: self.a,
        }
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
        .unwrap_or(tiny_skia::Color::BLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn milli_points_survive_round_trip() {
        let pt = Pt::from_milli_i64(100_250);
        assert_eq!(pt.to_milli_i64(), 100_250);
        assert!(approx(pt.to_f32(), 100.25));
    }

    #[test]
    fn lighten_moves_channels_toward_white() {
        let c = Color::rgb(0.5, 0.0, 1.0).lighten(0.4);
        assert!(approx(c.r, 0.7));
        assert!(approx(c.g, 0.4));
        assert!(approx(c.b, 1.0));
        assert!(approx(c.a, 1.0));
    }

    #[test]
    fn darken_moves_channels_toward_black_and_keeps_alpha() {
        let c = Color::rgba(0.5, 1.0, 0.0, 0.25).lighten(-0.4);
        assert!(approx(c.r, 0.3));
        assert!(approx(c.g, 0.6));
        assert!(approx(c.b, 0.0));
        assert!(approx(c.a, 0.25));
    }

    #[test]
    fn lighten_clamps_out_of_range_factors() {
        let white = Color::rgb(0.2, 0.2, 0.2).lighten(3.0);
        assert!(approx(white.r, 1.0) && approx(white.g, 1.0) && approx(white.b, 1.0));
        assert_eq!(Color::rgb(0.2, 0.2, 0.2).lighten(-3.0), Color::BLACK);
    }
}
