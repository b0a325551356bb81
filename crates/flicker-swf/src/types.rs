//! Geometry and color records
//!
//! These records are bit-packed and self-describing: each carries the
//! width of its own fields. All structured readers re-align to a byte
//! boundary before starting, per the format.

use flicker_bits::{BitReader, ReadResult};

/// Twips per pixel: the format's fixed coordinate scale.
pub const TWIPS_PER_PIXEL: f64 = 20.0;

/// Fixed-point scale of matrix scale/rotate terms (16.16).
const FIXED_16_16: f64 = 1.0 / 65536.0;

/// Fixed-point scale of color-transform multipliers (8.8).
const FIXED_8_8: f64 = 1.0 / 256.0;

/// A rectangle in twips: (x_min, x_max, y_min, y_max), the field order of
/// the wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge in twips.
    pub x_min: i32,
    /// Right edge in twips.
    pub x_max: i32,
    /// Top edge in twips.
    pub y_min: i32,
    /// Bottom edge in twips.
    pub y_max: i32,
}

impl Rect {
    /// Parse a packed rectangle: a 5-bit field width followed by four
    /// signed fields of that width.
    pub fn parse(r: &mut BitReader) -> ReadResult<Self> {
        r.sync();
        let nbits = r.bits(5)?;
        Ok(Self {
            x_min: r.sbits(nbits)?,
            x_max: r.sbits(nbits)?,
            y_min: r.sbits(nbits)?,
            y_max: r.sbits(nbits)?,
        })
    }

    /// Width in twips.
    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    /// Height in twips.
    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }
}

/// A 2×3 affine transform. Scale and rotate/skew terms are 16.16 fixed
/// point; translation is in twips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// First rotate/skew term.
    pub rotate_skew_0: f64,
    /// Second rotate/skew term.
    pub rotate_skew_1: f64,
    /// Horizontal translation in twips.
    pub translate_x: i32,
    /// Vertical translation in twips.
    pub translate_y: i32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
        rotate_skew_0: 0.0,
        rotate_skew_1: 0.0,
        translate_x: 0,
        translate_y: 0,
    };

    /// Parse a packed matrix: optional scale pair, optional rotate pair,
    /// then the translation pair, each group with its own 5-bit width.
    pub fn parse(r: &mut BitReader) -> ReadResult<Self> {
        r.sync();
        let mut m = Self::IDENTITY;
        if r.bit()? {
            let nbits = r.bits(5)?;
            m.scale_x = r.sbits(nbits)? as f64 * FIXED_16_16;
            m.scale_y = r.sbits(nbits)? as f64 * FIXED_16_16;
        }
        if r.bit()? {
            let nbits = r.bits(5)?;
            m.rotate_skew_0 = r.sbits(nbits)? as f64 * FIXED_16_16;
            m.rotate_skew_1 = r.sbits(nbits)? as f64 * FIXED_16_16;
        }
        let nbits = r.bits(5)?;
        m.translate_x = r.sbits(nbits)?;
        m.translate_y = r.sbits(nbits)?;
        Ok(m)
    }
}

/// A per-channel color transform: value' = value × mult + add.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransform {
    /// RGBA multipliers (8.8 fixed point on the wire).
    pub mult: [f64; 4],
    /// RGBA addends.
    pub add: [i32; 4],
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        mult: [1.0; 4],
        add: [0; 4],
    };

    /// Parse a packed color transform: has-add and has-mult bits, a 4-bit
    /// field width, then the present groups (multipliers first).
    pub fn parse(r: &mut BitReader, with_alpha: bool) -> ReadResult<Self> {
        r.sync();
        let has_add = r.bit()?;
        let has_mult = r.bit()?;
        let nbits = r.bits(4)?;
        let channels = if with_alpha { 4 } else { 3 };
        let mut out = Self::IDENTITY;
        if has_mult {
            for i in 0..channels {
                out.mult[i] = r.sbits(nbits)? as f64 * FIXED_8_8;
            }
        }
        if has_add {
            for i in 0..channels {
                out.add[i] = r.sbits(nbits)?;
            }
        }
        Ok(out)
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        // Stages default to white.
        Self {
            r: 0xff,
            g: 0xff,
            b: 0xff,
            a: 0xff,
        }
    }
}

impl Color {
    /// Read an opaque RGB color.
    pub fn parse_rgb(r: &mut BitReader) -> ReadResult<Self> {
        Ok(Self {
            r: r.u8()?,
            g: r.u8()?,
            b: r.u8()?,
            a: 0xff,
        })
    }

    /// Read an RGBA color.
    pub fn parse_rgba(r: &mut BitReader) -> ReadResult<Self> {
        Ok(Self {
            r: r.u8()?,
            g: r.u8()?,
            b: r.u8()?,
            a: r.u8()?,
        })
    }
}

/// One stop of a gradient ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientEntry {
    /// Position of the stop, 0..=255.
    pub ratio: u8,
    /// Color at the stop.
    pub color: Color,
}

/// A gradient ramp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gradient {
    /// The stops, in file order.
    pub entries: Vec<GradientEntry>,
}

impl Gradient {
    /// Parse a gradient: an 8-bit stop count, then ratio/color records.
    pub fn parse(r: &mut BitReader, with_alpha: bool) -> ReadResult<Self> {
        r.sync();
        let count = r.bits(8)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let ratio = r.bits(8)? as u8;
            let color = if with_alpha {
                Color::parse_rgba(r)?
            } else {
                Color::parse_rgb(r)?
            };
            entries.push(GradientEntry { ratio, color });
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicker_bits::Buffer;

    /// Append `n` bits of `value`, MSB first, to a bit string.
    fn push_bits(bits: &mut Vec<bool>, value: u32, n: u32) {
        for i in (0..n).rev() {
            bits.push((value >> i) & 1 != 0);
        }
    }

    fn to_bytes(bits: &[bool]) -> Vec<u8> {
        let mut out = vec![0u8; bits.len().div_ceil(8)];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                out[i / 8] |= 1 << (7 - i % 8);
            }
        }
        out
    }

    #[test]
    fn test_rect_parse() {
        // nbits=8, fields 0, 100, 0, 100.
        let mut bits = Vec::new();
        push_bits(&mut bits, 8, 5);
        for v in [0u32, 100, 0, 100] {
            push_bits(&mut bits, v, 8);
        }
        let mut r = BitReader::new(Buffer::from_vec(to_bytes(&bits)));
        let rect = Rect::parse(&mut r).unwrap();
        assert_eq!(
            rect,
            Rect {
                x_min: 0,
                x_max: 100,
                y_min: 0,
                y_max: 100
            }
        );
        assert_eq!(rect.width(), 100);
    }

    #[test]
    fn test_rect_signed_fields() {
        let mut bits = Vec::new();
        push_bits(&mut bits, 8, 5);
        // -20 as 8-bit two's complement.
        push_bits(&mut bits, 0x100 - 20, 8);
        for v in [20u32, 0, 40] {
            push_bits(&mut bits, v, 8);
        }
        let mut r = BitReader::new(Buffer::from_vec(to_bytes(&bits)));
        let rect = Rect::parse(&mut r).unwrap();
        assert_eq!(rect.x_min, -20);
        assert_eq!(rect.width(), 40);
    }

    #[test]
    fn test_matrix_identity_when_flags_clear() {
        // has_scale=0, has_rotate=0, 5-bit translate width of 0.
        let mut bits = Vec::new();
        push_bits(&mut bits, 0, 1);
        push_bits(&mut bits, 0, 1);
        push_bits(&mut bits, 0, 5);
        let mut r = BitReader::new(Buffer::from_vec(to_bytes(&bits)));
        assert_eq!(Matrix::parse(&mut r).unwrap(), Matrix::IDENTITY);
    }

    #[test]
    fn test_matrix_scale_fixed_point() {
        // has_scale=1, 17-bit fields holding 2.0 (0x20000) — the 16.16
        // fixed-point doubling.
        let mut bits = Vec::new();
        push_bits(&mut bits, 1, 1);
        push_bits(&mut bits, 18, 5);
        push_bits(&mut bits, 0x20000, 18);
        push_bits(&mut bits, 0x20000, 18);
        push_bits(&mut bits, 0, 1); // no rotate
        push_bits(&mut bits, 0, 5); // zero-width translate
        let mut r = BitReader::new(Buffer::from_vec(to_bytes(&bits)));
        let m = Matrix::parse(&mut r).unwrap();
        assert_eq!(m.scale_x, 2.0);
        assert_eq!(m.scale_y, 2.0);
        assert_eq!(m.translate_x, 0);
    }

    #[test]
    fn test_color_transform_identity_when_flags_clear() {
        let mut bits = Vec::new();
        push_bits(&mut bits, 0, 1); // has_add
        push_bits(&mut bits, 0, 1); // has_mult
        push_bits(&mut bits, 0, 4);
        let mut r = BitReader::new(Buffer::from_vec(to_bytes(&bits)));
        let ct = ColorTransform::parse(&mut r, true).unwrap();
        assert_eq!(ct, ColorTransform::IDENTITY);
    }

    #[test]
    fn test_color_transform_mult() {
        // has_add=0, has_mult=1, 9-bit fields of 128 (= 0.5 in 8.8).
        let mut bits = Vec::new();
        push_bits(&mut bits, 0, 1);
        push_bits(&mut bits, 1, 1);
        push_bits(&mut bits, 9, 4);
        for _ in 0..4 {
            push_bits(&mut bits, 128, 9);
        }
        let mut r = BitReader::new(Buffer::from_vec(to_bytes(&bits)));
        let ct = ColorTransform::parse(&mut r, true).unwrap();
        assert_eq!(ct.mult, [0.5; 4]);
        assert_eq!(ct.add, [0; 4]);
    }

    #[test]
    fn test_gradient_parse() {
        let bytes = vec![2, 0, 0x11, 0x22, 0x33, 255, 0x44, 0x55, 0x66];
        let mut r = BitReader::new(Buffer::from_vec(bytes));
        let g = Gradient::parse(&mut r, false).unwrap();
        assert_eq!(g.entries.len(), 2);
        assert_eq!(g.entries[0].ratio, 0);
        assert_eq!(g.entries[1].color.r, 0x44);
        assert_eq!(g.entries[1].color.a, 0xff);
    }
}
