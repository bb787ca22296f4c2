use std::ops::{Add, AddAssign, DivAssign, Mul, Sub};

/// RGBA color with `f32` components in the `0.0..=1.0` range.
///
/// Whether the components are premultiplied by alpha depends on the call
/// site. [`Rgba::scale`] multiplies the alpha channel along with the color
/// channels; the matcher's error metric depends on that.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(bytes: [u8; 4]) -> Self {
        Self {
            r: bytes[0] as f32 / 255.0,
            g: bytes[1] as f32 / 255.0,
            b: bytes[2] as f32 / 255.0,
            a: bytes[3] as f32 / 255.0,
        }
    }

    /// Multiply every component, including alpha, by `f`.
    pub fn scale(self, f: f32) -> Self {
        Self { r: self.r * f, g: self.g * f, b: self.b * f, a: self.a * f }
    }

    /// Premultiply by this color's own alpha.
    pub fn premultiplied(self) -> Self {
        self.scale(self.a)
    }

    pub fn sum(self) -> f32 {
        self.r + self.g + self.b + self.a
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
            (self.a * 255.0) as u8,
        ]
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        [(self.r * 255.0) as u8, (self.g * 255.0) as u8, (self.b * 255.0) as u8]
    }
}

impl Add for Rgba {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
            a: self.a + other.a,
        }
    }
}

impl AddAssign for Rgba {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Rgba {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            r: self.r - other.r,
            g: self.g - other.g,
            b: self.b - other.b,
            a: self.a - other.a,
        }
    }
}

/// Component-wise product.
impl Mul for Rgba {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self {
            r: self.r * other.r,
            g: self.g * other.g,
            b: self.b * other.b,
            a: self.a * other.a,
        }
    }
}

impl Mul<f32> for Rgba {
    type Output = Self;

    fn mul(self, f: f32) -> Self {
        self.scale(f)
    }
}

impl DivAssign<f32> for Rgba {
    fn div_assign(&mut self, f: f32) {
        self.r /= f;
        self.g /= f;
        self.b /= f;
        self.a /= f;
    }
}
